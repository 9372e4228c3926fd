mod common;
use common::*;
use note_query::*;

#[test]
fn empty_text_value_is_reported_over_its_quotes() {
    let errors = parse_err("Notes with \"\"");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Empty value matches everything and is invalid");
    assert_eq!((errors[0].start, errors[0].end), (11, 13));
}

#[test]
fn blank_values_are_empty_too() {
    for input in [
        "Notes with \"   \"",
        "Notes named '  '",
        "Notes named / /",
        "Notes in [[ ]]",
    ] {
        let errors = messages(input);
        assert_eq!(
            errors,
            ["Empty value matches everything and is invalid"],
            "{input}"
        );
    }
}

#[test]
fn empty_value_still_builds_the_clause() {
    let result = parse_query_text("Notes with \"\"");
    assert!(result.query.is_none());
    // The clause was completed, so no "missing value" error is added.
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn tag_without_body_is_empty() {
    let errors = parse_err("Notes with # and \"x\"");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Empty value matches everything and is invalid");
    assert_eq!((errors[0].start, errors[0].end), (11, 12));
}

#[test]
fn unterminated_fuzzy_value_aborts() {
    let errors = parse_err("Notes with '");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Value starting with ' was not closed");
    assert_eq!((errors[0].start, errors[0].end), (11, 12));
}

#[test]
fn unterminated_value_spans_to_end_of_text() {
    let errors = parse_err("Notes with (\"abc and (more");
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert_eq!(errors[0].message, "Value starting with \" was not closed");
    assert_eq!((errors[0].start, errors[0].end), (12, 26));

    let errors = messages("Notes in [[Projects");
    assert_eq!(errors, ["Value starting with [[ was not closed"]);

    let errors = messages("Notes with /ab");
    assert_eq!(errors, ["Value starting with / was not closed"]);

    let errors = messages("Notes with #");
    assert_eq!(errors, ["Value starting with # was not closed"]);
}

#[test]
fn unexpected_tokens_are_skipped() {
    let errors = parse_err("Notes wibble with \"x\"");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("Unexpected \"wibble\", expected "));
    assert!(errors[0].message.contains("a clause"));
    assert_eq!((errors[0].start, errors[0].end), (6, 12));
}

#[test]
fn each_unexpected_token_is_reported() {
    let errors = messages("with \"x\"");
    assert_eq!(errors[0], "Unexpected \"with\", expected a form");
    assert!(errors.len() > 1);
}

#[test]
fn value_shape_must_fit_the_clause() {
    let errors = messages("Notes named #tag");
    assert!(errors[0].starts_with("Unexpected \"#\""), "{errors:?}");

    let errors = messages("Notes linked from \"text\"");
    assert!(errors[0].starts_with("Unexpected \"\"\""), "{errors:?}");

    let errors = messages("Notes with all \"x\"");
    assert!(errors[0].starts_with("Unexpected \"all\""), "{errors:?}");
}

#[test]
fn bad_regex_flags_and_patterns() {
    let errors = parse_err("Notes named /a/gq");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Unknown regular expression flag 'q'");
    assert_eq!((errors[0].start, errors[0].end), (15, 17));

    let errors = messages("Notes named /(/");
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].starts_with("invalid regular expression"));
}

#[test]
fn unfinished_structure_is_reported_at_the_end() {
    assert_eq!(messages("Notes with"), ["Clause is missing a value"]);
    assert_eq!(messages("Notes not"), ["Expected a clause after 'not'"]);
    assert_eq!(messages("Notes with (\"a\""), ["Group was not closed"]);
    assert_eq!(messages("Notes not (with \"a\""), ["Group was not closed"]);
    assert_eq!(messages("Notes in {Folders"), ["Subquery was not closed"]);

    let errors = parse_err("Notes with (\"a\"");
    assert_eq!((errors[0].start, errors[0].end), (11, 12));
}

#[test]
fn offsets_are_utf16_code_units() {
    let errors = parse_err("Notes with \"😀\" and \"\"");
    assert_eq!(errors.len(), 1);
    assert_eq!((errors[0].start, errors[0].end), (20, 22));

    let query = parse_ok("Notes with \"😀 émoji\"");
    with_text_is(&query.children()[0], "😀 émoji");
}

#[test]
fn annotations_line_up_with_tokens() {
    for input in [
        "",
        "Notes",
        "Notes with \"x\"",
        "Notes with '",
        "Notes wibble (with \"a\" or #b/c",
        "Notes in {Folders named /x\\/y/gi}",
        "Notes\nwith \"multi\nline\"",
    ] {
        let result = parse_query_text(input);
        assert_eq!(result.annotations.len(), result.tokens.len(), "{input}");
    }
}

#[test]
fn annotations_record_the_active_expectation() {
    let result = parse_query_text("Notes with \"x\"");
    // Notes, " ", with, " ", open quote, x, close quote
    assert_eq!(result.tokens.len(), 7);
    let expected = |index: usize| result.annotations[index].expected_scope_prefixes.clone();

    assert_eq!(expected(0), Some(vec!["keyword.form".to_string()]));
    let after_form = expected(2).unwrap();
    assert!(after_form.contains(&"keyword.clause".to_string()));
    assert!(after_form.contains(&"keyword.operator.join".to_string()));

    let after_with = expected(4).unwrap();
    assert!(after_with.contains(&"punctuation.definition.text.begin".to_string()));
    assert!(after_with.contains(&"punctuation.definition.tag".to_string()));
    assert!(!after_with.contains(&"keyword.modifier".to_string()));

    // Tokens inside the value carry no hint.
    assert_eq!(expected(5), None);
    assert_eq!(expected(6), None);
}

#[test]
fn expectation_lookup_by_offset() {
    let result = parse_query_text("Notes in ");
    let hint = result.expectation_at(8).unwrap();
    assert!(hint.contains(&"keyword.modifier".to_string()));
    assert!(hint.contains(&"punctuation.definition.reference.begin".to_string()));
    assert!(hint.contains(&"punctuation.section.subquery.begin".to_string()));
}

#[test]
fn only_the_innermost_closer_is_offered() {
    let hint = |input: &str| {
        let result = parse_query_text(input);
        result
            .annotations
            .last()
            .and_then(|annotation| annotation.expected_scope_prefixes.clone())
            .unwrap()
    };
    let group_end = "punctuation.section.group.end".to_string();
    let subquery_end = "punctuation.section.subquery.end".to_string();

    let inside_group = hint("Notes in {Folders (named \"a\" ");
    assert!(inside_group.contains(&group_end));
    assert!(!inside_group.contains(&subquery_end));

    let after_group = hint("Notes in {Folders (named \"a\") ");
    assert!(after_group.contains(&subquery_end));
    assert!(!after_group.contains(&group_end));
}
