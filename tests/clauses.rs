mod common;
use common::*;
use note_query::*;

#[test]
fn single_text_clause_for_every_form_and_kind() {
    let cases = [
        ("Notes named \"Daily\"", "Notes", ClauseKind::Named),
        ("Notes with \"Daily\"", "Notes", ClauseKind::With),
        ("Folders named \"Daily\"", "Folders", ClauseKind::Named),
        ("Folders with \"Daily\"", "Folders", ClauseKind::With),
    ];
    for (input, form, kind) in cases {
        let query = parse_ok(input);
        assert_eq!(query.forms, [form], "{input}");
        assert_eq!(query.join(), Join::And, "{input}");
        assert_eq!(query.children().len(), 1, "{input}");
        text_is(&query.children()[0], kind, "Daily");
        assert_eq!(as_clause(&query.children()[0]).modifier, None);
    }
}

#[test]
fn form_keywords_are_case_insensitive() {
    let query = parse_ok("NOTES and folders with \"x\"");
    assert_eq!(query.forms, ["Notes", "Folders"]);
    assert_eq!(query.join(), Join::And);
    with_text_is(&query.children()[0], "x");
}

#[test]
fn forms_alone_parse() {
    let query = parse_ok("Notes");
    assert_eq!(query.forms, ["Notes"]);
    assert!(query.children().is_empty());

    let query = parse_ok("Notes or Folders");
    assert_eq!(query.forms, ["Notes", "Folders"]);
    assert_eq!(query.join(), Join::And);
}

#[test]
fn empty_input_is_an_empty_query() {
    let query = parse_ok("");
    assert!(query.is_empty());
    let query = parse_ok("   \n ");
    assert!(query.is_empty());
}

#[test]
fn text_is_kept_verbatim() {
    let query = parse_ok("Notes with \"  spaced  out \"");
    with_text_is(&query.children()[0], "  spaced  out ");

    let query = parse_ok("Notes with \"it's (not) #a [[b]]\"");
    with_text_is(&query.children()[0], "it's (not) #a [[b]]");
}

#[test]
fn text_can_span_lines() {
    let query = parse_ok("Notes with \"line one\nline two\"");
    with_text_is(&query.children()[0], "line one\nline two");
}

#[test]
fn tag_path_segments() {
    let query = parse_ok("Notes with #parent/child");
    tag_is(&query.children()[0], &["parent", "child"]);

    let query = parse_ok("Notes with #project.alpha/notes");
    tag_is(&query.children()[0], &["project", "alpha", "notes"]);

    let query = parse_ok("Notes with #solo");
    tag_is(&query.children()[0], &["solo"]);
}

#[test]
fn todo_states() {
    let cases = [
        ("Notes with todos", TodoState::Any),
        ("Notes with any todo", TodoState::Any),
        ("Notes with open todos", TodoState::Open),
        ("Notes with completed todos", TodoState::Complete),
        ("Notes with complete todo", TodoState::Complete),
        ("Notes with canceled todos", TodoState::Canceled),
        ("Notes with cancelled todos", TodoState::Canceled),
        ("Notes with closed todos", TodoState::Closed),
    ];
    for (input, state) in cases {
        let query = parse_ok(input);
        let clause = as_clause(&query.children()[0]);
        assert_eq!(clause.kind, ClauseKind::With, "{input}");
        todo_is(&query.children()[0], state);
    }
}

#[test]
fn references_and_modifiers() {
    let query = parse_ok("Notes in [[Projects/Alpha]]");
    let clause = as_clause(&query.children()[0]);
    assert_eq!(clause.kind, ClauseKind::In);
    assert_eq!(clause.modifier, None);
    reference_is(&query.children()[0], "Projects/Alpha");

    let query = parse_ok("Notes in any [[Alpha]]");
    assert_eq!(
        as_clause(&query.children()[0]).modifier,
        Some(ClauseModifier::Any)
    );

    let query = parse_ok("Notes linked from all [[Index]]");
    let clause = as_clause(&query.children()[0]);
    assert_eq!(clause.kind, ClauseKind::LinkedFrom);
    assert_eq!(clause.modifier, Some(ClauseModifier::All));
    reference_is(&query.children()[0], "Index");
}

#[test]
fn regex_with_flags() {
    let query = parse_ok(r"Notes named /^draft\d+/i");
    let regex = as_regex(&query.children()[0]);
    assert_eq!(regex.source(), r"^draft\d+");
    assert_eq!(regex.flags(), RegexFlags::D | RegexFlags::I);
    assert!(regex.is_match("DRAFT42"));
    assert!(!regex.is_match("final draft"));
}

#[test]
fn regex_always_reports_indices() {
    let query = parse_ok("Notes with /todo|fixme/");
    let regex = as_regex(&query.children()[0]);
    assert_eq!(regex.flags(), RegexFlags::D);
    assert!(regex.is_match("a fixme here"));
    assert!(!regex.is_match("FIXME"));
}

#[test]
fn regex_flags_must_touch_the_closing_slash() {
    let errors = parse_err("Notes with /a/ gi");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("Unexpected \"gi\""));
}

#[test]
fn fuzzy_text_builds_an_ordered_matcher() {
    let query = parse_ok("Notes named 'meet note'");
    let regex = as_regex(&query.children()[0]);
    assert_eq!(regex.source(), r"(meet).*?(note)[\w\d]*");
    assert_eq!(regex.flags().letters(), "dgim");
    assert!(regex.is_match("Meeting Notebook"));
    assert!(!regex.is_match("note from the meeting"));
}

#[test]
fn fuzzy_text_escapes_regex_syntax() {
    let query = parse_ok("Notes named 'c++ (draft)'");
    let regex = as_regex(&query.children()[0]);
    assert!(regex.is_match("C++ notes (draft)"));
    assert!(!regex.is_match("cpp draft"));
}

#[test]
fn a_new_clause_keyword_replaces_the_pending_one() {
    let query = parse_ok("Notes named \"a\" or with #b");
    assert_eq!(query.join(), Join::Or);
    text_is(&query.children()[0], ClauseKind::Named, "a");
    assert_eq!(as_clause(&query.children()[1]).kind, ClauseKind::With);
}

#[test]
fn pending_clause_carries_across_joins() {
    let query = parse_ok("Notes with \"a\" or \"b\" or #c");
    assert_eq!(query.join(), Join::Or);
    let kinds: Vec<_> = query
        .children()
        .iter()
        .map(|node| as_clause(node).kind)
        .collect();
    assert_eq!(kinds, [ClauseKind::With; 3]);
    tag_is(&query.children()[2], &["c"]);
}

#[test]
fn parsing_is_deterministic() {
    init_tracing();
    let input = "Notes not (with \"a\" or #b) and in {Folders named /x/}";
    assert_eq!(parse_query_text(input), parse_query_text(input));
}
