mod common;
use common::*;
use note_query::*;
use serde_json::json;

#[test]
fn clause_values_flatten_into_the_clause() {
    let query = parse_ok("Notes with \"draft\" or in any [[Inbox]]");
    assert_eq!(
        serde_json::to_value(&query).unwrap(),
        json!({
            "forms": ["Notes"],
            "join": "or",
            "children": [
                { "kind": "with", "text": "draft" },
                { "kind": "in", "modifier": "any", "reference": "Inbox" }
            ]
        })
    );
}

#[test]
fn regex_tag_and_todo_values() {
    let query = parse_ok("Notes named /^a/im and with #x/y and with open todos");
    assert_eq!(
        serde_json::to_value(query.children()).unwrap(),
        json!([
            { "kind": "named", "regex": { "source": "^a", "flags": "dim" } },
            { "kind": "with", "tag": ["x", "y"] },
            { "kind": "with", "todo": "open" }
        ])
    );
}

#[test]
fn negated_groups_and_subqueries() {
    let query = parse_ok("Notes not with \"a\" and linked from {Folders}");
    assert_eq!(
        serde_json::to_value(&query).unwrap(),
        json!({
            "forms": ["Notes"],
            "join": "and",
            "children": [
                {
                    "join": "and",
                    "negationModifier": "not",
                    "children": [{ "kind": "with", "text": "a" }]
                },
                {
                    "kind": "linkedFrom",
                    "subquery": { "forms": ["Folders"], "join": "and", "children": [] }
                }
            ]
        })
    );
}

#[test]
fn failed_result_omits_query() {
    let result = parse_query_text("Notes with \"\"");
    let value = serde_json::to_value(&result).unwrap();
    assert!(value.get("query").is_none());
    assert_eq!(value["errors"][0]["start"], 11);
    assert_eq!(value["errors"][0]["end"], 13);
    assert_eq!(value["tokens"][0]["startOffset"], 0);
    assert_eq!(value["tokens"][0]["endOffset"], 5);
    assert_eq!(value["tokens"][0]["scopes"][1], "keyword.form.notequery");
    assert_eq!(
        value["annotations"][0]["expectedScopePrefixes"],
        json!(["keyword.form"])
    );
    // Value interiors have no hint at all.
    assert_eq!(value["annotations"][5], json!({}));
}

#[test]
fn successful_result_omits_errors() {
    let value = serde_json::to_value(parse_query_text("Notes")).unwrap();
    assert!(value.get("errors").is_none());
    assert_eq!(value["query"]["forms"], json!(["Notes"]));
}
