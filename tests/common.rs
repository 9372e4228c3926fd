#![allow(dead_code)]
//! Shared helpers for `note-query` integration tests.

use note_query::*;

/// Routes parser logs through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("note_query=trace,query_scanner=trace")
        .with_test_writer()
        .try_init();
}

pub fn parse_ok(input: &str) -> Query {
    match parse_query_text(input).into_query() {
        Ok(query) => query,
        Err(errors) => panic!("expected {input:?} to parse, got: {errors:?}"),
    }
}

pub fn parse_err(input: &str) -> Vec<QueryError> {
    let result = parse_query_text(input);
    assert_eq!(
        result.annotations.len(),
        result.tokens.len(),
        "annotations must line up with tokens"
    );
    match result.into_query() {
        Ok(query) => panic!("expected {input:?} to fail, got: {query:?}"),
        Err(errors) => errors,
    }
}

pub fn messages(input: &str) -> Vec<String> {
    parse_err(input).into_iter().map(|e| e.message).collect()
}

pub fn as_clause(node: &QueryNode) -> &Clause {
    match node {
        QueryNode::Clause(clause) => clause,
        other => panic!("expected Clause, got: {other:?}"),
    }
}

pub fn as_group(node: &QueryNode) -> &ClauseGroup {
    match node {
        QueryNode::Group(group) => group,
        other => panic!("expected Group, got: {other:?}"),
    }
}

pub fn as_negation(node: &QueryNode) -> &ClauseGroup {
    let group = as_group(node);
    assert_eq!(group.negation_modifier, Some(Negation::Not), "expected negated group");
    group
}

pub fn as_subquery(node: &QueryNode) -> &Query {
    match &as_clause(node).value {
        ClauseValue::Subquery(query) => query,
        other => panic!("expected Subquery, got: {other:?}"),
    }
}

pub fn as_regex(node: &QueryNode) -> &QueryRegex {
    match &as_clause(node).value {
        ClauseValue::Regex(regex) => regex,
        other => panic!("expected Regex, got: {other:?}"),
    }
}

pub fn text_is(node: &QueryNode, kind: ClauseKind, expected: &str) {
    let clause = as_clause(node);
    assert_eq!(clause.kind, kind);
    match &clause.value {
        ClauseValue::Text(text) => assert_eq!(text, expected),
        other => panic!("expected Text, got: {other:?}"),
    }
}

pub fn with_text_is(node: &QueryNode, expected: &str) {
    text_is(node, ClauseKind::With, expected)
}

pub fn reference_is(node: &QueryNode, expected: &str) {
    match &as_clause(node).value {
        ClauseValue::Reference(target) => assert_eq!(target, expected),
        other => panic!("expected Reference, got: {other:?}"),
    }
}

pub fn tag_is(node: &QueryNode, expected: &[&str]) {
    match &as_clause(node).value {
        ClauseValue::Tag(segments) => assert_eq!(segments, expected),
        other => panic!("expected Tag, got: {other:?}"),
    }
}

pub fn todo_is(node: &QueryNode, expected: TodoState) {
    match &as_clause(node).value {
        ClauseValue::Todo(state) => assert_eq!(*state, expected),
        other => panic!("expected Todo, got: {other:?}"),
    }
}
