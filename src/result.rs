use crate::{Expected, Query};
use query_scanner::Token;
use serde::Serialize;
use std::fmt;

/// A diagnostic over a UTF-16 range of the query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryError {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub message: String,
}

impl QueryError {
    pub fn new(start: usize, end: usize, message: impl Into<String>) -> Self {
        Self {
            start,
            end,
            message: message.into(),
        }
    }

    pub(crate) fn at(token: &Token, message: impl Into<String>) -> Self {
        Self::new(token.start_offset, token.end_offset, message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {}..{})", self.message, self.start, self.end)
    }
}

impl std::error::Error for QueryError {}

/// Completion hint recorded for one token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAnnotation {
    /// Scope prefixes that were acceptable when the token was reached.
    /// Absent for tokens swallowed by a value (quoted text, regex bodies...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_scope_prefixes: Option<Vec<String>>,
}

impl TokenAnnotation {
    pub(crate) fn expecting(expected: Expected) -> Self {
        Self {
            expected_scope_prefixes: Some(expected.scope_prefixes()),
        }
    }
}

/// Everything one parse produces.
///
/// `query` is present only when `errors` is empty. `tokens` and
/// `annotations` are always filled and always have the same length, so
/// editors can still render diagnostics and completions for broken input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<QueryError>,
    pub tokens: Vec<Token>,
    pub annotations: Vec<TokenAnnotation>,
}

impl ParseResult {
    pub(crate) fn new(
        query: Query,
        errors: Vec<QueryError>,
        tokens: Vec<Token>,
        annotations: Vec<TokenAnnotation>,
    ) -> Self {
        debug_assert_eq!(tokens.len(), annotations.len());
        Self {
            query: errors.is_empty().then_some(query),
            errors,
            tokens,
            annotations,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.query.is_some()
    }

    pub fn into_query(self) -> Result<Query, Vec<QueryError>> {
        match self.query {
            Some(query) => Ok(query),
            None => Err(self.errors),
        }
    }

    /// Expected scope prefixes recorded for the token covering `offset`
    /// (UTF-16). At a boundary the token starting there wins.
    pub fn expectation_at(&self, offset: usize) -> Option<&[String]> {
        let index = self
            .tokens
            .iter()
            .rposition(|token| token.start_offset <= offset && offset <= token.end_offset)?;
        self.annotations[index].expected_scope_prefixes.as_deref()
    }
}
