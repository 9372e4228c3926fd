//! # Note query parser
//!
//! `note-query` turns queries such as `Notes with "draft" and in [[Inbox]]`
//! into a [`Query`] tree. Text is first split into scope-annotated tokens by
//! [`query_scanner`] using the bundled TextMate-style grammar, then a single
//! pass over those tokens drives a small stack machine (groups, `not`,
//! `{subqueries}`) while checking each token against the set of token classes
//! that may legally come next.
//!
//! Parsing never fails outright: a [`ParseResult`] always carries the tokens
//! and one [`TokenAnnotation`] per token so editors can highlight and
//! complete broken input. The query itself is only present when no error was
//! recorded.
//!
//! ## Example
//! ```
//! use note_query::{ClauseKind, ClauseValue, Join, parse_query_text};
//!
//! let query = parse_query_text(r#"Notes with "my text" or #work/meetings"#)
//!     .into_query()
//!     .unwrap();
//! assert_eq!(query.forms, ["Notes"]);
//! assert_eq!(query.join(), Join::Or);
//!
//! let tag = query.children()[1].as_clause().unwrap();
//! assert_eq!(tag.kind, ClauseKind::With);
//! assert_eq!(tag.value, ClauseValue::Tag(vec!["work".into(), "meetings".into()]));
//!
//! let broken = parse_query_text(r#"Notes with """#);
//! assert!(broken.query.is_none());
//! assert_eq!(broken.annotations.len(), broken.tokens.len());
//! ```

mod ast;
mod cursor;
mod expect;
mod parser;
mod result;
mod stack;
mod values;

pub use ast::*;
pub use expect::Expected;
pub use parser::QueryParser;
pub use query_scanner::{Grammar, GrammarError, Scanner, Token};
pub use result::{ParseResult, QueryError, TokenAnnotation};

use once_cell::sync::Lazy;
use tracing::instrument;

/// Grammar the default scanner is built from.
pub const BUNDLED_GRAMMAR: &str = include_str!("../grammar/notequery.tmLanguage.json");

static SCANNER: Lazy<Scanner> = Lazy::new(|| {
    // The grammar is compiled into the binary and covered by tests, so a
    // failure here is a build defect rather than an input error.
    Scanner::from_json(BUNDLED_GRAMMAR).expect("bundled query grammar must compile")
});

/// Scanner for the bundled grammar, compiled on first use.
pub fn bundled_scanner() -> &'static Scanner {
    &SCANNER
}

/// Parses `text` with the bundled grammar.
#[instrument(level = "debug", skip_all)]
pub fn parse_query_text(text: &str) -> ParseResult {
    QueryParser::new(bundled_scanner()).parse(text)
}
