//! Scope scanner driven by a declarative, TextMate-style grammar.
//!
//! The scanner knows nothing about any particular language: a [`Grammar`] is
//! loaded from JSON once, wrapped in a [`Scanner`], and reused for every call
//! to [`Scanner::tokenize`]. Each [`Token`] carries its UTF-16 range and the
//! stack of scope names that applied to it, coarsest first.
//!
//! ```
//! use query_scanner::Scanner;
//!
//! let scanner = Scanner::from_json(
//!     r#"{"scopeName": "source.demo", "patterns": [{"match": "\\d+", "name": "constant.numeric"}]}"#,
//! )
//! .unwrap();
//! let tokens = scanner.tokenize("a 42");
//! assert_eq!(tokens.len(), 2);
//! assert_eq!(tokens[1].scope(), "constant.numeric");
//! assert_eq!((tokens[1].start_offset, tokens[1].end_offset), (2, 4));
//! ```

mod engine;
mod grammar;
mod source;

pub use engine::Scanner;
pub use grammar::{Grammar, GrammarError};
pub use source::SourceText;

use serde::Serialize;

/// One scanned stretch of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Start offset in UTF-16 code units.
    pub start_offset: usize,
    /// End offset (exclusive) in UTF-16 code units.
    pub end_offset: usize,
    /// Scope names from the grammar root down to the most specific one.
    pub scopes: Vec<String>,
}

impl Token {
    /// The most specific scope, i.e. the last one.
    pub fn scope(&self) -> &str {
        self.scopes.last().map_or("", String::as_str)
    }

    pub fn has_scope_prefix(&self, prefix: &str) -> bool {
        self.scopes.iter().any(|scope| scope.starts_with(prefix))
    }
}
