//! Literal values: the delimited runs after a clause keyword.
//!
//! Every reader starts right after the opening token has been consumed and
//! leaves the cursor after the last token of the value. Only an unterminated
//! value is fatal; everything else is pushed onto `errors` and the value is
//! still produced so the clause keeps its place in the tree.

use crate::{
    ClauseValue, QueryError, QueryRegex, RegexFlags, cursor::TokenCursor, expect::Delimiter,
};
use query_scanner::Token;
use tracing::trace;

const EMPTY_VALUE: &str = "Empty value matches everything and is invalid";
const REGEX_FLAGS_SCOPE: &str = "keyword.other.regex-flags";
const TAG_BODY_SCOPE: &str = "entity.name.tag";

/// Flags every fuzzy matcher is compiled with.
fn fuzzy_flags() -> RegexFlags {
    RegexFlags::D | RegexFlags::G | RegexFlags::I | RegexFlags::M
}

/// Reads a delimited value. `Ok(None)` means the value was present but
/// unusable (an invalid pattern); the error has already been recorded.
pub(crate) fn read_delimited(
    delimiter: Delimiter,
    open: &Token,
    cursor: &mut TokenCursor<'_, '_>,
    errors: &mut Vec<QueryError>,
) -> Result<Option<ClauseValue>, QueryError> {
    let (content, close) = collect_until(delimiter.close_prefix(), open, cursor)?;
    if content.trim().is_empty() {
        errors.push(QueryError::new(
            open.start_offset,
            close.end_offset,
            EMPTY_VALUE,
        ));
    }
    trace!(?delimiter, %content, "value read");

    let value = match delimiter {
        Delimiter::Text => Some(ClauseValue::Text(content)),
        Delimiter::Reference => Some(ClauseValue::Reference(content)),
        Delimiter::Fuzzy => {
            compile(fuzzy_pattern(&content), fuzzy_flags(), open, close, errors)
                .map(ClauseValue::Regex)
        }
        Delimiter::Regex => {
            let flags = read_regex_flags(close, cursor, errors);
            compile(content, flags | RegexFlags::D, open, close, errors).map(ClauseValue::Regex)
        }
    };
    Ok(value)
}

/// Reads the body following a `#` sigil.
pub(crate) fn read_tag(
    sigil: &Token,
    cursor: &mut TokenCursor<'_, '_>,
    errors: &mut Vec<QueryError>,
) -> Result<ClauseValue, QueryError> {
    let Some(next) = cursor.peek(1) else {
        return Err(unterminated(sigil, cursor));
    };
    if !next.has_scope_prefix(TAG_BODY_SCOPE) {
        errors.push(QueryError::at(sigil, EMPTY_VALUE));
        return Ok(ClauseValue::Tag(Vec::new()));
    }
    cursor.next();
    Ok(ClauseValue::Tag(tag_segments(cursor.text_of(next))))
}

/// Splits `parent/child` or `parent.child` into path segments.
pub(crate) fn tag_segments(body: &str) -> Vec<String> {
    body.split(['.', '/'])
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ordered, gap tolerant match of every word; the last word may be a prefix.
pub(crate) fn fuzzy_pattern(content: &str) -> String {
    let words: Vec<String> = content
        .split_whitespace()
        .map(|word| format!("({})", regex::escape(word)))
        .collect();
    if words.is_empty() {
        return String::new();
    }
    format!(r"{}[\w\d]*", words.join(".*?"))
}

fn collect_until<'t>(
    close_prefix: &str,
    open: &Token,
    cursor: &mut TokenCursor<'t, '_>,
) -> Result<(String, &'t Token), QueryError> {
    let mut content = String::new();
    while let Some(token) = cursor.next() {
        if token.scope().starts_with(close_prefix) {
            return Ok((content, token));
        }
        content.push_str(cursor.text_of(token));
    }
    Err(unterminated(open, cursor))
}

/// Flags are only taken from a token glued to the closing slash.
fn read_regex_flags(
    close: &Token,
    cursor: &mut TokenCursor<'_, '_>,
    errors: &mut Vec<QueryError>,
) -> RegexFlags {
    let Some(next) = cursor.peek(1) else {
        return RegexFlags::empty();
    };
    if next.start_offset != close.end_offset || !next.scope().starts_with(REGEX_FLAGS_SCOPE) {
        return RegexFlags::empty();
    }
    cursor.next();
    let letters = cursor.text_of(next);
    match RegexFlags::from_letters(letters) {
        Ok(flags) => flags,
        Err(letter) => {
            errors.push(QueryError::at(
                next,
                format!("Unknown regular expression flag '{letter}'"),
            ));
            letters
                .chars()
                .filter_map(RegexFlags::from_letter)
                .fold(RegexFlags::empty(), |flags, flag| flags | flag)
        }
    }
}

fn compile(
    source: String,
    flags: RegexFlags,
    open: &Token,
    close: &Token,
    errors: &mut Vec<QueryError>,
) -> Option<QueryRegex> {
    match QueryRegex::new(source, flags) {
        Ok(regex) => Some(regex),
        Err(err) => {
            errors.push(QueryError::new(
                open.start_offset,
                close.end_offset,
                format!("invalid regular expression: {err}"),
            ));
            None
        }
    }
}

fn unterminated(open: &Token, cursor: &TokenCursor<'_, '_>) -> QueryError {
    QueryError::new(
        open.start_offset,
        cursor.source().utf16_len(),
        format!("Value starting with {} was not closed", cursor.text_of(open)),
    )
}
