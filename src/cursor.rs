use query_scanner::{SourceText, Token};

/// Forward-only walk over the scanner's tokens.
pub(crate) struct TokenCursor<'t, 's> {
    tokens: &'t [Token],
    source: &'t SourceText<'s>,
    position: usize,
}

impl<'t, 's> TokenCursor<'t, 's> {
    pub(crate) fn new(tokens: &'t [Token], source: &'t SourceText<'s>) -> Self {
        Self {
            tokens,
            source,
            position: 0,
        }
    }

    pub(crate) fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// Looks ahead without consuming. `peek(1)` is the token [`Self::next`]
    /// would return.
    pub(crate) fn peek(&self, offset: usize) -> Option<&'t Token> {
        let index = self.position + offset.checked_sub(1)?;
        self.tokens.get(index)
    }

    /// The next token whose text is not blank.
    pub(crate) fn peek_significant(&self) -> Option<&'t Token> {
        self.tokens[self.position.min(self.tokens.len())..]
            .iter()
            .find(|token| !self.text_of(token).trim().is_empty())
    }

    /// Source text under `token`; empty when its offsets do not fit the text.
    pub(crate) fn text_of(&self, token: &Token) -> &'s str {
        self.source
            .slice_utf16(token.start_offset, token.end_offset)
            .unwrap_or_default()
    }

    /// Number of tokens consumed so far.
    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn source(&self) -> &'t SourceText<'s> {
        self.source
    }
}
