/// Text plus a UTF-16 index over it.
///
/// Tokens and diagnostics speak in UTF-16 code units because that is what the
/// editor side counts in, while Rust slices by byte. `SourceText` keeps one
/// `(byte, utf16)` pair per char boundary so both directions are a binary
/// search away. Pure ASCII input skips the table entirely.
#[derive(Debug, Clone)]
pub struct SourceText<'a> {
    text: &'a str,
    // `None` when the text is ASCII and both offset spaces coincide.
    boundaries: Option<Vec<(usize, usize)>>,
    utf16_len: usize,
}

impl<'a> SourceText<'a> {
    pub fn new(text: &'a str) -> Self {
        if text.is_ascii() {
            return Self {
                text,
                boundaries: None,
                utf16_len: text.len(),
            };
        }

        let mut boundaries = Vec::with_capacity(text.len() + 1);
        let mut utf16 = 0;
        for (byte, ch) in text.char_indices() {
            boundaries.push((byte, utf16));
            utf16 += ch.len_utf16();
        }
        boundaries.push((text.len(), utf16));
        Self {
            text,
            boundaries: Some(boundaries),
            utf16_len: utf16,
        }
    }

    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// Length of the whole text in UTF-16 code units.
    pub fn utf16_len(&self) -> usize {
        self.utf16_len
    }

    /// Converts a byte offset on a char boundary into a UTF-16 offset.
    ///
    /// Offsets past the end clamp to [`Self::utf16_len`]; offsets inside a
    /// multi-byte char round down to the char start.
    pub fn utf16_offset(&self, byte: usize) -> usize {
        let Some(boundaries) = &self.boundaries else {
            return byte.min(self.utf16_len);
        };
        match boundaries.binary_search_by_key(&byte, |&(b, _)| b) {
            Ok(index) => boundaries[index].1,
            Err(0) => 0,
            Err(index) => boundaries[index - 1].1,
        }
    }

    /// Converts a UTF-16 offset back into a byte offset.
    ///
    /// Returns `None` for offsets past the end or in the middle of a
    /// surrogate pair.
    pub fn byte_offset(&self, utf16: usize) -> Option<usize> {
        let Some(boundaries) = &self.boundaries else {
            return (utf16 <= self.text.len()).then_some(utf16);
        };
        boundaries
            .binary_search_by_key(&utf16, |&(_, u)| u)
            .ok()
            .map(|index| boundaries[index].0)
    }

    /// Slices the text by a UTF-16 range. Never panics.
    pub fn slice_utf16(&self, start: usize, end: usize) -> Option<&'a str> {
        if start > end {
            return None;
        }
        let start = self.byte_offset(start)?;
        let end = self.byte_offset(end)?;
        self.text.get(start..end)
    }
}
