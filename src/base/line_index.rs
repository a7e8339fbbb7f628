//! Offset ↔ line/column conversion.
//!
//! Byte offsets are what the parser and checker work with; editors speak in
//! zero-based lines and UTF-16 code-unit columns. A code point outside the
//! basic multilingual plane occupies two UTF-16 units.

use std::sync::Arc;

use text_size::{TextRange, TextSize};

use super::{Position, Span};

/// Number of UTF-16 code units needed to encode `text`.
pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(|c| c.len_utf16() as u32).sum()
}

/// Line table for one source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineIndex {
    text: Arc<str>,
    /// Byte offset of the first character of every line.
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let mut line_starts = vec![TextSize::new(0)];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(TextSize::new(idx as u32 + 1));
            }
        }
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> TextSize {
        TextSize::of(&*self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Byte range of `line` without its terminator (`\n` or `\r\n`).
    pub fn line_range(&self, line: u32) -> Option<TextRange> {
        let raw = self.raw_line_range(line)?;
        let mut end = raw.end();
        if end > raw.start() && self.text.as_bytes()[u32::from(end) as usize - 1] == b'\r' {
            end -= TextSize::new(1);
        }
        Some(TextRange::new(raw.start(), end))
    }

    /// Byte range of `line` up to, not including, its `\n`.
    fn raw_line_range(&self, line: u32) -> Option<TextRange> {
        let start = *self.line_starts.get(line as usize)?;
        let end = self
            .line_starts
            .get(line as usize + 1)
            .map(|next| *next - TextSize::new(1))
            .unwrap_or_else(|| self.len());
        Some(TextRange::new(start, end))
    }

    pub fn line_text(&self, line: u32) -> Option<&str> {
        self.line_range(line).map(|range| &self.text[range])
    }

    /// Convert a byte offset into a position.
    ///
    /// Offsets past the end clamp to the end of the text; offsets inside a
    /// multi-byte character round down to the character start.
    pub fn position(&self, offset: TextSize) -> Position {
        let mut offset = offset.min(self.len());
        while !self.text.is_char_boundary(u32::from(offset) as usize) {
            offset -= TextSize::new(1);
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = utf16_len(&self.text[TextRange::new(line_start, offset)]);
        Position::new(line as u32, column)
    }

    /// Convert a position into a byte offset.
    ///
    /// A line past the last one maps to the end of the text. A column past the
    /// end of its line maps to the end of that line, and a column that splits
    /// a surrogate pair maps to the start of that character.
    pub fn offset(&self, position: Position) -> TextSize {
        let Some(range) = self.raw_line_range(position.line) else {
            return self.len();
        };
        let mut units = 0u32;
        let mut offset = range.start();
        for ch in self.text[range].chars() {
            let width = ch.len_utf16() as u32;
            if units + width > position.column {
                break;
            }
            units += width;
            offset += TextSize::of(ch);
        }
        offset
    }

    pub fn span(&self, range: TextRange) -> Span {
        Span::new(self.position(range.start()), self.position(range.end()))
    }

    pub fn range(&self, span: Span) -> TextRange {
        let start = self.offset(span.start);
        let end = self.offset(span.end).max(start);
        TextRange::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_round_trip() {
        let index = LineIndex::new("var x int\nx = 1\n");
        for offset in 0..=16u32 {
            let offset = TextSize::new(offset);
            assert_eq!(index.offset(index.position(offset)), offset);
        }
        assert_eq!(index.position(TextSize::new(10)), Position::new(1, 0));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_astral_character_counts_two_units() {
        let text = "say \"😀!\"";
        let index = LineIndex::new(text);
        assert_eq!("😀".len(), 4);
        assert_eq!(utf16_len("😀"), 2);
        let bang = TextSize::new(text.find('!').unwrap() as u32);
        assert_eq!(index.position(bang), Position::new(0, 7));
        assert_eq!(index.offset(Position::new(0, 7)), bang);
    }

    #[test]
    fn test_round_trip_on_char_boundaries() {
        let text = "é😀a\r\nß\n\n𝄞z";
        let index = LineIndex::new(text);
        for (offset, _) in text.char_indices() {
            let offset = TextSize::new(offset as u32);
            assert_eq!(index.offset(index.position(offset)), offset, "offset {offset:?}");
        }
    }

    #[test]
    fn test_out_of_range_line_clamps_to_end() {
        let index = LineIndex::new("a\nbc");
        assert_eq!(index.offset(Position::new(9, 0)), TextSize::new(4));
        assert_eq!(index.offset(Position::new(0, 40)), TextSize::new(1));
    }

    #[test]
    fn test_surrogate_split_maps_to_char_start() {
        let index = LineIndex::new("😀x");
        assert_eq!(index.offset(Position::new(0, 1)), TextSize::new(0));
        assert_eq!(index.offset(Position::new(0, 2)), TextSize::new(4));
    }

    #[test]
    fn test_crlf_line_range() {
        let index = LineIndex::new("ab\r\ncd");
        assert_eq!(index.line_text(0), Some("ab"));
        assert_eq!(index.line_text(1), Some("cd"));
        assert_eq!(index.line_text(2), None);
    }
}
