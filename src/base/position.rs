//! Editor-facing positions.
//!
//! Lines and columns are zero-based. Columns count UTF-16 code units, which is
//! what editors speaking LSP send and expect back.

use serde::{Deserialize, Serialize};

/// A span representing a range in source code (0-indexed for LSP compatibility)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// A position in source code (0-indexed, UTF-16 columns)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    #[serde(rename = "character")]
    pub column: u32,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a span from line/column coordinates
    pub fn from_coords(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start: Position::new(start_line, start_col),
            end: Position::new(end_line, end_col),
        }
    }

    /// Check if a position falls within this span (both ends inclusive)
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    /// Whether two spans share at least one position.
    pub fn overlaps(&self, other: &Span) -> bool {
        (self.start < other.end && other.start < self.end)
            || self.start == other.start
            || (self.start == self.end && other.contains(self.start))
            || (other.start == other.end && self.contains(other.start))
    }
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_contains() {
        let span = Span::from_coords(1, 4, 2, 3);
        assert!(span.contains(Position::new(1, 4)));
        assert!(span.contains(Position::new(1, 80)));
        assert!(span.contains(Position::new(2, 3)));
        assert!(!span.contains(Position::new(1, 3)));
        assert!(!span.contains(Position::new(2, 4)));
    }

    #[test]
    fn test_span_overlaps() {
        let a = Span::from_coords(0, 0, 0, 5);
        let b = Span::from_coords(0, 4, 0, 8);
        let c = Span::from_coords(0, 5, 0, 8);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_position_serializes_as_lsp_character() {
        let json = serde_json::to_string(&Position::new(3, 7)).unwrap();
        assert_eq!(json, r#"{"line":3,"character":7}"#);
    }
}
