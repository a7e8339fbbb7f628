//! Text manipulation utilities for working with source code.

use text_size::{TextRange, TextSize};

/// Check if a character is considered part of a word (identifier).
///
/// Uses Unicode Standard Annex #31 rules for identifier characters.
#[inline]
pub fn is_word_character(c: char) -> bool {
    unicode_ident::is_xid_continue(c) || c == '_'
}

/// Find the boundaries of a word at the given position.
///
/// Returns `Some((start, end))` where `start` is the character index of the word start
/// and `end` is the character index after the last word character.
/// Returns `None` if there is no word at the position.
pub fn find_word_boundaries(chars: &[char], position: usize) -> Option<(usize, usize)> {
    if position >= chars.len() {
        return None;
    }

    if !is_word_character(chars[position]) {
        return None;
    }

    let mut start = position;
    while start > 0 && is_word_character(chars[start - 1]) {
        start -= 1;
    }

    let mut end = position;
    while end < chars.len() && is_word_character(chars[end]) {
        end += 1;
    }

    Some((start, end))
}

/// Extract the word (identifier) at the cursor position in a line of text.
///
/// # Example
/// ```
/// use spxls::base::text_utils::extract_word_at_cursor;
///
/// let line = "Fido.say \"hi\"";
/// assert_eq!(extract_word_at_cursor(line, 1), Some("Fido".to_string()));
/// assert_eq!(extract_word_at_cursor(line, 6), Some("say".to_string()));
/// assert_eq!(extract_word_at_cursor(line, 8), None); // space
/// ```
pub fn extract_word_at_cursor(line: &str, position: usize) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    let (start, end) = find_word_boundaries(&chars, position)?;
    Some(chars[start..end].iter().collect())
}

/// Byte range of the identifier fragment that ends exactly at `offset`.
///
/// This is the text a completion item replaces: `sa|` yields the range of
/// `sa`, while a cursor after punctuation yields an empty range at `offset`.
pub fn word_range_before(text: &str, offset: TextSize) -> TextRange {
    let end = (u32::from(offset) as usize).min(text.len());
    let mut start = end;
    for (idx, ch) in text[..end].char_indices().rev() {
        if !is_word_character(ch) {
            break;
        }
        start = idx;
    }
    TextRange::new(TextSize::new(start as u32), TextSize::new(end as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_word_character() {
        assert!(is_word_character('a'));
        assert!(is_word_character('Z'));
        assert!(is_word_character('_'));
        assert!(is_word_character('7'));
        assert!(!is_word_character(' '));
        assert!(!is_word_character('.'));
    }

    #[test]
    fn test_unicode_identifiers() {
        assert_eq!(extract_word_at_cursor("say 精灵", 5), Some("精灵".to_string()));
    }

    #[test]
    fn test_word_range_before() {
        let text = "Fido.se";
        let range = word_range_before(text, TextSize::of(text));
        assert_eq!(&text[range], "se");
        let range = word_range_before(text, TextSize::new(5));
        assert!(range.is_empty());
    }
}
