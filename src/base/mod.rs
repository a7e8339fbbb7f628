//! Foundation types for the spx toolchain.
//!
//! This module provides fundamental types used throughout the analyzer:
//! - [`FileId`] - Dense file identifiers (unit files and prelude files)
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineIndex`] - Offset ↔ line/UTF-16 column conversion
//! - [`Position`], [`Span`] - Zero-based line/column positions for editors
//!
//! This module has NO dependencies on other spxls modules.

mod file_id;
mod line_index;
mod position;
pub mod text_utils;

pub use file_id::FileId;
pub use line_index::{LineIndex, utf16_len};
pub use position::{Position, Span};
pub use text_size::{TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
