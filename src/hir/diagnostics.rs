//! Diagnostics: source problems reported alongside a best-effort result.
//!
//! Parse errors, type errors and resource-resolution problems all end up here.
//! A diagnostic is never an `Err`: analysis keeps going on broken programs.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;
use text_size::TextRange;

use crate::base::FileId;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// The file containing this diagnostic.
    pub file: FileId,
    /// Byte range inside the file.
    pub range: TextRange,
    pub severity: Severity,
    /// Error/warning code (e.g., "E0001").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(file: FileId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            file,
            range,
            severity: Severity::Error,
            code: None,
            message: message.into(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(file: FileId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            file,
            range,
            severity: Severity::Warning,
            code: None,
            message: message.into(),
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Standard diagnostic codes.
///
/// ## Code Ranges
///
/// - **E0001-E0019**: Syntax errors
/// - **E0020-E0059**: Type checking
/// - **E0060-E0079**: Resources
/// - **W0001-W0099**: Warnings
#[allow(dead_code)]
pub mod codes {
    // ========================================================================
    // SYNTAX (E0001-E0019)
    // ========================================================================

    /// Parse error.
    pub const SYNTAX_ERROR: &str = "E0001";
    /// File declares a package other than the unit's.
    pub const PACKAGE_MISMATCH: &str = "E0002";

    // ========================================================================
    // TYPE CHECKING (E0020-E0059)
    // ========================================================================

    /// Name not found.
    pub const UNDEFINED_REFERENCE: &str = "E0020";
    /// Type mismatch.
    pub const TYPE_MISMATCH: &str = "E0021";
    /// Duplicate definition.
    pub const DUPLICATE_DEFINITION: &str = "E0022";
    /// Wrong number or type of call arguments.
    pub const INVALID_CALL: &str = "E0023";
    /// Invalid operation for the operand types.
    pub const INVALID_OPERATION: &str = "E0024";
    /// Invalid type expression.
    pub const INVALID_TYPE: &str = "E0025";
    /// Circular declaration.
    pub const CIRCULAR_DEPENDENCY: &str = "E0026";
    /// Unknown import path.
    pub const INVALID_IMPORT: &str = "E0027";
    /// Assignment count or target problem.
    pub const INVALID_ASSIGNMENT: &str = "E0028";

    // ========================================================================
    // RESOURCES (E0060-E0079)
    // ========================================================================

    /// Resource name not present in the catalog.
    pub const RESOURCE_NOT_FOUND: &str = "E0060";
    /// Empty resource name.
    pub const EMPTY_RESOURCE_NAME: &str = "E0061";
    /// Asset tree could not be read.
    pub const ASSET_LOAD: &str = "E0062";
    /// Asset root argument is not a constant string.
    pub const NON_CONSTANT_ASSET_ROOT: &str = "E0063";

    // ========================================================================
    // WARNINGS (W0001-W0099)
    // ========================================================================

    /// Resource field outside the first var block.
    pub const MISPLACED_AUTO_BINDING: &str = "W0001";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics, dropping repeats of the same
/// (file, severity, range, message).
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    seen: FxHashSet<(FileId, Severity, TextRange, Arc<str>)>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic; returns `false` if it was a repeat.
    pub fn add(&mut self, diagnostic: Diagnostic) -> bool {
        let key = (
            diagnostic.file,
            diagnostic.severity,
            diagnostic.range,
            diagnostic.message.clone(),
        );
        if !self.seen.insert(key) {
            return false;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    /// Add an error with a code.
    pub fn error(
        &mut self,
        file: FileId,
        range: TextRange,
        code: &'static str,
        message: impl Into<Arc<str>>,
    ) {
        self.add(Diagnostic::error(file, range, message).with_code(code));
    }

    /// Add a warning with a code.
    pub fn warning(
        &mut self,
        file: FileId,
        range: TextRange,
        code: &'static str,
        message: impl Into<Arc<str>>,
    ) {
        self.add(Diagnostic::warning(file, range, message).with_code(code));
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get diagnostics for a specific file.
    pub fn diagnostics_for_file(&self, file: FileId) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.file == file).collect()
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Get the number of warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Consume the collector, returning diagnostics in insertion order.
    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_size::TextSize;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(end))
    }

    #[test]
    fn test_diagnostic_with_code() {
        let diag = Diagnostic::error(FileId::new(0), range(1, 4), "boom").with_code(codes::TYPE_MISMATCH);
        assert_eq!(diag.code.as_deref(), Some("E0021"));
        assert!(diag.is_error());
    }

    #[test]
    fn test_collector_dedups_repeats() {
        let mut collector = DiagnosticCollector::new();
        let file = FileId::new(0);
        assert!(collector.add(Diagnostic::error(file, range(0, 3), "x")));
        assert!(!collector.add(Diagnostic::error(file, range(0, 3), "x")));
        assert!(collector.add(Diagnostic::warning(file, range(0, 3), "x")));
        assert!(collector.add(Diagnostic::error(file, range(0, 4), "x")));
        assert!(collector.add(Diagnostic::error(FileId::new(1), range(0, 3), "x")));
        assert_eq!(collector.diagnostics().len(), 4);
        assert_eq!(collector.error_count(), 3);
        assert_eq!(collector.warning_count(), 1);
        assert_eq!(collector.diagnostics_for_file(file).len(), 3);
    }

    #[test]
    fn test_severity_to_lsp() {
        assert_eq!(Severity::Error.to_lsp(), 1);
        assert_eq!(Severity::Warning.to_lsp(), 2);
    }
}
