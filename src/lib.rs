//! # spxls-base
//!
//! Semantic core for the spx language server: compiles a project's source
//! files against its asset tree and answers editor queries over the result.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project   → Workspace loading from disk
//!   ↓
//! ide       → Completion, input slots, goto-definition, commands
//!   ↓
//! hir       → Type checker, program model, compilation unit
//!   ↓
//! resource  → Asset catalog, resource identity, resource references
//!   ↓
//! parser    → Logos lexer, recursive-descent parser, typed AST
//!   ↓
//! base      → Primitives (FileId, LineIndex, Position, TextRange)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → resource → hir → ide → project)
// ============================================================================

/// Foundation types: FileId, LineIndex, Position/Span, TextRange
pub mod base;

/// Analysis configuration
pub mod config;

/// Error types
pub mod error;

/// Parser: Logos lexer, recursive-descent parser, rowan syntax tree
pub mod parser;

/// Resources: asset catalog and resource references
pub mod resource;

/// High-level IR: checker, program model, compiled unit
pub mod hir;

/// IDE features: completion, input slots, goto-definition, commands
pub mod ide;

/// Project management: workspace loading
pub mod project;

// Re-export commonly needed items
pub use parser::KEYWORDS;

// Re-export foundation types
pub use base::{FileId, LineIndex, Position, Span, TextRange, TextSize};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, CommandError, LoadError, RequestError};
pub use hir::{ProgramUnit, compile};
pub use ide::{Analysis, AnalysisHost};
pub use resource::{ResourceId, ResourceKind};
