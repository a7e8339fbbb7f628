//! High-level IR (HIR): the checked program unit.
//!
//! This module turns parsed files into a [`ProgramUnit`]: a type-checked
//! semantic model together with diagnostics and resource references. Every
//! recompile produces a fresh unit; nothing is mutated incrementally.
//!
//! ## Key Types
//!
//! - [`ProgramUnit`] - Immutable result of one compile
//! - [`Model`] - Symbol, type and scope arenas with lookup queries
//! - [`Info`] - Side tables: expression types, defs, uses, call resolutions
//! - [`Diagnostic`] - Source problems reported next to the result
//!
//! ## Phases
//!
//! ```text
//! parse(file)              ← per file, errors become diagnostics
//!     │
//!     ▼
//! check_unit(files)        ← declare → resolve → bodies
//!     │
//!     ▼
//! load_catalog(root)       ← asset root taken from `run` in the entry file
//!     │
//!     ▼
//! resolve_references(unit) ← resource references and auto-bindings
//! ```

mod check;
mod diagnostics;
pub mod domain;
mod info;
mod model;
pub mod prelude;
mod scope;
mod symbols;
mod types;
mod unit;

pub use check::{CheckResult, SourceInput, TypeError, check_unit};
pub use diagnostics::{Diagnostic, DiagnosticCollector, Severity, codes};
pub use info::{CallInfo, Info, NodeKey, TypeAndValue};
pub use model::{Member, Model};
pub use scope::{Scope, ScopeEntry, ScopeId, ScopeKind};
pub use symbols::{DefSite, Symbol, SymbolId, SymbolKind, is_handler_name};
pub use types::{
    BasicKind, ClassKind, ConstValue, Field, NamedId, NamedType, Signature, Type, Underlying,
};
pub use unit::{ProgramUnit, UnitFile, compile};
