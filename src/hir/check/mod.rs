//! Type checker for one program unit.
//!
//! The checker runs in three passes over the bundled packages and the unit's
//! files:
//!
//! 1. **Declare**: type names, classes, functions, constants and variables
//!    are bound in their scopes without looking at their types.
//! 2. **Resolve**: type declarations, class fields, signatures and
//!    package-level initializers are resolved. Initializers resolve lazily so
//!    that declaration order does not matter.
//! 3. **Bodies**: method bodies and top-level statements are checked in
//!    source order, recording types, definitions, uses and call resolutions.
//!
//! Problems are collected as [`TypeError`]s; checking never stops early.

mod calls;
pub(crate) mod consts;
mod decls;
mod exprs;
mod stmts;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::diagnostics::codes;
use super::info::{Info, NodeKey};
use super::model::Model;
use super::scope::{Scope, ScopeId, ScopeKind};
use super::symbols::{Symbol, SymbolId, SymbolKind};
use super::types::{ConstValue, NamedId, Type};
use crate::base::FileId;
use crate::config::AnalysisConfig;
use crate::parser::{FuncDecl, SyntaxNode, SyntaxToken, TypeDecl, ValueSpec};

/// A unit file handed to the checker
#[derive(Clone, Debug)]
pub struct SourceInput {
    pub id: FileId,
    pub root: SyntaxNode,
    /// Name of the class the file declares
    pub class_name: SmolStr,
    pub is_entry: bool,
}

/// A problem found while checking
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeError {
    pub file: FileId,
    pub range: TextRange,
    pub code: &'static str,
    pub message: String,
}

/// Output of [`check_unit`]
#[derive(Debug)]
pub struct CheckResult {
    pub model: Model,
    pub info: Info,
    pub errors: Vec<TypeError>,
}

/// Type-check the unit formed by `inputs`.
pub fn check_unit(inputs: &[SourceInput], config: &AnalysisConfig) -> CheckResult {
    let mut checker = Checker::new(config);
    checker.declare_universe();
    checker.declare_prelude();
    checker.declare_unit(inputs);
    checker.resolve_declarations();
    checker.check_bodies(inputs);
    checker.finish()
}

/// Mode of an operand: what an expression denotes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Invalid,
    /// A call without results
    NoValue,
    Value,
    Type,
    Package,
    Builtin,
}

/// A checked expression
#[derive(Clone, Debug)]
pub(crate) struct Operand {
    pub mode: Mode,
    pub ty: Type,
    pub value: Option<ConstValue>,
    /// Symbol named by an identifier or selector
    pub symbol: Option<SymbolId>,
}

impl Operand {
    pub fn invalid() -> Self {
        Self {
            mode: Mode::Invalid,
            ty: Type::Invalid,
            value: None,
            symbol: None,
        }
    }

    pub fn value(ty: Type) -> Self {
        Self {
            mode: Mode::Value,
            ty,
            value: None,
            symbol: None,
        }
    }

    pub fn constant(ty: Type, value: ConstValue) -> Self {
        Self {
            mode: Mode::Value,
            ty,
            value: Some(value),
            symbol: None,
        }
    }

    pub fn no_value() -> Self {
        Self {
            mode: Mode::NoValue,
            ty: Type::void(),
            value: None,
            symbol: None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.mode == Mode::Invalid
    }
}

/// Where the checker currently is
#[derive(Clone, Debug)]
pub(crate) struct Context {
    pub file: FileId,
    pub scope: ScopeId,
    /// Class of the current file
    pub class: Option<NamedId>,
    /// Result types of the enclosing function
    pub results: Option<Vec<Type>>,
    /// Package whose declarations are being checked
    pub package: SmolStr,
}

/// A package-level `var`/`const` spec, or a class field spec, whose types
/// and values are resolved on first use
#[derive(Clone, Debug)]
pub(crate) struct PendingSpec {
    pub ctx: Context,
    pub spec: ValueSpec,
    pub symbols: Vec<SymbolId>,
    pub is_const: bool,
    pub state: PendingState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PendingState {
    Unresolved,
    Resolving,
    Done,
}

/// A declared type whose underlying type is not resolved yet
#[derive(Clone, Debug)]
pub(crate) struct PendingType {
    pub ctx: Context,
    pub decl: TypeDecl,
}

/// A method or function declaration waiting for its signature
#[derive(Clone, Debug)]
pub(crate) struct PendingFunc {
    pub ctx: Context,
    pub decl: FuncDecl,
    pub symbol: SymbolId,
}

pub(crate) struct Checker {
    pub(crate) model: Model,
    pub(crate) info: Info,
    errors: Vec<TypeError>,
    pub(crate) config: AnalysisConfig,
    pub(crate) ctx: Context,
    pub(crate) pending: Vec<PendingSpec>,
    pub(crate) pending_of: FxHashMap<SymbolId, usize>,
    pub(crate) type_decls: IndexMap<NamedId, PendingType>,
    pub(crate) resolving_types: FxHashSet<NamedId>,
    pub(crate) aliases: Vec<(SymbolId, PendingType)>,
    pub(crate) funcs: Vec<PendingFunc>,
    /// Class type of each unit file
    pub(crate) classes: FxHashMap<FileId, NamedId>,
    pub(crate) game_class: Option<NamedId>,
}

impl Checker {
    fn new(config: &AnalysisConfig) -> Self {
        let model = Model::new();
        let universe = model.universe();
        Self {
            model,
            info: Info::default(),
            errors: Vec::new(),
            config: config.clone(),
            ctx: Context {
                file: FileId::default(),
                scope: universe,
                class: None,
                results: None,
                package: SmolStr::default(),
            },
            pending: Vec::new(),
            pending_of: FxHashMap::default(),
            type_decls: IndexMap::new(),
            resolving_types: FxHashSet::default(),
            aliases: Vec::new(),
            funcs: Vec::new(),
            classes: FxHashMap::default(),
            game_class: None,
        }
    }

    fn finish(self) -> CheckResult {
        let errors = self
            .errors
            .into_iter()
            .filter(|e| {
                if e.file.is_prelude() {
                    tracing::warn!(message = %e.message, "error in bundled package");
                    false
                } else {
                    true
                }
            })
            .collect();
        CheckResult {
            model: self.model,
            info: self.info,
            errors,
        }
    }

    // ========================================================================
    // Error reporting
    // ========================================================================

    pub(crate) fn error(&mut self, range: TextRange, code: &'static str, message: impl Into<String>) {
        self.error_in(self.ctx.file, range, code, message);
    }

    pub(crate) fn error_in(
        &mut self,
        file: FileId,
        range: TextRange,
        code: &'static str,
        message: impl Into<String>,
    ) {
        let message = message.into();
        tracing::trace!(?file, ?range, %message, "type error");
        self.errors.push(TypeError {
            file,
            range,
            code,
            message,
        });
    }

    // ========================================================================
    // Context and scopes
    // ========================================================================

    /// Run `f` in `ctx`, restoring the current context afterwards.
    pub(crate) fn with_context<R>(&mut self, ctx: Context, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.ctx, ctx);
        let result = f(self);
        self.ctx = saved;
        result
    }

    /// Open a child scope of the current one covering `range`.
    pub(crate) fn open_scope(&mut self, kind: ScopeKind, range: TextRange, inclusive_end: bool) -> ScopeId {
        let scope = Scope::new(kind, Some(self.ctx.scope)).with_range(self.ctx.file, range, inclusive_end);
        let id = self.model.add_scope(scope);
        self.ctx.scope = id;
        id
    }

    pub(crate) fn close_scope(&mut self, previous: ScopeId) {
        self.ctx.scope = previous;
    }

    /// Whether top-level statement bindings are being declared.
    fn in_body_scope(&self) -> bool {
        self.model.scope(self.ctx.scope).kind == ScopeKind::File
    }

    /// Bind a new local (variable, parameter or constant) named by `ident`.
    pub(crate) fn declare_local(
        &mut self,
        ident: &SyntaxToken,
        kind: SymbolKind,
        ty: Type,
        visible_from: TextSize,
    ) -> SymbolId {
        let name = SmolStr::new(ident.text());
        let range = ident.text_range();
        let symbol = Symbol::new(name.clone(), kind, self.ctx.package.clone())
            .with_type(ty)
            .with_def(self.ctx.file, range);
        let id = self.model.add_symbol(symbol);
        self.info.record_def(self.ctx.file, range, id);
        if name == "_" {
            return id;
        }
        let body_local = self.in_body_scope();
        let scope = self.ctx.scope;
        if self.model.scope(scope).entry(&name, None).is_some() {
            self.error(
                range,
                codes::DUPLICATE_DEFINITION,
                format!("{name} redeclared in this block"),
            );
        }
        self.model.declare(scope, name, id, visible_from, body_local);
        id
    }

    /// Record the checked type of an expression node.
    pub(crate) fn record(&mut self, node: &SyntaxNode, operand: &Operand) {
        if matches!(operand.mode, Mode::Value | Mode::NoValue) {
            self.info.record_type(
                NodeKey::new(self.ctx.file, node),
                operand.ty.clone(),
                operand.value.clone(),
            );
        }
    }

    pub(crate) fn record_expected(&mut self, node: &SyntaxNode, ty: &Type) {
        self.info.record_expected(NodeKey::new(self.ctx.file, node), ty.clone());
    }

    pub(crate) fn display(&self, ty: &Type) -> String {
        self.model.display(ty)
    }
}
