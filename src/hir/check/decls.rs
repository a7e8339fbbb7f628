//! Declaration passes: binding names, then resolving types, signatures and
//! package-level initializers.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::{Checker, Context, Operand, PendingFunc, PendingSpec, PendingState, PendingType, SourceInput};
use crate::hir::diagnostics::codes;
use crate::hir::domain::{ENGINE_PACKAGE, GAME_BASE, SPRITE_BASE};
use crate::hir::prelude::prelude_files;
use crate::hir::scope::{Scope, ScopeId, ScopeKind};
use crate::hir::symbols::{Symbol, SymbolId, SymbolKind};
use crate::hir::types::{
    BasicKind, ClassKind, ConstValue, Field, NamedId, NamedType, Signature, Type, Underlying,
};
use crate::parser::{
    AstNode, ConstDecl, FuncDecl, ImportDecl, InterfaceType, Item, Param, ParamList, Receiver,
    ResultClause, SourceFile, StructType, SyntaxNode, SyntaxToken, TypeExpr, ValueSpec, VarDecl,
};

/// Universe functions with special typing rules
pub(crate) const BUILTIN_FUNCS: &[&str] = &["append", "len", "println"];

impl Checker {
    // ========================================================================
    // Declare
    // ========================================================================

    pub(super) fn declare_universe(&mut self) {
        let universe = self.model.universe();
        let types = [
            ("bool", Type::BOOL),
            ("int", Type::INT),
            ("float64", Type::FLOAT64),
            ("string", Type::STRING),
            ("any", Type::Any),
        ];
        for (name, ty) in types {
            self.declare_builtin(universe, Symbol::new(name, SymbolKind::TypeName, "").with_type(ty));
        }
        for (name, value) in [("true", true), ("false", false)] {
            let symbol = Symbol::new(name, SymbolKind::Const, "")
                .with_type(Type::Basic(BasicKind::UntypedBool))
                .with_value(ConstValue::Bool(value));
            self.declare_builtin(universe, symbol);
        }
        let nil = Symbol::new("nil", SymbolKind::Const, "").with_type(Type::Basic(BasicKind::UntypedNil));
        self.declare_builtin(universe, nil);
        for name in BUILTIN_FUNCS {
            self.declare_builtin(universe, Symbol::new(*name, SymbolKind::Builtin, ""));
        }
    }

    fn declare_builtin(&mut self, scope: ScopeId, symbol: Symbol) {
        let name = symbol.name.clone();
        let id = self.model.add_symbol(symbol);
        self.model.declare(scope, name, id, TextSize::new(0), false);
    }

    pub(super) fn declare_prelude(&mut self) {
        let universe = self.model.universe();
        for file in prelude_files() {
            let Some(root) = SourceFile::cast(file.syntax()) else {
                continue;
            };
            let mut scope = Scope::new(ScopeKind::Package, Some(universe));
            scope.package = Some(SmolStr::new(file.package));
            let scope = self.model.add_scope(scope);
            self.model.packages.insert(SmolStr::new(file.package), scope);
            let ctx = Context {
                file: file.id,
                scope,
                class: None,
                results: None,
                package: SmolStr::new(file.package),
            };
            self.with_context(ctx, |this| {
                this.declare_type_names(&root, scope);
                this.declare_members(&root, scope, None);
            });
        }
    }

    pub(super) fn declare_unit(&mut self, inputs: &[SourceInput]) {
        let parent = self
            .model
            .package_scope(ENGINE_PACKAGE)
            .unwrap_or(self.model.universe());
        let unit = self.model.add_scope(Scope::new(ScopeKind::Unit, Some(parent)));
        self.model.unit_scope = unit;
        let package = SmolStr::new(&self.config.package_name);

        for input in inputs {
            let kind = if input.is_entry {
                ClassKind::Game
            } else {
                ClassKind::Sprite
            };
            let mut named = NamedType::new(input.class_name.clone(), package.clone());
            named.underlying = Underlying::Struct(Vec::new());
            named.class = Some(kind);
            let id = self.model.add_named(named);
            let start = TextRange::empty(TextSize::new(0));
            let symbol = self.model.add_symbol(
                Symbol::new(input.class_name.clone(), SymbolKind::TypeName, package.clone())
                    .with_type(Type::Named(id))
                    .with_def(input.id, start),
            );
            self.model.named_mut(id).symbol = Some(symbol);
            self.model.declare(unit, input.class_name.clone(), symbol, TextSize::new(0), false);
            self.classes.insert(input.id, id);
            if input.is_entry {
                self.game_class = Some(id);
            }

            let mut file_scope = Scope::new(ScopeKind::File, Some(unit)).with_range(
                input.id,
                input.root.text_range(),
                true,
            );
            file_scope.class = Some(id);
            let file_scope = self.model.add_scope(file_scope);
            self.model.file_scopes.insert(input.id, file_scope);
        }

        let game_base = self.model.package_type(ENGINE_PACKAGE, GAME_BASE);
        let sprite_base = self.model.package_type(ENGINE_PACKAGE, SPRITE_BASE);
        for input in inputs {
            let Some(class) = self.classes.get(&input.id).copied() else {
                continue;
            };
            if input.is_entry {
                if let Some(base) = game_base {
                    self.embed(class, base);
                }
            } else {
                if let Some(base) = sprite_base {
                    self.embed(class, base);
                }
                if let Some(game) = self.game_class.or(game_base) {
                    self.embed(class, game);
                }
            }
        }

        let contexts: Vec<(SourceFile, Context)> = inputs
            .iter()
            .filter_map(|input| {
                let root = SourceFile::cast(input.root.clone())?;
                let scope = self.model.file_scope(input.id)?;
                let ctx = Context {
                    file: input.id,
                    scope,
                    class: self.classes.get(&input.id).copied(),
                    results: None,
                    package: package.clone(),
                };
                Some((root, ctx))
            })
            .collect();
        for (root, ctx) in &contexts {
            self.with_context(ctx.clone(), |this| this.declare_type_names(root, unit));
        }
        for (root, ctx) in &contexts {
            let class = ctx.class;
            self.with_context(ctx.clone(), |this| this.declare_members(root, unit, class));
        }
    }

    /// Add `base` as an embedded field of `class`.
    fn embed(&mut self, class: NamedId, base: NamedId) {
        let name = self.model.named(base).name.clone();
        let package = self.model.named(class).package.clone();
        let symbol = self.model.add_symbol(
            Symbol::new(name.clone(), SymbolKind::Field, package)
                .with_type(Type::Named(base))
                .with_owner(class),
        );
        if let Underlying::Struct(fields) = &mut self.model.named_mut(class).underlying {
            fields.push(Field {
                symbol,
                name,
                ty: Type::Named(base),
                embedded: true,
            });
        }
    }

    /// Bind `name` in `scope`, reporting a redeclaration.
    fn bind(&mut self, scope: ScopeId, name: SmolStr, symbol: SymbolId, range: TextRange) {
        if self.model.scope(scope).entry(&name, None).is_some() {
            self.error(
                range,
                codes::DUPLICATE_DEFINITION,
                format!("{name} redeclared in this block"),
            );
            return;
        }
        self.model.declare(scope, name, symbol, TextSize::new(0), false);
    }

    fn declare_type_names(&mut self, root: &SourceFile, scope: ScopeId) {
        for item in root.items() {
            let Item::Type(decl) = item else {
                continue;
            };
            let Some(ident) = decl.name().and_then(|n| n.ident()) else {
                continue;
            };
            let name = SmolStr::new(ident.text());
            let range = ident.text_range();
            let pending = PendingType {
                ctx: self.ctx.clone(),
                decl: decl.clone(),
            };
            let symbol = if decl.is_alias() {
                let symbol = self.model.add_symbol(
                    Symbol::new(name.clone(), SymbolKind::TypeName, self.ctx.package.clone())
                        .with_def(self.ctx.file, range),
                );
                self.aliases.push((symbol, pending));
                symbol
            } else {
                let id = self
                    .model
                    .add_named(NamedType::new(name.clone(), self.ctx.package.clone()));
                let symbol = self.model.add_symbol(
                    Symbol::new(name.clone(), SymbolKind::TypeName, self.ctx.package.clone())
                        .with_type(Type::Named(id))
                        .with_def(self.ctx.file, range),
                );
                self.model.named_mut(id).symbol = Some(symbol);
                self.type_decls.insert(id, pending);
                symbol
            };
            self.info.record_def(self.ctx.file, range, symbol);
            self.bind(scope, name, symbol, range);
        }
    }

    fn declare_members(&mut self, root: &SourceFile, scope: ScopeId, class: Option<NamedId>) {
        let mut seen_var_block = false;
        for item in root.items() {
            match item {
                Item::Import(decl) => self.declare_imports(&decl),
                Item::Var(decl) => {
                    let first = !seen_var_block;
                    seen_var_block = true;
                    match class {
                        Some(class) if first => self.declare_fields(&decl, class),
                        _ => self.declare_package_vars(&decl, scope),
                    }
                }
                Item::Const(decl) => self.declare_package_consts(&decl, scope),
                Item::Func(decl) => self.declare_func(&decl, scope, class),
                Item::Type(_) | Item::Stmt(_) => {}
            }
        }
    }

    fn declare_imports(&mut self, decl: &ImportDecl) {
        let file_scope = self.ctx.scope;
        for spec in decl.specs() {
            let (Some(path), Some(token)) = (spec.path(), spec.path_token()) else {
                continue;
            };
            if self.model.package_scope(&path).is_none() {
                self.error(
                    token.text_range(),
                    codes::INVALID_IMPORT,
                    format!("package {path} is not in std"),
                );
                continue;
            }
            let alias = spec.alias().and_then(|a| a.ident());
            let name = match &alias {
                Some(alias) => SmolStr::new(alias.text()),
                None => SmolStr::new(path.rsplit('/').next().unwrap_or(&path)),
            };
            let range = alias.as_ref().map_or(token.text_range(), |a| a.text_range());
            let symbol = self.model.add_symbol(
                Symbol::new(name.clone(), SymbolKind::Package, path.as_str()).with_def(self.ctx.file, range),
            );
            self.info.record_def(self.ctx.file, range, symbol);
            self.bind(file_scope, name, symbol, range);
        }
    }

    fn declare_fields(&mut self, decl: &VarDecl, class: NamedId) {
        for spec in decl.specs() {
            let mut symbols = Vec::new();
            for name in spec.names() {
                let Some(ident) = name.ident() else {
                    continue;
                };
                let text = SmolStr::new(ident.text());
                let range = ident.text_range();
                let mut symbol = Symbol::new(text.clone(), SymbolKind::Field, self.ctx.package.clone())
                    .with_def(self.ctx.file, range)
                    .with_owner(class);
                symbol.in_first_var_block = true;
                let id = self.model.add_symbol(symbol);
                self.info.record_def(self.ctx.file, range, id);
                let duplicate = self.model.named(class).fields().iter().any(|f| f.name == text);
                if duplicate {
                    self.error(range, codes::DUPLICATE_DEFINITION, format!("duplicate field {text}"));
                } else if let Underlying::Struct(fields) = &mut self.model.named_mut(class).underlying {
                    fields.push(Field {
                        symbol: id,
                        name: text,
                        ty: Type::Invalid,
                        embedded: false,
                    });
                }
                symbols.push(id);
            }
            self.push_pending(spec, symbols, false);
        }
    }

    fn declare_package_vars(&mut self, decl: &VarDecl, scope: ScopeId) {
        for spec in decl.specs() {
            let symbols = self.declare_spec_names(&spec, scope, SymbolKind::Var);
            self.push_pending(spec, symbols, false);
        }
    }

    fn declare_package_consts(&mut self, decl: &ConstDecl, scope: ScopeId) {
        for spec in decl.specs() {
            let symbols = self.declare_spec_names(&spec, scope, SymbolKind::Const);
            self.push_pending(spec, symbols, true);
        }
    }

    fn declare_spec_names(&mut self, spec: &ValueSpec, scope: ScopeId, kind: SymbolKind) -> Vec<SymbolId> {
        let mut symbols = Vec::new();
        for name in spec.names() {
            let Some(ident) = name.ident() else {
                continue;
            };
            let text = SmolStr::new(ident.text());
            let range = ident.text_range();
            let id = self.model.add_symbol(
                Symbol::new(text.clone(), kind, self.ctx.package.clone()).with_def(self.ctx.file, range),
            );
            self.info.record_def(self.ctx.file, range, id);
            if text != "_" {
                self.bind(scope, text, id, range);
            }
            symbols.push(id);
        }
        symbols
    }

    fn push_pending(&mut self, spec: ValueSpec, symbols: Vec<SymbolId>, is_const: bool) {
        let index = self.pending.len();
        for symbol in &symbols {
            self.pending_of.insert(*symbol, index);
        }
        self.pending.push(PendingSpec {
            ctx: self.ctx.clone(),
            spec,
            symbols,
            is_const,
            state: PendingState::Unresolved,
        });
    }

    fn declare_func(&mut self, decl: &FuncDecl, scope: ScopeId, class: Option<NamedId>) {
        let Some(ident) = decl.name().and_then(|n| n.ident()) else {
            return;
        };
        let name = SmolStr::new(ident.text());
        let range = ident.text_range();
        let overloadable = self.ctx.file.is_prelude();
        let owner = match decl.receiver() {
            Some(receiver) => self.receiver_type(&receiver),
            None => class,
        };

        let symbol = match owner {
            Some(owner) => {
                let existing = self
                    .model
                    .named(owner)
                    .methods
                    .iter()
                    .copied()
                    .find(|m| self.model.symbol(*m).name == name);
                match existing {
                    Some(existing) if overloadable => existing,
                    Some(_) => {
                        self.error(
                            range,
                            codes::DUPLICATE_DEFINITION,
                            format!("method {name} already declared"),
                        );
                        self.new_func_symbol(&name, SymbolKind::Method, range, Some(owner))
                    }
                    None => {
                        let id = self.new_func_symbol(&name, SymbolKind::Method, range, Some(owner));
                        self.model.named_mut(owner).methods.push(id);
                        id
                    }
                }
            }
            None => {
                let existing = self
                    .model
                    .scope(scope)
                    .entry(&name, None)
                    .map(|e| e.symbol)
                    .filter(|s| self.model.symbol(*s).kind == SymbolKind::Func);
                match existing {
                    Some(existing) if overloadable => existing,
                    _ => {
                        let id = self.new_func_symbol(&name, SymbolKind::Func, range, None);
                        self.bind(scope, name.clone(), id, range);
                        id
                    }
                }
            }
        };
        self.info.record_def(self.ctx.file, range, symbol);
        self.funcs.push(PendingFunc {
            ctx: self.ctx.clone(),
            decl: decl.clone(),
            symbol,
        });
    }

    fn new_func_symbol(
        &mut self,
        name: &SmolStr,
        kind: SymbolKind,
        range: TextRange,
        owner: Option<NamedId>,
    ) -> SymbolId {
        let mut symbol =
            Symbol::new(name.clone(), kind, self.ctx.package.clone()).with_def(self.ctx.file, range);
        symbol.owner = owner;
        self.model.add_symbol(symbol)
    }

    /// Named type of a method receiver `(p *T)`.
    fn receiver_type(&mut self, receiver: &Receiver) -> Option<NamedId> {
        let param = receiver.param()?;
        let token = match param.ty() {
            Some(ty) => embedded_name(&ty)?,
            None => param.name()?.ident()?,
        };
        match self.lookup_type_symbol(token.text()) {
            Some(symbol) => {
                self.info.record_use(self.ctx.file, token.text_range(), symbol);
                self.model.symbol(symbol).ty.as_named()
            }
            None => {
                self.error(
                    token.text_range(),
                    codes::UNDEFINED_REFERENCE,
                    format!("undefined: {}", token.text()),
                );
                None
            }
        }
    }

    // ========================================================================
    // Resolve
    // ========================================================================

    pub(super) fn resolve_declarations(&mut self) {
        let named: Vec<NamedId> = self.type_decls.keys().copied().collect();
        for id in named {
            self.resolve_named(id);
        }
        for (symbol, pending) in std::mem::take(&mut self.aliases) {
            let ty = self.with_context(pending.ctx.clone(), |this| {
                pending
                    .decl
                    .ty()
                    .map(|t| this.resolve_type(&t))
                    .unwrap_or_default()
            });
            self.model.symbol_mut(symbol).ty = ty;
        }
        for index in 0..self.funcs.len() {
            let func = self.funcs[index].clone();
            let signature = self.with_context(func.ctx.clone(), |this| {
                this.signature_of(func.decl.params(), func.decl.result())
            });
            let symbol = self.model.symbol_mut(func.symbol);
            symbol.signatures.push(signature.into());
            if symbol.signatures.len() == 1 {
                symbol.ty = Type::Func(symbol.signatures[0].clone());
            }
        }
        self.model.invalidate_members();
        for index in 0..self.pending.len() {
            self.resolve_pending(index);
        }
        tracing::debug!(
            types = self.type_decls.len(),
            specs = self.pending.len(),
            "declarations resolved"
        );
    }

    /// Resolve the underlying type of a declared named type.
    pub(crate) fn resolve_named(&mut self, id: NamedId) {
        if !matches!(self.model.named(id).underlying, Underlying::Pending) {
            return;
        }
        let Some(pending) = self.type_decls.get(&id).cloned() else {
            return;
        };
        if !self.resolving_types.insert(id) {
            let name = self.model.named(id).name.clone();
            let range = pending
                .decl
                .name()
                .map_or(pending.decl.syntax().text_range(), |n| n.syntax().text_range());
            self.error_in(
                pending.ctx.file,
                range,
                codes::CIRCULAR_DEPENDENCY,
                format!("invalid recursive type {name}"),
            );
            self.model.named_mut(id).underlying = Underlying::Type(Type::Invalid);
            return;
        }
        let underlying = self.with_context(pending.ctx.clone(), |this| match pending.decl.ty() {
            Some(TypeExpr::Struct(st)) => Underlying::Struct(this.struct_fields(&st, id)),
            Some(TypeExpr::Interface(it)) => Underlying::Interface(this.interface_methods(&it, id)),
            Some(other) => {
                let ty = this.resolve_type(&other);
                this.underlying_of(ty)
            }
            None => Underlying::Type(Type::Invalid),
        });
        self.resolving_types.remove(&id);
        if matches!(self.model.named(id).underlying, Underlying::Pending) {
            self.model.named_mut(id).underlying = underlying;
        }
    }

    fn underlying_of(&mut self, ty: Type) -> Underlying {
        let Type::Named(other) = ty else {
            return Underlying::Type(ty);
        };
        self.resolve_named(other);
        match &self.model.named(other).underlying {
            Underlying::Struct(fields) => Underlying::Struct(fields.clone()),
            Underlying::Interface(methods) => Underlying::Interface(methods.clone()),
            Underlying::Type(inner) => Underlying::Type(inner.clone()),
            Underlying::Pending => Underlying::Type(Type::Invalid),
        }
    }

    fn struct_fields(&mut self, st: &StructType, owner: NamedId) -> Vec<Field> {
        let mut fields = Vec::new();
        for decl in st.fields() {
            let Some(type_expr) = decl.ty() else {
                continue;
            };
            let ty = self.resolve_type(&type_expr);
            let idents: Vec<(SyntaxToken, bool)> = if decl.is_embedded() {
                embedded_name(&type_expr).into_iter().map(|t| (t, true)).collect()
            } else {
                decl.names()
                    .filter_map(|n| n.ident())
                    .map(|t| (t, false))
                    .collect()
            };
            for (ident, embedded) in idents {
                let name = SmolStr::new(ident.text());
                let range = ident.text_range();
                let mut symbol = Symbol::new(name.clone(), SymbolKind::Field, self.ctx.package.clone())
                    .with_type(ty.clone())
                    .with_owner(owner);
                if !embedded {
                    symbol = symbol.with_def(self.ctx.file, range);
                }
                let symbol = self.model.add_symbol(symbol);
                if !embedded {
                    self.info.record_def(self.ctx.file, range, symbol);
                }
                if fields.iter().any(|f: &Field| f.name == name) {
                    self.error(range, codes::DUPLICATE_DEFINITION, format!("duplicate field {name}"));
                    continue;
                }
                fields.push(Field {
                    symbol,
                    name,
                    ty: ty.clone(),
                    embedded,
                });
            }
        }
        fields
    }

    fn interface_methods(&mut self, it: &InterfaceType, owner: NamedId) -> Vec<SymbolId> {
        let mut methods = Vec::new();
        for spec in it.methods() {
            let Some(ident) = spec.name().and_then(|n| n.ident()) else {
                continue;
            };
            let signature = std::sync::Arc::new(self.signature_of(spec.params(), spec.result()));
            let mut symbol = Symbol::new(ident.text(), SymbolKind::Method, self.ctx.package.clone())
                .with_type(Type::Func(signature.clone()))
                .with_def(self.ctx.file, ident.text_range())
                .with_owner(owner);
            symbol.signatures.push(signature);
            let id = self.model.add_symbol(symbol);
            self.info.record_def(self.ctx.file, ident.text_range(), id);
            methods.push(id);
        }
        methods
    }

    // ========================================================================
    // Type expressions
    // ========================================================================

    pub(crate) fn resolve_type(&mut self, expr: &TypeExpr) -> Type {
        match expr {
            TypeExpr::Ref(type_ref) => {
                let Some(name) = type_ref.name_token() else {
                    return Type::Invalid;
                };
                match type_ref.qualifier() {
                    Some(qualifier) => self.resolve_qualified_type(&qualifier, &name),
                    None => self.resolve_type_name(&name),
                }
            }
            TypeExpr::Pointer(pointer) => pointer
                .elem()
                .map(|t| self.resolve_type(&t))
                .unwrap_or_default(),
            TypeExpr::Slice(slice) => match slice.elem() {
                Some(elem) => Type::slice(self.resolve_type(&elem)),
                None => Type::Invalid,
            },
            TypeExpr::Map(map) => match (map.key(), map.value()) {
                (Some(key), Some(value)) => {
                    let key = self.resolve_type(&key);
                    Type::map(key, self.resolve_type(&value))
                }
                _ => Type::Invalid,
            },
            TypeExpr::Chan(chan) => match chan.elem() {
                Some(elem) => Type::Chan(self.resolve_type(&elem).into()),
                None => Type::Invalid,
            },
            TypeExpr::Func(func) => Type::Func(self.signature_of(func.params(), func.result()).into()),
            TypeExpr::Struct(st) => {
                let id = self.model.add_named(NamedType::new("struct{...}", ""));
                let fields = self.struct_fields(st, id);
                self.model.named_mut(id).underlying = Underlying::Struct(fields);
                Type::Named(id)
            }
            TypeExpr::Interface(it) => {
                if it.methods().next().is_none() {
                    return Type::Any;
                }
                let id = self.model.add_named(NamedType::new("interface{...}", ""));
                let methods = self.interface_methods(it, id);
                self.model.named_mut(id).underlying = Underlying::Interface(methods);
                Type::Named(id)
            }
        }
    }

    /// Type named by a bare identifier.
    pub(crate) fn resolve_type_name(&mut self, token: &SyntaxToken) -> Type {
        let name = token.text();
        if let Some(symbol) = self.lookup_type_symbol(name) {
            self.info.record_use(self.ctx.file, token.text_range(), symbol);
            return self.model.symbol(symbol).ty.clone();
        }
        let message = if self.model.lookup(self.ctx.scope, name, None).is_some() {
            format!("{name} is not a type")
        } else {
            format!("undefined: {name}")
        };
        self.error(token.text_range(), codes::INVALID_TYPE, message);
        Type::Invalid
    }

    fn resolve_qualified_type(&mut self, qualifier: &SyntaxToken, name: &SyntaxToken) -> Type {
        let Some(package) = self.lookup_package(qualifier) else {
            return Type::Invalid;
        };
        let Some(scope) = self.model.package_scope(&self.model.symbol(package).package) else {
            return Type::Invalid;
        };
        match self.model.scope(scope).entry(name.text(), None) {
            Some(entry) if self.model.symbol(entry.symbol).kind == SymbolKind::TypeName => {
                self.info.record_use(self.ctx.file, name.text_range(), entry.symbol);
                self.model.symbol(entry.symbol).ty.clone()
            }
            _ => {
                self.error(
                    name.text_range(),
                    codes::INVALID_TYPE,
                    format!("undefined: {}.{}", qualifier.text(), name.text()),
                );
                Type::Invalid
            }
        }
    }

    /// The package symbol named by `token`, reporting when it is not one.
    pub(crate) fn lookup_package(&mut self, token: &SyntaxToken) -> Option<SymbolId> {
        let offset = token.text_range().start();
        match self.model.lookup(self.ctx.scope, token.text(), Some(offset)) {
            Some(symbol) if self.model.symbol(symbol).kind == SymbolKind::Package => {
                self.info.record_use(self.ctx.file, token.text_range(), symbol);
                Some(symbol)
            }
            _ => {
                self.error(
                    token.text_range(),
                    codes::UNDEFINED_REFERENCE,
                    format!("undefined: {}", token.text()),
                );
                None
            }
        }
    }

    /// Nearest type-name binding of `name`, skipping values and class members.
    pub(crate) fn lookup_type_symbol(&self, name: &str) -> Option<SymbolId> {
        self.model.scope_chain(self.ctx.scope).find_map(|scope| {
            self.model
                .scope(scope)
                .entry(name, None)
                .filter(|e| self.model.symbol(e.symbol).kind == SymbolKind::TypeName)
                .map(|e| e.symbol)
        })
    }

    pub(crate) fn signature_of(&mut self, params: Option<ParamList>, result: Option<ResultClause>) -> Signature {
        let (params, param_names, variadic) = match params {
            Some(list) => self.param_types(&list),
            None => (Vec::new(), Vec::new(), false),
        };
        let results = match result {
            Some(result) => match (result.ty(), result.params()) {
                (Some(ty), _) => vec![self.resolve_type(&ty)],
                (None, Some(list)) => self.param_types(&list).0,
                (None, None) => Vec::new(),
            },
            None => Vec::new(),
        };
        Signature {
            params,
            param_names,
            variadic,
            results,
        }
    }

    /// Parameter types, names and variadic flag of a parameter list.
    ///
    /// `(a, b float64)` shares the trailing type; a list without any type,
    /// like `(Sprite)`, names types only.
    pub(crate) fn param_types(&mut self, list: &ParamList) -> (Vec<Type>, Vec<Option<SmolStr>>, bool) {
        let params: Vec<Param> = list.params().collect();
        let variadic = params.last().is_some_and(Param::is_variadic);
        if !params.iter().any(|p| p.ty().is_some()) {
            let types = params
                .iter()
                .map(|p| match p.name().and_then(|n| n.ident()) {
                    Some(ident) => self.resolve_type_name(&ident),
                    None => Type::Invalid,
                })
                .collect();
            return (types, vec![None; params.len()], false);
        }
        let mut types = vec![Type::Invalid; params.len()];
        let mut carried = Type::Invalid;
        for (index, param) in params.iter().enumerate().rev() {
            types[index] = match param.ty() {
                Some(ty) => {
                    carried = self.resolve_type(&ty);
                    if param.is_variadic() {
                        Type::slice(carried.clone())
                    } else {
                        carried.clone()
                    }
                }
                None => carried.clone(),
            };
        }
        let names = params
            .iter()
            .map(|p| p.name().and_then(|n| n.text()))
            .collect();
        (types, names, variadic)
    }

    // ========================================================================
    // Package-level initializers
    // ========================================================================

    /// Resolve the spec declaring `symbol` if it is still pending.
    pub(crate) fn ensure_resolved(&mut self, symbol: SymbolId) {
        if let Some(index) = self.pending_of.get(&symbol).copied() {
            self.resolve_pending(index);
        }
    }

    fn resolve_pending(&mut self, index: usize) {
        match self.pending[index].state {
            PendingState::Done => return,
            PendingState::Resolving => {
                let pending = &self.pending[index];
                let file = pending.ctx.file;
                let range = pending.spec.syntax().text_range();
                let name = pending
                    .symbols
                    .first()
                    .map(|s| self.model.symbol(*s).name.clone())
                    .unwrap_or_default();
                self.error_in(
                    file,
                    range,
                    codes::CIRCULAR_DEPENDENCY,
                    format!("initialization cycle: {name} refers to itself"),
                );
                return;
            }
            PendingState::Unresolved => {}
        }
        self.pending[index].state = PendingState::Resolving;
        let PendingSpec {
            ctx,
            spec,
            symbols,
            is_const,
            ..
        } = self.pending[index].clone();
        let resolved = self.with_context(ctx, |this| this.resolve_value_spec(&spec, symbols.len(), is_const));
        for (symbol, (ty, value)) in symbols.iter().zip(resolved) {
            let owner = self.model.symbol(*symbol).owner;
            if let Some(owner) = owner
                && let Underlying::Struct(fields) = &mut self.model.named_mut(owner).underlying
                && let Some(field) = fields.iter_mut().find(|f| f.symbol == *symbol)
            {
                field.ty = ty.clone();
            }
            let entry = self.model.symbol_mut(*symbol);
            entry.ty = ty;
            if is_const {
                entry.value = value;
            }
        }
        self.pending[index].state = PendingState::Done;
    }

    /// Types and constant values for the `count` names of a value spec.
    pub(crate) fn resolve_value_spec(
        &mut self,
        spec: &ValueSpec,
        count: usize,
        is_const: bool,
    ) -> Vec<(Type, Option<ConstValue>)> {
        let declared = spec.ty().map(|t| self.resolve_type(&t));
        let values = spec.values();
        let mut out = vec![(declared.clone().unwrap_or_default(), None); count];
        let range = spec.syntax().text_range();
        if values.is_empty() {
            if is_const {
                self.error(range, codes::INVALID_ASSIGNMENT, "missing init expr for const declaration");
            } else if declared.is_none() {
                self.error(range, codes::INVALID_ASSIGNMENT, "missing type or init expr");
            }
            return out;
        }
        if values.len() == count {
            for (slot, value) in out.iter_mut().zip(&values) {
                let operand = self.check_expr(value, declared.as_ref());
                *slot = self.init_type(value.syntax(), &operand, declared.as_ref(), is_const);
            }
            return out;
        }
        if values.len() == 1 && !is_const {
            let operand = self.check_expr(&values[0], None);
            if let Type::Tuple(items) = &operand.ty
                && items.len() == count
            {
                for (slot, item) in out.iter_mut().zip(items.iter()) {
                    let ty = match &declared {
                        Some(declared) => {
                            let item_operand = Operand::value(item.clone());
                            self.assign_to(values[0].syntax(), &item_operand, declared, "assignment");
                            declared.clone()
                        }
                        None => item.clone(),
                    };
                    *slot = (ty, None);
                }
                return out;
            }
            if operand.is_invalid() {
                return out;
            }
        } else {
            for value in &values {
                self.check_expr(value, declared.as_ref());
            }
        }
        self.error(
            range,
            codes::INVALID_ASSIGNMENT,
            format!(
                "assignment mismatch: {count} variable{} but {} value{}",
                if count == 1 { "" } else { "s" },
                values.len(),
                if values.len() == 1 { "" } else { "s" }
            ),
        );
        out
    }

    /// Type (and value) a declared name takes from its initializer.
    fn init_type(
        &mut self,
        node: &SyntaxNode,
        operand: &Operand,
        declared: Option<&Type>,
        is_const: bool,
    ) -> (Type, Option<ConstValue>) {
        if operand.is_invalid() {
            return (declared.cloned().unwrap_or_default(), None);
        }
        if is_const && operand.value.is_none() {
            self.error(
                node.text_range(),
                codes::TYPE_MISMATCH,
                format!("{} is not constant", node.text()),
            );
        }
        match declared {
            Some(declared) => {
                self.assign_to(node, operand, declared, "variable declaration");
                let value = operand
                    .value
                    .as_ref()
                    .and_then(|v| match self.model.basic_of(declared) {
                        Some(kind) => super::consts::convert(v, kind),
                        None => Some(v.clone()),
                    });
                (declared.clone(), value)
            }
            // Untyped constants stay untyped until used.
            None if is_const => (operand.ty.clone(), operand.value.clone()),
            None => (self.default_type(node, operand), operand.value.clone()),
        }
    }
}

/// Identifier naming an embedded field: the type name.
fn embedded_name(ty: &TypeExpr) -> Option<SyntaxToken> {
    match ty {
        TypeExpr::Ref(type_ref) => type_ref.name_token(),
        TypeExpr::Pointer(pointer) => pointer.elem().as_ref().and_then(embedded_name),
        _ => None,
    }
}

/// Identifiers of a parameter list aligned with its parameter types.
pub(crate) fn param_idents(list: &ParamList) -> Vec<Option<SyntaxToken>> {
    let params: Vec<Param> = list.params().collect();
    if !params.iter().any(|p| p.ty().is_some()) {
        return vec![None; params.len()];
    }
    params
        .iter()
        .map(|p| p.name().and_then(|n| n.ident()))
        .collect()
}
