//! The semantic model of one program unit: symbol, type and scope arenas plus
//! the queries that walk them.

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use text_size::TextSize;

use super::domain::{self, ENGINE_PACKAGE};
use super::scope::{Scope, ScopeEntry, ScopeId, ScopeKind};
use super::symbols::{Symbol, SymbolId, SymbolKind};
use super::types::{BasicKind, ClassKind, NamedId, NamedType, Type, Underlying};
use crate::base::FileId;
use crate::resource::ResourceKind;

/// A member reachable from a named type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Member {
    pub symbol: SymbolId,
    /// Embedding depth: 0 for members declared on the type itself
    pub depth: u32,
}

/// Arenas and scope tree of one program unit.
#[derive(Debug)]
pub struct Model {
    symbols: Vec<Symbol>,
    named: Vec<NamedType>,
    scopes: Vec<Scope>,
    pub(crate) universe: ScopeId,
    pub(crate) unit_scope: ScopeId,
    /// Scopes of the bundled packages, by import path
    pub(crate) packages: IndexMap<SmolStr, ScopeId>,
    pub(crate) file_scopes: FxHashMap<FileId, ScopeId>,
    member_memo: Mutex<FxHashMap<NamedId, Arc<[Member]>>>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        let mut model = Self {
            symbols: Vec::new(),
            named: Vec::new(),
            scopes: Vec::new(),
            universe: ScopeId(0),
            unit_scope: ScopeId(0),
            packages: IndexMap::new(),
            file_scopes: FxHashMap::default(),
            member_memo: Mutex::new(FxHashMap::default()),
        };
        model.universe = model.add_scope(Scope::new(ScopeKind::Universe, None));
        model
    }

    // ========================================================================
    // Arenas
    // ========================================================================

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub(crate) fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    pub fn named(&self, id: NamedId) -> &NamedType {
        &self.named[id.index()]
    }

    pub(crate) fn named_mut(&mut self, id: NamedId) -> &mut NamedType {
        &mut self.named[id.index()]
    }

    pub(crate) fn add_named(&mut self, named: NamedType) -> NamedId {
        let id = NamedId(self.named.len() as u32);
        self.named.push(named);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub(crate) fn add_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        if let Some(parent) = scope.parent {
            self.scopes[parent.index()].children.push(id);
        }
        self.scopes.push(scope);
        id
    }

    /// Bind `name` in `scope`; returns the symbol it replaces, if any.
    pub(crate) fn declare(
        &mut self,
        scope: ScopeId,
        name: SmolStr,
        symbol: SymbolId,
        visible_from: TextSize,
        body_local: bool,
    ) -> Option<SymbolId> {
        let entry = ScopeEntry {
            symbol,
            visible_from,
            body_local,
        };
        self.scope_mut(scope)
            .entries
            .insert(name, entry)
            .map(|old| old.symbol)
    }

    pub fn universe(&self) -> ScopeId {
        self.universe
    }

    pub fn unit_scope(&self) -> ScopeId {
        self.unit_scope
    }

    pub fn file_scope(&self, file: FileId) -> Option<ScopeId> {
        self.file_scopes.get(&file).copied()
    }

    pub fn package_scope(&self, path: &str) -> Option<ScopeId> {
        self.packages.get(path).copied()
    }

    /// Named type declared in a bundled package.
    pub fn package_type(&self, package: &str, name: &str) -> Option<NamedId> {
        let scope = self.package_scope(package)?;
        let entry = self.scope(scope).entry(name, None)?;
        let symbol = self.symbol(entry.symbol);
        (symbol.kind == SymbolKind::TypeName)
            .then(|| symbol.ty.as_named())
            .flatten()
    }

    // ========================================================================
    // Scope queries
    // ========================================================================

    /// Ancestors of `scope`, innermost first, starting with `scope` itself.
    pub fn scope_chain(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |s| self.scope(*s).parent)
    }

    /// Most deeply nested scope of `file` containing `offset`.
    pub fn innermost_scope_at(&self, file: FileId, offset: TextSize) -> Option<ScopeId> {
        let mut current = self.file_scope(file)?;
        'descend: loop {
            for child in &self.scope(current).children {
                if self.scope(*child).contains(file, offset) {
                    current = *child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Resolve `name` starting from `scope`.
    ///
    /// With an offset, bindings made later in the same file are skipped.
    pub fn lookup(&self, scope: ScopeId, name: &str, offset: Option<TextSize>) -> Option<SymbolId> {
        let mut inside_func = false;
        for id in self.scope_chain(scope) {
            let scope = self.scope(id);
            let offset = if scope.file.is_some() { offset } else { None };
            if let Some(entry) = scope.entry(name, offset)
                && !(entry.body_local && inside_func)
            {
                return Some(entry.symbol);
            }
            if let Some(class) = scope.class
                && let Some(member) = self.lookup_member(class, name)
            {
                return Some(member);
            }
            if scope.kind == ScopeKind::Func {
                inside_func = true;
            }
        }
        None
    }

    /// Every binding visible from `scope`, innermost first, shadowed names
    /// reported once.
    pub fn visible_symbols(&self, scope: ScopeId, offset: Option<TextSize>) -> Vec<SymbolId> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut inside_func = false;
        for id in self.scope_chain(scope) {
            let scope = self.scope(id);
            let local_offset = if scope.file.is_some() { offset } else { None };
            for (name, entry) in &scope.entries {
                if local_offset.is_some_and(|o| entry.visible_from > o) {
                    continue;
                }
                if entry.body_local && inside_func {
                    continue;
                }
                if seen.insert(name.clone()) {
                    out.push(entry.symbol);
                }
            }
            if let Some(class) = scope.class {
                for member in self.member_walk(class).iter() {
                    let symbol = self.symbol(member.symbol);
                    if seen.insert(symbol.name.clone()) {
                        out.push(member.symbol);
                    }
                }
            }
            if scope.kind == ScopeKind::Func {
                inside_func = true;
            }
        }
        out
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Members of `ty` in declaration order, own members first, then promoted
    /// members by embedding depth. Each embedded type is visited once and a
    /// name is reported only at its shallowest occurrence.
    pub fn member_walk(&self, ty: NamedId) -> Arc<[Member]> {
        if let Some(members) = self.member_memo.lock().get(&ty) {
            return members.clone();
        }
        let members: Arc<[Member]> = Arc::from(self.compute_members(ty));
        self.member_memo.lock().insert(ty, members.clone());
        members
    }

    fn compute_members(&self, root: NamedId) -> Vec<Member> {
        let mut out = Vec::new();
        let mut names = FxHashSet::default();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([(root, 0u32)]);
        while let Some((id, depth)) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let named = self.named(id);
            let mut visit = |symbol: SymbolId| {
                if names.insert(self.symbol(symbol).name.clone()) {
                    out.push(Member { symbol, depth });
                }
            };
            match &named.underlying {
                Underlying::Struct(fields) => {
                    for field in fields {
                        visit(field.symbol);
                    }
                }
                Underlying::Interface(methods) => {
                    for method in methods {
                        visit(*method);
                    }
                }
                Underlying::Pending | Underlying::Type(_) => {}
            }
            for method in &named.methods {
                visit(*method);
            }
            for field in named.fields() {
                if field.embedded
                    && let Type::Named(inner) = field.ty
                {
                    queue.push_back((inner, depth + 1));
                }
            }
        }
        out
    }

    /// Drop memoized member lists after members were added.
    pub(crate) fn invalidate_members(&self) {
        self.member_memo.lock().clear();
    }

    pub fn lookup_member(&self, ty: NamedId, name: &str) -> Option<SymbolId> {
        self.member_walk(ty)
            .iter()
            .map(|m| m.symbol)
            .find(|s| self.symbol(*s).name == name)
    }

    /// Member `name` of a value of type `ty`.
    pub fn lookup_member_of(&self, ty: &Type, name: &str) -> Option<SymbolId> {
        match ty {
            Type::Named(id) => self.lookup_member(*id, name),
            _ => None,
        }
    }

    // ========================================================================
    // Type relations
    // ========================================================================

    /// Underlying type; structs and interfaces stay named.
    pub fn underlying(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        for _ in 0..16 {
            match &current {
                Type::Named(id) => match &self.named(*id).underlying {
                    Underlying::Type(inner) => current = inner.clone(),
                    _ => return current,
                },
                _ => return current,
            }
        }
        Type::Invalid
    }

    /// Basic kind underlying `ty`, if any.
    pub fn basic_of(&self, ty: &Type) -> Option<BasicKind> {
        self.underlying(ty).basic()
    }

    pub fn is_interface(&self, ty: &Type) -> bool {
        match ty {
            Type::Any => true,
            Type::Named(id) => self.named(*id).is_interface(),
            _ => false,
        }
    }

    /// Whether every method required by interface `iface` is a member of `ty`.
    pub fn implements(&self, ty: &Type, iface: NamedId) -> bool {
        let Underlying::Interface(required) = &self.named(iface).underlying else {
            return false;
        };
        let Type::Named(id) = ty else {
            return required.is_empty();
        };
        required.iter().all(|method| {
            let name = &self.symbol(*method).name;
            self.lookup_member(*id, name)
                .is_some_and(|m| self.symbol(m).kind == SymbolKind::Method)
        })
    }

    /// Resource kind named by values of `ty`, if it is a resource-name type.
    pub fn resource_name_kind(&self, ty: &Type) -> Option<ResourceKind> {
        let named = self.named(ty.as_named()?);
        if named.package != ENGINE_PACKAGE {
            return None;
        }
        domain::resource_name_kind(&named.name)
    }

    /// Engine enumerated domain of `ty`.
    pub fn enum_domain(&self, ty: &Type) -> Option<domain::EnumDomain> {
        let named = self.named(ty.as_named()?);
        if named.package != ENGINE_PACKAGE {
            return None;
        }
        domain::EnumDomain::from_type_name(&named.name)
    }

    pub fn is_engine_type(&self, ty: &Type, name: &str) -> bool {
        ty.as_named().is_some_and(|id| {
            let named = self.named(id);
            named.package == ENGINE_PACKAGE && named.name == name
        })
    }

    pub fn class_kind(&self, ty: &Type) -> Option<ClassKind> {
        ty.as_named().and_then(|id| self.named(id).class)
    }

    pub fn is_sprite_class(&self, ty: &Type) -> bool {
        self.class_kind(ty) == Some(ClassKind::Sprite)
    }

    /// Whether a value of type `from` may be assigned to `to`.
    pub fn assignable(&self, from: &Type, to: &Type) -> bool {
        if from.is_invalid() || to.is_invalid() || from == to {
            return true;
        }
        if matches!(to, Type::Any) {
            return !from.is_void() && !matches!(from, Type::Tuple(_));
        }
        if let Type::Basic(kind) = from
            && kind.is_untyped()
        {
            return self.untyped_assignable(*kind, to);
        }
        // Resource names stay interchangeable with plain strings.
        if (self.resource_name_kind(from).is_some() || self.resource_name_kind(to).is_some())
            && self.basic_of(from) == Some(BasicKind::String)
            && self.basic_of(to) == Some(BasicKind::String)
        {
            return true;
        }
        if let Type::Named(iface) = to
            && self.named(*iface).is_interface()
        {
            return self.implements(from, *iface);
        }
        let from_named = matches!(from, Type::Named(_)) || matches!(from, Type::Basic(_));
        let to_named = matches!(to, Type::Named(_)) || matches!(to, Type::Basic(_));
        if !(from_named && to_named) {
            return self.underlying(from) == self.underlying(to);
        }
        false
    }

    fn untyped_assignable(&self, kind: BasicKind, to: &Type) -> bool {
        if kind == BasicKind::UntypedNil {
            return match self.underlying(to) {
                Type::Slice(_) | Type::Map(..) | Type::Chan(_) | Type::Func(_) | Type::Any => true,
                // Pointers are erased, so nil stands in for a missing object.
                Type::Named(id) => matches!(
                    self.named(id).underlying,
                    Underlying::Struct(_) | Underlying::Interface(_)
                ),
                _ => false,
            };
        }
        match to {
            Type::Any => return true,
            Type::Named(id) if self.named(*id).is_interface() => {
                return self.implements(&Type::Basic(kind.default_kind()), *id);
            }
            _ => {}
        }
        let Some(target) = self.basic_of(to) else {
            return false;
        };
        match kind {
            BasicKind::UntypedInt => target.is_numeric(),
            BasicKind::UntypedFloat => target == BasicKind::Float64,
            BasicKind::UntypedString => target.is_string(),
            BasicKind::UntypedBool => target.is_boolean(),
            _ => false,
        }
    }

    /// Display form of a type as used in messages and completion details.
    pub fn display(&self, ty: &Type) -> String {
        match ty {
            Type::Invalid => "invalid type".to_string(),
            Type::Basic(kind) => kind.name().to_string(),
            Type::Any => "any".to_string(),
            Type::Named(id) => {
                let named = self.named(*id);
                if named.package.is_empty() || named.package == "main" {
                    named.name.to_string()
                } else {
                    format!("{}.{}", named.package, named.name)
                }
            }
            Type::Slice(elem) => format!("[]{}", self.display(elem)),
            Type::Map(key, value) => format!("map[{}]{}", self.display(key), self.display(value)),
            Type::Chan(elem) => format!("chan {}", self.display(elem)),
            Type::Func(sig) => {
                let params: Vec<String> = sig
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let last = i + 1 == sig.params.len();
                        match p {
                            Type::Slice(elem) if sig.variadic && last => {
                                format!("...{}", self.display(elem))
                            }
                            other => self.display(other),
                        }
                    })
                    .collect();
                let mut out = format!("func({})", params.join(", "));
                match sig.results.as_slice() {
                    [] => {}
                    [single] => {
                        out.push(' ');
                        out.push_str(&self.display(single));
                    }
                    many => {
                        let results: Vec<String> = many.iter().map(|r| self.display(r)).collect();
                        out.push_str(&format!(" ({})", results.join(", ")));
                    }
                }
                out
            }
            Type::Tuple(items) => {
                let items: Vec<String> = items.iter().map(|t| self.display(t)).collect();
                format!("({})", items.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::types::Field;

    fn struct_type(model: &mut Model, name: &str, package: &str) -> NamedId {
        let mut named = NamedType::new(name, package);
        named.underlying = Underlying::Struct(Vec::new());
        model.add_named(named)
    }

    fn add_method(model: &mut Model, owner: NamedId, name: &str) -> SymbolId {
        let sym = model.add_symbol(Symbol::new(name, SymbolKind::Method, "spx").with_owner(owner));
        model.named_mut(owner).methods.push(sym);
        sym
    }

    fn embed(model: &mut Model, outer: NamedId, inner: NamedId) {
        let name = model.named(inner).name.clone();
        let symbol = model.add_symbol(Symbol::new(name.clone(), SymbolKind::Field, "spx"));
        if let Underlying::Struct(fields) = &mut model.named_mut(outer).underlying {
            fields.push(Field {
                symbol,
                name,
                ty: Type::Named(inner),
                embedded: true,
            });
        }
    }

    #[test]
    fn test_member_walk_visits_diamond_once() {
        let mut model = Model::new();
        let base = struct_type(&mut model, "baseObj", "spx");
        let left = struct_type(&mut model, "Game", "spx");
        let right = struct_type(&mut model, "SpriteImpl", "spx");
        let class = struct_type(&mut model, "Fido", "main");
        add_method(&mut model, base, "setGraphicEffect");
        add_method(&mut model, left, "broadcast");
        add_method(&mut model, right, "say");
        embed(&mut model, left, base);
        embed(&mut model, right, base);
        embed(&mut model, class, right);
        embed(&mut model, class, left);

        let members = model.member_walk(class);
        let names: Vec<_> = members
            .iter()
            .map(|m| model.symbol(m.symbol).name.to_string())
            .collect();
        assert_eq!(
            names.iter().filter(|n| n.as_str() == "setGraphicEffect").count(),
            1
        );
        assert!(names.contains(&"say".to_string()));
        assert!(names.contains(&"broadcast".to_string()));
        let effect = members
            .iter()
            .find(|m| model.symbol(m.symbol).name == "setGraphicEffect")
            .unwrap();
        assert_eq!(effect.depth, 2);
    }

    #[test]
    fn test_shallow_member_shadows_deep_one() {
        let mut model = Model::new();
        let base = struct_type(&mut model, "Game", "spx");
        let class = struct_type(&mut model, "Game", "main");
        let deep = add_method(&mut model, base, "play");
        let shallow = add_method(&mut model, class, "play");
        embed(&mut model, class, base);
        assert_eq!(model.lookup_member(class, "play"), Some(shallow));
        assert_ne!(model.lookup_member(class, "play"), Some(deep));
    }

    #[test]
    fn test_resource_names_are_loose_strings() {
        let mut model = Model::new();
        let mut sprite_name = NamedType::new("SpriteName", "spx");
        sprite_name.underlying = Underlying::Type(Type::STRING);
        let sprite_name = Type::Named(model.add_named(sprite_name));
        let mut sound_name = NamedType::new("SoundName", "spx");
        sound_name.underlying = Underlying::Type(Type::STRING);
        let sound_name = Type::Named(model.add_named(sound_name));

        assert!(model.assignable(&Type::STRING, &sprite_name));
        assert!(model.assignable(&sprite_name, &Type::STRING));
        assert!(model.assignable(&sprite_name, &sound_name));
        assert!(model.assignable(&Type::Basic(BasicKind::UntypedString), &sprite_name));
        assert!(!model.assignable(&Type::INT, &sprite_name));
    }

    #[test]
    fn test_named_numeric_types_are_distinct() {
        let mut model = Model::new();
        let mut direction = NamedType::new("Direction", "spx");
        direction.underlying = Underlying::Type(Type::FLOAT64);
        let direction = Type::Named(model.add_named(direction));
        assert!(!model.assignable(&direction, &Type::FLOAT64));
        assert!(model.assignable(&Type::Basic(BasicKind::UntypedInt), &direction));
        assert!(!model.assignable(&Type::Basic(BasicKind::UntypedFloat), &Type::INT));
        assert_eq!(model.display(&Type::slice(direction)), "[]spx.Direction");
    }
}
