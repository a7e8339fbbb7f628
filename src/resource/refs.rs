//! Resource references: every place a program names one of its assets.
//!
//! References come in four kinds:
//!
//! - **StringLiteral**: `play "Meow"` where the parameter is a `SoundName`
//! - **ConstantReference**: a named string constant used as a resource name
//! - **AutoBinding**: a game field such as `Fido Fido` bound to the sprite
//!   of the same name
//! - **AutoBindingReference**: any other occurrence of such a field
//!
//! Costume and animation names are scoped to a sprite, found by walking
//! outwards to the nearest call whose receiver is a sprite.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::{Catalog, ResourceId, ResourceKind};
use crate::base::FileId;
use crate::config::AnalysisConfig;
use crate::hir::domain::{self, ENGINE_PACKAGE};
use crate::hir::{DiagnosticCollector, Info, Model, SymbolId, SymbolKind, Type, UnitFile, codes};
use crate::parser::{
    AstNode, Expr, Item, Literal, LiteralKind, NameRef, SourceFile, Stmt, SyntaxKind, SyntaxNode,
};

/// How a reference names its resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RefKind {
    StringLiteral,
    ConstantReference,
    AutoBinding,
    AutoBindingReference,
}

/// A resolved reference to a catalog resource
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub id: ResourceId,
    pub kind: RefKind,
    pub file: FileId,
    /// Range of the literal or identifier
    pub range: TextRange,
}

/// Resource references of one unit.
#[derive(Clone, Debug, Default)]
pub struct ResourceIndex {
    refs: Vec<ResourceRef>,
    seen: FxHashSet<ResourceRef>,
    auto_bindings: FxHashMap<SymbolId, ResourceId>,
}

impl ResourceIndex {
    fn add(&mut self, reference: ResourceRef) {
        if self.seen.insert(reference.clone()) {
            self.refs.push(reference);
        }
    }

    pub fn refs(&self) -> &[ResourceRef] {
        &self.refs
    }

    /// References to `id`, in unit order.
    pub fn references_to<'a>(&'a self, id: &'a ResourceId) -> impl Iterator<Item = &'a ResourceRef> + 'a {
        self.refs.iter().filter(move |r| &r.id == id)
    }

    pub fn refs_in(&self, file: FileId) -> impl Iterator<Item = &ResourceRef> + '_ {
        self.refs.iter().filter(move |r| r.file == file)
    }

    /// The reference covering `offset`.
    pub fn ref_at(&self, file: FileId, offset: TextSize) -> Option<&ResourceRef> {
        self.refs
            .iter()
            .find(|r| r.file == file && r.range.contains_inclusive(offset))
    }

    /// Resource a field is auto-bound to.
    pub fn auto_binding(&self, symbol: SymbolId) -> Option<&ResourceId> {
        self.auto_bindings.get(&symbol)
    }

    pub fn auto_bindings(&self) -> impl Iterator<Item = (SymbolId, &ResourceId)> + '_ {
        self.auto_bindings.iter().map(|(symbol, id)| (*symbol, id))
    }
}

/// Resource kind carried by fields of type `ty`: sprite classes, `Sound`
/// and `Monitor`.
pub fn resource_field_kind(model: &Model, ty: &Type) -> Option<ResourceKind> {
    if model.is_sprite_class(ty) {
        return Some(ResourceKind::Sprite);
    }
    let named = model.named(ty.as_named()?);
    if named.package != ENGINE_PACKAGE {
        return None;
    }
    domain::resource_field_kind(&named.name)
}

/// Sprite whose costumes and animations `node` refers to: the receiver of
/// the nearest enclosing call made on a sprite.
pub fn sprite_context(model: &Model, info: &Info, file: FileId, node: &SyntaxNode) -> Option<SmolStr> {
    node.ancestors()
        .filter(|n| matches!(n.kind(), SyntaxKind::CALL_EXPR | SyntaxKind::COMMAND_CALL))
        .filter_map(|call| info.call(file, &call)?.receiver_type())
        .find(|ty| model.is_sprite_class(ty))
        .and_then(|ty| ty.as_named())
        .map(|id| model.named(id).name.clone())
}

/// Asset root named by the first argument of the top-level `run` call of the
/// entry file.
pub(crate) fn asset_root(
    entry: Option<&UnitFile>,
    model: &Model,
    info: &Info,
    config: &AnalysisConfig,
    diagnostics: &mut DiagnosticCollector,
) -> String {
    let default = config.default_asset_root.clone();
    let Some(entry) = entry else {
        return default;
    };
    let Some(root) = SourceFile::cast(entry.syntax()) else {
        return default;
    };
    for item in root.items() {
        let Item::Stmt(Stmt::Expr(stmt)) = item else {
            continue;
        };
        let Some(call) = stmt.expr().and_then(|e| e.as_call()) else {
            continue;
        };
        let is_run = info
            .call(entry.id, call.syntax())
            .and_then(|c| c.callee)
            .map(|s| model.symbol(s))
            .is_some_and(|s| s.name == "run" && s.package == ENGINE_PACKAGE);
        if !is_run {
            continue;
        }
        let Some(arg) = call.args().into_iter().next() else {
            return default;
        };
        let value = info
            .type_of(entry.id, arg.syntax())
            .and_then(|tv| tv.value.as_ref())
            .and_then(|v| v.as_str().map(str::to_string));
        return match value {
            Some(root) => root,
            None => {
                diagnostics.error(
                    entry.id,
                    arg.syntax().text_range(),
                    codes::NON_CONSTANT_ASSET_ROOT,
                    "asset root must be a constant string",
                );
                default
            }
        };
    }
    default
}

struct Resolver<'a> {
    model: &'a Model,
    info: &'a Info,
    catalog: &'a Catalog,
    entry_name: &'a str,
    index: ResourceIndex,
    diagnostics: &'a mut DiagnosticCollector,
}

/// Find and resolve every resource reference of the checked files.
pub(crate) fn resolve_references(
    files: &[UnitFile],
    model: &Model,
    info: &Info,
    catalog: &Catalog,
    config: &AnalysisConfig,
    diagnostics: &mut DiagnosticCollector,
) -> ResourceIndex {
    let mut resolver = Resolver {
        model,
        info,
        catalog,
        entry_name: &config.entry_file_name,
        index: ResourceIndex::default(),
        diagnostics,
    };
    let checked: Vec<&UnitFile> = files.iter().filter(|f| !f.excluded).collect();
    for file in &checked {
        resolver.fields(file);
    }
    for file in &checked {
        resolver.expressions(file);
    }
    tracing::debug!(
        refs = resolver.index.refs.len(),
        bindings = resolver.index.auto_bindings.len(),
        "resource references resolved"
    );
    resolver.index
}

impl Resolver<'_> {
    /// Auto-bindings and misplaced resource fields of a file.
    fn fields(&mut self, file: &UnitFile) {
        let Some(root) = SourceFile::cast(file.syntax()) else {
            return;
        };
        let mut first_block = true;
        for item in root.items() {
            let Item::Var(decl) = item else {
                continue;
            };
            let eligible = file.is_entry && first_block;
            first_block = false;
            for spec in decl.specs() {
                for name in spec.names() {
                    let Some(ident) = name.ident() else {
                        continue;
                    };
                    let range = ident.text_range();
                    let Some(symbol) = self.info.def_at(file.id, range) else {
                        continue;
                    };
                    let sym = self.model.symbol(symbol);
                    let Some(kind) = resource_field_kind(self.model, &sym.ty) else {
                        continue;
                    };
                    if !eligible {
                        self.diagnostics.warning(
                            file.id,
                            range,
                            codes::MISPLACED_AUTO_BINDING,
                            format!(
                                "{} {} is not auto-bound: resource fields must be declared in the first var block of {}",
                                kind.display(),
                                sym.name,
                                self.entry_name
                            ),
                        );
                        continue;
                    }
                    self.auto_binding(file.id, range, symbol, kind);
                }
            }
        }
    }

    fn auto_binding(&mut self, file: FileId, range: TextRange, symbol: SymbolId, kind: ResourceKind) {
        let sym = self.model.symbol(symbol);
        let id = match kind {
            ResourceKind::Sprite => ResourceId::sprite(sym.name.clone()),
            ResourceKind::Sound => ResourceId::sound(sym.name.clone()),
            ResourceKind::Widget => ResourceId::widget(sym.name.clone()),
            _ => return,
        };
        if !self.check_exists(file, range, &id) {
            return;
        }
        tracing::trace!(field = %sym.name, resource = %id, "auto-binding");
        self.index.add(ResourceRef {
            id: id.clone(),
            kind: RefKind::AutoBinding,
            file,
            range,
        });
        for (use_file, use_range) in self.info.use_sites(symbol) {
            self.index.add(ResourceRef {
                id: id.clone(),
                kind: RefKind::AutoBindingReference,
                file: *use_file,
                range: *use_range,
            });
        }
        self.index.auto_bindings.insert(symbol, id);
    }

    /// String literals and constants whose type names a resource.
    fn expressions(&mut self, file: &UnitFile) {
        for node in file.syntax().descendants() {
            match Expr::cast(node) {
                Some(Expr::Literal(lit)) => self.literal(file.id, &lit),
                Some(Expr::NameRef(name)) => self.constant(file.id, &name),
                _ => {}
            }
        }
    }

    fn literal(&mut self, file: FileId, lit: &Literal) {
        if lit.kind() != Some(LiteralKind::String) {
            return;
        }
        let Some(tv) = self.info.type_of(file, lit.syntax()) else {
            return;
        };
        let Some(kind) = self.model.resource_name_kind(&tv.ty) else {
            return;
        };
        let name = lit.string_value().unwrap_or_default();
        self.name_reference(file, lit.syntax(), kind, &name, RefKind::StringLiteral);
    }

    fn constant(&mut self, file: FileId, name: &NameRef) {
        let Some(ident) = name.ident() else {
            return;
        };
        let Some(symbol) = self.info.use_at(file, ident.text_range()) else {
            return;
        };
        if self.model.symbol(symbol).kind != SymbolKind::Const {
            return;
        }
        let Some(tv) = self.info.type_of(file, name.syntax()) else {
            return;
        };
        let Some(kind) = self.model.resource_name_kind(&tv.ty) else {
            return;
        };
        let Some(value) = tv.value.as_ref().and_then(|v| v.as_str()) else {
            return;
        };
        let value = value.to_string();
        self.name_reference(file, name.syntax(), kind, &value, RefKind::ConstantReference);
    }

    fn name_reference(&mut self, file: FileId, node: &SyntaxNode, kind: ResourceKind, name: &str, ref_kind: RefKind) {
        let range = node.text_range();
        let id = if kind.is_sprite_scoped() {
            let Some(sprite) = sprite_context(self.model, self.info, file, node) else {
                tracing::trace!(?range, name, "no sprite context");
                return;
            };
            match kind {
                ResourceKind::SpriteCostume => ResourceId::costume(sprite, name),
                _ => ResourceId::animation(sprite, name),
            }
        } else {
            ResourceId {
                kind,
                sprite: None,
                name: SmolStr::new(name),
            }
        };
        if !self.check_exists(file, range, &id) {
            return;
        }
        self.index.add(ResourceRef {
            id,
            kind: ref_kind,
            file,
            range,
        });
    }

    /// Report an empty or unknown resource name; true when `id` exists.
    fn check_exists(&mut self, file: FileId, range: TextRange, id: &ResourceId) -> bool {
        if id.name.is_empty() {
            self.diagnostics.error(
                file,
                range,
                codes::EMPTY_RESOURCE_NAME,
                format!("{} resource name cannot be empty", id.kind.display()),
            );
            return false;
        }
        if !self.catalog.contains(id) {
            self.diagnostics.error(
                file,
                range,
                codes::RESOURCE_NOT_FOUND,
                format!("{} resource \"{}\" not found", id.kind.display(), id.name),
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::hir::{ProgramUnit, Severity, compile};
    use crate::resource::MemoryAssetReader;

    fn assets(root: &str) -> MemoryAssetReader {
        MemoryAssetReader::new()
            .with_file(format!("{root}/index.json"), r#"{"backdrops":[{"name":"stage"}]}"#)
            .with_file(format!("{root}/sounds/Meow/index.json"), "{}")
            .with_file(
                format!("{root}/sprites/Fido/index.json"),
                r#"{"costumes":[{"name":"jump"}]}"#,
            )
    }

    fn compile_with(files: &[(&str, &str)], reader: &MemoryAssetReader) -> ProgramUnit {
        let files: Vec<(String, String)> = files
            .iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect();
        compile(files, reader, &AnalysisConfig::default(), &CancellationToken::new()).unwrap()
    }

    fn unit(files: &[(&str, &str)]) -> ProgramUnit {
        compile_with(files, &assets("assets"))
    }

    fn messages(unit: &ProgramUnit) -> Vec<String> {
        unit.diagnostics().iter().map(|d| d.message.to_string()).collect()
    }

    #[test]
    fn test_first_block_sprite_field_is_auto_bound() {
        let unit = unit(&[("main.spx", "var (\n\tFido Fido\n)\n"), ("Fido.spx", "")]);
        assert!(unit.diagnostics().is_empty(), "{:?}", messages(&unit));
        let bindings: Vec<_> = unit
            .resources()
            .refs()
            .iter()
            .filter(|r| r.kind == RefKind::AutoBinding)
            .collect();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].id, ResourceId::sprite("Fido"));
        assert_eq!(unit.resources().auto_bindings().count(), 1);
    }

    #[test]
    fn test_field_uses_are_binding_references() {
        let unit = unit(&[
            ("main.spx", "var (\n\tFido Fido\n)\n\nonStart => {\n\tFido.show\n}\n"),
            ("Fido.spx", ""),
        ]);
        assert!(unit.diagnostics().is_empty(), "{:?}", messages(&unit));
        let kinds: Vec<_> = unit
            .resources()
            .references_to(&ResourceId::sprite("Fido"))
            .map(|r| r.kind)
            .collect();
        assert_eq!(kinds, vec![RefKind::AutoBinding, RefKind::AutoBindingReference]);
    }

    #[test]
    fn test_field_outside_first_block_warns() {
        let unit = unit(&[("main.spx", "var (\n\tscore int\n)\n\nvar Meow Sound\n")]);
        let warnings: Vec<_> = unit
            .diagnostics()
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1, "{:?}", messages(&unit));
        assert!(warnings[0].message.contains("first var block"));
        assert_eq!(unit.resources().auto_bindings().count(), 0);
        assert!(unit.resources().refs().is_empty());
    }

    #[test]
    fn test_unknown_sprite_name_is_error() {
        let unit = unit(&[("main.spx", ""), ("Fido.spx", "onClick => {\n\tturnTo \"Ghost\"\n}\n")]);
        assert_eq!(messages(&unit), vec!["sprite resource \"Ghost\" not found".to_string()]);
        assert!(unit.resources().refs().is_empty());
    }

    #[test]
    fn test_known_sound_literal_resolves() {
        let unit = unit(&[("main.spx", "onStart => {\n\tplay \"Meow\"\n}\n")]);
        assert!(unit.diagnostics().is_empty(), "{:?}", messages(&unit));
        let refs = unit.resources().refs();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].id, ResourceId::sound("Meow"));
        assert_eq!(refs[0].kind, RefKind::StringLiteral);
    }

    #[test]
    fn test_constant_reference() {
        let unit = unit(&[("main.spx", "const snd = \"Meow\"\n\nonStart => {\n\tplay snd\n}\n")]);
        assert!(unit.diagnostics().is_empty(), "{:?}", messages(&unit));
        let refs = unit.resources().refs();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, RefKind::ConstantReference);
    }

    #[test]
    fn test_empty_name_is_error() {
        let unit = unit(&[("main.spx", "onStart => {\n\tplay \"\"\n}\n")]);
        assert_eq!(messages(&unit), vec!["sound resource name cannot be empty".to_string()]);
    }

    #[test]
    fn test_costume_resolves_against_receiver_sprite() {
        let unit = unit(&[
            ("main.spx", "var (\n\tFido Fido\n)\n\nonStart => {\n\tFido.setCostume \"sit\"\n}\n"),
            ("Fido.spx", "onClick => {\n\tsetCostume \"jump\"\n}\n"),
        ]);
        assert_eq!(
            messages(&unit),
            vec!["sprite costume resource \"sit\" not found".to_string()]
        );
        let costume = ResourceId::costume("Fido", "jump");
        assert_eq!(unit.resources().references_to(&costume).count(), 1);
    }

    #[test]
    fn test_asset_root_from_run_call() {
        let unit = compile_with(
            &[("main.spx", "onStart => {\n\tplay \"Meow\"\n}\n\nrun \"res\"\n")],
            &assets("res"),
        );
        assert!(unit.diagnostics().is_empty(), "{:?}", messages(&unit));
        assert_eq!(unit.catalog().root, "res");
        assert_eq!(unit.resources().refs().len(), 1);
    }

    #[test]
    fn test_non_constant_asset_root() {
        let unit = unit(&[("main.spx", "root := \"res\"\nrun root\n")]);
        assert_eq!(messages(&unit), vec!["asset root must be a constant string".to_string()]);
        assert_eq!(unit.catalog().root, "assets");
    }
}
