//! Documentation for bundled declarations.
//!
//! Docs only decorate completion items; nothing else reads them.

use std::sync::Arc;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::hir::prelude::{leading_comment, prelude_files};
use crate::hir::{Model, Symbol};
use crate::parser::{AstNode, Item, SourceFile, SyntaxNode};

/// Source of doc comments, keyed by package path and symbol name.
///
/// Methods and fields are keyed `Type.name`, e.g. `Game.play`.
pub trait DocProvider: Send + Sync {
    fn documentation(&self, package: &str, name: &str) -> Option<Arc<str>>;
}

/// Provider without any documentation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDocs;

impl DocProvider for NoDocs {
    fn documentation(&self, _package: &str, _name: &str) -> Option<Arc<str>> {
        None
    }
}

/// Serves the comments written above declarations of the bundled packages.
#[derive(Clone, Copy, Debug, Default)]
pub struct PreludeDocs;

static PRELUDE_DOCS: Lazy<FxHashMap<(String, String), Arc<str>>> = Lazy::new(collect_prelude_docs);

impl DocProvider for PreludeDocs {
    fn documentation(&self, package: &str, name: &str) -> Option<Arc<str>> {
        PRELUDE_DOCS
            .get(&(package.to_string(), name.to_string()))
            .cloned()
    }
}

fn collect_prelude_docs() -> FxHashMap<(String, String), Arc<str>> {
    let mut docs = FxHashMap::default();
    for file in prelude_files() {
        let Some(root) = SourceFile::cast(file.syntax()) else {
            continue;
        };
        let mut add = |name: String, node: &SyntaxNode| {
            if let Some(doc) = leading_comment(node) {
                // Overloads keep the comment of the first declaration.
                docs.entry((file.package.to_string(), name))
                    .or_insert_with(|| Arc::from(doc));
            }
        };
        for item in root.items() {
            match item {
                Item::Func(func) => {
                    let Some(name) = func.name().and_then(|n| n.text()) else {
                        continue;
                    };
                    let receiver = func
                        .receiver()
                        .and_then(|r| r.param())
                        .and_then(|p| p.ty())
                        .map(|ty| ty.syntax().text().to_string());
                    let key = match receiver {
                        Some(ty) => format!("{}.{}", ty.trim_start_matches('*'), name),
                        None => name.to_string(),
                    };
                    add(key, func.syntax());
                }
                Item::Type(decl) => {
                    if let Some(name) = decl.name().and_then(|n| n.text()) {
                        add(name.to_string(), decl.syntax());
                    }
                }
                Item::Const(decl) => {
                    for spec in decl.specs() {
                        for name in spec.names().filter_map(|n| n.text()) {
                            add(name.to_string(), spec.syntax());
                            add(name.to_string(), decl.syntax());
                        }
                    }
                }
                Item::Var(decl) => {
                    for spec in decl.specs() {
                        for name in spec.names().filter_map(|n| n.text()) {
                            add(name.to_string(), spec.syntax());
                            add(name.to_string(), decl.syntax());
                        }
                    }
                }
                Item::Import(_) | Item::Stmt(_) => {}
            }
        }
    }
    tracing::debug!(entries = docs.len(), "collected bundled docs");
    docs
}

/// Package path and doc name of a bundled symbol.
pub fn doc_key(model: &Model, symbol: &Symbol) -> Option<(String, String)> {
    if !symbol.is_builtin() || symbol.package.is_empty() {
        return None;
    }
    let name = match symbol.owner {
        Some(owner) => format!("{}.{}", model.named(owner).name, symbol.name),
        None => symbol.name.to_string(),
    };
    Some((symbol.package.to_string(), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_docs() {
        let doc = PreludeDocs.documentation("spx", "HSB").expect("HSB doc");
        assert!(doc.contains("hue"));
    }

    #[test]
    fn test_method_docs_are_keyed_by_receiver() {
        let doc = PreludeDocs.documentation("spx", "SpriteImpl.setPenColor");
        assert_eq!(doc.as_deref(), Some("setPenColor sets the color of the pen."));
        assert!(PreludeDocs.documentation("spx", "setPenColor").is_none());
    }

    #[test]
    fn test_unknown_names() {
        assert!(PreludeDocs.documentation("spx", "NoSuchThing").is_none());
        assert!(NoDocs.documentation("spx", "HSB").is_none());
    }
}
