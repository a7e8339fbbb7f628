//! Go-to-definition.

use serde::Serialize;

use super::docs::doc_key;
use super::document;
use crate::base::{Position, Span};
use crate::error::RequestError;
use crate::hir::ProgramUnit;
use crate::resource::ResourceId;

/// Where a name or resource reference leads
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DefinitionTarget {
    /// A declaration in one of the unit's documents
    Source { path: String, span: Span, name: String },
    /// A declaration of a bundled package, or a universe builtin when
    /// `package` is empty
    Builtin { package: String, name: String },
    Resource { id: ResourceId },
}

/// Definitions of the symbol and the resource at `position`.
///
/// An auto-bound variable yields both its declaration and its resource.
pub fn goto_definition(
    unit: &ProgramUnit,
    path: &str,
    position: Position,
) -> Result<Vec<DefinitionTarget>, RequestError> {
    let file = document(unit, path)?;
    if position.line >= file.line_index.line_count() {
        return Ok(Vec::new());
    }
    let offset = file.line_index.offset(position);
    let model = unit.model();
    let mut targets = Vec::new();

    if let Some((_, id)) = unit.info().symbol_at(file.id, offset) {
        let symbol = model.symbol(id);
        if symbol.is_builtin() {
            let (package, name) =
                doc_key(model, symbol).unwrap_or_else(|| (String::new(), symbol.name.to_string()));
            targets.push(DefinitionTarget::Builtin { package, name });
        } else if let Some(def) = &symbol.def
            && let Some(def_file) = unit.file(def.file)
        {
            targets.push(DefinitionTarget::Source {
                path: def_file.path.to_string(),
                span: def_file.line_index.span(def.range),
                name: symbol.name.to_string(),
            });
        }
    }
    if let Some(reference) = unit.resources().ref_at(file.id, offset) {
        targets.push(DefinitionTarget::Resource {
            id: reference.id.clone(),
        });
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::config::AnalysisConfig;
    use crate::hir::compile;
    use crate::resource::MemoryAssetReader;

    const MAIN: &str = "var (\n\tFido Fido\n)\n\nonStart => {\n\tFido.show\n\tplay \"Meow\"\n\tn := len(\"x\")\n\tprintln n\n}\n";

    fn unit() -> ProgramUnit {
        let assets = MemoryAssetReader::new()
            .with_file("assets/sounds/Meow/index.json", "{}")
            .with_file("assets/sprites/Fido/index.json", "{}");
        let files = vec![
            ("main.spx".to_string(), MAIN.to_string()),
            ("Fido.spx".to_string(), String::new()),
        ];
        compile(files, &assets, &AnalysisConfig::default(), &CancellationToken::new()).unwrap()
    }

    fn fido_decl() -> DefinitionTarget {
        DefinitionTarget::Source {
            path: "main.spx".to_string(),
            span: Span::new(Position::new(1, 1), Position::new(1, 5)),
            name: "Fido".to_string(),
        }
    }

    #[test]
    fn test_auto_bound_variable() {
        let targets = goto_definition(&unit(), "main.spx", Position::new(5, 2)).unwrap();
        assert_eq!(
            targets,
            vec![
                fido_decl(),
                DefinitionTarget::Resource {
                    id: ResourceId::sprite("Fido"),
                },
            ]
        );
    }

    #[rstest]
    #[case(Position::new(5, 7), "spx", "SpriteImpl.show")]
    #[case(Position::new(7, 7), "", "len")]
    fn test_builtin_targets(#[case] position: Position, #[case] package: &str, #[case] name: &str) {
        let targets = goto_definition(&unit(), "main.spx", position).unwrap();
        assert_eq!(
            targets,
            vec![DefinitionTarget::Builtin {
                package: package.to_string(),
                name: name.to_string(),
            }]
        );
    }

    #[test]
    fn test_string_literal_resource() {
        let targets = goto_definition(&unit(), "main.spx", Position::new(6, 8)).unwrap();
        assert_eq!(
            targets,
            vec![DefinitionTarget::Resource {
                id: ResourceId::sound("Meow"),
            }]
        );
    }

    #[test]
    fn test_nothing_at_position() {
        let unit = unit();
        assert!(goto_definition(&unit, "main.spx", Position::new(3, 0)).unwrap().is_empty());
        assert!(goto_definition(&unit, "main.spx", Position::new(50, 0)).unwrap().is_empty());
    }
}
