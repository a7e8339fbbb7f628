//! Resource references for the rename front end.

use serde::Serialize;

use super::document;
use crate::base::{Position, Span};
use crate::error::RequestError;
use crate::hir::ProgramUnit;
use crate::resource::{RefKind, ResourceId};

/// A place in a document that names a resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceLocation {
    pub path: String,
    pub span: Span,
    pub kind: RefKind,
}

/// Every reference to `id` across the unit, in reference-index order.
pub fn find_resource_references(unit: &ProgramUnit, id: &ResourceId) -> Vec<ResourceLocation> {
    unit.resources()
        .references_to(id)
        .filter_map(|r| {
            let file = unit.file(r.file)?;
            Some(ResourceLocation {
                path: file.path.to_string(),
                span: file.line_index.span(r.range),
                kind: r.kind,
            })
        })
        .collect()
}

/// The resource referenced at `position`, if any.
pub fn resource_at(
    unit: &ProgramUnit,
    path: &str,
    position: Position,
) -> Result<Option<ResourceId>, RequestError> {
    let file = document(unit, path)?;
    if position.line >= file.line_index.line_count() {
        return Ok(None);
    }
    let offset = file.line_index.offset(position);
    Ok(unit
        .resources()
        .ref_at(file.id, offset)
        .map(|r| r.id.clone()))
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::config::AnalysisConfig;
    use crate::hir::compile;
    use crate::resource::MemoryAssetReader;

    fn unit() -> ProgramUnit {
        let assets = MemoryAssetReader::new()
            .with_file("assets/sounds/Meow/index.json", "{}")
            .with_file("assets/sprites/Fido/index.json", "{}");
        let files = vec![
            (
                "main.spx".to_string(),
                "var (\n\tFido Fido\n\tMeow Sound\n)\n\nonStart => {\n\tplay \"Meow\"\n\tplay Meow\n}\n"
                    .to_string(),
            ),
            ("Fido.spx".to_string(), "onClick => {\n\tplay \"Meow\"\n}\n".to_string()),
        ];
        compile(files, &assets, &AnalysisConfig::default(), &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_references_across_files() {
        let unit = unit();
        let refs = find_resource_references(&unit, &ResourceId::sound("Meow"));
        let kinds: Vec<_> = refs.iter().map(|r| r.kind).collect();
        assert_eq!(refs.len(), 4);
        assert!(kinds.contains(&RefKind::AutoBinding));
        assert!(kinds.contains(&RefKind::AutoBindingReference));
        assert_eq!(
            kinds.iter().filter(|k| **k == RefKind::StringLiteral).count(),
            2
        );
        assert!(refs.iter().any(|r| r.path == "Fido.spx"));
    }

    #[test]
    fn test_resource_at_position() {
        let unit = unit();
        assert_eq!(
            resource_at(&unit, "main.spx", Position::new(6, 8)).unwrap(),
            Some(ResourceId::sound("Meow"))
        );
        assert_eq!(resource_at(&unit, "main.spx", Position::new(5, 2)).unwrap(), None);
        assert_eq!(resource_at(&unit, "main.spx", Position::new(99, 0)).unwrap(), None);
        assert!(resource_at(&unit, "Ghost.spx", Position::new(0, 0)).is_err());
    }

    #[test]
    fn test_unreferenced_resource() {
        let unit = unit();
        assert!(find_resource_references(&unit, &ResourceId::backdrop("stage")).is_empty());
    }
}
