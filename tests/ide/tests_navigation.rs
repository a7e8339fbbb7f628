//! Go-to-definition and resource references across documents.

use spxls::base::Position;
use spxls::ide::DefinitionTarget;
use spxls::resource::{RefKind, ResourceId};

use crate::helpers::source_fixtures::*;
use crate::helpers::unit_helpers::*;

#[test]
fn test_auto_bound_field_leads_to_declaration_and_resource() {
    let mut host = host_from_sources(&[("main.spx", GAME_WITH_FIDO), ("Fido.spx", FIDO_SPRITE)]);
    let analysis = host.analysis().unwrap();
    // `Fido` in `Fido.setCostume "walk"`
    let targets = analysis.goto_definition("main.spx", Position::new(7, 2)).unwrap();
    assert_eq!(targets.len(), 2, "{targets:?}");
    assert!(matches!(
        &targets[0],
        DefinitionTarget::Source { path, name, span } if path == "main.spx" && name == "Fido" && span.start == Position::new(1, 1)
    ));
    assert_eq!(
        targets[1],
        DefinitionTarget::Resource {
            id: ResourceId::sprite("Fido")
        }
    );
}

#[test]
fn test_costume_literal_leads_to_resource() {
    let mut host = host_from_sources(&[("main.spx", GAME_WITH_FIDO), ("Fido.spx", FIDO_SPRITE)]);
    let analysis = host.analysis().unwrap();
    let position = Position::new(1, 13);
    assert_eq!(
        analysis.resource_at("Fido.spx", position).unwrap(),
        Some(ResourceId::costume("Fido", "jump"))
    );
    assert_eq!(
        analysis.goto_definition("Fido.spx", position).unwrap(),
        vec![DefinitionTarget::Resource {
            id: ResourceId::costume("Fido", "jump")
        }]
    );
}

#[test]
fn test_sound_references_across_documents() {
    let mut host = host_from_sources(&[
        ("main.spx", GAME_WITH_FIDO),
        ("Fido.spx", "onClick => {\n\tplay \"Meow\"\n}\n"),
    ]);
    let analysis = host.analysis().unwrap();
    let locations = analysis.find_resource_references(&ResourceId::sound("Meow"));
    let mut found: Vec<_> = locations.iter().map(|l| (l.kind, l.path.as_str())).collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            (RefKind::StringLiteral, "Fido.spx"),
            (RefKind::AutoBinding, "main.spx"),
            (RefKind::AutoBindingReference, "main.spx"),
        ]
    );
}

#[test]
fn test_position_past_end_has_no_definition() {
    let mut host = host_from_sources(&[("main.spx", GAME_WITH_FIDO)]);
    let analysis = host.analysis().unwrap();
    assert!(analysis.goto_definition("main.spx", Position::new(99, 0)).unwrap().is_empty());
    assert_eq!(analysis.resource_at("main.spx", Position::new(99, 0)).unwrap(), None);
}
