//! Resource resolution and auto-binding across a whole unit.

use spxls::hir::Severity;
use spxls::resource::{RefKind, ResourceId};

use crate::helpers::source_fixtures::*;
use crate::helpers::unit_helpers::*;

#[test]
fn test_first_block_sprite_field_binds_to_catalog_sprite() {
    let unit = unit_from_sources(&[("main.spx", "var (\n\tFido Fido\n)\n"), ("Fido.spx", "")]);
    assert_clean(&unit);

    let fido = ResourceId::sprite("Fido");
    let bindings: Vec<_> = unit
        .resources()
        .references_to(&fido)
        .filter(|r| r.kind == RefKind::AutoBinding)
        .collect();
    assert_eq!(bindings.len(), 1);
    assert_eq!(unit.resources().auto_bindings().count(), 1);
}

#[test]
fn test_game_and_sprite_references_resolve() {
    let unit = unit_from_sources(&[("main.spx", GAME_WITH_FIDO), ("Fido.spx", FIDO_SPRITE)]);
    assert_clean(&unit);

    let resources = unit.resources();
    let meow: Vec<_> = resources
        .references_to(&ResourceId::sound("Meow"))
        .map(|r| r.kind)
        .collect();
    assert_eq!(meow, vec![RefKind::AutoBinding, RefKind::AutoBindingReference]);

    for id in [
        ResourceId::costume("Fido", "jump"),
        ResourceId::costume("Fido", "walk"),
        ResourceId::animation("Fido", "dance"),
    ] {
        let refs: Vec<_> = resources.references_to(&id).collect();
        assert_eq!(refs.len(), 1, "{id:?}");
        assert_eq!(refs[0].kind, RefKind::StringLiteral);
    }
}

#[test]
fn test_unknown_sprite_name_reports_not_found() {
    let unit = unit_from_sources(&[
        ("main.spx", ""),
        ("Fido.spx", "onClick => {\n\tturnTo \"Ghost\"\n}\n"),
    ]);
    let errors: Vec<_> = unit
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1, "{:?}", messages(&unit));
    assert!(errors[0].message.contains("not found"));
    assert!(unit.resources().references_to(&ResourceId::sprite("Ghost")).next().is_none());
}

#[test]
fn test_field_outside_first_block_is_not_bound() {
    let unit = unit_from_sources(&[(
        "main.spx",
        "var (\n\tscore int\n)\n\nvar Meow Sound\n\nonStart => {\n\tplay Meow\n}\n",
    )]);
    assert_eq!(count_with_severity(&unit, Severity::Warning), 1, "{:?}", messages(&unit));
    assert_eq!(unit.resources().auto_bindings().count(), 0);
    assert!(unit.resources().references_to(&ResourceId::sound("Meow")).next().is_none());
}

#[test]
fn test_asset_root_follows_run_call() {
    let unit = unit_with_assets(
        &[("main.spx", "onStart => {\n\tplay \"Meow\"\n}\n\nrun \"res\"\n")],
        &assets_under("res"),
    );
    assert_clean(&unit);
    assert_eq!(unit.catalog().root, "res");
}

#[test]
fn test_widget_and_backdrop_names() {
    let unit = unit_from_sources(&[(
        "main.spx",
        "onStart => {\n\tsetBackdrop \"stage\"\n\tm := getWidget(\"score\")\n\t_ = m\n}\n",
    )]);
    assert_clean(&unit);
    assert_eq!(unit.resources().references_to(&ResourceId::backdrop("stage")).count(), 1);
    assert_eq!(unit.resources().references_to(&ResourceId::widget("score")).count(), 1);
}

#[test]
fn test_broken_sprite_asset_keeps_other_references() {
    let assets = standard_assets().with_file("assets/sprites/Broken/index.json", "not json");
    let unit = unit_with_assets(&[("main.spx", GAME_WITH_FIDO), ("Fido.spx", FIDO_SPRITE)], &assets);
    let errors = messages(&unit);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("sprites/Broken/index.json"));
    assert!(unit.catalog().contains(&ResourceId::costume("Fido", "jump")));
    assert_eq!(unit.resources().references_to(&ResourceId::sound("Meow")).count(), 2);
}
