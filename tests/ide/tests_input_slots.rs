//! Input slots of whole documents.

use spxls::base::Position;
use spxls::ide::{ColorValue, InputKind, InputSlot, InputType, InputValue, SlotKind};

use crate::helpers::source_fixtures::*;
use crate::helpers::unit_helpers::*;

fn document_slots(files: &[(&str, &str)], path: &str) -> Vec<InputSlot> {
    let mut host = host_from_sources(files);
    let analysis = host.analysis().unwrap();
    analysis.input_slots(path).unwrap()
}

#[test]
fn test_hsb_constructor_is_one_color_slot() {
    let slots = document_slots(
        &[("main.spx", ""), ("Fido.spx", "onClick => {\n\tsetPenColor HSB(255, 0, 0)\n}\n")],
        "Fido.spx",
    );
    assert_eq!(slots.len(), 1);
    let slot = &slots[0];
    assert_eq!(slot.kind, SlotKind::Value);
    assert_eq!(slot.accept.ty, InputType::Color);
    assert_eq!(slot.input.kind, InputKind::InPlace);
    assert_eq!(
        slot.input.value,
        Some(InputValue::Color(ColorValue {
            constructor: "HSB".to_string(),
            args: vec![255.0, 0.0, 0.0],
        }))
    );
}

#[test]
fn test_slots_are_deterministic_and_disjoint() {
    let files = [("main.spx", GAME_WITH_FIDO), ("Fido.spx", FIDO_SPRITE)];
    let first = document_slots(&files, "Fido.spx");
    let second = document_slots(&files, "Fido.spx");
    assert_eq!(first, second);
    assert!(!first.is_empty());

    for pair in first.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.span.start <= b.span.start);
        assert!(a.span.end <= b.span.start, "{a:?} overlaps {b:?}");
    }
}

#[test]
fn test_slot_json_shape() {
    let slots = document_slots(
        &[("main.spx", ""), ("Fido.spx", "onClick => {\n\tsay \"hi\"\n}\n")],
        "Fido.spx",
    );
    let json = serde_json::to_value(&slots[0]).unwrap();
    assert_eq!(json["kind"], "value");
    assert_eq!(json["input"]["value"]["type"], "string");
    assert_eq!(json["input"]["value"]["value"], "hi");
    assert_eq!(json["span"]["start"], serde_json::json!({"line": 1, "character": 5}));
    assert_eq!(slots[0].span.start, Position::new(1, 5));
}

#[test]
fn test_unknown_document_is_request_error() {
    let mut host = host_from_sources(&[("main.spx", "")]);
    let analysis = host.analysis().unwrap();
    assert!(analysis.input_slots("Nope.spx").is_err());
    assert!(analysis.input_slots("notes.txt").is_err());
}
