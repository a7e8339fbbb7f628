//! Diagnostics of broken and incomplete programs.

use rstest::rstest;
use spxls::base::Position;
use spxls::hir::Severity;
use spxls::{LineIndex, TextSize};

use crate::helpers::source_fixtures::UNTERMINATED_STRING;
use crate::helpers::unit_helpers::*;

#[test]
fn test_unterminated_string_reports_error_after_literal() {
    let unit = unit_from_sources(&[("main.spx", UNTERMINATED_STRING)]);
    assert!(unit.has_error());

    let literal_start = TextSize::new(UNTERMINATED_STRING.find('"').unwrap() as u32);
    let errors: Vec<_> = unit
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|d| d.range.start() >= literal_start));
}

#[test]
fn test_broken_file_keeps_other_files_checked() {
    let unit = unit_from_sources(&[
        ("main.spx", UNTERMINATED_STRING),
        ("Fido.spx", "onClick => {\n\tmissingThing\n}\n"),
    ]);
    let fido = unit.file_by_path("Fido.spx").unwrap().id;
    let fido_messages: Vec<_> = unit
        .diagnostics_for(fido)
        .map(|d| d.message.to_string())
        .collect();
    assert!(
        fido_messages.iter().any(|m| m == "undefined: missingThing"),
        "{fido_messages:?}"
    );
}

#[test]
fn test_recompiling_unchanged_files_is_idempotent() {
    let files = [
        ("main.spx", "onStart => {\n\tplay \"Ghost\"\n\tx := y\n}\n"),
        ("Fido.spx", UNTERMINATED_STRING),
    ];
    let first = unit_from_sources(&files);
    let second = unit_from_sources(&files);
    assert!(!first.diagnostics().is_empty());
    assert_eq!(first.diagnostics(), second.diagnostics());
}

#[test]
fn test_unit_without_entry_is_still_returned() {
    let unit = unit_from_sources(&[("Fido.spx", "onClick => {\n\tstep 10\n}\n")]);
    assert!(!unit.has_entry());
    assert_eq!(unit.files().len(), 1);
}

#[test]
fn test_diagnostic_columns_count_utf16_units() {
    let source = "onStart => {\n\tprintln \"😀\", undefinedThing\n}\n";
    let mut host = host_from_sources(&[("main.spx", source)]);
    let analysis = host.analysis().unwrap();
    let diagnostics = analysis.diagnostics("main.spx").unwrap();
    let undefined = diagnostics
        .iter()
        .find(|d| d.message == "undefined: undefinedThing")
        .expect("undefined identifier is reported");
    assert_eq!(undefined.span.start, Position::new(1, 15));
    assert_eq!(undefined.span.end, Position::new(1, 29));
}

#[rstest]
#[case("ascii", 5)]
#[case("é", 1)]
#[case("中", 1)]
#[case("😀", 2)]
fn test_position_round_trip(#[case] text: &str, #[case] column: u32) {
    let source = format!("x\n{text}y\n");
    let index = LineIndex::new(source.as_str());
    let y = TextSize::new(source.find('y').unwrap() as u32);
    let position = index.position(y);
    assert_eq!(position, Position::new(1, column));
    assert_eq!(index.offset(position), y);
}
