//! The command surface through the analysis host.

use rstest::rstest;
use serde_json::json;
use spxls::CommandError;
use spxls::ide::{COMMANDS, GET_DIAGNOSTICS, GET_INPUT_SLOTS, GET_RESOURCE_REFERENCES};

use crate::helpers::source_fixtures::*;
use crate::helpers::unit_helpers::*;

#[test]
fn test_unknown_command() {
    let mut host = host_from_sources(&[("main.spx", "")]);
    let analysis = host.analysis().unwrap();
    let err = analysis.execute_command("spx.renameResources", &[]).unwrap_err();
    assert!(matches!(err, CommandError::UnknownCommand(_)));
    assert_eq!(err.to_string(), "unknown command: spx.renameResources");
}

#[test]
fn test_every_listed_command_is_known() {
    let mut host = host_from_sources(&[("main.spx", "")]);
    let analysis = host.analysis().unwrap();
    for command in COMMANDS {
        let result = analysis.execute_command(command, &[]);
        assert!(
            !matches!(result, Err(CommandError::UnknownCommand(_))),
            "{command} should be known"
        );
    }
}

#[rstest]
#[case(0)]
#[case(2)]
fn test_input_slots_need_one_document(#[case] count: usize) {
    let mut host = host_from_sources(&[("main.spx", ""), ("Fido.spx", "")]);
    let analysis = host.analysis().unwrap();
    let args: Vec<_> = ["main.spx", "Fido.spx"]
        .iter()
        .take(count)
        .map(|path| json!({ "path": path }))
        .collect();
    let err = analysis.execute_command(GET_INPUT_SLOTS, &args).unwrap_err();
    assert_eq!(err.to_string(), format!("expected exactly one document, got {count}"));
}

#[test]
fn test_resource_references_command() {
    let mut host = host_from_sources(&[("main.spx", GAME_WITH_FIDO), ("Fido.spx", FIDO_SPRITE)]);
    let analysis = host.analysis().unwrap();
    let result = analysis
        .execute_command(
            GET_RESOURCE_REFERENCES,
            &[json!("spx://resources/sprites/Fido/costumes/jump")],
        )
        .unwrap();
    let locations = result.as_array().unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0]["path"], "Fido.spx");
    assert_eq!(locations[0]["kind"], "StringLiteral");
}

#[test]
fn test_diagnostics_command_reports_per_document() {
    let mut host = host_from_sources(&[("main.spx", UNTERMINATED_STRING), ("Fido.spx", "")]);
    let analysis = host.analysis().unwrap();
    let result = analysis
        .execute_command(GET_DIAGNOSTICS, &[json!({"path": "main.spx"}), json!({"path": "Fido.spx"})])
        .unwrap();
    let reports = result.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["path"], "main.spx");
    assert!(!reports[0]["diagnostics"].as_array().unwrap().is_empty());
    assert!(reports[1]["diagnostics"].as_array().unwrap().is_empty());
}

#[test]
fn test_malformed_locator_is_rejected() {
    let mut host = host_from_sources(&[("main.spx", "")]);
    let analysis = host.analysis().unwrap();
    let err = analysis
        .execute_command(GET_RESOURCE_REFERENCES, &[json!("file:///tmp/x")])
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidArguments { .. }));
}

#[test]
fn test_edits_are_visible_to_the_next_analysis() {
    let mut host = host_from_sources(&[("main.spx", UNTERMINATED_STRING)]);
    assert!(host.analysis().unwrap().has_error());
    host.set_file_content("main.spx", "onStart => {\n\tprintln \"hello\"\n}\n");
    assert!(!host.analysis().unwrap().has_error());
}
