//! Completion through the analysis host.

use spxls::base::Position;
use spxls::hir::Type;
use spxls::ide::{CompletionItem, CompletionKind};

use crate::helpers::unit_helpers::*;

fn complete(files: &[(&str, &str)], path: &str, line: u32, column: u32) -> Vec<CompletionItem> {
    let mut host = host_from_sources(files);
    let analysis = host.analysis().unwrap();
    analysis.completions(path, Position::new(line, column)).unwrap()
}

#[test]
fn test_sound_argument_candidates_are_compatible() {
    let source = "var (\n\tcount int\n\ttitle string\n\tMeow Sound\n)\n\nonStart => {\n\tplay \n}\n";
    let mut host = host_from_sources(&[("main.spx", source)]);
    let analysis = host.analysis().unwrap();
    let items = analysis.completions("main.spx", Position::new(7, 6)).unwrap();
    let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"title"));
    assert!(labels.contains(&"Meow"));
    assert!(!labels.contains(&"count"));

    let model = analysis.unit().model();
    let expected: Vec<Type> = ["SoundName", "Sound"]
        .iter()
        .filter_map(|name| model.package_type("spx", name).map(Type::Named))
        .collect();
    assert_eq!(expected.len(), 2);
    for item in &items {
        if !matches!(item.kind, CompletionKind::Variable | CompletionKind::Constant) {
            continue;
        }
        let ty = &model.symbol(item.symbol.unwrap()).ty;
        assert!(
            expected.iter().any(|to| model.assignable(ty, to)),
            "{} is not assignable to a sound",
            item.label
        );
    }
}

#[test]
fn test_no_duplicate_resource_candidates() {
    let source = "var (\n\tMeow Sound\n)\n\nonStart => {\n\tplay \"Meow\"\n\tplay \n}\n";
    let items = complete(&[("main.spx", source)], "main.spx", 6, 6);
    let mut resources: Vec<_> = items.iter().filter_map(|i| i.resource.clone()).collect();
    let total = resources.len();
    resources.sort_by_key(|id| id.to_locator());
    resources.dedup();
    assert_eq!(resources.len(), total);
    assert!(total >= 1);
}

#[test]
fn test_costume_names_inside_string() {
    let items = complete(
        &[("main.spx", ""), ("Fido.spx", "onClick => {\n\tsetCostume \"\"\n}\n")],
        "Fido.spx",
        1,
        13,
    );
    let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["jump", "walk"]);
    assert!(items.iter().all(|i| i.kind == CompletionKind::Resource));
}
