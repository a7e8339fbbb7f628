//! Loading a project directory from disk.

use std::fs;
use std::path::Path;

use spxls::LoadError;
use spxls::base::Position;
use spxls::project::WorkspaceLoader;
use spxls::resource::ResourceId;
use tempfile::TempDir;

use crate::helpers::source_fixtures::*;

fn write(root: &Path, path: &str, text: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "main.spx", GAME_WITH_FIDO);
    write(root, "Fido.spx", FIDO_SPRITE);
    write(root, "README.md", "# game");
    write(root, "assets/index.json", ASSET_INDEX);
    write(root, "assets/sounds/Meow/index.json", "{}");
    write(root, "assets/sprites/Fido/index.json", FIDO_INDEX);
    dir
}

#[test]
fn test_load_project_with_assets() {
    let dir = project();
    let mut host = WorkspaceLoader::new().load(dir.path()).unwrap();
    assert_eq!(host.file_count(), 2);
    assert!(!host.has_file("README.md"));

    let analysis = host.analysis().unwrap();
    assert!(!analysis.has_error(), "{:?}", analysis.unit().diagnostics());
    let catalog = analysis.unit().catalog();
    assert!(catalog.contains(&ResourceId::widget("score")));
    assert!(catalog.contains(&ResourceId::animation("Fido", "dance")));
    assert_eq!(
        analysis.find_resource_references(&ResourceId::costume("Fido", "walk")).len(),
        1
    );
}

#[test]
fn test_missing_asset_tree_reports_unknown_resources() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "main.spx", "onStart => {\n\tplay \"Meow\"\n}\n");
    let mut host = WorkspaceLoader::new().load(dir.path()).unwrap();
    let analysis = host.analysis().unwrap();
    let diagnostics = analysis.diagnostics("main.spx").unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "sound resource \"Meow\" not found");
    assert_eq!(diagnostics[0].span.start, Position::new(1, 6));
}

#[test]
fn test_nested_sources_keep_relative_paths() {
    let dir = project();
    write(dir.path(), "extra/Cat.spx", "onClick => {\n\tstep 1\n}\n");
    let host = WorkspaceLoader::new().load(dir.path()).unwrap();
    assert!(host.has_file("extra/Cat.spx"));
    assert_eq!(host.file_count(), 3);
}

#[test]
fn test_file_instead_of_directory() {
    let dir = project();
    let err = WorkspaceLoader::new().load(dir.path().join("main.spx")).unwrap_err();
    assert!(matches!(err, LoadError::NotADirectory(_)));
}
