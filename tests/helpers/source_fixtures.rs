//! Common source and asset fixtures for tests.

use spxls::resource::MemoryAssetReader;

/// Asset index with one backdrop, the Fido sprite and a score monitor.
pub const ASSET_INDEX: &str =
    r#"{"backdrops":[{"name":"stage"}],"zorder":["Fido",{"type":"monitor","name":"score"}]}"#;

pub const FIDO_INDEX: &str =
    r#"{"costumes":[{"name":"jump"},{"name":"walk"}],"fAnimations":{"dance":{}}}"#;

pub const GAME_WITH_FIDO: &str = r#"var (
	Fido Fido
	Meow Sound
)

onStart => {
	play Meow
	Fido.setCostume "walk"
}
"#;

pub const FIDO_SPRITE: &str = r#"onClick => {
	setCostume "jump"
	animate "dance"
	setPenColor HSB(255, 0, 0)
}
"#;

pub const UNTERMINATED_STRING: &str = "onStart => {\n\tprintln \"hello\n}\n";

/// The standard asset pack under `assets/`.
pub fn standard_assets() -> MemoryAssetReader {
    assets_under("assets")
}

/// The standard asset pack under `root`.
pub fn assets_under(root: &str) -> MemoryAssetReader {
    MemoryAssetReader::new()
        .with_file(format!("{root}/index.json"), ASSET_INDEX)
        .with_file(format!("{root}/sounds/Meow/index.json"), "{}")
        .with_file(format!("{root}/sprites/Fido/index.json"), FIDO_INDEX)
}
