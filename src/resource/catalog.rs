//! The asset catalog: which backdrops, sounds, sprites and widgets exist.
//!
//! ```text
//! <root>/index.json                 backdrops and z-order (sprites, widgets)
//! <root>/sounds/<name>/index.json
//! <root>/sprites/<name>/index.json  costumes and animations
//! ```

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use smol_str::SmolStr;
use walkdir::WalkDir;

use super::{ResourceId, ResourceKind};
use crate::error::AssetError;

// ============================================================================
// READERS
// ============================================================================

/// Read-only access to the asset tree.
///
/// Paths are `/`-separated and relative to the project directory.
pub trait AssetReader {
    /// Contents of a file, or `None` when it does not exist.
    fn read_file(&self, path: &str) -> Result<Option<String>, AssetError>;

    /// Names of the direct subdirectories of `path`, sorted.
    fn list_dirs(&self, path: &str) -> Result<Vec<String>, AssetError>;
}

/// Reads assets from a project directory on disk.
#[derive(Clone, Debug)]
pub struct DiskAssetReader {
    root: PathBuf,
}

impl DiskAssetReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl AssetReader for DiskAssetReader {
    fn read_file(&self, path: &str) -> Result<Option<String>, AssetError> {
        let full = self.resolve(path);
        match std::fs::read_to_string(&full) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AssetError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    fn list_dirs(&self, path: &str) -> Result<Vec<String>, AssetError> {
        let dir = self.resolve(path);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| AssetError::Io {
                path: path.to_string(),
                source: err.into(),
            })?;
            if entry.file_type().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Assets held in memory, keyed by path.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssetReader {
    files: FxHashMap<String, String>,
}

impl MemoryAssetReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl AssetReader for MemoryAssetReader {
    fn read_file(&self, path: &str) -> Result<Option<String>, AssetError> {
        Ok(self.files.get(path).cloned())
    }

    fn list_dirs(&self, path: &str) -> Result<Vec<String>, AssetError> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let mut names: Vec<String> = self
            .files
            .keys()
            .filter_map(|file| file.strip_prefix(&prefix))
            .filter_map(|rest| rest.split_once('/').map(|(dir, _)| dir.to_string()))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// Costumes and animations of one sprite
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpriteAsset {
    pub costumes: IndexSet<SmolStr>,
    pub animations: IndexSet<SmolStr>,
}

/// An asset file that could not be read or parsed and was left out
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedAsset {
    pub path: String,
    pub message: String,
}

/// Every resource of a project, in asset-tree order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Asset root the catalog was loaded from
    pub root: String,
    pub backdrops: IndexSet<SmolStr>,
    pub sounds: IndexSet<SmolStr>,
    pub sprites: IndexMap<SmolStr, SpriteAsset>,
    pub widgets: IndexSet<SmolStr>,
    /// Broken asset files; everything else is still loaded
    pub skipped: Vec<SkippedAsset>,
}

impl Catalog {
    pub fn empty(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Whether the resource exists.
    pub fn contains(&self, id: &ResourceId) -> bool {
        let sprite = || id.sprite.as_ref().and_then(|s| self.sprites.get(s));
        match id.kind {
            ResourceKind::Backdrop => self.backdrops.contains(&id.name),
            ResourceKind::Sound => self.sounds.contains(&id.name),
            ResourceKind::Sprite => self.sprites.contains_key(&id.name),
            ResourceKind::Widget => self.widgets.contains(&id.name),
            ResourceKind::SpriteCostume => sprite().is_some_and(|s| s.costumes.contains(&id.name)),
            ResourceKind::SpriteAnimation => {
                sprite().is_some_and(|s| s.animations.contains(&id.name))
            }
        }
    }

    /// Resources of `kind`; costumes and animations need their sprite.
    pub fn ids(&self, kind: ResourceKind, sprite: Option<&str>) -> Vec<ResourceId> {
        match kind {
            ResourceKind::Backdrop => self.backdrops.iter().map(|n| ResourceId::backdrop(n.clone())).collect(),
            ResourceKind::Sound => self.sounds.iter().map(|n| ResourceId::sound(n.clone())).collect(),
            ResourceKind::Sprite => self.sprites.keys().map(|n| ResourceId::sprite(n.clone())).collect(),
            ResourceKind::Widget => self.widgets.iter().map(|n| ResourceId::widget(n.clone())).collect(),
            ResourceKind::SpriteCostume | ResourceKind::SpriteAnimation => {
                let Some((name, asset)) = sprite.and_then(|s| self.sprites.get_key_value(s)) else {
                    return Vec::new();
                };
                if kind == ResourceKind::SpriteCostume {
                    asset
                        .costumes
                        .iter()
                        .map(|c| ResourceId::costume(name.clone(), c.clone()))
                        .collect()
                } else {
                    asset
                        .animations
                        .iter()
                        .map(|a| ResourceId::animation(name.clone(), a.clone()))
                        .collect()
                }
            }
        }
    }

    fn skip(&mut self, err: AssetError) {
        tracing::warn!(error = %err, "skipping asset file");
        self.skipped.push(SkippedAsset {
            path: err.path().to_string(),
            message: err.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.backdrops.is_empty()
            && self.sounds.is_empty()
            && self.sprites.is_empty()
            && self.widgets.is_empty()
    }
}

// ============================================================================
// LOADING
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndexJson {
    backdrops: Vec<NamedJson>,
    zorder: Vec<ZorderJson>,
}

#[derive(Debug, Deserialize)]
struct NamedJson {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZorderJson {
    Sprite(String),
    Widget {
        #[serde(rename = "type")]
        kind: String,
        name: String,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpriteJson {
    costumes: Vec<NamedJson>,
    #[serde(rename = "fAnimations")]
    animations: IndexMap<String, serde_json::Value>,
}

fn parse_json<T: for<'de> Deserialize<'de>>(path: &str, text: &str) -> Result<T, AssetError> {
    serde_json::from_str(text).map_err(|source| AssetError::Json {
        path: path.to_string(),
        source,
    })
}

/// Load the catalog rooted at `root`.
///
/// A missing asset tree is an empty catalog. Unreadable or malformed files
/// are recorded in [`Catalog::skipped`]; only a failure to list the tree is
/// an error.
pub fn load_catalog(reader: &dyn AssetReader, root: &str) -> Result<Catalog, AssetError> {
    let root = root.trim_end_matches('/');
    let mut catalog = Catalog::empty(root);
    let join = |rest: &str| {
        if root.is_empty() {
            rest.to_string()
        } else {
            format!("{root}/{rest}")
        }
    };

    let index_path = join("index.json");
    let mut zorder_sprites = Vec::new();
    match reader
        .read_file(&index_path)
        .and_then(|text| text.map(|t| parse_json::<IndexJson>(&index_path, &t)).transpose())
    {
        Ok(Some(index)) => {
            catalog.backdrops = index.backdrops.into_iter().map(|b| SmolStr::new(b.name)).collect();
            for entry in index.zorder {
                match entry {
                    ZorderJson::Sprite(name) => zorder_sprites.push(name),
                    ZorderJson::Widget { kind, name } => {
                        tracing::trace!(%kind, %name, "widget");
                        catalog.widgets.insert(SmolStr::new(name));
                    }
                }
            }
        }
        Ok(None) => tracing::debug!(path = %index_path, "no asset index"),
        Err(err) => catalog.skip(err),
    }

    for name in reader.list_dirs(&join("sounds"))? {
        catalog.sounds.insert(SmolStr::new(name));
    }

    for name in reader.list_dirs(&join("sprites"))? {
        let path = join(&format!("sprites/{name}/index.json"));
        let sprite = match reader
            .read_file(&path)
            .and_then(|text| text.map(|t| parse_json::<SpriteJson>(&path, &t)).transpose())
        {
            Ok(Some(sprite)) => sprite,
            Ok(None) => continue,
            Err(err) => {
                catalog.skip(err);
                continue;
            }
        };
        let asset = SpriteAsset {
            costumes: sprite.costumes.into_iter().map(|c| SmolStr::new(c.name)).collect(),
            animations: sprite.animations.into_keys().map(SmolStr::new).collect(),
        };
        catalog.sprites.insert(SmolStr::new(name), asset);
    }

    for name in zorder_sprites.iter().filter(|n| !catalog.sprites.contains_key(n.as_str())) {
        tracing::debug!(sprite = %name, "z-order names a sprite without assets");
    }

    tracing::debug!(
        root,
        backdrops = catalog.backdrops.len(),
        sounds = catalog.sounds.len(),
        sprites = catalog.sprites.len(),
        widgets = catalog.widgets.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Load the catalog from a project directory on disk.
pub fn load_catalog_from_dir(dir: &Path, root: &str) -> Result<Catalog, AssetError> {
    load_catalog(&DiskAssetReader::new(dir), root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> MemoryAssetReader {
        MemoryAssetReader::new()
            .with_file(
                "assets/index.json",
                r#"{"backdrops":[{"name":"stage"}],"zorder":["Fido",{"type":"monitor","name":"score"}]}"#,
            )
            .with_file("assets/sounds/Meow/index.json", "{}")
            .with_file(
                "assets/sprites/Fido/index.json",
                r#"{"costumes":[{"name":"jump"},{"name":"sit"}],"fAnimations":{"walk":{}}}"#,
            )
    }

    #[test]
    fn test_load_catalog() {
        let catalog = load_catalog(&sample(), "assets").unwrap();
        assert_eq!(catalog.root, "assets");
        assert!(catalog.backdrops.contains("stage"));
        assert!(catalog.sounds.contains("Meow"));
        assert!(catalog.widgets.contains("score"));
        let fido = &catalog.sprites["Fido"];
        assert_eq!(fido.costumes.iter().collect::<Vec<_>>(), ["jump", "sit"]);
        assert!(fido.animations.contains("walk"));
    }

    #[rstest]
    #[case(ResourceId::backdrop("stage"), true)]
    #[case(ResourceId::sound("Meow"), true)]
    #[case(ResourceId::sound("Bark"), false)]
    #[case(ResourceId::sprite("Fido"), true)]
    #[case(ResourceId::costume("Fido", "jump"), true)]
    #[case(ResourceId::costume("Ghost", "jump"), false)]
    #[case(ResourceId::animation("Fido", "walk"), true)]
    #[case(ResourceId::widget("score"), true)]
    fn test_contains(#[case] id: ResourceId, #[case] expected: bool) {
        let catalog = load_catalog(&sample(), "assets").unwrap();
        assert_eq!(catalog.contains(&id), expected);
    }

    #[test]
    fn test_missing_tree_is_empty() {
        let catalog = load_catalog(&MemoryAssetReader::new(), "assets").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_malformed_index_is_skipped() {
        let reader = MemoryAssetReader::new()
            .with_file("assets/index.json", "{")
            .with_file("assets/sounds/Meow/index.json", "{}");
        let catalog = load_catalog(&reader, "assets").unwrap();
        assert_eq!(catalog.skipped.len(), 1);
        assert_eq!(catalog.skipped[0].path, "assets/index.json");
        assert!(catalog.sounds.contains("Meow"));
    }

    #[test]
    fn test_broken_sprite_keeps_the_rest() {
        let reader = sample().with_file("assets/sprites/Broken/index.json", "{\"costumes\": 3}");
        let catalog = load_catalog(&reader, "assets").unwrap();
        let skipped: Vec<_> = catalog.skipped.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(skipped, ["assets/sprites/Broken/index.json"]);
        assert!(!catalog.sprites.contains_key("Broken"));
        assert!(catalog.contains(&ResourceId::costume("Fido", "jump")));
        assert!(catalog.contains(&ResourceId::widget("score")));
    }

    #[test]
    fn test_sprite_scoped_ids() {
        let catalog = load_catalog(&sample(), "assets").unwrap();
        assert_eq!(
            catalog.ids(ResourceKind::SpriteCostume, Some("Fido")),
            vec![ResourceId::costume("Fido", "jump"), ResourceId::costume("Fido", "sit")]
        );
        assert!(catalog.ids(ResourceKind::SpriteCostume, None).is_empty());
    }

    #[test]
    fn test_disk_reader() {
        let dir = tempfile::tempdir().unwrap();
        let sprite = dir.path().join("assets/sprites/Fido");
        std::fs::create_dir_all(&sprite).unwrap();
        std::fs::write(sprite.join("index.json"), r#"{"costumes":[{"name":"a"}]}"#).unwrap();
        std::fs::create_dir_all(dir.path().join("assets/sounds/Meow")).unwrap();

        let catalog = load_catalog_from_dir(dir.path(), "assets").unwrap();
        assert!(catalog.contains(&ResourceId::costume("Fido", "a")));
        assert!(catalog.contains(&ResourceId::sound("Meow")));
    }
}
