use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::error::LoadError;
use crate::ide::AnalysisHost;
use crate::resource::DiskAssetReader;

/// Loads a project directory: its source files plus its asset tree.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceLoader {
    config: AnalysisConfig,
}

impl WorkspaceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// A host holding every source file under `root`, reading assets from
    /// `root` as well.
    pub fn load<P: AsRef<Path>>(&self, root: P) -> Result<AnalysisHost, LoadError> {
        let root = root.as_ref();
        let mut host = AnalysisHost::new()
            .with_config(self.config.clone())
            .with_asset_reader(DiskAssetReader::new(root));
        self.load_directory_into_host(root, &mut host)?;
        Ok(host)
    }

    /// Loads all source files under `root` into `host`, keyed by their path
    /// relative to `root`. Returns the number of files loaded.
    pub fn load_directory_into_host<P: AsRef<Path>>(
        &self,
        root: P,
        host: &mut AnalysisHost,
    ) -> Result<usize, LoadError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(LoadError::NotADirectory(root.to_path_buf()));
        }
        let paths = self.collect_source_paths(root)?;
        for path in &paths {
            self.load_file_into_host(root, path, host)?;
        }
        tracing::debug!(root = %root.display(), files = paths.len(), "loaded workspace");
        Ok(paths.len())
    }

    /// Loads a single file into `host`.
    pub fn load_file_into_host(&self, root: &Path, path: &Path, host: &mut AnalysisHost) -> Result<(), LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        host.set_file_content(&document_path(root, path), &text);
        Ok(())
    }

    /// Source files under `root`, in file-name order.
    fn collect_source_paths(&self, root: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_source = entry
                .path()
                .extension()
                .is_some_and(|ext| ext == self.config.source_extension.as_str());
            if is_source {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

/// Document path of `path`: relative to `root`, `/`-separated.
fn document_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::resource::ResourceId;

    fn write(dir: &Path, path: &str, text: &str) {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, text).unwrap();
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.spx", "var (\n\tFido Fido\n)\n\nonStart => {\n\tplay \"Meow\"\n}\n");
        write(dir.path(), "Fido.spx", "onClick => {\n\tsetCostume \"jump\"\n}\n");
        write(dir.path(), "README.md", "not a source file");
        write(dir.path(), "assets/index.json", r#"{"backdrops":[{"name":"stage"}]}"#);
        write(dir.path(), "assets/sounds/Meow/index.json", "{}");
        write(
            dir.path(),
            "assets/sprites/Fido/index.json",
            r#"{"costumes":[{"name":"jump"}]}"#,
        );
        dir
    }

    #[test]
    fn test_load_project() {
        let dir = project();
        let mut host = WorkspaceLoader::new().load(dir.path()).unwrap();
        assert_eq!(host.file_count(), 2);
        assert!(host.has_file("main.spx"));
        assert!(host.has_file("Fido.spx"));

        let analysis = host.analysis().unwrap();
        assert!(!analysis.has_error());
        assert_eq!(
            analysis.find_resource_references(&ResourceId::costume("Fido", "jump")).len(),
            1
        );
        assert!(analysis.unit().catalog().contains(&ResourceId::backdrop("stage")));
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = WorkspaceLoader::new().load(&missing).unwrap_err();
        assert!(matches!(err, LoadError::NotADirectory(_)));
    }

    #[test]
    fn test_document_paths_are_relative() {
        let root = Path::new("/work/game");
        assert_eq!(document_path(root, Path::new("/work/game/main.spx")), "main.spx");
        assert_eq!(document_path(root, Path::new("/work/game/extra/Cat.spx")), "extra/Cat.spx");
    }
}
