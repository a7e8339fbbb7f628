//! Analysis configuration.

/// Knobs for one compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// File name of the entry (game) file.
    pub entry_file_name: String,
    /// Extension of source files, without the dot.
    pub source_extension: String,
    /// Asset root used when the program does not name one.
    pub default_asset_root: String,
    /// Package every source file belongs to.
    pub package_name: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            entry_file_name: "main.spx".to_string(),
            source_extension: "spx".to_string(),
            default_asset_root: "assets".to_string(),
            package_name: "main".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry_file_name(mut self, name: impl Into<String>) -> Self {
        self.entry_file_name = name.into();
        self
    }

    pub fn with_source_extension(mut self, ext: impl Into<String>) -> Self {
        self.source_extension = ext.into();
        self
    }

    pub fn with_default_asset_root(mut self, root: impl Into<String>) -> Self {
        self.default_asset_root = root.into();
        self
    }

    pub fn with_package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = name.into();
        self
    }

    /// Whether `path` names a source file of this configuration.
    pub fn is_source_path(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .is_some_and(|(_, ext)| ext == self.source_extension)
    }

    /// Whether `path` names the entry file.
    pub fn is_entry_path(&self, path: &str) -> bool {
        file_name(path) == self.entry_file_name
    }

    /// Class name for a sprite file: the file stem.
    pub fn class_name_for(&self, path: &str) -> String {
        let name = file_name(path);
        name.strip_suffix(&format!(".{}", self.source_extension))
            .unwrap_or(name)
            .to_string()
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
