//! AnalysisHost and Analysis: state management for IDE features.
//!
//! The `AnalysisHost` owns the file contents, the asset reader and the
//! configuration. Any change drops the compiled unit; the next `analysis()`
//! recompiles the whole unit and hands out an immutable snapshot.
//!
//! ## Usage
//!
//! ```ignore
//! let mut host = AnalysisHost::new();
//! host.set_file_content("main.spx", content);
//!
//! let analysis = host.analysis()?;
//! let slots = analysis.input_slots("main.spx")?;
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use super::{
    CompletionItem, DefinitionTarget, DiagnosticInfo, DocProvider, InputSlot, PreludeDocs,
    ResourceLocation,
};
use crate::base::Position;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, CommandError, RequestError};
use crate::hir::{ProgramUnit, compile};
use crate::resource::{AssetReader, MemoryAssetReader, ResourceId};

/// Owns all mutable state for the IDE layer.
pub struct AnalysisHost {
    /// Source texts by path, in the order they were added
    files: IndexMap<Arc<str>, Arc<str>>,
    assets: Arc<dyn AssetReader + Send + Sync>,
    docs: Arc<dyn DocProvider>,
    config: AnalysisConfig,
    /// Unit compiled from the current files, dropped on any change
    unit: Option<Arc<ProgramUnit>>,
}

impl fmt::Debug for AnalysisHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisHost")
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .field("compiled", &self.unit.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for AnalysisHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisHost {
    /// An empty host without assets.
    pub fn new() -> Self {
        Self {
            files: IndexMap::new(),
            assets: Arc::new(MemoryAssetReader::new()),
            docs: Arc::new(PreludeDocs),
            config: AnalysisConfig::default(),
            unit: None,
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self.unit = None;
        self
    }

    pub fn with_asset_reader(mut self, assets: impl AssetReader + Send + Sync + 'static) -> Self {
        self.set_asset_reader(assets);
        self
    }

    pub fn with_doc_provider(mut self, docs: impl DocProvider + 'static) -> Self {
        self.docs = Arc::new(docs);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Replace the asset reader; the catalog is reloaded on the next compile.
    pub fn set_asset_reader(&mut self, assets: impl AssetReader + Send + Sync + 'static) {
        self.assets = Arc::new(assets);
        self.unit = None;
    }

    /// Set the content of a file.
    ///
    /// Setting identical content keeps the compiled unit.
    pub fn set_file_content(&mut self, path: &str, content: &str) {
        if self.files.get(path).is_some_and(|text| **text == *content) {
            return;
        }
        self.files.insert(Arc::from(path), Arc::from(content));
        self.unit = None;
    }

    pub fn remove_file(&mut self, path: &str) {
        if self.files.shift_remove(path).is_some() {
            self.unit = None;
        }
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file_content(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(|text| &**text)
    }

    /// Drop the compiled unit, e.g. after the asset tree changed on disk.
    pub fn mark_dirty(&mut self) {
        self.unit = None;
    }

    /// The unit for the current files, compiling it if needed.
    pub fn unit(&mut self) -> Result<Arc<ProgramUnit>, AnalysisError> {
        self.unit_with_cancel(&CancellationToken::new())
    }

    /// Like [`unit`](Self::unit), giving up between compile phases once
    /// `cancel` fires.
    pub fn unit_with_cancel(&mut self, cancel: &CancellationToken) -> Result<Arc<ProgramUnit>, AnalysisError> {
        if let Some(unit) = &self.unit {
            return Ok(unit.clone());
        }
        let files = self
            .files
            .iter()
            .map(|(path, text)| (path.clone(), text.clone()));
        let unit = Arc::new(compile(files, &*self.assets, &self.config, cancel)?);
        tracing::debug!(
            files = unit.files().len(),
            diagnostics = unit.diagnostics().len(),
            "unit compiled"
        );
        self.unit = Some(unit.clone());
        Ok(unit)
    }

    /// A consistent snapshot for querying.
    pub fn analysis(&mut self) -> Result<Analysis, AnalysisError> {
        let unit = self.unit()?;
        Ok(Analysis {
            unit,
            docs: self.docs.clone(),
        })
    }
}

/// An immutable snapshot of the analysis state.
///
/// All IDE queries go through this struct so they see the same unit.
#[derive(Clone)]
pub struct Analysis {
    unit: Arc<ProgramUnit>,
    docs: Arc<dyn DocProvider>,
}

impl Analysis {
    pub fn unit(&self) -> &ProgramUnit {
        &self.unit
    }

    pub fn has_error(&self) -> bool {
        self.unit.has_error()
    }

    pub fn diagnostics(&self, path: &str) -> Result<Vec<DiagnosticInfo>, RequestError> {
        super::diagnostics(&self.unit, path)
    }

    pub fn completions(&self, path: &str, position: Position) -> Result<Vec<CompletionItem>, RequestError> {
        super::completions(&self.unit, &*self.docs, path, position)
    }

    pub fn input_slots(&self, path: &str) -> Result<Vec<InputSlot>, RequestError> {
        super::input_slots(&self.unit, path)
    }

    pub fn goto_definition(&self, path: &str, position: Position) -> Result<Vec<DefinitionTarget>, RequestError> {
        super::goto_definition(&self.unit, path, position)
    }

    pub fn find_resource_references(&self, id: &ResourceId) -> Vec<ResourceLocation> {
        super::find_resource_references(&self.unit, id)
    }

    pub fn resource_at(&self, path: &str, position: Position) -> Result<Option<ResourceId>, RequestError> {
        super::resource_at(&self.unit, path, position)
    }

    pub fn execute_command(
        &self,
        command: &str,
        arguments: &[serde_json::Value],
    ) -> Result<serde_json::Value, CommandError> {
        super::execute_command(&self.unit, command, arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_debug_lists_files() {
        let mut host = AnalysisHost::new();
        host.set_file_content("main.spx", "");
        let debug = format!("{host:?}");
        assert!(debug.contains("main.spx"));
        assert!(debug.contains("compiled: false"));
    }

    #[test]
    fn test_analysis_host_basic() {
        let mut host = AnalysisHost::new();
        host.set_file_content("main.spx", "onStart => {\n\tx := y\n}\n");
        let analysis = host.analysis().unwrap();
        assert!(analysis.unit().has_entry());
        assert!(analysis.has_error());
        assert_eq!(analysis.diagnostics("main.spx").unwrap().len(), 1);
    }

    #[test]
    fn test_unchanged_content_reuses_unit() {
        let mut host = AnalysisHost::new();
        host.set_file_content("main.spx", "x := 1\n");
        let first = host.unit().unwrap();
        host.set_file_content("main.spx", "x := 1\n");
        let second = host.unit().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        host.set_file_content("main.spx", "x := 2\n");
        let third = host.unit().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_file_removal() {
        let mut host = AnalysisHost::new();
        host.set_file_content("main.spx", "");
        host.set_file_content("Fido.spx", "");
        host.remove_file("Fido.spx");
        assert!(!host.has_file("Fido.spx"));
        let analysis = host.analysis().unwrap();
        assert!(analysis.unit().file_by_path("Fido.spx").is_none());
        assert_eq!(host.file_count(), 1);
    }

    #[test]
    fn test_new_assets_trigger_recompile() {
        let mut host = AnalysisHost::new();
        host.set_file_content("main.spx", "onStart => {\n\tplay \"Meow\"\n}\n");
        assert!(host.analysis().unwrap().has_error());

        host.set_asset_reader(
            MemoryAssetReader::new().with_file("assets/sounds/Meow/index.json", "{}"),
        );
        assert!(!host.analysis().unwrap().has_error());
    }

    #[test]
    fn test_cancelled_compile_keeps_no_unit() {
        let mut host = AnalysisHost::new();
        host.set_file_content("main.spx", "");
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(host.unit_with_cancel(&cancel), Err(AnalysisError::Cancelled)));
        assert!(host.unit().is_ok());
    }
}
