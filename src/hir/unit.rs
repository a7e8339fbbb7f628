//! The compilation aggregator: one compile of one program unit.

use std::sync::Arc;

use rowan::GreenNode;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;

use super::check::{SourceInput, TypeError, check_unit};
use super::diagnostics::{Diagnostic, DiagnosticCollector, codes};
use super::domain::GAME_CLASS;
use super::info::Info;
use super::model::Model;
use crate::base::{FileId, LineIndex};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::parser::{AstNode, SourceFile, SyntaxNode, parse};
use crate::resource::{
    AssetReader, Catalog, ResourceIndex, asset_root, load_catalog, resolve_references,
};

/// A source file of a program unit.
#[derive(Clone, Debug)]
pub struct UnitFile {
    pub id: FileId,
    pub path: Arc<str>,
    pub text: Arc<str>,
    pub line_index: LineIndex,
    green: GreenNode,
    /// Class the file declares: `Game` for the entry file, else the file stem
    pub class_name: SmolStr,
    pub is_entry: bool,
    /// Declares another package and was left out of checking
    pub excluded: bool,
}

impl UnitFile {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn source_file(&self) -> Option<SourceFile> {
        SourceFile::cast(self.syntax())
    }
}

/// Result of compiling one set of files.
///
/// A unit is immutable; any change to the file set produces a new one.
#[derive(Debug)]
pub struct ProgramUnit {
    config: AnalysisConfig,
    files: Vec<UnitFile>,
    by_path: FxHashMap<Arc<str>, FileId>,
    entry: Option<FileId>,
    model: Model,
    info: Info,
    catalog: Catalog,
    resources: ResourceIndex,
    diagnostics: Vec<Diagnostic>,
}

impl ProgramUnit {
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn files(&self) -> &[UnitFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> Option<&UnitFile> {
        if id.is_prelude() {
            return None;
        }
        self.files.get(id.index())
    }

    pub fn file_by_path(&self, path: &str) -> Option<&UnitFile> {
        self.by_path.get(path).and_then(|id| self.file(*id))
    }

    pub fn entry_file(&self) -> Option<&UnitFile> {
        self.entry.and_then(|id| self.file(id))
    }

    /// Whether the entry file was found; type errors do not matter here.
    pub fn has_entry(&self) -> bool {
        self.entry.is_some()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resources(&self) -> &ResourceIndex {
        &self.resources
    }

    /// All diagnostics of the unit, grouped by file in unit order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn diagnostics_for(&self, file: FileId) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.diagnostics.iter().filter(move |d| d.file == file)
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), AnalysisError> {
    if cancel.is_cancelled() {
        tracing::debug!("compile cancelled");
        return Err(AnalysisError::Cancelled);
    }
    Ok(())
}

/// Compile `files` into a program unit.
///
/// Source problems become diagnostics. An `Err` means the compile was
/// cancelled or the checker broke its contract.
pub fn compile<P, T>(
    files: impl IntoIterator<Item = (P, T)>,
    assets: &dyn AssetReader,
    config: &AnalysisConfig,
    cancel: &CancellationToken,
) -> Result<ProgramUnit, AnalysisError>
where
    P: Into<Arc<str>>,
    T: Into<Arc<str>>,
{
    let mut collector = DiagnosticCollector::new();

    // ========================================================================
    // Parse
    // ========================================================================

    let mut unit_files = Vec::new();
    let mut by_path = FxHashMap::default();
    let mut entry = None;
    for (path, text) in files {
        let path: Arc<str> = path.into();
        let text: Arc<str> = text.into();
        if !config.is_source_path(&path) {
            tracing::trace!(%path, "skipping non-source file");
            continue;
        }
        if by_path.contains_key(&path) {
            tracing::warn!(%path, "duplicate file in unit");
            continue;
        }
        let id = FileId::new(unit_files.len() as u32);
        let parse = parse(&text);
        for error in &parse.errors {
            collector.error(id, error.range, codes::SYNTAX_ERROR, error.message.clone());
        }

        let is_entry = entry.is_none() && config.is_entry_path(&path);
        if is_entry {
            entry = Some(id);
        }
        let class_name = if is_entry {
            SmolStr::new(GAME_CLASS)
        } else {
            SmolStr::new(config.class_name_for(&path))
        };

        let root = SourceFile::cast(parse.syntax());
        let package = root
            .and_then(|r| r.package())
            .and_then(|p| p.name())
            .and_then(|n| n.ident());
        let excluded = match package {
            Some(ident) if ident.text() != config.package_name => {
                collector.error(
                    id,
                    ident.text_range(),
                    codes::PACKAGE_MISMATCH,
                    format!("package {}; expected package {}", ident.text(), config.package_name),
                );
                true
            }
            _ => false,
        };

        by_path.insert(path.clone(), id);
        unit_files.push(UnitFile {
            id,
            line_index: LineIndex::new(text.clone()),
            path,
            text,
            green: parse.green,
            class_name,
            is_entry,
            excluded,
        });
    }
    tracing::debug!(files = unit_files.len(), entry = ?entry, "parsed unit");
    check_cancelled(cancel)?;

    // ========================================================================
    // Check
    // ========================================================================

    let inputs: Vec<SourceInput> = unit_files
        .iter()
        .filter(|f| !f.excluded)
        .map(|f| SourceInput {
            id: f.id,
            root: f.syntax(),
            class_name: f.class_name.clone(),
            is_entry: f.is_entry,
        })
        .collect();
    let result = check_unit(&inputs, config);
    drop(inputs);
    for error in result.errors {
        let diagnostic = type_error_diagnostic(&unit_files, error)?;
        collector.add(diagnostic);
    }
    let (model, info) = (result.model, result.info);
    check_cancelled(cancel)?;

    // ========================================================================
    // Catalog
    // ========================================================================

    let entry_file = entry.and_then(|id| unit_files.get(id.index()));
    let root = asset_root(entry_file, &model, &info, config, &mut collector);
    let asset_error = |collector: &mut DiagnosticCollector, message: String| {
        if let Some(file) = entry_file {
            collector.error(file.id, TextRange::empty(TextSize::new(0)), codes::ASSET_LOAD, message);
        }
    };
    let catalog = match load_catalog(assets, &root) {
        Ok(catalog) => {
            for skipped in &catalog.skipped {
                asset_error(&mut collector, skipped.message.clone());
            }
            Some(catalog)
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load asset catalog");
            asset_error(&mut collector, err.to_string());
            None
        }
    };
    check_cancelled(cancel)?;

    // ========================================================================
    // Resource references
    // ========================================================================

    // Without a catalog every name would be reported missing.
    let (catalog, resources) = match catalog {
        Some(catalog) => {
            let resources = resolve_references(&unit_files, &model, &info, &catalog, config, &mut collector);
            (catalog, resources)
        }
        None => (Catalog::empty(root), ResourceIndex::default()),
    };

    let mut diagnostics = collector.finish();
    diagnostics.sort_by_key(|d| d.file);

    Ok(ProgramUnit {
        config: config.clone(),
        files: unit_files,
        by_path,
        entry,
        model,
        info,
        catalog,
        resources,
        diagnostics,
    })
}

/// Turn a type error into a diagnostic, refusing errors without a usable
/// position.
fn type_error_diagnostic(files: &[UnitFile], error: TypeError) -> Result<Diagnostic, AnalysisError> {
    let file = files.get(error.file.index()).filter(|_| !error.file.is_prelude());
    let valid = file.is_some_and(|f| error.range.end() <= TextSize::of(&*f.text));
    if !valid {
        tracing::error!(file = ?error.file, range = ?error.range, message = %error.message, "type error without position");
        return Err(AnalysisError::FrontEndContract {
            message: format!("type error without valid position: {}", error.message),
        });
    }
    Ok(Diagnostic::error(error.file, error.range, error.message).with_code(error.code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::diagnostics::Severity;
    use crate::resource::MemoryAssetReader;

    fn compile_files(files: &[(&str, &str)]) -> ProgramUnit {
        let files: Vec<(String, String)> = files
            .iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect();
        compile(
            files,
            &MemoryAssetReader::new(),
            &AnalysisConfig::default(),
            &CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let unit = compile_files(&[("main.spx", "onStart => {\n\techo \"hello\n}\n")]);
        assert!(unit.has_error());
        let first = &unit.diagnostics()[0];
        assert_eq!(first.severity, Severity::Error);
        assert!(first.range.start() >= TextSize::new(19));
    }

    #[test]
    fn test_missing_entry_still_returns_unit() {
        let unit = compile_files(&[("Fido.spx", "onClick => {\n\tundefinedThing\n}\n")]);
        assert!(!unit.has_entry());
        assert!(unit.has_error());
        assert_eq!(unit.files()[0].class_name, "Fido");
    }

    #[test]
    fn test_package_mismatch_excludes_file() {
        let unit = compile_files(&[
            ("main.spx", ""),
            ("Other.spx", "package other\n\nx := undefinedThing\n"),
        ]);
        let messages: Vec<_> = unit.diagnostics().iter().map(|d| d.message.to_string()).collect();
        assert_eq!(messages, vec!["package other; expected package main".to_string()]);
        assert!(unit.file_by_path("Other.spx").unwrap().excluded);
    }

    #[test]
    fn test_recompile_is_idempotent() {
        let files = [
            ("main.spx", "onStart => {\n\tplay \"Ghost\"\n\tx := y\n}\n"),
            ("Fido.spx", "onClick => {\n\tsay\n}\n"),
        ];
        let first = compile_files(&files);
        let second = compile_files(&files);
        assert_eq!(first.diagnostics(), second.diagnostics());
        assert!(!first.diagnostics().is_empty());
    }

    #[test]
    fn test_broken_asset_file_does_not_hide_other_resources() {
        let assets = MemoryAssetReader::new()
            .with_file("assets/sounds/Meow/index.json", "{}")
            .with_file("assets/sprites/Broken/index.json", "{");
        let unit = compile(
            [("main.spx", "onStart => {\n\tplay \"Meow\"\n}\n")],
            &assets,
            &AnalysisConfig::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let codes: Vec<_> = unit.diagnostics().iter().map(|d| d.code.as_deref()).collect();
        assert_eq!(codes, vec![Some(codes::ASSET_LOAD)]);
        assert!(unit.diagnostics()[0].message.contains("sprites/Broken/index.json"));
        assert_eq!(unit.resources().refs().len(), 1);
    }

    #[test]
    fn test_cancelled_compile() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = compile(
            [("main.spx", "")],
            &MemoryAssetReader::new(),
            &AnalysisConfig::default(),
            &cancel,
        );
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[test]
    fn test_non_source_files_are_ignored() {
        let unit = compile_files(&[("main.spx", ""), ("README.md", "# hi")]);
        assert_eq!(unit.files().len(), 1);
        assert!(unit.file_by_path("README.md").is_none());
    }

    #[test]
    fn test_type_error_outside_file_is_contract_failure() {
        let files = compile_files(&[("main.spx", "")]).files().to_vec();
        let error = TypeError {
            file: FileId::new(0),
            range: TextRange::new(TextSize::new(5), TextSize::new(50)),
            code: codes::TYPE_MISMATCH,
            message: "boom".to_string(),
        };
        assert!(matches!(
            type_error_diagnostic(&files, error),
            Err(AnalysisError::FrontEndContract { .. })
        ));
    }
}
