//! Helpers for compiling program units and building hosts.

use spxls::config::AnalysisConfig;
use spxls::hir::{ProgramUnit, Severity, compile};
use spxls::ide::AnalysisHost;
use spxls::resource::MemoryAssetReader;
use tokio_util::sync::CancellationToken;

use super::source_fixtures::standard_assets;

/// Compiles `files` against the standard asset pack.
pub fn unit_from_sources(files: &[(&str, &str)]) -> ProgramUnit {
    unit_with_assets(files, &standard_assets())
}

/// Compiles `files` against `assets`.
pub fn unit_with_assets(files: &[(&str, &str)], assets: &MemoryAssetReader) -> ProgramUnit {
    let files: Vec<(String, String)> = files
        .iter()
        .map(|(path, text)| (path.to_string(), text.to_string()))
        .collect();
    compile(files, assets, &AnalysisConfig::default(), &CancellationToken::new())
        .expect("compile should not fail")
}

/// A host holding `files` and reading the standard asset pack.
pub fn host_from_sources(files: &[(&str, &str)]) -> AnalysisHost {
    let mut host = AnalysisHost::new().with_asset_reader(standard_assets());
    for (path, content) in files {
        host.set_file_content(path, content);
    }
    host
}

pub fn messages(unit: &ProgramUnit) -> Vec<String> {
    unit.diagnostics().iter().map(|d| d.message.to_string()).collect()
}

pub fn count_with_severity(unit: &ProgramUnit, severity: Severity) -> usize {
    unit.diagnostics().iter().filter(|d| d.severity == severity).count()
}

/// Asserts that the unit compiled without any diagnostics.
pub fn assert_clean(unit: &ProgramUnit) {
    assert!(
        unit.diagnostics().is_empty(),
        "expected no diagnostics, got: {:?}",
        messages(unit)
    );
}
