//! Per-document diagnostics with editor positions.

use serde::Serialize;

use super::document;
use crate::base::Span;
use crate::error::RequestError;
use crate::hir::{ProgramUnit, Severity};

/// A diagnostic located by line and UTF-16 column
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticInfo {
    pub span: Span,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

/// Diagnostics of the document at `path`, in unit order.
pub fn diagnostics(unit: &ProgramUnit, path: &str) -> Result<Vec<DiagnosticInfo>, RequestError> {
    let file = document(unit, path)?;
    Ok(unit
        .diagnostics_for(file.id)
        .map(|d| DiagnosticInfo {
            span: file.line_index.span(d.range),
            severity: d.severity,
            code: d.code.as_deref().map(str::to_string),
            message: d.message.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::base::Position;
    use crate::config::AnalysisConfig;
    use crate::hir::compile;
    use crate::resource::MemoryAssetReader;

    fn unit(files: &[(&str, &str)]) -> ProgramUnit {
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
    fn test_positions_count_utf16_units() {
        let unit = unit(&[("main.spx", "s := \"😀\"\nx := y\n")]);
        let diags = diagnostics(&unit, "main.spx").unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "undefined: y");
        assert_eq!(diags[0].span.start, Position::new(1, 5));
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn test_diagnostics_are_per_document() {
        let unit = unit(&[("main.spx", "a := b\n"), ("Fido.spx", "c := d\n")]);
        let main = diagnostics(&unit, "main.spx").unwrap();
        let fido = diagnostics(&unit, "Fido.spx").unwrap();
        assert_eq!(main.len(), 1);
        assert_eq!(fido.len(), 1);
        assert_eq!(fido[0].message, "undefined: d");
    }

    #[test]
    fn test_malformed_requests() {
        let unit = unit(&[("main.spx", "")]);
        assert_eq!(
            diagnostics(&unit, "Ghost.spx"),
            Err(RequestError::UnknownDocument("Ghost.spx".into()))
        );
        assert_eq!(
            diagnostics(&unit, "main.go"),
            Err(RequestError::UnsupportedExtension("main.go".into()))
        );
    }
}
