//! IDE features: editor-facing queries over a compiled program unit.
//!
//! Each query is a function of one [`ProgramUnit`] and corresponds to one
//! editor request. Positions are zero-based lines and UTF-16 columns.
//!
//! ## Usage
//!
//! The recommended entry point is [`AnalysisHost`]:
//!
//! ```ignore
//! use spxls::ide::AnalysisHost;
//!
//! let mut host = AnalysisHost::new();
//! host.set_file_content("main.spx", "onStart => {\n\tsay \"hi\"\n}\n");
//!
//! let analysis = host.analysis()?;
//! let items = analysis.completions("main.spx", Position::new(1, 4))?;
//! ```

mod analysis;
mod commands;
mod completion;
mod diagnostics;
mod docs;
mod goto;
mod input_slots;
mod references;

pub use analysis::{Analysis, AnalysisHost};
pub use commands::{
    COMMANDS, GET_DEFINITIONS, GET_DIAGNOSTICS, GET_INPUT_SLOTS, GET_RESOURCE_REFERENCES,
    execute_command,
};
pub use completion::{
    CompletionContextKind, CompletionItem, CompletionKind, completion_context, completions,
};
pub use diagnostics::{DiagnosticInfo, diagnostics};
pub use docs::{DocProvider, NoDocs, PreludeDocs, doc_key};
pub use goto::{DefinitionTarget, goto_definition};
pub use input_slots::{
    ColorValue, Input, InputKind, InputSlot, InputType, InputValue, ResourceContext, SlotAccept,
    SlotKind, input_slots,
};
pub use references::{ResourceLocation, find_resource_references, resource_at};

use crate::error::RequestError;
use crate::hir::{ProgramUnit, UnitFile};

/// The unit file at `path`.
///
/// Paths without the source extension and paths outside the unit are
/// malformed requests.
pub(crate) fn document<'a>(unit: &'a ProgramUnit, path: &str) -> Result<&'a UnitFile, RequestError> {
    if !unit.config().is_source_path(path) {
        return Err(RequestError::UnsupportedExtension(path.to_string()));
    }
    unit.file_by_path(path)
        .ok_or_else(|| RequestError::UnknownDocument(path.to_string()))
}
