//! `workspace/executeCommand` surface.
//!
//! Arguments arrive as a JSON array. Document arguments are objects with a
//! `path`; position arguments add a `position` of `{line, character}`;
//! resource arguments are locator strings such as
//! `spx://resources/sounds/Meow`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{diagnostics, find_resource_references, goto_definition, input_slots};
use crate::base::Position;
use crate::error::{CommandError, RequestError};
use crate::hir::ProgramUnit;
use crate::resource::ResourceId;

pub const GET_DEFINITIONS: &str = "spx.getDefinitions";
pub const GET_INPUT_SLOTS: &str = "spx.getInputSlots";
pub const GET_RESOURCE_REFERENCES: &str = "spx.getResourceReferences";
pub const GET_DIAGNOSTICS: &str = "spx.getDiagnostics";

/// Every command name understood by [`execute_command`].
pub const COMMANDS: &[&str] = &[
    GET_DEFINITIONS,
    GET_INPUT_SLOTS,
    GET_RESOURCE_REFERENCES,
    GET_DIAGNOSTICS,
];

#[derive(Debug, Deserialize)]
struct DocumentArg {
    path: String,
}

#[derive(Debug, Deserialize)]
struct PositionArg {
    path: String,
    position: Position,
}

#[derive(Debug, Serialize)]
struct DocumentDiagnostics<T> {
    path: String,
    diagnostics: T,
}

/// Run the command `name` against `unit`.
pub fn execute_command(unit: &ProgramUnit, name: &str, arguments: &[Value]) -> Result<Value, CommandError> {
    tracing::debug!(command = name, args = arguments.len(), "execute command");
    let result = match name {
        GET_DEFINITIONS => {
            let mut results = Vec::new();
            for arg in parse_args::<PositionArg>(name, arguments)? {
                results.push(goto_definition(unit, &arg.path, arg.position)?);
            }
            serde_json::to_value(results)?
        }
        GET_INPUT_SLOTS => {
            let mut documents = parse_args::<DocumentArg>(name, arguments)?;
            let (Some(arg), true) = (documents.pop(), arguments.len() == 1) else {
                return Err(RequestError::DocumentCount(arguments.len()).into());
            };
            serde_json::to_value(input_slots(unit, &arg.path)?)?
        }
        GET_RESOURCE_REFERENCES => {
            let mut locations = Vec::new();
            for id in parse_args::<ResourceId>(name, arguments)? {
                locations.extend(find_resource_references(unit, &id));
            }
            serde_json::to_value(locations)?
        }
        GET_DIAGNOSTICS => {
            let mut reports = Vec::new();
            for arg in parse_args::<DocumentArg>(name, arguments)? {
                let diagnostics = diagnostics(unit, &arg.path)?;
                reports.push(DocumentDiagnostics {
                    path: arg.path,
                    diagnostics,
                });
            }
            serde_json::to_value(reports)?
        }
        _ => return Err(CommandError::UnknownCommand(name.to_string())),
    };
    Ok(result)
}

fn parse_args<T: DeserializeOwned>(command: &str, arguments: &[Value]) -> Result<Vec<T>, CommandError> {
    arguments
        .iter()
        .map(|arg| {
            serde_json::from_value(arg.clone())
                .map_err(|e| CommandError::invalid_arguments(command, e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::config::AnalysisConfig;
    use crate::hir::compile;
    use crate::resource::MemoryAssetReader;

    fn unit() -> ProgramUnit {
        let assets = MemoryAssetReader::new().with_file("assets/sounds/Meow/index.json", "{}");
        let files = vec![
            (
                "main.spx".to_string(),
                "onStart => {\n\tplay \"Meow\"\n\tx := y\n}\n".to_string(),
            ),
            (
                "Fido.spx".to_string(),
                "onStart => {\n\tsetPenColor HSB(1, 2, 3)\n}\n".to_string(),
            ),
        ];
        compile(files, &assets, &AnalysisConfig::default(), &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_unknown_command() {
        let err = execute_command(&unit(), "spx.renameEverything", &[]).unwrap_err();
        assert!(matches!(err, CommandError::UnknownCommand(_)));
        assert_eq!(err.to_string(), "unknown command: spx.renameEverything");
    }

    #[test]
    fn test_input_slots_need_one_document() {
        let unit = unit();
        let args = [json!({"path": "main.spx"}), json!({"path": "Fido.spx"})];
        let err = execute_command(&unit, GET_INPUT_SLOTS, &args).unwrap_err();
        assert!(matches!(err, CommandError::Request(RequestError::DocumentCount(2))));

        let result = execute_command(&unit, GET_INPUT_SLOTS, &[json!({"path": "Fido.spx"})]).unwrap();
        let slots = result.as_array().unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0]["accept"]["type"], "color");
        assert_eq!(slots[0]["input"]["value"]["value"]["constructor"], "HSB");
    }

    #[test]
    fn test_resource_references() {
        let result = execute_command(
            &unit(),
            GET_RESOURCE_REFERENCES,
            &[json!("spx://resources/sounds/Meow")],
        )
        .unwrap();
        let locations = result.as_array().unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0]["path"], "main.spx");
        assert_eq!(locations[0]["span"]["start"], json!({"line": 1, "character": 6}));
    }

    #[test]
    fn test_definitions_and_diagnostics() {
        let unit = unit();
        let defs = execute_command(
            &unit,
            GET_DEFINITIONS,
            &[json!({"path": "main.spx", "position": {"line": 1, "character": 8}})],
        )
        .unwrap();
        assert_eq!(defs[0][0]["kind"], "resource");
        assert_eq!(defs[0][0]["id"], "spx://resources/sounds/Meow");

        let diags = execute_command(&unit, GET_DIAGNOSTICS, &[json!({"path": "main.spx"})]).unwrap();
        assert_eq!(diags[0]["diagnostics"][0]["message"], "undefined: y");
    }

    #[test]
    fn test_malformed_arguments() {
        let unit = unit();
        let err = execute_command(&unit, GET_DIAGNOSTICS, &[json!(42)]).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArguments { .. }));
        let err = execute_command(&unit, GET_RESOURCE_REFERENCES, &[json!("spx://resources/planets/Mars")]).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArguments { .. }));
        let err = execute_command(&unit, GET_DIAGNOSTICS, &[json!({"path": "Ghost.spx"})]).unwrap_err();
        assert!(matches!(err, CommandError::Request(RequestError::UnknownDocument(_))));
    }
}
