//! Error types for analysis, requests and commands.
//!
//! Recoverable source problems never show up here; they are reported as
//! [`Diagnostic`](crate::hir::Diagnostic)s next to a best-effort result.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of a whole compile.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The checker reported an error without a usable position.
    #[error("front-end contract violation: {message}")]
    FrontEndContract { message: String },

    /// The caller cancelled the request between phases.
    #[error("analysis cancelled")]
    Cancelled,
}

/// A request whose shape the core cannot serve.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// No document with this path is part of the unit.
    #[error("unknown document: {0}")]
    UnknownDocument(String),

    /// The document does not carry the source extension.
    #[error("unsupported document extension: {0}")]
    UnsupportedExtension(String),

    /// A single-document query received a different number of documents.
    #[error("expected exactly one document, got {0}")]
    DocumentCount(usize),
}

/// Errors raised by the command surface.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid arguments for {command}: {message}")]
    InvalidArguments { command: String, message: String },

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Resource(#[from] ResourceIdError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("failed to encode command result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CommandError {
    pub fn invalid_arguments(command: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            command: command.to_string(),
            message: message.into(),
        }
    }
}

/// A resource locator string that does not name a resource.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("not a resource locator: {0}")]
    Scheme(String),

    #[error("unknown resource kind in {0}")]
    UnknownKind(String),

    #[error("malformed resource locator: {0}")]
    Malformed(String),
}

/// Problems reading the asset tree.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl AssetError {
    /// The asset path the error refers to
    pub fn path(&self) -> &str {
        match self {
            Self::Io { path, .. } | Self::Json { path, .. } => path,
        }
    }
}

/// Problems loading a project directory.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("directory not found: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk project directory: {0}")]
    Walk(#[from] walkdir::Error),
}
