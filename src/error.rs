use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to whoever drives the stores, the access gate or the CLI.
///
/// The traversal engine never produces these: inconsistencies inside a running
/// session degrade to no-ops instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A scenario or class id that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Malformed scenario, bad identifier, bad email, bad class name.
    #[error("{0}")]
    Validation(String),

    /// The caller may not see or change the requested resource.
    #[error("{0}")]
    AccessDenied(String),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }

    /// Short category name shown in front of user-visible messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not found",
            Error::Validation(_) => "validation failed",
            Error::AccessDenied(_) => "access denied",
            Error::Io { .. } | Error::Json { .. } => "storage error",
        }
    }
}
