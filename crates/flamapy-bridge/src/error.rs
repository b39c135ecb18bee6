use std::path::PathBuf;
use thiserror::Error;

use flamapy_embed::EmbedError;

use crate::registry::{Operation, Technique};

#[derive(Error, Debug)]
pub enum FlamapyError {
    // Precondition errors, raised before the engine is touched
    #[error("Technique {technique} is not supported by {operation}")]
    UnsupportedTechnique {
        operation: Operation,
        technique: Technique,
    },

    #[error("Invalid parameter `{parameter}` for {operation}: expected {expected}, got {found}")]
    InvalidParameter {
        operation: Operation,
        parameter: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{operation} takes {expected} argument(s), got {found}")]
    ArgumentCount {
        operation: Operation,
        expected: String,
        found: usize,
    },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Unknown solving technique: {0}")]
    UnknownTechnique(String),

    #[error("Feature model is not initialized, call initialize() first")]
    NotInitialized,

    // Materialization errors
    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Engine errors
    #[error("Engine failed running {operation}: {source}")]
    Engine {
        operation: Operation,
        #[source]
        source: EmbedError,
    },

    #[error("Engine bootstrap failed: {0}")]
    Bootstrap(#[source] EmbedError),

    #[error("Engine task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlamapyError {
    /// Whether the error was detected in host code before any engine call
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            FlamapyError::UnsupportedTechnique { .. }
                | FlamapyError::InvalidParameter { .. }
                | FlamapyError::ArgumentCount { .. }
                | FlamapyError::UnknownOperation(_)
                | FlamapyError::UnknownTechnique(_)
                | FlamapyError::NotInitialized
        )
    }
}

pub type Result<T> = std::result::Result<T, FlamapyError>;
