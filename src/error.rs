//! Error types for the dialogue engine.

use thiserror::Error;

use crate::validate::ValidationError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while loading or running a story.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Node id absent from the node store.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Path name absent from the path table.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// A choice node offers nothing to pick.
    #[error("choice node {0} has no options")]
    EmptyChoice(String),

    /// Option id is not among the pending options.
    #[error("invalid selection: {option}")]
    InvalidSelection {
        /// The rejected option id.
        option: String,
    },

    /// A selection arrived while nothing is awaiting a choice.
    #[error("no choice is pending")]
    NoPendingChoice,

    /// The same kind of operation is already in flight. Safe to ignore.
    #[error("{0} already in progress")]
    Reentrant(&'static str),

    /// Startup validation failed in fail-fast mode.
    #[error("story failed validation with {} error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    /// Story document could not be parsed.
    #[error("malformed story: {0}")]
    Story(#[from] serde_json::Error),
}

impl EngineError {
    /// Duplicate UI events surface as this; adapters drop them silently.
    pub fn is_reentrant(&self) -> bool {
        matches!(self, EngineError::Reentrant(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::NodeNotFound(_) | EngineError::PathNotFound(_)
        )
    }
}
