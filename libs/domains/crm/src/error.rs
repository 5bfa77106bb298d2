use thiserror::Error;

use crate::models::{EntityKind, RecordId};

/// Failures reported by a record or board configuration service
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Record {id} not found in table '{table}'")]
    NotFound { table: String, id: RecordId },

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Payload error: {0}")]
    Codec(String),
}

pub type RecordResult<T> = Result<T, RecordError>;

impl From<reqwest::Error> for RecordError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RecordError::Codec(err.to_string())
        } else {
            RecordError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError::Codec(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum BoardError {
    /// Wiring mistake: the kind is unknown or has no record service registered
    #[error("Unsupported entity kind: {0}")]
    UnsupportedEntityKind(String),

    #[error("Failed to load {kind} board: {source}")]
    Load {
        kind: EntityKind,
        #[source]
        source: RecordError,
    },

    #[error("Failed to add {kind}: {source}")]
    Create {
        kind: EntityKind,
        #[source]
        source: RecordError,
    },

    #[error("Record {0} is not on the board")]
    RecordNotFound(RecordId),

    #[error("Failed to move record {record_id} to '{target_status}': {source}")]
    Transition {
        record_id: RecordId,
        target_status: String,
        #[source]
        source: RecordError,
    },

    #[error("Record {0} is still being moved")]
    TransitionInFlight(RecordId),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Failed to save board configuration: {0}")]
    Configuration(#[source] RecordError),
}

pub type BoardResult<T> = Result<T, BoardError>;

impl BoardError {
    /// Whether the user can reasonably retry the operation that produced this error
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BoardError::Load { .. }
                | BoardError::Create { .. }
                | BoardError::Transition { .. }
                | BoardError::TransitionInFlight(_)
                | BoardError::Configuration(_)
        )
    }
}

impl From<validator::ValidationErrors> for BoardError {
    fn from(err: validator::ValidationErrors) -> Self {
        BoardError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_names_record_and_target() {
        let err = BoardError::Transition {
            record_id: 7,
            target_status: "qualified".to_string(),
            source: RecordError::Transport("connection reset".to_string()),
        };

        let message = err.to_string();
        assert!(message.contains('7'));
        assert!(message.contains("qualified"));
        assert!(message.contains("connection reset"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_programming_errors_are_not_transient() {
        assert!(!BoardError::UnsupportedEntityKind("invoice".to_string()).is_transient());
        assert!(!BoardError::RecordNotFound(1).is_transient());
    }
}
