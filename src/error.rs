use std::fmt;
use std::path::PathBuf;

/// Which lookup table a pose miss came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseKind {
    Named,
    LetterSource,
    Slot,
}

impl fmt::Display for PoseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseKind::Named => f.write_str("named pose"),
            PoseKind::LetterSource => f.write_str("letter source"),
            PoseKind::Slot => f.write_str("slot"),
        }
    }
}

/// Errors that can occur when driving the arm or preparing a round.
#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    #[error("No {kind} defined for '{key}'")]
    PoseNotFound { kind: PoseKind, key: String },

    #[error("{kind} '{key}' is a joint-space pose, offset descent needs a Cartesian pose")]
    PoseSpaceMismatch { kind: PoseKind, key: String },

    #[error("Motion backend cannot {0}")]
    MissingCapability(String),

    #[error("Connection to controller failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("Write to controller failed: {0}")]
    Transmission(#[source] std::io::Error),

    #[error("Expected a vector of {expected} values, got {actual}")]
    InvalidVectorLength { expected: usize, actual: usize },

    #[error("No word with length in [{min_len}, {max_len}]")]
    NoCandidate { min_len: usize, max_len: usize },

    #[error("Invalid safety limits: {0}")]
    InvalidSafetyLimits(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Timeout waiting for motion acknowledgment")]
    SettleTimeout,

    #[error("Acknowledgment stream stopped")]
    AckStreamStopped,
}

impl RobotError {
    /// Recoverable misses abort the current sequence only.
    pub fn is_configuration_miss(&self) -> bool {
        matches!(
            self,
            RobotError::PoseNotFound { .. }
                | RobotError::PoseSpaceMismatch { .. }
                | RobotError::MissingCapability(_)
        )
    }
}
