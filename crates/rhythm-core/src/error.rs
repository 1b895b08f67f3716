use thiserror::Error;

#[derive(Debug, Error)]
pub enum RhythmError {
    #[error("not initialized: run 'rhythm init'")]
    NotInitialized,

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("support circle member not found: {0}")]
    MemberNotFound(String),

    #[error("support circle member already exists: {0}")]
    MemberExists(String),

    #[error("support circle member is no longer active: {0}")]
    MemberInactive(String),

    #[error("recording not found: {0}")]
    RecordingNotFound(String),

    #[error("recording already exists: {0}")]
    RecordingExists(String),

    #[error("invalid id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidId(String),

    #[error("invalid priority {value}: {reason}")]
    InvalidPriority { value: i64, reason: String },

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid confidence {0}: must be between 0 and 1")]
    InvalidConfidence(f32),

    #[error("invalid move from {source_index} to {destination} in a list of {len}")]
    InvalidMove {
        source_index: usize,
        destination: usize,
        len: usize,
    },

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("action {id} was changed elsewhere (expected version {expected}, found {found})")]
    VersionConflict { id: String, expected: u64, found: u64 },

    #[error("failed to persist action {action_id} ({index} of {total}): {reason}")]
    PersistFailed {
        action_id: String,
        index: usize,
        total: usize,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RhythmError>;
