use uuid::Uuid;

/// Domain-level error taxonomy. Every variant maps to exactly one HTTP status
/// at the API boundary; nothing downstream of here does string-matching on
/// error messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("run {0} not found")]
    RunNotFound(Uuid),

    #[error("invalid cron expression '{cron}': {reason}")]
    InvalidCronExpression { cron: String, reason: String },

    #[error("run {id} could not be assigned to {worker}")]
    RunAssignmentFailed { id: Uuid, worker: String },

    #[error("run {id} could not be completed by {worker}")]
    RunCompletionFailed { id: Uuid, worker: String },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
