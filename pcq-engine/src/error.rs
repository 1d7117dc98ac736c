use pcq_projection::ProjError;
use pcq_source::SourceError;
use thiserror::Error;

/// Failures surfaced while executing a job.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The job input itself is invalid; the cause persists across retries.
    #[error("invalid job input: {0}")]
    Input(String),

    #[error("job cancelled")]
    Cancelled,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("projection failed: {0}")]
    Projection(#[from] ProjError),

    #[error("failed to write artifact: {0}")]
    Artifact(#[from] std::io::Error),
}

impl EngineError {
    /// Terminal errors are dead-lettered immediately instead of retried.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Input(_) | Self::Source(SourceError::MissingFile(_))
        )
    }
}
