use thiserror::Error;

/// Outcome of a failed handler attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// Worth another attempt after backoff (network, store I/O, provider).
    #[error("retryable: {0}")]
    Retryable(String),
    /// Retrying cannot help (bad payload, missing record, configuration).
    #[error("fatal: {0}")]
    Fatal(String),
}

impl JobError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::Retryable(_))
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            JobError::Retryable(m) | JobError::Fatal(m) => m,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue workers are already running")]
    AlreadyStarted,
    #[error("job queue is closed")]
    Closed,
}
