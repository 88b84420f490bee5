use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnileadsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store timeout: {0}")]
    Timeout(String),

    #[error("Write conflict (retryable): {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl UnileadsError {
    /// Transient write races are worth retrying with backoff; connectivity
    /// failures are fatal to the calling batch and propagate instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UnileadsError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(UnileadsError::Conflict("race".into()).is_retryable());
        assert!(!UnileadsError::Database("down".into()).is_retryable());
        assert!(!UnileadsError::Timeout("slow".into()).is_retryable());
        assert!(!UnileadsError::Validation("bad".into()).is_retryable());
    }
}
