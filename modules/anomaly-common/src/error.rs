use thiserror::Error;

/// Crosses the rolling-store / marshaller / pipeline boundary. Distinguishes
/// transient I/O failures (re-delivered by the consumer's retry machinery)
/// from permanent-for-this-message failures (logged, offset advances).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("retryable: {0}")]
    Retry(#[source] anyhow::Error),

    #[error("ignored: {0}")]
    Ignore(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    pub fn retry(msg: impl Into<String>) -> Self {
        CoreError::Retry(anyhow::anyhow!(msg.into()))
    }

    pub fn ignore(msg: impl Into<String>) -> Self {
        CoreError::Ignore(anyhow::anyhow!(msg.into()))
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, CoreError::Retry(_))
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, CoreError::Ignore(_))
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
