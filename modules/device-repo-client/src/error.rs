use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeviceRepoError>;

#[derive(Debug, Error)]
pub enum DeviceRepoError {
    #[error("network error: {0}")]
    Network(String),

    #[error("device repository returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for DeviceRepoError {
    fn from(err: reqwest::Error) -> Self {
        DeviceRepoError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for DeviceRepoError {
    fn from(err: serde_json::Error) -> Self {
        DeviceRepoError::Parse(err.to_string())
    }
}
