use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeviceSelectionError>;

#[derive(Debug, Error)]
pub enum DeviceSelectionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("device selection service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for DeviceSelectionError {
    fn from(err: reqwest::Error) -> Self {
        DeviceSelectionError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for DeviceSelectionError {
    fn from(err: serde_json::Error) -> Self {
        DeviceSelectionError::Parse(err.to_string())
    }
}
