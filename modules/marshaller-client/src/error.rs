use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarshallerError>;

#[derive(Debug, Error)]
pub enum MarshallerError {
    #[error("network error: {0}")]
    Network(String),

    #[error("marshaller service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no output path found for criteria")]
    NoOutputPath,
}

impl From<reqwest::Error> for MarshallerError {
    fn from(err: reqwest::Error) -> Self {
        MarshallerError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for MarshallerError {
    fn from(err: serde_json::Error) -> Self {
        MarshallerError::Parse(err.to_string())
    }
}
