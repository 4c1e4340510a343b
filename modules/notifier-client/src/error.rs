use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotifierError>;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response status from notifier {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl From<reqwest::Error> for NotifierError {
    fn from(err: reqwest::Error) -> Self {
        NotifierError::Network(err.to_string())
    }
}
