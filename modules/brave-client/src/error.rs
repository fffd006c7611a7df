use thiserror::Error;

pub type Result<T> = std::result::Result<T, BraveError>;

#[derive(Debug, Error)]
pub enum BraveError {
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 403: the subscription token was rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BraveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BraveError::Parse(err.to_string())
        } else {
            BraveError::Network(err.to_string())
        }
    }
}
