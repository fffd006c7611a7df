use thiserror::Error;

pub type Result<T> = std::result::Result<T, HeyGenError>;

#[derive(Debug, Error)]
pub enum HeyGenError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for HeyGenError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HeyGenError::Parse(err.to_string())
        } else {
            HeyGenError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for HeyGenError {
    fn from(err: serde_json::Error) -> Self {
        HeyGenError::Parse(err.to_string())
    }
}
