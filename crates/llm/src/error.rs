use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Model server unreachable: {0}")]
    Unreachable(String),

    #[error("Model server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Model returned non-parseable output: {reason}; raw: {raw}")]
    Malformed { reason: String, raw: String },
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Unreachable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
