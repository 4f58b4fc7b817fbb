#[derive(Debug, thiserror::Error)]
pub enum OpalError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlParseError(String),

    #[error("Opal request failed with status code {status}: {message}")]
    HttpError {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Invalid connection parameters: {0}")]
    InvalidConnectionParameters(String),
}

pub type Result<T, E = OpalError> = std::result::Result<T, E>;
