use thiserror::Error;

#[derive(Error, Debug)]
pub enum AskDbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("query execution failed: {0}")]
    QueryExecution(String),

    #[error("model provider error: {0}")]
    Provider(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

impl From<rusqlite::Error> for AskDbError {
    fn from(e: rusqlite::Error) -> Self {
        AskDbError::QueryExecution(e.to_string())
    }
}

impl From<reqwest::Error> for AskDbError {
    fn from(e: reqwest::Error) -> Self {
        AskDbError::Provider(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AskDbError>;
