use std::path::PathBuf;

/// Every way a pipeline stage can fail. Stages never recover from these:
/// the error is logged by the binary and the process exits non-zero.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Missing API key: set OPENAI_API_KEY or DEEPSEEK_API_KEY")]
    MissingCredential,

    #[error("Malformed model response for '{word}': {reason}")]
    MalformedResponse { word: String, reason: String },

    #[error("{service} request failed: {message}")]
    RemoteApi { service: String, message: String },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid template: {0}")]
    Template(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    pub fn remote(service: &str, message: impl Into<String>) -> Self {
        PipelineError::RemoteApi {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn malformed(word: &str, reason: impl Into<String>) -> Self {
        PipelineError::MalformedResponse {
            word: word.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
