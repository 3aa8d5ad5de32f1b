// src/utils/error.rs
use thiserror::Error;

// Errors raised while turning the input PDF into text. Always fatal.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Could not read document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a readable PDF ({path}): {reason}")]
    Pdf { path: String, reason: String },
}

// Errors talking to the inference backend. Recovered per section.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP error {status}: {body}")]
    Http { status: reqwest::StatusCode, body: String },

    #[error("Gemini rate limit exceeded")]
    RateLimited,

    #[error("Prompt blocked by the backend: {0}")]
    Blocked(String),

    #[error("Backend returned no text")]
    EmptyResponse,
}

impl InferenceError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            InferenceError::Timeout | InferenceError::RateLimited => true,
            InferenceError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            InferenceError::Http { status, .. } => status.is_server_error(),
            InferenceError::Blocked(_) | InferenceError::EmptyResponse => false,
        }
    }
}

// The model answered, but not with a valid section result.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("No JSON object found in model response")]
    NoJsonFound,

    #[error("Response does not match the record schema: {0}")]
    Invalid(#[from] serde_json::Error),
}

// Anything that degrades a single section to an empty sheet.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Schema validation failed: {0}")]
    Schema(#[from] SchemaError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document load failed: {0}")]
    Document(#[from] DocumentError),

    #[error("Could not build inference client: {0}")]
    Client(#[from] InferenceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
