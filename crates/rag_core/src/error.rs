use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes. The prefix names the backend call that failed.
pub mod codes {
    pub const RETRIEVAL_NETWORK: &str = "RETRIEVAL_NETWORK";
    pub const RETRIEVAL_BACKEND: &str = "RETRIEVAL_BACKEND";
    pub const RETRIEVAL_INVALID_RESPONSE: &str = "RETRIEVAL_INVALID_RESPONSE";

    pub const GENERATION_NETWORK: &str = "GENERATION_NETWORK";
    pub const GENERATION_BACKEND: &str = "GENERATION_BACKEND";
    pub const GENERATION_INVALID_RESPONSE: &str = "GENERATION_INVALID_RESPONSE";

    pub const COLLECTIONS_NETWORK: &str = "COLLECTIONS_NETWORK";
    pub const COLLECTIONS_BACKEND: &str = "COLLECTIONS_BACKEND";
    pub const COLLECTIONS_INVALID_RESPONSE: &str = "COLLECTIONS_INVALID_RESPONSE";
    pub const COLLECTIONS_EMPTY: &str = "COLLECTIONS_EMPTY";

    pub const QUERY_INVALID: &str = "QUERY_INVALID";

    pub const BACKEND_URL_INVALID: &str = "BACKEND_URL_INVALID";
    pub const BACKEND_UNHEALTHY: &str = "BACKEND_UNHEALTHY";
    pub const BACKEND_UNREACHABLE: &str = "BACKEND_UNREACHABLE";

    pub const CONFIG_READ_FAILED: &str = "CONFIG_READ_FAILED";
    pub const CONFIG_PARSE_FAILED: &str = "CONFIG_PARSE_FAILED";
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    pub const INPUT_READ_FAILED: &str = "INPUT_READ_FAILED";
    pub const OUTPUT_ENCODE_FAILED: &str = "OUTPUT_ENCODE_FAILED";
}

/// Single structured error shape used across the core, the clients and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
    /// HTTP status when the error came from a non-success backend response.
    pub status: Option<u16>,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
            status: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// True for any failure of the retrieval/answer endpoint.
    pub fn is_retrieval(&self) -> bool {
        self.code.starts_with("RETRIEVAL_")
    }

    /// True for any failure of the chat-completion endpoint.
    pub fn is_generation(&self) -> bool {
        self.code.starts_with("GENERATION_")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
