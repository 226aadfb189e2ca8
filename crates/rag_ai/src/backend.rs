use std::time::Duration;

use rag_core::error::{codes, AppError};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const HEALTH_TIMEOUT: Duration = Duration::from_millis(800);

/// Connection settings for one HTTP backend. Each client owns its own, so retrieval and
/// generation can point at different servers (or at different test stubs).
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    /// Create a client rooted at `base_url`. Only absolute `http`/`https` URLs with a host
    /// are accepted; a trailing slash is trimmed.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        check_base_url(&base_url).map_err(|reason| {
            AppError::new(codes::BACKEND_URL_INVALID, "Backend base URL is not usable")
                .with_details(format!("base_url={base_url}; reason={reason}"))
        })?;
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `path` must start with `/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        self.check_endpoint("/health")
    }

    /// Short GET against `path`; any 2xx counts as healthy.
    pub fn check_endpoint(&self, path: &str) -> Result<(), AppError> {
        let url = self.endpoint(path);
        let resp = ureq::get(&url).timeout(HEALTH_TIMEOUT).call();

        match resp {
            Ok(r) if (200..300).contains(&r.status()) => Ok(()),
            Ok(r) => Err(unhealthy(r.status())),
            Err(ureq::Error::Status(status, _)) => Err(unhealthy(status)),
            Err(e) => Err(AppError::new(
                codes::BACKEND_UNREACHABLE,
                "Failed to reach backend",
            )
            .with_details(format!("url={url}; err={e}"))
            .with_retryable(true)),
        }
    }
}

fn unhealthy(status: u16) -> AppError {
    AppError::new(codes::BACKEND_UNHEALTHY, "Backend health check failed")
        .with_details(format!("status={status}"))
        .with_status(status)
}

fn check_base_url(raw: &str) -> Result<(), &'static str> {
    // The URL parser normalizes these away, so the string we later format requests from
    // would differ from the one that was checked.
    if raw.contains('\\') || raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("whitespace, control characters and backslashes are not allowed");
    }
    let url = Url::parse(raw).map_err(|_| "not an absolute URL")?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err("scheme must be http or https");
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("host is empty");
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err("userinfo is not allowed");
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("query strings and fragments are not allowed");
    }
    if url.port() == Some(0) {
        return Err("port must be in 1..=65535");
    }
    Ok(())
}

/// Which backend call a response belongs to; picks the error codes for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackendCall {
    Retrieval,
    Generation,
    Collections,
}

impl BackendCall {
    fn label(self) -> &'static str {
        match self {
            BackendCall::Retrieval => "RAG query",
            BackendCall::Generation => "Chat completion",
            BackendCall::Collections => "Collections listing",
        }
    }

    fn network_code(self) -> &'static str {
        match self {
            BackendCall::Retrieval => codes::RETRIEVAL_NETWORK,
            BackendCall::Generation => codes::GENERATION_NETWORK,
            BackendCall::Collections => codes::COLLECTIONS_NETWORK,
        }
    }

    fn backend_code(self) -> &'static str {
        match self {
            BackendCall::Retrieval => codes::RETRIEVAL_BACKEND,
            BackendCall::Generation => codes::GENERATION_BACKEND,
            BackendCall::Collections => codes::COLLECTIONS_BACKEND,
        }
    }

    fn invalid_code(self) -> &'static str {
        match self {
            BackendCall::Retrieval => codes::RETRIEVAL_INVALID_RESPONSE,
            BackendCall::Generation => codes::GENERATION_INVALID_RESPONSE,
            BackendCall::Collections => codes::COLLECTIONS_INVALID_RESPONSE,
        }
    }

    pub(crate) fn invalid(self, message: impl Into<String>) -> AppError {
        AppError::new(self.invalid_code(), message)
    }

    /// Turn a finished request into the success body, or a typed error carrying the status
    /// and body of a non-success response.
    pub(crate) fn read_body(
        self,
        url: &str,
        resp: Result<ureq::Response, ureq::Error>,
    ) -> Result<String, AppError> {
        let r = match resp {
            Ok(r) => r,
            Err(ureq::Error::Status(status, r)) => {
                let body = r
                    .into_string()
                    .unwrap_or_else(|e| format!("<unreadable response body: {e}>"));
                return Err(self.backend_error(status, body));
            }
            Err(e) => {
                return Err(AppError::new(
                    self.network_code(),
                    format!("Failed to call {} endpoint", self.label()),
                )
                .with_details(format!("url={url}; err={e}"))
                .with_retryable(true))
            }
        };

        let status = r.status();
        let body = r.into_string().map_err(|e| {
            AppError::new(
                self.network_code(),
                format!("Failed to read {} response", self.label()),
            )
            .with_details(e.to_string())
            .with_retryable(true)
        })?;
        if !(200..300).contains(&status) {
            return Err(self.backend_error(status, body));
        }
        Ok(body)
    }

    fn backend_error(self, status: u16, body: String) -> AppError {
        AppError::new(
            self.backend_code(),
            format!("{} failed with status {status}", self.label()),
        )
        .with_status(status)
        .with_details(body)
    }

    pub(crate) fn decode<T: serde::de::DeserializeOwned>(self, body: &str) -> Result<T, AppError> {
        serde_json::from_str(body).map_err(|e| {
            self.invalid(format!("Failed to decode {} response", self.label()))
                .with_details(e.to_string())
        })
    }

    pub(crate) fn encode<T: serde::Serialize>(self, req: &T) -> Result<serde_json::Value, AppError> {
        serde_json::to_value(req).map_err(|e| {
            AppError::new(
                self.invalid_code(),
                format!("Failed to encode {} request", self.label()),
            )
            .with_details(e.to_string())
        })
    }
}
