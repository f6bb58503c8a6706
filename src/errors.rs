#[cfg(feature = "server")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::error::Error as StdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("{0}")]
    InvalidDomain(String),

    #[error("Data type must be either \"domain\" or \"contact\"")]
    InvalidDataType,

    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    #[error("WHOIS API key not configured")]
    MissingApiKey,

    #[error("DNS resolution failed - unable to connect to WHOIS service")]
    Dns,

    #[error("Connection refused by WHOIS service")]
    Connection,

    #[error("Invalid or expired API key")]
    Authentication,

    #[error("API quota exceeded or access denied")]
    QuotaExceeded,

    #[error("Rate limit exceeded - please try again later")]
    RateLimited,

    #[error("Request timeout - the WHOIS service is taking too long to respond")]
    Timeout,

    #[error("Invalid response from WHOIS service")]
    InvalidResponse,

    #[error("No WHOIS data found for this domain")]
    NoDataFound(String),

    /// The reason is kept for logs only; clients get the generic message.
    #[error("Failed to process WHOIS data")]
    Extraction { reason: String },

    #[error("Internal server error occurred during WHOIS lookup")]
    Upstream(String),

    #[error("Invalid provider URL: {0}")]
    ProviderUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

impl LookupError {
    /// Machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::InvalidDomain(_) => "INVALID_DOMAIN",
            LookupError::InvalidDataType => "INVALID_DATA_TYPE",
            LookupError::InvalidRequest(_) => "INVALID_REQUEST",
            LookupError::MissingApiKey => "MISSING_API_KEY",
            LookupError::Dns => "DNS_ERROR",
            LookupError::Connection => "CONNECTION_ERROR",
            LookupError::Authentication => "AUTHENTICATION_ERROR",
            LookupError::QuotaExceeded => "QUOTA_EXCEEDED",
            LookupError::RateLimited => "RATE_LIMITED",
            LookupError::Timeout => "TIMEOUT_ERROR",
            LookupError::InvalidResponse => "INVALID_RESPONSE",
            LookupError::NoDataFound(_) => "NO_DATA_FOUND",
            LookupError::Extraction { .. } => "EXTRACTION_ERROR",
            LookupError::Upstream(_)
            | LookupError::ProviderUrl(_)
            | LookupError::ConfigError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            LookupError::InvalidDomain(_)
            | LookupError::InvalidDataType
            | LookupError::InvalidRequest(_) => 400,
            LookupError::Authentication => 401,
            LookupError::QuotaExceeded => 403,
            LookupError::NoDataFound(_) => 404,
            LookupError::Timeout => 408,
            LookupError::RateLimited => 429,
            LookupError::InvalidResponse => 502,
            LookupError::Dns | LookupError::Connection => 503,
            LookupError::MissingApiKey
            | LookupError::Extraction { .. }
            | LookupError::Upstream(_)
            | LookupError::ProviderUrl(_)
            | LookupError::ConfigError(_) => 500,
        }
    }

    /// JSON error body: `{error, code}` plus `domain` for missing records.
    pub fn body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        if let LookupError::NoDataFound(domain) = self {
            body["domain"] = serde_json::Value::String(domain.clone());
        }
        body
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return LookupError::Timeout;
        }
        if is_dns_failure(&err) {
            return LookupError::Dns;
        }
        if err.is_connect() || is_connection_drop(&err) {
            return LookupError::Connection;
        }
        LookupError::Upstream(err.to_string())
    }
}

/// Walks the source chain looking for the resolver's failure message.
fn is_dns_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        let message = e.to_string().to_lowercase();
        if message.contains("dns error") || message.contains("failed to lookup address") {
            return true;
        }
        current = e.source();
    }
    false
}

fn is_connection_drop(err: &(dyn StdError + 'static)) -> bool {
    use std::io::ErrorKind;

    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
            ) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// A failed lookup together with the time spent before it failed.
#[derive(Debug)]
pub struct LookupFailure {
    pub error: LookupError,
    pub response_time_ms: u64,
}

impl LookupFailure {
    pub fn new(error: LookupError, response_time_ms: u64) -> Self {
        Self { error, response_time_ms }
    }
}

#[cfg(feature = "server")]
impl IntoResponse for LookupFailure {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut body = self.error.body();
        body["responseTime"] = serde_json::Value::from(self.response_time_ms);

        (status, Json(body)).into_response()
    }
}
