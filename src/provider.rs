//! Outbound client for the WHOIS data provider.
//!
//! One request per lookup, no retries. Transport and HTTP failures are
//! folded into [`LookupError`] kinds before they reach the handler.

use crate::{config::Config, errors::LookupError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Top level of the provider's JSON document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderResponse {
    /// Left untyped here so a malformed record surfaces as an extraction error.
    #[serde(rename = "WhoisRecord", default)]
    pub whois_record: Option<serde_json::Value>,
}

impl ProviderResponse {
    /// The record, unless the provider sent none (or an explicit `null`).
    pub fn record(&self) -> Option<&serde_json::Value> {
        self.whois_record.as_ref().filter(|record| !record.is_null())
    }
}

#[async_trait]
pub trait WhoisProvider: Send + Sync {
    async fn fetch_whois(&self, domain: &str, api_key: &str) -> Result<ProviderResponse, LookupError>;
}

pub struct WhoisXmlClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl WhoisXmlClient {
    pub fn new(config: &Config) -> Result<Self, LookupError> {
        let endpoint = Url::parse(&config.whois_api_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.whois_timeout_seconds))
            .user_agent(concat!("whois-lookup-api/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| LookupError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        info!("WHOIS provider client initialized for {}", endpoint);
        info!("Upstream timeout: {}s", config.whois_timeout_seconds);

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl WhoisProvider for WhoisXmlClient {
    async fn fetch_whois(&self, domain: &str, api_key: &str) -> Result<ProviderResponse, LookupError> {
        debug!("Querying WHOIS provider for {}", domain);

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("apiKey", api_key),
                ("domainName", domain),
                ("outputFormat", "JSON"),
                ("da", "1"),
                ("ip", "1"),
            ])
            .send()
            .await?;

        if let Some(error) = classify_status(response.status(), domain) {
            return Err(error);
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::InvalidResponse
            }
        })?;

        debug!("Provider response length: {} bytes", body.len());
        parse_body(&body)
    }
}

/// Maps a provider status code to an error kind; `None` for success.
pub fn classify_status(status: StatusCode, domain: &str) -> Option<LookupError> {
    match status.as_u16() {
        401 => Some(LookupError::Authentication),
        403 => Some(LookupError::QuotaExceeded),
        429 => Some(LookupError::RateLimited),
        _ if status.is_success() => None,
        _ if status.is_server_error() => Some(LookupError::Upstream(format!("provider returned {}", status))),
        _ => Some(LookupError::NoDataFound(domain.to_string())),
    }
}

pub fn parse_body(body: &str) -> Result<ProviderResponse, LookupError> {
    if body.trim().is_empty() {
        return Err(LookupError::InvalidResponse);
    }

    let value: serde_json::Value = serde_json::from_str(body).map_err(|_| LookupError::InvalidResponse)?;
    if !value.is_object() {
        return Err(LookupError::InvalidResponse);
    }

    serde_json::from_value(value).map_err(|_| LookupError::InvalidResponse)
}
