use crate::{
    cache::CacheService,
    errors::{LookupError, LookupFailure},
    extract::{extract_contact_info, extract_domain_info},
    provider::WhoisProvider,
    validation::{parse_data_type, validate_domain, DataType},
    LookupData, ResponseEnvelope,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};

/// Body of a lookup request.
///
/// Fields stay untyped so that a missing or non-string value is reported as
/// a validation error rather than a malformed body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupRequest {
    #[serde(default)]
    pub domain: serde_json::Value,
    #[serde(default, rename = "dataType")]
    pub data_type: serde_json::Value,
}

impl LookupRequest {
    pub fn new(domain: &str, data_type: &str) -> Self {
        Self {
            domain: serde_json::Value::String(domain.to_string()),
            data_type: serde_json::Value::String(data_type.to_string()),
        }
    }
}

/// Validates, serves from cache, or fetches and shapes a WHOIS record.
#[derive(Clone)]
pub struct LookupService {
    provider: Arc<dyn WhoisProvider>,
    cache: Arc<CacheService>,
    api_key: Option<String>,
}

impl LookupService {
    pub fn new(provider: Arc<dyn WhoisProvider>, cache: Arc<CacheService>, api_key: Option<String>) -> Self {
        Self { provider, cache, api_key }
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub async fn lookup(&self, request: &LookupRequest) -> Result<ResponseEnvelope, LookupFailure> {
        let start_time = Instant::now();

        self.lookup_inner(request, start_time).await.map_err(|e| {
            let elapsed_ms = elapsed_ms(start_time);
            let domain = request.domain.as_str().unwrap_or_default();

            match &e {
                LookupError::Extraction { reason } => {
                    error!(domain, elapsed_ms, code = e.code(), "Data extraction error: {}", reason)
                }
                _ if e.status_code() >= 500 => {
                    error!(domain, elapsed_ms, code = e.code(), "WHOIS lookup error: {}", e)
                }
                _ => warn!(domain, elapsed_ms, code = e.code(), "WHOIS lookup rejected: {}", e),
            }

            LookupFailure::new(e, elapsed_ms)
        })
    }

    async fn lookup_inner(&self, request: &LookupRequest, start_time: Instant) -> Result<ResponseEnvelope, LookupError> {
        let domain = validate_domain(request.domain.as_str())?;
        let data_type = parse_data_type(request.data_type.as_str())?;
        debug!(domain = %domain, data_type = %data_type, "Lookup request validated");

        let cache_key = CacheService::key(&domain, data_type);
        if let Some(cached) = self.cache.get(&cache_key).await {
            let response_time = elapsed_ms(start_time);
            info!(domain = %domain, elapsed_ms = response_time, "Cache hit for {}", domain);
            return Ok(ResponseEnvelope {
                cached: true,
                response_time,
                ..cached
            });
        }

        let api_key = self.api_key.as_deref().ok_or(LookupError::MissingApiKey)?;

        info!("Fetching WHOIS data for domain: {} (type: {})", domain, data_type);
        let response = self.provider.fetch_whois(&domain, api_key).await?;

        let record = response
            .record()
            .ok_or_else(|| LookupError::NoDataFound(domain.clone()))?;

        let data = match data_type {
            DataType::Domain => LookupData::Domain(extract_domain_info(record)?),
            DataType::Contact => LookupData::Contact(extract_contact_info(record)?),
        };

        let envelope = ResponseEnvelope {
            success: true,
            data_type,
            domain: domain.clone(),
            data,
            cached: false,
            response_time: elapsed_ms(start_time),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        self.cache.set(&cache_key, envelope.clone()).await;
        info!(domain = %domain, elapsed_ms = envelope.response_time, "WHOIS lookup completed");

        Ok(envelope)
    }
}

fn elapsed_ms(start_time: Instant) -> u64 {
    start_time.elapsed().as_millis() as u64
}
