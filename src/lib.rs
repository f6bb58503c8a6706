//! # WHOIS Lookup API
//!
//! A small HTTP service in front of a WHOIS data provider.
//!
//! ## Features
//!
//! - Strict domain validation before any network call
//! - Five minute in-memory response cache with an injectable clock
//! - Single upstream call per miss, with failures mapped to stable error codes
//! - Provider records flattened into domain and contact views
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use whois_lookup_api::{CacheService, Config, LookupRequest, LookupService, WhoisXmlClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let provider = Arc::new(WhoisXmlClient::new(&config)?);
//!     let service = LookupService::new(provider, Arc::new(CacheService::new()), config.whois_api_key.clone());
//!
//!     let request = LookupRequest::new("example.com", "domain");
//!     match service.lookup(&request).await {
//!         Ok(envelope) => println!("{}", serde_json::to_string_pretty(&envelope)?),
//!         Err(failure) => eprintln!("{} ({})", failure.error, failure.error.code()),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod errors;
pub mod extract;
pub mod lookup;
pub mod provider;
pub mod validation;

#[cfg(feature = "server")]
pub mod metrics;
#[cfg(feature = "server")]
pub mod server;

// Re-export main types for easy access
pub use cache::CacheService;
pub use config::Config;
pub use errors::{LookupError, LookupFailure};
pub use extract::{ContactInfo, DomainInfo};
pub use lookup::{LookupRequest, LookupService};
pub use provider::{WhoisProvider, WhoisXmlClient};
pub use validation::DataType;

use serde::{Deserialize, Serialize};

/// Payload of a successful lookup, shaped by the requested data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupData {
    Domain(DomainInfo),
    Contact(ContactInfo),
}

/// Response structure for lookups; this is also what the cache stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub success: bool,
    pub data_type: DataType,
    pub domain: String,
    pub data: LookupData,
    pub cached: bool,
    /// Milliseconds spent serving this request.
    pub response_time: u64,
    /// ISO-8601 UTC time at which the data was fetched.
    pub timestamp: String,
}
