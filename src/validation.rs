//! Input validation for lookup requests.

use crate::errors::LookupError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_DOMAIN_LENGTH: usize = 253;

// Labels of [a-z0-9-], 1-63 chars, no leading/trailing hyphen; alphabetic TLD of 2+ chars
static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("hostname pattern is valid")
});

/// Which view of the WHOIS record the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Domain,
    Contact,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Domain => "domain",
            DataType::Contact => "contact",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizes a user supplied domain and checks it against the hostname grammar.
///
/// `None` stands for a missing or non-string value in the request body.
pub fn validate_domain(raw: Option<&str>) -> Result<String, LookupError> {
    let raw = match raw {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(LookupError::InvalidDomain("Domain is required".to_string())),
    };

    let lowered = raw.trim().to_lowercase();
    let domain = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);

    if !HOSTNAME.is_match(domain) {
        return Err(LookupError::InvalidDomain("Invalid domain format".to_string()));
    }

    if domain.len() > MAX_DOMAIN_LENGTH {
        return Err(LookupError::InvalidDomain("Domain name too long".to_string()));
    }

    Ok(domain.to_string())
}

pub fn parse_data_type(raw: Option<&str>) -> Result<DataType, LookupError> {
    match raw {
        Some("domain") => Ok(DataType::Domain),
        Some("contact") => Ok(DataType::Contact),
        _ => Err(LookupError::InvalidDataType),
    }
}
