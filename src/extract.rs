//! Flattens the provider's WHOIS record into the two views served to clients.
//!
//! Every provider field is optional. Missing or empty values fall back to
//! [`NOT_AVAILABLE`] instead of failing the lookup; only a record that is not
//! shaped like an object with the expected field types is an extraction error.

use crate::errors::LookupError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

pub const NOT_AVAILABLE: &str = "N/A";

const REDACTION_MARKER: &str = "REDACTED";
const REGISTRAR_IDS_URL: &str = "https://www.iana.org/assignments/registrar-ids/registrar-ids.xhtml";
const HOSTNAMES_MAX_LEN: usize = 25;
const HOSTNAMES_CUT_LEN: usize = 22;
const HOSTNAMES_MIN_COMMA: usize = 10;

/// The `WhoisRecord` object returned by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoisRecord {
    #[serde(default)]
    pub registry_data: Option<RegistryData>,
    #[serde(default)]
    pub contact_info: Option<ContactSection>,
    /// Some records carry registry facts at the top level instead.
    #[serde(flatten)]
    pub top_level: RegistryData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryData {
    pub domain_name: Option<String>,
    pub registrar_name: Option<String>,
    pub created_date: Option<String>,
    pub expires_date: Option<String>,
    pub updated_date: Option<String>,
    pub status: Option<String>,
    pub name_servers: Option<NameServers>,
    #[serde(rename = "registrarIANAID")]
    pub registrar_iana_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NameServers {
    pub host_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactSection {
    pub registrant: Option<Contact>,
    pub technical: Option<Contact>,
    pub administrative: Option<Contact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub name: Option<String>,
    pub organization: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainInfo {
    pub domain_name: String,
    pub registrar: String,
    pub registration_date: String,
    pub expiration_date: String,
    pub estimated_domain_age: String,
    pub hostnames: String,
    pub status: String,
    pub last_updated: String,
    pub registrar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub registrant_name: String,
    pub technical_contact_name: String,
    pub administrative_contact_name: String,
    pub contact_email: String,
    pub registrant_country: String,
    pub registrant_state: String,
    pub registrant_city: String,
    pub privacy_protected: bool,
}

impl Default for ContactInfo {
    fn default() -> Self {
        Self {
            registrant_name: NOT_AVAILABLE.to_string(),
            technical_contact_name: NOT_AVAILABLE.to_string(),
            administrative_contact_name: NOT_AVAILABLE.to_string(),
            contact_email: NOT_AVAILABLE.to_string(),
            registrant_country: NOT_AVAILABLE.to_string(),
            registrant_state: NOT_AVAILABLE.to_string(),
            registrant_city: NOT_AVAILABLE.to_string(),
            privacy_protected: false,
        }
    }
}

pub fn extract_domain_info(raw: &serde_json::Value) -> Result<DomainInfo, LookupError> {
    Ok(WhoisRecord::parse(raw)?.domain_info(Utc::now()))
}

pub fn extract_contact_info(raw: &serde_json::Value) -> Result<ContactInfo, LookupError> {
    Ok(WhoisRecord::parse(raw)?.contact_info())
}

impl WhoisRecord {
    pub fn parse(raw: &serde_json::Value) -> Result<Self, LookupError> {
        if !raw.is_object() {
            return Err(LookupError::Extraction {
                reason: format!("WhoisRecord is not an object: {}", json_kind(raw)),
            });
        }
        serde_json::from_value(raw.clone()).map_err(|e| LookupError::Extraction { reason: e.to_string() })
    }

    /// Registry facts come from `registryData` when the provider sent one.
    pub fn registry(&self) -> &RegistryData {
        self.registry_data.as_ref().unwrap_or(&self.top_level)
    }

    pub fn domain_info(&self, now: DateTime<Utc>) -> DomainInfo {
        let registry = self.registry();
        let created = present(&registry.created_date);

        DomainInfo {
            domain_name: or_na(present(&registry.domain_name)),
            registrar: or_na(present(&registry.registrar_name)),
            registration_date: format_date(created),
            expiration_date: format_date(present(&registry.expires_date)),
            estimated_domain_age: domain_age(created, now),
            hostnames: registry
                .name_servers
                .as_ref()
                .and_then(|ns| ns.host_names.as_deref())
                .map(format_hostnames)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            status: or_na(present(&registry.status)),
            last_updated: format_date(present(&registry.updated_date)),
            registrar_url: if registry.registrar_iana_id.as_ref().is_some_and(is_truthy) {
                REGISTRAR_IDS_URL.to_string()
            } else {
                NOT_AVAILABLE.to_string()
            },
        }
    }

    pub fn contact_info(&self) -> ContactInfo {
        let contacts = self.contact_info.clone().unwrap_or_default();
        let registrant = contacts.registrant.unwrap_or_default();
        let technical = contacts.technical.unwrap_or_default();
        let administrative = contacts.administrative.unwrap_or_default();

        let redacted = |value: Option<&str>| value.is_some_and(|v| v.contains(REDACTION_MARKER));
        let privacy_protected =
            redacted(self.registry().domain_name.as_deref()) || redacted(registrant.name.as_deref());

        ContactInfo {
            registrant_name: display_name(&registrant),
            technical_contact_name: display_name(&technical),
            administrative_contact_name: display_name(&administrative),
            contact_email: or_na(
                present(&registrant.email)
                    .or_else(|| present(&administrative.email))
                    .or_else(|| present(&technical.email)),
            ),
            registrant_country: or_na(present(&registrant.country)),
            registrant_state: or_na(present(&registrant.state)),
            registrant_city: or_na(present(&registrant.city)),
            privacy_protected,
        }
    }
}

fn display_name(contact: &Contact) -> String {
    or_na(present(&contact.name).or_else(|| present(&contact.organization)))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn or_na(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Approximate age of a registration, e.g. `2 years, 3 months`.
///
/// Years are 365 days and months 30 days of the remainder; calendar lengths
/// and leap years are ignored.
pub fn describe_age(registered: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if registered > now {
        return "Future date".to_string();
    }

    let days = (now - registered).num_days();
    let years = days / 365;
    let months = (days % 365) / 30;

    if years > 0 {
        if months > 0 {
            return format!("{}, {}", plural(years, "year"), plural(months, "month"));
        }
        plural(years, "year")
    } else if months > 0 {
        plural(months, "month")
    } else {
        plural(days, "day")
    }
}

pub fn domain_age(created: Option<&str>, now: DateTime<Utc>) -> String {
    match created.and_then(parse_date) {
        Some(registered) => describe_age(registered, now),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn plural(count: i64, unit: &str) -> String {
    format!("{} {}{}", count, unit, if count > 1 { "s" } else { "" })
}

/// Deduplicated, sorted, comma separated name servers, shortened past 25 characters.
pub fn format_hostnames(host_names: &[String]) -> String {
    let unique: BTreeSet<&str> = host_names.iter().map(String::as_str).collect();
    if unique.is_empty() {
        return NOT_AVAILABLE.to_string();
    }

    let joined = unique.into_iter().collect::<Vec<_>>().join(", ");
    if joined.chars().count() <= HOSTNAMES_MAX_LEN {
        return joined;
    }

    let truncated: Vec<char> = joined.chars().take(HOSTNAMES_CUT_LEN).collect();
    let cut = match truncated.iter().rposition(|c| *c == ',') {
        Some(comma) if comma > HOSTNAMES_MIN_COMMA => comma,
        _ => truncated.len(),
    };

    format!("{}...", truncated[..cut].iter().collect::<String>())
}

/// Renders a provider date as `Sep 15, 1997` in UTC.
pub fn format_date(value: Option<&str>) -> String {
    match value {
        None => NOT_AVAILABLE.to_string(),
        Some(raw) => match parse_date(raw) {
            Some(date) => date.format("%b %-d, %Y").to_string(),
            None => "Invalid date".to_string(),
        },
    }
}

/// Parse the date layouts commonly found in WHOIS records
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let date_str = date_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Some(dt.with_timezone(&Utc));
    }

    let offset_formats = [
        "%Y-%m-%dT%H:%M:%S%z",             // 1997-09-15T07:00:00+0000
        "%Y-%m-%dT%H:%M:%S%.f%z",          // 1997-09-15T07:00:00.000+0000
        "%Y-%m-%d %H:%M:%S%z",             // 1997-09-15 07:00:00+0000
        "%Y-%m-%d %H:%M:%S %z",            // 1997-09-15 07:00:00 +0000
    ];

    for format in &offset_formats {
        if let Ok(dt) = DateTime::parse_from_str(date_str, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive_formats = [
        "%Y-%m-%dT%H:%M:%S%.fZ",           // 2025-05-18T13:36:06.0Z
        "%Y-%m-%dT%H:%M:%S%.f",            // 2025-05-18T13:36:06
        "%Y-%m-%d %H:%M:%S%.f",            // 2025-05-18 13:36:06
        "%Y-%m-%d %H:%M:%S UTC",           // 2025-05-18 13:36:06 UTC
    ];

    for format in &naive_formats {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Some(DateTime::from_naive_utc_and_offset(naive_dt, Utc));
        }
    }

    // Date only, assume midnight UTC
    let date_only_formats = [
        "%Y-%m-%d",
        "%d-%b-%Y",
        "%d %b %Y",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d.%m.%Y",
    ];

    for format in &date_only_formats {
        if let Ok(naive_date) = NaiveDate::parse_from_str(date_str, format) {
            if let Some(naive_dt) = naive_date.and_hms_opt(0, 0, 0) {
                return Some(DateTime::from_naive_utc_and_offset(naive_dt, Utc));
            }
        }
    }

    debug!("Failed to parse date: {}", date_str);
    None
}
