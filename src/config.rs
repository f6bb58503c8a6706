use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const DEFAULT_PROVIDER_URL: &str = "https://www.whoisxmlapi.com/whoisserver/WhoisService";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub frontend_url: String,
    pub whois_api_key: Option<String>,
    pub whois_api_url: String,
    pub whois_timeout_seconds: u64,
    pub environment: String,
    pub start_time: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigData {
    pub port: u16,
    pub frontend_url: String,
    #[serde(default)]
    pub whois_api_key: Option<String>,
    pub whois_api_url: String,
    pub whois_timeout_seconds: u64,
    pub environment: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut settings = config::Config::builder()
            .set_default("port", Self::get_default_port())?
            .set_default("frontend_url", "http://localhost:3000")?
            .set_default("whois_api_url", DEFAULT_PROVIDER_URL)?
            .set_default("whois_timeout_seconds", 15_u64)?
            .set_default("environment", "development")?;

        // Override with environment variables if present
        settings = Self::apply_env_overrides(settings)?;

        let config_data: ConfigData = settings.build()?.try_deserialize()?;

        Ok(Config {
            port: config_data.port,
            frontend_url: config_data.frontend_url,
            // An empty key is treated the same as no key at all
            whois_api_key: config_data.whois_api_key.filter(|key| !key.trim().is_empty()),
            whois_api_url: config_data.whois_api_url,
            whois_timeout_seconds: config_data.whois_timeout_seconds,
            environment: config_data.environment,
            start_time: Instant::now(),
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    fn get_default_port() -> u16 {
        // Check common environment variables for port
        std::env::var("PORT")
            .or_else(|_| std::env::var("HTTP_PORT"))
            .or_else(|_| std::env::var("SERVER_PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000)
    }

    fn apply_env_overrides(mut settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        // Later entries win when several aliases are set
        let env_mappings = [
            ("PORT", "port"),
            ("ALLOWED_ORIGIN", "frontend_url"),
            ("FRONTEND_URL", "frontend_url"),
            ("WHOIS_API_KEY", "whois_api_key"),
            ("WHOIS_API_URL", "whois_api_url"),
            ("WHOIS_TIMEOUT", "whois_timeout_seconds"),
            ("WHOIS_TIMEOUT_SECONDS", "whois_timeout_seconds"),
            ("NODE_ENV", "environment"),
            ("ENV", "environment"),
            ("ENVIRONMENT", "environment"),
        ];

        for (env_var, config_key) in env_mappings {
            if let Ok(value) = std::env::var(env_var) {
                settings = settings.set_override(config_key, value)?;
            }
        }

        Ok(settings)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            frontend_url: "http://localhost:3000".to_string(),
            whois_api_key: None,
            whois_api_url: DEFAULT_PROVIDER_URL.to_string(),
            whois_timeout_seconds: 15,
            environment: "development".to_string(),
            start_time: Instant::now(),
        }
    }
}
