use std::time::Duration;

use crate::error::{AppError, Result};

pub const DEFAULT_BASE_URL: &str = "https://apiv3.loop.software/api";
pub const DEFAULT_MAIL_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Clone)]
pub struct EstateConfig {
    pub base_url: String,
    pub api_key: String,
    pub key_header: String,
}

impl Default for EstateConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            key_header: "x-api-key".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub fast_page_size: usize,
    pub full_page_size: usize,
    pub fast_timeout: Duration,
    pub full_timeout: Duration,
    pub cache_ttl: Duration,
    pub fallback_limit: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            fast_page_size: 30,
            full_page_size: 100,
            fast_timeout: Duration::from_millis(1200),
            full_timeout: Duration::from_millis(2500),
            cache_ttl: Duration::from_secs(60),
            fallback_limit: 12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub env_name: String,
    pub request_timeout: Duration,
    pub estate: EstateConfig,
    pub lookup: LookupConfig,
    pub mail: Option<MailConfig>,
    pub force_lead_to: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            var(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |name: &str, default: u64| -> Result<u64> {
            match get(name) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map_err(|e| AppError::config(format!("{} must be a number ({}): {}", name, raw, e))),
                None => Ok(default),
            }
        };

        let defaults = LookupConfig::default();
        let lookup = LookupConfig {
            fast_timeout: Duration::from_millis(number(
                "ESTATE_FAST_TIMEOUT_MS",
                defaults.fast_timeout.as_millis() as u64,
            )?),
            full_timeout: Duration::from_millis(number(
                "ESTATE_TIMEOUT_MS",
                defaults.full_timeout.as_millis() as u64,
            )?),
            cache_ttl: Duration::from_secs(number(
                "LOOKUP_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            ..defaults
        };

        let estate_defaults = EstateConfig::default();
        let estate = EstateConfig {
            base_url: get("ESTATE_BASE_URL").unwrap_or(estate_defaults.base_url),
            api_key: get("ESTATE_API_KEY").unwrap_or_default(),
            key_header: get("ESTATE_KEY_HEADER").unwrap_or(estate_defaults.key_header),
        };

        let mail = get("MAIL_API_KEY").map(|api_key| {
            let from_email = get("LEAD_FROM_EMAIL").unwrap_or_default();
            MailConfig {
                api_url: get("MAIL_API_URL").unwrap_or_else(|| DEFAULT_MAIL_API_URL.to_string()),
                api_key,
                from_name: get("LEAD_FROM_NAME").unwrap_or_else(|| "Voice Agent".to_string()),
                from_email,
            }
        });

        let port = number("PORT", 8080)?;
        let port = u16::try_from(port)
            .map_err(|_| AppError::config(format!("PORT out of range: {}", port)))?;

        Ok(Self {
            port,
            env_name: get("APP_ENV").unwrap_or_else(|| "production".to_string()),
            request_timeout: Duration::from_secs(number("REQUEST_TIMEOUT_SECS", 8)?),
            estate,
            lookup,
            mail,
            force_lead_to: get("FORCE_LEAD_EMAIL_TO"),
        })
    }
}
