//! Client configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_RECAPTCHA_KEY: &str = "RECAPTCHA_SITE_KEY";
pub const ENV_CACHE_TTL_MS: &str = "CRITICART_CACHE_TTL_MS";

/// Settings for connecting to the hosted backend and tuning the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Project URL of the hosted backend.
    #[serde(default)]
    pub supabase_url: String,

    /// Public (anonymous) API key.
    #[serde(default)]
    pub anon_key: String,

    /// Site key for the captcha widget on the sign-in forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recaptcha_site_key: Option<String>,

    /// Lifetime of cached reads.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Total upload attempts, including the first.
    #[serde(default = "default_upload_max_attempts")]
    pub upload_max_attempts: u32,

    /// Upload backoff step; attempt `n` waits `n * step`.
    #[serde(default = "default_upload_backoff_ms")]
    pub upload_backoff_ms: u64,

    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Storage bucket for review images and videos.
    #[serde(default = "default_media_bucket")]
    pub media_bucket: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_cache_ttl_ms() -> u64 {
    300_000
}

fn default_upload_max_attempts() -> u32 {
    3
}

fn default_upload_backoff_ms() -> u64 {
    1000
}

fn default_page_size() -> u32 {
    criticart_core::DEFAULT_PAGE_SIZE
}

fn default_media_bucket() -> String {
    "media".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            anon_key: String::new(),
            recaptcha_site_key: None,
            cache_ttl_ms: default_cache_ttl_ms(),
            upload_max_attempts: default_upload_max_attempts(),
            upload_backoff_ms: default_upload_backoff_ms(),
            default_page_size: default_page_size(),
            media_bucket: default_media_bucket(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn new(supabase_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            anon_key: anon_key.into(),
            ..Default::default()
        }
    }

    /// Load config from a file. `.json` files are JSON, anything else TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Read config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read config through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self {
            supabase_url: lookup(ENV_URL).unwrap_or_default(),
            anon_key: lookup(ENV_ANON_KEY).unwrap_or_default(),
            recaptcha_site_key: lookup(ENV_RECAPTCHA_KEY).filter(|v| !v.is_empty()),
            ..Default::default()
        };
        if let Some(ttl) = lookup(ENV_CACHE_TTL_MS) {
            config.cache_ttl_ms = ttl
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", ENV_CACHE_TTL_MS))?;
        }
        Ok(config)
    }

    /// Names of required settings that are missing.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.supabase_url.trim().is_empty() {
            missing.push("supabase_url");
        }
        if self.anon_key.trim().is_empty() {
            missing.push("anon_key");
        }
        missing
    }

    /// Fail if any required setting is missing.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_keys();
        if !missing.is_empty() {
            anyhow::bail!("Missing required configuration: {}", missing.join(", "));
        }
        if self.upload_max_attempts == 0 {
            anyhow::bail!("upload_max_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn upload_backoff(&self) -> Duration {
        Duration::from_millis(self.upload_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
