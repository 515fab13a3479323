//! Client settings with serde defaults.
//!
//! # Design
//! Every field has a default matching the vendor's production endpoints and
//! the transport limits the API expects, so a config file or environment
//! only needs to name what it overrides. The rate-limit wait is computed
//! here so the policy lives next to the numbers that drive it.

use serde::Deserialize;
use std::time::Duration;

/// Endpoints, transport limits and rate-limit policy for a `Client`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_login_base_url")]
    pub login_base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Largest response body read before the exchange is abandoned.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,

    /// Automatic re-issues after a 429 before it is surfaced as an error.
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,

    /// Wait used when a 429 carries no usable `X-Retry-After`.
    #[serde(default = "default_retry_after_secs")]
    pub default_retry_after_secs: u64,

    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_api_base_url() -> String {
    "https://api.bigcommerce.com".to_string()
}
fn default_login_base_url() -> String {
    "https://login.bigcommerce.com".to_string()
}
fn default_user_agent() -> String {
    concat!("storeapi-rust/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> u32 {
    3
}
fn default_max_body_bytes() -> u64 {
    64 * 1024 * 1024
}
fn default_rate_limit_retries() -> u32 {
    1
}
fn default_retry_after_secs() -> u64 {
    1
}
fn default_max_retry_after_secs() -> u64 {
    300
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            login_base_url: default_login_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            max_body_bytes: default_max_body_bytes(),
            rate_limit_retries: default_rate_limit_retries(),
            default_retry_after_secs: default_retry_after_secs(),
            max_retry_after_secs: default_max_retry_after_secs(),
        }
    }
}

impl ClientConfig {
    /// Point both the API and the token endpoint at `base_url`.
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            api_base_url: base.clone(),
            login_base_url: base,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.login_base_url.trim_end_matches('/'))
    }

    /// Wait for a 429 given its `X-Retry-After` value, if any.
    pub fn retry_after(&self, header: Option<&str>) -> Duration {
        let secs = header
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(self.default_retry_after_secs);
        Duration::from_secs(secs.min(self.max_retry_after_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_vendor_conventions() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.token_url(), "https://login.bigcommerce.com/oauth2/token");
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_redirects, 3);
        assert_eq!(cfg.max_body_bytes, 64 * 1024 * 1024);
        assert_eq!(cfg.rate_limit_retries, 1);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: ClientConfig = serde_json::from_str(r#"{"api_base_url":"http://127.0.0.1:9"}"#).unwrap();
        assert_eq!(cfg.api_base_url, "http://127.0.0.1:9");
        assert_eq!(cfg.login_base_url, "https://login.bigcommerce.com");
        assert_eq!(cfg.max_retry_after_secs, 300);
    }

    #[test]
    fn retry_after_parsing() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.retry_after(Some("2")), Duration::from_secs(2));
        assert_eq!(cfg.retry_after(Some(" 7 ")), Duration::from_secs(7));
        assert_eq!(cfg.retry_after(Some("soon")), Duration::from_secs(1));
        assert_eq!(cfg.retry_after(None), Duration::from_secs(1));
        assert_eq!(cfg.retry_after(Some("86400")), Duration::from_secs(300));
    }

    #[test]
    fn with_base_url_trims_slash() {
        let cfg = ClientConfig::with_base_url("http://127.0.0.1:3000/");
        assert_eq!(cfg.api_base_url, "http://127.0.0.1:3000");
        assert_eq!(cfg.token_url(), "http://127.0.0.1:3000/oauth2/token");
    }
}
