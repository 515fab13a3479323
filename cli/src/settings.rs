use anyhow::{Context, Result};
use serde::Deserialize;
use storeapi_core::{ClientConfig, Credentials};

/// Top-level CLI configuration
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

/// Store and app credentials
#[derive(Clone, Deserialize)]
pub struct StoreConfig {
    /// e.g. `stores/abc123`
    pub context: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("STOREAPI").separator("__"))
            .build()?;

        cfg.try_deserialize().context(
            "incomplete configuration: set store.context, store.client_id and store.client_secret \
             (config/local.toml or STOREAPI__STORE__* variables)",
        )
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.store.context.clone(),
            self.store.client_id.clone(),
            self.store.client_secret.clone(),
            self.store.token.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_section_is_optional() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{"store":{"context":"stores/abc","client_id":"id","client_secret":"s"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.client.max_redirects, 3);
        let creds = cfg.credentials();
        assert_eq!(creds.store_context, "stores/abc");
        assert!(creds.token.is_none());
    }

    #[test]
    fn client_overrides_apply() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{"store":{"context":"stores/abc","client_id":"id","client_secret":"s","token":"t"},
                "client":{"api_base_url":"http://127.0.0.1:3000","rate_limit_retries":2}}"#,
        )
        .unwrap();
        assert_eq!(cfg.client.api_base_url, "http://127.0.0.1:3000");
        assert_eq!(cfg.client.rate_limit_retries, 2);
        assert_eq!(cfg.credentials().token.as_deref(), Some("t"));
    }
}
