use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

/// Minimum length of the session signing secret, in bytes.
pub const MIN_SIGNING_SECRET_BYTES: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Absent means accounts are kept in memory.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    pub session: SessionConfig,
    pub external_provider: ExternalProviderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub signing_secret: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExternalProviderConfig {
    pub name: String,
    pub client_id: String,
    pub issuers: Vec<String>,
    pub jwks_uri: String,
    pub key_cache_ttl_secs: u64,
    pub fetch_timeout_ms: u64,
    pub leeway_secs: i64,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (SESSION__SIGNING_SECRET, DATABASE__URL, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .set_default("server.http_port", 8000)?
            .set_default("session.token_ttl_minutes", 30)?
            .set_default("external_provider.name", "google")?
            .set_default(
                "external_provider.issuers",
                vec!["https://accounts.google.com", "accounts.google.com"],
            )?
            .set_default(
                "external_provider.jwks_uri",
                "https://www.googleapis.com/oauth2/v3/certs",
            )?
            .set_default("external_provider.key_cache_ttl_secs", 3600)?
            .set_default("external_provider.fetch_timeout_ms", 3000)?
            .set_default("external_provider.leeway_secs", 60)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: EXTERNAL_PROVIDER__ISSUERS=a,b overrides external_provider.issuers
            .add_source(
                Environment::default()
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("external_provider.issuers")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the service cannot run safely with.
    ///
    /// # Errors
    /// * `Message` - Describes the first invalid setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.signing_secret.len() < MIN_SIGNING_SECRET_BYTES {
            return Err(ConfigError::Message(format!(
                "session.signing_secret must be at least {} bytes",
                MIN_SIGNING_SECRET_BYTES
            )));
        }
        if self.session.token_ttl_minutes <= 0 {
            return Err(ConfigError::Message(
                "session.token_ttl_minutes must be positive".to_string(),
            ));
        }
        if self.external_provider.client_id.trim().is_empty() {
            return Err(ConfigError::Message(
                "external_provider.client_id must be set".to_string(),
            ));
        }
        if self
            .external_provider
            .issuers
            .iter()
            .all(|issuer| issuer.trim().is_empty())
        {
            return Err(ConfigError::Message(
                "external_provider.issuers must name at least one issuer".to_string(),
            ));
        }
        if self.database.as_ref().is_some_and(|db| db.url.trim().is_empty()) {
            return Err(ConfigError::Message("database.url must not be empty".to_string()));
        }

        Ok(())
    }
}
