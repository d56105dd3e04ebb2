use std::time::Duration;

use anyhow::{Context, Result, ensure};
use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use tracing::warn;

const CONFIG_PATH_VAR: &str = "EARNBOT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/bot.toml";

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/earning_bot";
pub const DEFAULT_SHORTENER_ENDPOINT: &str = "https://gplinks.in/api";
pub const DEFAULT_TARGET_BASE_URL: &str = "https://yourwebsite.com/earn_page";

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    pub shortener: ShortenerConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

impl BotConfig {
    /// Loads `.env`, the optional TOML file and the process environment.
    pub fn load() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!("Ignoring unreadable .env file: {err}");
            }
        }
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Builds the configuration with `lookup` standing in for the environment.
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let configured_path =
            lookup(CONFIG_PATH_VAR).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        ensure!(
            configured_path.len() < 4096,
            "Configuration path length exceeds hard limit"
        );

        let timeout_ms = lookup("GPLINKS_TIMEOUT_MS")
            .map(|raw| raw.trim().parse::<u64>())
            .transpose()
            .context("GPLINKS_TIMEOUT_MS must be a number of milliseconds")?;

        let mut builder = Config::builder()
            .set_default("telegram.token", "")?
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .set_default("database.max_connections", 10_i64)?
            .set_default("shortener.api_key", "")?
            .set_default("shortener.endpoint", DEFAULT_SHORTENER_ENDPOINT)?
            .set_default("shortener.target_base_url", DEFAULT_TARGET_BASE_URL)?
            .add_source(File::new(&configured_path, FileFormat::Toml).required(false))
            .set_override_option("telegram.token", lookup("TELEGRAM_BOT_TOKEN"))?
            .set_override_option("database.url", lookup("DATABASE_URL"))?
            .set_override_option("shortener.api_key", lookup("GPLINKS_API_KEY"))?
            .set_override_option("shortener.endpoint", lookup("GPLINKS_ENDPOINT"))?
            .set_override_option("shortener.target_base_url", lookup("EARN_TARGET_URL"))?
            .set_override_option("shortener.request_timeout_ms", timeout_ms)?;

        if let Some(raw) = lookup("ADMIN_IDS") {
            builder = builder.set_override("admin.ids", parse_admin_ids(&raw))?;
        }

        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, &configured_path))?;
        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize bot configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        self.telegram.token = self.telegram.token.trim().to_string();
        self.shortener.api_key = self.shortener.api_key.trim().to_string();
        ensure!(
            !self.telegram.token.is_empty(),
            "TELEGRAM_BOT_TOKEN environment variable not set"
        );
        ensure!(
            !self.shortener.api_key.is_empty(),
            "GPLINKS_API_KEY environment variable not set"
        );
        ensure!(
            !self.database.url.trim().is_empty(),
            "Database URL must be specified"
        );
        self.database.ensure_bounds()?;
        self.shortener.ensure_bounds()?;
        Ok(())
    }

    pub fn admin_ids(&self) -> &[i64] {
        &self.admin.ids
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: Option<u32>,
}

impl DatabaseConfig {
    fn ensure_bounds(&self) -> Result<()> {
        ensure!(
            self.max_connections >= self.min_connections.unwrap_or(1),
            "Max connections must be >= min connections"
        );
        ensure!(self.max_connections <= 128, "Connection pool oversized");
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShortenerConfig {
    pub api_key: String,
    pub endpoint: String,
    /// Page the short link points at; user id and link sequence are appended.
    pub target_base_url: String,
    pub request_timeout_ms: Option<u64>,
}

impl ShortenerConfig {
    pub fn request_timeout(&self) -> Duration {
        let millis = self.request_timeout_ms.unwrap_or(10_000);
        assert!(millis >= 100, "Shortener timeout must be at least 100ms");
        assert!(millis <= 60_000, "Shortener timeout cannot exceed 60 seconds");
        Duration::from_millis(millis)
    }

    fn ensure_bounds(&self) -> Result<()> {
        if let Some(millis) = self.request_timeout_ms {
            ensure!(
                (100..=60_000).contains(&millis),
                "GPLINKS_TIMEOUT_MS must be between 100 and 60000, got {millis}"
            );
        }
        ensure!(
            self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://"),
            "Shortener endpoint must be an http(s) URL"
        );
        ensure!(
            self.target_base_url.starts_with("http://")
                || self.target_base_url.starts_with("https://"),
            "Earning target URL must be an http(s) URL"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub ids: Vec<i64>,
}

/// Parses the comma-separated `ADMIN_IDS` list, skipping entries that are not user ids.
pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    let mut ids = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        match entry.parse::<i64>() {
            Ok(id) if id > 0 => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            _ => warn!("Skipping invalid admin id {entry:?} in ADMIN_IDS"),
        }
    }
    ids
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}
