use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::recommend::orchestrator::RecommendSettings;
use crate::recommend::rank::RankPolicy;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EventMatchConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    /// Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RecommendationConfig {
    pub max_results: usize,
    pub similarity_threshold: f32,
    pub category_boost: f32,
    /// Query text used when a user has neither bio nor interests.
    pub fallback_query: String,
}

impl Default for EventMatchConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            recommendation: RecommendationConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 7420,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_eventmatch_dir()
            .join("events.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "text-embedding-3-small".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            dimensions: 1536,
            request_timeout_secs: 30,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            similarity_threshold: 0.2,
            category_boost: 0.2,
            fallback_query: "events I might like".into(),
        }
    }
}

impl EmbeddingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RecommendationConfig {
    /// Ranking policy with the configured boost and threshold, capped at `limit`
    /// when given, otherwise at `max_results`. A zero override is raised to 1.
    pub fn policy(&self, limit: Option<usize>) -> RankPolicy {
        RankPolicy {
            category_boost: self.category_boost,
            similarity_threshold: self.similarity_threshold,
            limit: limit.map(|l| l.max(1)).unwrap_or(self.max_results),
        }
    }

    pub fn settings(&self, limit: Option<usize>) -> RecommendSettings {
        RecommendSettings {
            policy: self.policy(limit),
            fallback_query: self.fallback_query.clone(),
        }
    }
}

/// Returns `~/.eventmatch/`
pub fn default_eventmatch_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".eventmatch")
}

/// Returns the default config file path: `~/.eventmatch/config.toml`
pub fn default_config_path() -> PathBuf {
    default_eventmatch_dir().join("config.toml")
}

impl EventMatchConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EventMatchConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (EVENTMATCH_DB, EVENTMATCH_LOG_LEVEL,
    /// EVENTMATCH_EMBEDDING_BASE_URL, OPENAI_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EVENTMATCH_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("EVENTMATCH_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("EVENTMATCH_EMBEDDING_BASE_URL") {
            self.embedding.base_url = val;
        }
        if self.embedding.api_key.is_none() {
            if let Ok(val) = std::env::var("OPENAI_API_KEY") {
                self.embedding.api_key = Some(val);
            }
        }
    }

    /// Reject settings that would corrupt or empty every ranking.
    pub fn validate(&self) -> Result<()> {
        self.recommendation
            .policy(None)
            .validate()
            .context("invalid [recommendation] config")?;
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
