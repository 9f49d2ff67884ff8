//! File-backed engine configuration.
//!
//! The config file is JSON. When it does not exist yet it is written out
//! with defaults so server operators have something to edit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use emberrpg_domain::ProgressionRules;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "EMBERRPG_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "configs/emberrpg.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ability: AbilityConfig,
    pub save_queue: SaveQueueConfig,
}

/// Storage connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file (created if missing)
    pub path: String,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection
    pub connect_timeout_secs: u64,
    /// Upper bound on a single query, including lock waits
    pub query_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "emberrpg.db".to_string(),
            max_connections: 5,
            connect_timeout_secs: 5,
            query_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    pub cooldown_secs: u64,
    pub reward_xp: u32,
    /// Sound asset played by the host on a successful cast
    pub cast_sound: String,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: emberrpg_domain::DEFAULT_COOLDOWN_SECS as u64,
            reward_xp: emberrpg_domain::DEFAULT_ABILITY_REWARD,
            cast_sound: "ability_cast.wav".to_string(),
        }
    }
}

/// Background writer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveQueueConfig {
    /// Number of writer lanes; a player always maps to the same lane
    pub workers: usize,
    /// Pending saves per lane before new saves are rejected
    pub lane_capacity: usize,
    /// Retries for transient storage errors (0 = single attempt)
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for SaveQueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            lane_capacity: 256,
            max_retries: 3,
            retry_base_delay_ms: 100,
        }
    }
}

impl SaveQueueConfig {
    /// Exponential backoff: base * 2^(attempt-1)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(factor))
    }
}

impl AppConfig {
    /// Resolve the config path from `EMBERRPG_CONFIG`, falling back to the default.
    pub fn path_from_env() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Read the config at `path`, writing defaults there first if it is missing.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        let config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(io_err)?;
            let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(path = %path.display(), "Loaded config");
            config
        } else {
            let config = Self::default();
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
            let json = serde_json::to_string_pretty(&config).map_err(|source| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            std::fs::write(path, json).map_err(io_err)?;
            tracing::info!(path = %path.display(), "Config file created with defaults");
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.save_queue.workers == 0 {
            return Err(ConfigError::Invalid("save_queue.workers must be at least 1".into()));
        }
        if self.save_queue.lane_capacity == 0 {
            return Err(ConfigError::Invalid(
                "save_queue.lane_capacity must be at least 1".into(),
            ));
        }
        self.rules().map(|_| ())
    }

    pub fn rules(&self) -> Result<ProgressionRules, ConfigError> {
        let cooldown_secs = i64::try_from(self.ability.cooldown_secs)
            .map_err(|_| ConfigError::Invalid("ability.cooldown_secs is too large".into()))?;
        ProgressionRules::new(chrono::Duration::seconds(cooldown_secs), self.ability.reward_xp)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
