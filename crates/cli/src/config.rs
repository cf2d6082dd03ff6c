use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use tracity_core::{ChartType, Config};
use tracity_explorer::FileSessionStore;

/// CLI configuration loaded from TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Backend base URL, e.g. http://localhost:8001
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Where the signed-in session is persisted
    #[serde(default)]
    pub session_file: Option<PathBuf>,

    /// Chart used by `explore` when --chart is not given
    #[serde(default)]
    pub default_chart: Option<String>,
}

impl CliConfig {
    /// Return the default config directory path: ~/.config/tracity/
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("tracity");
        Ok(config_dir)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// Returns default config if the file does not exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };
        Self::load_from(&config_path)
    }

    fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            debug!(?config_path, "Loading config");
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("failed to read config: {}", config_path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("failed to parse config: {}", config_path.display()))?;
            Ok(config)
        } else {
            debug!(?config_path, "Config file not found, using defaults");
            let config = Self::default();
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let toml_str = toml::to_string_pretty(&config)
                .context("failed to serialize default config")?;
            std::fs::write(config_path, toml_str).ok();
            Ok(config)
        }
    }

    /// Resolve the backend URL.
    /// Priority: cli_override > TRACITY_BACKEND_URL > config file > built-in default.
    pub fn resolve_backend_url(&self, cli_override: Option<&str>, env: &Config) -> String {
        if let Some(url) = cli_override {
            return url.to_string();
        }
        if env_is_set("TRACITY_BACKEND_URL", &env.profile) {
            return env.backend.url.clone();
        }
        self.backend_url
            .clone()
            .unwrap_or_else(|| env.backend.url.clone())
    }

    /// Resolve the session file.
    /// Priority: TRACITY_SESSION_FILE > config file > user config dir.
    pub fn resolve_session_file(&self, env: &Config) -> Result<PathBuf> {
        if let Some(path) = &env.session.file {
            return Ok(path.clone());
        }
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        FileSessionStore::default_path().context("could not determine user config directory")
    }

    /// Priority: cli_override > config file > bar.
    pub fn resolve_chart(&self, cli_override: Option<ChartType>) -> Result<ChartType> {
        if let Some(chart) = cli_override {
            return Ok(chart);
        }
        match &self.default_chart {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("invalid default_chart in config"),
            None => Ok(ChartType::default()),
        }
    }
}

fn env_is_set(key: &str, profile: &str) -> bool {
    let set = |k: &str| std::env::var(k).is_ok_and(|v| !v.is_empty());
    (!profile.is_empty() && set(&format!("{}_{}", profile, key))) || set(key)
}
