use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub backend: BackendConfig,
    pub limits: LimitsConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TRACITY_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TRACITY_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            backend: BackendConfig::from_env_profiled(p),
            limits: LimitsConfig::from_env_profiled(p),
            session: SessionConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  backend:  url={}{}, timeout={}s",
            self.backend.url,
            self.backend.api_prefix,
            self.backend.request_timeout_secs
        );
        tracing::info!(
            "  limits:   unfiltered_full={}, filtered_narrow={}, filtered_full={}, upload_max={}B",
            self.limits.unfiltered_full,
            self.limits.filtered_narrow,
            self.limits.filtered_full,
            self.limits.upload_max_bytes
        );
        tracing::info!(
            "  session:  file={}",
            self.session
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(default)".to_string())
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            backend: BackendConfig::default(),
            limits: LimitsConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

// ── Backend ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub api_prefix: String,
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "TRACITY_BACKEND_URL", "http://localhost:8001"),
            api_prefix: profiled_env_or(p, "TRACITY_API_PREFIX", "/api"),
            request_timeout_secs: profiled_env_u64(p, "TRACITY_REQUEST_TIMEOUT_SECS", 30),
        }
    }

    /// Base URL every endpoint path is appended to.
    pub fn base_url(&self) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8001".to_string(),
            api_prefix: "/api".to_string(),
            request_timeout_secs: 30,
        }
    }
}

// ── Row limits ────────────────────────────────────────────────

/// Row limits sent with visualization requests, keyed by breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Unfiltered public fetch with full breadth. Narrow sends no limit.
    pub unfiltered_full: u32,
    pub filtered_narrow: u32,
    pub filtered_full: u32,
    pub upload_max_bytes: u64,
}

impl LimitsConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            unfiltered_full: profiled_env_u32(p, "TRACITY_LIMIT_UNFILTERED_FULL", d.unfiltered_full),
            filtered_narrow: profiled_env_u32(p, "TRACITY_LIMIT_FILTERED_NARROW", d.filtered_narrow),
            filtered_full: profiled_env_u32(p, "TRACITY_LIMIT_FILTERED_FULL", d.filtered_full),
            upload_max_bytes: profiled_env_u64(p, "TRACITY_UPLOAD_MAX_BYTES", d.upload_max_bytes),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            unfiltered_full: 200,
            filtered_narrow: 100,
            filtered_full: 1000,
            upload_max_bytes: crate::upload::MAX_UPLOAD_BYTES,
        }
    }
}

// ── Session persistence ───────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Override for the persisted session file. `None` uses the user config dir.
    pub file: Option<PathBuf>,
}

impl SessionConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            file: profiled_env_opt(p, "TRACITY_SESSION_FILE").map(PathBuf::from),
        }
    }
}
