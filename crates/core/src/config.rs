use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

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

/// Default data directory: `~/.local/share/certwatch`, or `data` when the
/// platform has no user data dir.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("certwatch"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub watcher: WatcherConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CERTWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("CERTWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            storage: StorageConfig::from_env_profiled(p),
            api: ApiConfig::from_env_profiled(p),
            watcher: WatcherConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject values the rest of the system cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.watcher.horizon_days == 0 {
            return Err(CoreError::Config("horizon_days must be at least 1".into()));
        }
        if self.watcher.horizon_days > MAX_HORIZON_DAYS {
            return Err(CoreError::Config(format!(
                "horizon_days must be at most {MAX_HORIZON_DAYS}"
            )));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(CoreError::Config("api base_url is empty".into()));
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  storage:  data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  api:      base_url={}, token={}, timeout={}s",
            self.api.base_url,
            if self.api.token.is_some() { "(set)" } else { "(none)" },
            self.api.timeout_secs
        );
        tracing::info!("  watcher:  horizon_days={}", self.watcher.horizon_days);
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: profiled_env_opt(p, "CERTWATCH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
        }
    }
}

// ── Customer API ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl ApiConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            base_url: profiled_env_or(p, "CERTWATCH_API_URL", "http://localhost:5000/api"),
            token: profiled_env_opt(p, "CERTWATCH_API_TOKEN"),
            timeout_secs: profiled_env_u64(p, "CERTWATCH_FETCH_TIMEOUT_SECS", 10),
        }
    }
}

// ── Watcher ───────────────────────────────────────────────────

/// Upper bound accepted for `CERTWATCH_HORIZON_DAYS` (about a century).
pub const MAX_HORIZON_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Days ahead of now in which an expiry counts as "soon".
    pub horizon_days: u32,
}

impl WatcherConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            horizon_days: profiled_env_u32(p, "CERTWATCH_HORIZON_DAYS", 30),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { horizon_days: 30 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        env::set_var("CWTEST_CERTWATCH_HORIZON_DAYS", "14");
        env::set_var("CERTWATCH_API_URL", "http://base.example");
        let config = Config::for_profile("cwtest");
        assert_eq!(config.profile, "CWTEST");
        assert_eq!(config.watcher.horizon_days, 14);
        assert_eq!(config.api.base_url, "http://base.example");
        env::remove_var("CWTEST_CERTWATCH_HORIZON_DAYS");
        env::remove_var("CERTWATCH_API_URL");
    }

    #[test]
    fn validate_bounds_horizon() {
        let mut config = Config::for_profile("cwvalidate");
        config.api.base_url = "http://x".into();
        config.watcher.horizon_days = 0;
        assert!(config.validate().is_err());
        config.watcher.horizon_days = 30;
        assert!(config.validate().is_ok());
        config.watcher.horizon_days = MAX_HORIZON_DAYS;
        assert!(config.validate().is_ok());
        config.watcher.horizon_days = MAX_HORIZON_DAYS + 1;
        assert!(config.validate().is_err());
        config.watcher.horizon_days = u32::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn token_is_not_serialized() {
        let mut config = Config::for_profile("cwredact");
        config.api.token = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
