use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};
use crate::periods::Granularity;

/// Overrides `api.base_url`.
pub const ENV_API_URL: &str = "COSTBOARD_API_URL";
/// Overrides `api.timeout`, in integer milliseconds.
pub const ENV_API_TIMEOUT_MS: &str = "COSTBOARD_API_TIMEOUT_MS";

const CONFIG_FILE_NAME: &str = "costboard.toml";

fn default_base_url() -> String {
    "http://localhost:3001/api".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_token_env() -> String {
    "COSTBOARD_API_TOKEN".to_string()
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,

    /// Overall per-request timeout.
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,

    /// Environment variable holding the bearer token.
    pub token_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            token_env: default_token_env(),
        }
    }
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

/// Dashboard snapshot memoization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    #[serde(
        default = "default_cache_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// How many top transactions to request per flow.
    pub top_transactions_limit: u32,

    /// Period granularity used when the command line does not pick one.
    pub default_period_type: Granularity,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_transactions_limit: 5,
            default_period_type: Granularity::Monthly,
        }
    }
}

/// Display/output formatting configuration.
///
/// Purely presentational; calculations always use exact decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Decimal places shown for amounts. Pesos are shown without decimals.
    pub currency_decimals: u32,

    pub currency_symbol: String,

    pub thousands_separator: String,

    pub decimal_separator: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_decimals: 0,
            currency_symbol: "$".to_string(),
            thousands_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub dashboard: DashboardConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `COSTBOARD_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        if let Some(ms) = lookup(ENV_API_TIMEOUT_MS).filter(|v| !v.trim().is_empty()) {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("{ENV_API_TIMEOUT_MS} must be an integer, got {ms:?}"))?;
            self.api.timeout = Duration::from_millis(ms);
        }
        Ok(())
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./costboard.toml` if it exists in current directory
/// 2. `<config dir>/costboard/costboard.toml`
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("costboard").join(CONFIG_FILE_NAME);
    }

    local_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:3001/api");
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.api.token_env, "COSTBOARD_API_TOKEN");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.dashboard.top_transactions_limit, 5);
        assert_eq!(config.dashboard.default_period_type, Granularity::Monthly);
        assert_eq!(config.display.currency_decimals, 0);
        assert_eq!(config.display.thousands_separator, ".");
    }

    #[test]
    fn test_load_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("costboard.toml");
        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.api.base_url, default_base_url());
        Ok(())
    }

    #[test]
    fn test_load_partial_sections() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("costboard.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[api]")?;
        writeln!(file, "base_url = \"https://erp.example.cl/api\"")?;
        writeln!(file, "timeout = \"1500ms\"")?;
        writeln!(file, "[cache]")?;
        writeln!(file, "enabled = false")?;
        writeln!(file, "[dashboard]")?;
        writeln!(file, "default_period_type = \"quarterly\"")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.api.base_url, "https://erp.example.cl/api");
        assert_eq!(config.api.timeout, Duration::from_millis(1500));
        assert_eq!(config.api.token_env, "COSTBOARD_API_TOKEN");
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.dashboard.default_period_type, Granularity::Quarterly);
        assert_eq!(config.dashboard.top_transactions_limit, 5);
        Ok(())
    }

    #[test]
    fn test_invalid_duration_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("costboard.toml");
        std::fs::write(&config_path, "[api]\ntimeout = \"soon\"\n")?;

        let err = Config::load(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
        Ok(())
    }

    #[test]
    fn test_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::load_or_default(&dir.path().join("missing.toml"))?;
        assert_eq!(config.api.base_url, default_base_url());
        Ok(())
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let vars: HashMap<&str, &str> = [
            (ENV_API_URL, "http://10.0.0.5:3001/api"),
            (ENV_API_TIMEOUT_MS, "2500"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()))?;
        assert_eq!(config.api.base_url, "http://10.0.0.5:3001/api");
        assert_eq!(config.api.timeout, Duration::from_millis(2500));
        Ok(())
    }

    #[test]
    fn test_bad_timeout_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|name| {
            (name == ENV_API_TIMEOUT_MS).then(|| "fast".to_string())
        });
        assert!(result.is_err());
        assert_eq!(config.api.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_serializes_back_to_toml() -> Result<()> {
        let rendered = toml::to_string(&Config::default())?;
        assert!(rendered.contains("timeout = \"30s\""));
        assert!(rendered.contains("ttl = \"5m\""));
        let parsed: Config = toml::from_str(&rendered)?;
        assert_eq!(parsed.api.timeout, Duration::from_secs(30));
        Ok(())
    }
}
