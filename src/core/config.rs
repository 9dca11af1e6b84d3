use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_BUDA_URL: &str = "https://www.buda.com/api/v2";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BudaProviderConfig {
    pub base_url: String,
    /// Upper bound for one fetch, retries included.
    pub timeout_secs: u64,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for BudaProviderConfig {
    fn default() -> Self {
        BudaProviderConfig {
            base_url: DEFAULT_BUDA_URL.to_string(),
            timeout_secs: 5,
            retries: 2,
            retry_delay_ms: 300,
        }
    }
}

impl BudaProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub buda: BudaProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PricingConfig {
    /// Freshness window for quotes; 0 disables quote caching.
    pub quote_ttl_secs: u64,
    pub markets_ttl_secs: u64,
    /// Intermediate currencies tried, in order, for two-hop conversion.
    pub bridge_currencies: Vec<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            quote_ttl_secs: 5,
            markets_ttl_secs: 300,
            bridge_currencies: vec!["BTC".to_string(), "USDC".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub pricing: PricingConfig,
}

impl AppConfig {
    /// Loads the config file at `path`, or the default config file if it
    /// exists, or built-in defaults. Environment overrides apply last.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::load_from_path(&default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    AppConfig::default()
                }
            }
        };
        config.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "folioval", "folioval")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("FOLIOVAL_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Some(url) = lookup("FOLIOVAL_PRICE_API_URL") {
            self.providers.buda.base_url = url;
        }
        if let Some(timeout) = lookup("FOLIOVAL_PRICE_API_TIMEOUT_SECS") {
            self.providers.buda.timeout_secs = timeout
                .parse()
                .with_context(|| format!("Invalid FOLIOVAL_PRICE_API_TIMEOUT_SECS: {timeout}"))?;
        }
        Ok(())
    }

    pub fn default_yaml() -> Result<String> {
        serde_yaml::to_string(&AppConfig::default()).context("Failed to serialize default config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
server:
  bind_address: "127.0.0.1:9000"
providers:
  buda:
    base_url: "http://example.com/buda"
    timeout_secs: 2
pricing:
  quote_ttl_secs: 0
  bridge_currencies: ["USDC"]
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.providers.buda.base_url, "http://example.com/buda");
        assert_eq!(config.providers.buda.timeout(), Duration::from_secs(2));
        // Unset fields fall back to defaults
        assert_eq!(config.providers.buda.retries, 2);
        assert_eq!(config.pricing.quote_ttl_secs, 0);
        assert_eq!(config.pricing.markets_ttl_secs, 300);
        assert_eq!(config.pricing.bridge_currencies, vec!["USDC".to_string()]);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.providers.buda.base_url, DEFAULT_BUDA_URL);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("FOLIOVAL_BIND_ADDRESS", "127.0.0.1:1234"),
            ("FOLIOVAL_PRICE_API_URL", "http://localhost:9999"),
            ("FOLIOVAL_PRICE_API_TIMEOUT_SECS", "7"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:1234");
        assert_eq!(config.providers.buda.base_url, "http://localhost:9999");
        assert_eq!(config.providers.buda.timeout_secs, 7);
    }

    #[test]
    fn test_invalid_timeout_override() {
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "FOLIOVAL_PRICE_API_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "server:\n  bind_address: \"127.0.0.1:7000\"\n").unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:7000");
        assert_eq!(config.pricing, PricingConfig::default());
    }

    #[test]
    fn test_default_yaml_round_trips() {
        let yaml = AppConfig::default_yaml().unwrap();
        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
