use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_COUNTRIES_BASE_URL: &str = "https://restcountries.com";
pub const DEFAULT_RATES_BASE_URL: &str = "https://open.er-api.com";
pub const DEFAULT_BASE_CURRENCY: &str = "USD";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CountriesProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExchangeRatesProviderConfig {
    pub base_url: String,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
}

fn default_base_currency() -> String {
    DEFAULT_BASE_CURRENCY.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProvidersConfig {
    pub countries: CountriesProviderConfig,
    pub exchange_rates: ExchangeRatesProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            countries: CountriesProviderConfig {
                base_url: DEFAULT_COUNTRIES_BASE_URL.to_string(),
            },
            exchange_rates: ExchangeRatesProviderConfig {
                base_url: DEFAULT_RATES_BASE_URL.to_string(),
                base_currency: default_base_currency(),
            },
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    pub database_url: Option<String>,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            providers: ProvidersConfig::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            database_url: None,
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the default config file if it exists, falling back to defaults.
    /// Environment overrides are applied on top either way.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!(path = %config_path.display(), "No config file, using defaults");
            Self::default()
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "cgdp", "cgdp")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "cgdp", "cgdp")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Loads an explicit config file and applies environment overrides.
    pub fn load_with_env<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Ok(Self::load_from_path(path)?.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies `COUNTRY_API_URL`, `EXCHANGE_RATE_API_URL`, `DATABASE_URL`, `HOST`,
    /// `PORT` and `CGDP_DATA_PATH` from `lookup`. Empty values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("COUNTRY_API_URL") {
            self.providers.countries.base_url = url;
        }
        if let Some(url) = var("EXCHANGE_RATE_API_URL") {
            self.providers.exchange_rates.base_url = url;
        }
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        match var("PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(port)) => self.server.port = port,
            Some(Err(e)) => debug!(error = %e, "Ignoring invalid PORT"),
            None => {}
        }
        if let Some(path) = var("CGDP_DATA_PATH") {
            self.data_path = Some(path);
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connection URL for the store; defaults to a SQLite file in the data path.
    pub fn database_url(&self) -> Result<String> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }
        let path = self.default_data_path()?.join("cgdp.db");
        Ok(format!("sqlite://{}", path.display()))
    }

    /// Location of the rendered summary image.
    pub fn summary_image_path(&self) -> Result<PathBuf> {
        Ok(self.default_data_path()?.join("cache").join("summary.png"))
    }
}
