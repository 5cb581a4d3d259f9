use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::duration::deserialize_duration;
use crate::nft::{Tier, DEFAULT_NATIVE_CURRENCY, FREE_NFT_LIMIT};

fn default_free_limit() -> usize {
    FREE_NFT_LIMIT
}

fn default_native_currency() -> String {
    DEFAULT_NATIVE_CURRENCY.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn deserialize_secret<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|key| !key.trim().is_empty())
        .map(|key| SecretString::new(key.into())))
}

fn default_opensea_base_url() -> String {
    "https://api.opensea.io".to_string()
}

fn default_coingecko_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

/// OpenSea API settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OpenSeaConfig {
    pub base_url: String,

    /// Sent as `x-api-key`. Requests without one are heavily rate limited.
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,

    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for OpenSeaConfig {
    fn default() -> Self {
        Self {
            base_url: default_opensea_base_url(),
            api_key: None,
            timeout: default_timeout(),
        }
    }
}

/// CoinGecko API settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub base_url: String,

    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: default_coingecko_base_url(),
            timeout: default_timeout(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Premium accounts have no NFT quota.
    pub premium: bool,

    /// NFTs considered per query on the free tier.
    #[serde(default = "default_free_limit")]
    pub free_limit: usize,

    /// Currency the provider reports prices in.
    #[serde(default = "default_native_currency")]
    pub native_currency: String,

    pub opensea: OpenSeaConfig,

    pub coingecko: CoinGeckoConfig,

    /// NFT identifiers hidden from results.
    pub ignored: BTreeSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            premium: false,
            free_limit: default_free_limit(),
            native_currency: default_native_currency(),
            opensea: OpenSeaConfig::default(),
            coingecko: CoinGeckoConfig::default(),
            ignored: BTreeSet::new(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    pub fn tier(&self) -> Tier {
        if self.premium {
            Tier::Premium
        } else {
            Tier::Free {
                limit: self.free_limit,
            }
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub tier: Tier,
    pub native_currency: String,
    pub opensea: OpenSeaConfig,
    pub coingecko: CoinGeckoConfig,
    pub ignored: BTreeSet<String>,
}

impl ResolvedConfig {
    fn from_config(config: Config, config_dir: &Path) -> Self {
        Self {
            data_dir: config.resolve_data_dir(config_dir),
            tier: config.tier(),
            native_currency: config.native_currency.trim().to_uppercase(),
            opensea: config.opensea,
            coingecko: config.coingecko,
            ignored: config.ignored,
        }
    }

    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;
        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::from_config(config, config_dir))
    }

    /// Falls back to defaults when the file doesn't exist, using the file's
    /// intended parent directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self::from_config(Config::default(), config_dir))
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./nftbook.toml` if it exists in current directory
/// 2. `~/.local/share/nftbook/nftbook.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("nftbook.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("nftbook").join("nftbook.toml");
    }

    local_config
}
