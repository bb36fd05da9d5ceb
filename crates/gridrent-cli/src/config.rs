use crate::{CliError, Result};
use gridrent_core::{RateTier, TierSchedule, DEFAULT_UTILIZATION_HOURS};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const TOKEN_ENV: &str = "GRIDRENT_API_TOKEN";
pub const BASE_URL_ENV: &str = "GRIDRENT_API_URL";

/// Keys accepted by `config get/set/unset`
pub const KEYS: &[&str] = &[
    "api.token",
    "api.base_url",
    "api.timeout_secs",
    "pricing.base_rate",
    "pricing.currency",
    "provider.wallet",
    "provider.hours_per_day",
];

/// Configuration-specific errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Invalid pricing tiers: {0}")]
    InvalidTiers(String),

    #[error("Config directory creation failed: {0}")]
    DirectoryCreationFailed(String),

    #[error("TOML parsing error: {0}")]
    TomlError(String),
}

/// `[api]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiSection {
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// One `[[pricing.tiers]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierEntry {
    pub min_vram_gb: f64,
    pub hourly_rate: f64,
}

/// `[pricing]` section. Any field left out falls back to the built-in rate card.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PricingSection {
    pub base_rate: Option<f64>,
    pub currency: Option<String>,
    pub tiers: Option<Vec<TierEntry>>,
}

/// `[provider]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderSection {
    pub wallet: Option<String>,
    pub hours_per_day: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigData {
    pub api: Option<ApiSection>,
    pub pricing: Option<PricingSection>,
    pub provider: Option<ProviderSection>,
}

impl gridrent_api::ApiConfig for Config {
    type Error = CliError;

    fn get_api_token(&self) -> std::result::Result<Option<String>, Self::Error> {
        Ok(self.api_token())
    }

    fn get_base_url(&self) -> std::result::Result<Option<String>, Self::Error> {
        Ok(self.base_url())
    }

    fn get_timeout(&self) -> std::result::Result<Option<Duration>, Self::Error> {
        Ok(self
            .data
            .api
            .as_ref()
            .and_then(|api| api.timeout_secs)
            .map(Duration::from_secs))
    }
}

/// Configuration manager that handles loading, saving, and accessing
/// `~/.gridrent/config.toml`
#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub data: ConfigData,
}

impl Config {
    /// Load from the default location, or start empty if no file exists yet
    pub fn new() -> Result<Self> {
        Self::load_from(default_config_path()?)
    }

    /// Load from an explicit path
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = path.into();

        let data = if config_path.exists() {
            debug!("Loading config from {}", config_path.display());
            let content = fs::read_to_string(&config_path).map_err(CliError::Io)?;
            toml::from_str(&content).map_err(|e| ConfigError::TomlError(e.to_string()))?
        } else {
            debug!("No config at {}, using defaults", config_path.display());
            ConfigData::default()
        };

        Ok(Config { config_path, data })
    }

    /// Save the configuration to file with atomic write
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(&self.data)
            .map_err(|e| ConfigError::TomlError(e.to_string()))?;

        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::DirectoryCreationFailed(e.to_string()))?;
            }
        }

        // Write to a temporary file first, then rename (atomic operation)
        let temp_path = self.config_path.with_extension("tmp");
        fs::write(&temp_path, &content).map_err(CliError::Io)?;
        fs::rename(&temp_path, &self.config_path).map_err(CliError::Io)?;

        debug!("Saved config to {}", self.config_path.display());
        Ok(())
    }

    /// API token, checking the environment first
    pub fn api_token(&self) -> Option<String> {
        if let Some(token) = env_override(TOKEN_ENV) {
            return Some(token);
        }
        self.data.api.as_ref().and_then(|api| api.token.clone())
    }

    /// Base URL, checking the environment first
    pub fn base_url(&self) -> Option<String> {
        if let Some(url) = env_override(BASE_URL_ENV) {
            return Some(url);
        }
        self.data.api.as_ref().and_then(|api| api.base_url.clone())
    }

    pub fn currency(&self) -> String {
        self.data
            .pricing
            .as_ref()
            .and_then(|p| p.currency.clone())
            .unwrap_or_else(|| "USD".to_string())
    }

    pub fn wallet(&self) -> Option<String> {
        self.data.provider.as_ref().and_then(|p| p.wallet.clone())
    }

    pub fn hours_per_day(&self) -> f64 {
        self.data
            .provider
            .as_ref()
            .and_then(|p| p.hours_per_day)
            .unwrap_or(DEFAULT_UTILIZATION_HOURS)
    }

    /// The rate card, with `[pricing]` overrides applied over the defaults
    pub fn tier_schedule(&self) -> Result<TierSchedule> {
        let pricing = match &self.data.pricing {
            Some(p) if p.tiers.is_some() || p.base_rate.is_some() => p,
            _ => return Ok(TierSchedule::default()),
        };

        let defaults = TierSchedule::default();
        let tiers = match &pricing.tiers {
            Some(entries) => entries
                .iter()
                .map(|t| RateTier::new(t.min_vram_gb, t.hourly_rate))
                .collect(),
            None => defaults.tiers().to_vec(),
        };
        let base_rate = pricing.base_rate.unwrap_or(defaults.base_rate());

        debug!(
            "Using configured rate card: {} tiers, base {}",
            tiers.len(),
            base_rate
        );
        TierSchedule::new(tiers, base_rate)
            .map_err(|e| ConfigError::InvalidTiers(e.to_string()).into())
    }

    /// Show all configuration as TOML, with the token masked
    pub fn show_config(&self) -> String {
        let mut data = self.data.clone();
        if let Some(token) = data.api.as_mut().and_then(|api| api.token.as_mut()) {
            *token = mask_secret(token);
        }
        toml::to_string_pretty(&data).unwrap_or_else(|_| "Error formatting config".to_string())
    }

    /// Read a value as stored in the file (environment overrides not applied)
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let api = self.data.api.as_ref();
        let pricing = self.data.pricing.as_ref();
        let provider = self.data.provider.as_ref();

        let value = match key {
            "api.token" => api.and_then(|a| a.token.clone()),
            "api.base_url" => api.and_then(|a| a.base_url.clone()),
            "api.timeout_secs" => api.and_then(|a| a.timeout_secs).map(|v| v.to_string()),
            "pricing.base_rate" => pricing.and_then(|p| p.base_rate).map(|v| v.to_string()),
            "pricing.currency" => pricing.and_then(|p| p.currency.clone()),
            "provider.wallet" => provider.and_then(|p| p.wallet.clone()),
            "provider.hours_per_day" => {
                provider.and_then(|p| p.hours_per_day).map(|v| v.to_string())
            }
            other => return Err(ConfigError::UnknownKey(other.to_string()).into()),
        };
        Ok(value)
    }

    /// Set a value, checking its type. Call `save` to persist.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "api.token" => self.api_mut().token = Some(non_empty(key, value)?),
            "api.base_url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid(key, value));
                }
                self.api_mut().base_url = Some(value.trim_end_matches('/').to_string());
            }
            "api.timeout_secs" => {
                let secs: u64 = value.parse().map_err(|_| invalid(key, value))?;
                if secs == 0 {
                    return Err(invalid(key, value));
                }
                self.api_mut().timeout_secs = Some(secs);
            }
            "pricing.base_rate" => {
                let rate = non_negative(key, value)?;
                let previous = self.pricing_mut().base_rate.replace(rate);
                if let Err(e) = self.tier_schedule() {
                    self.pricing_mut().base_rate = previous;
                    self.prune_empty_sections();
                    return Err(e);
                }
            }
            "pricing.currency" => {
                let code = non_empty(key, value)?.to_ascii_uppercase();
                if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(invalid(key, value));
                }
                self.pricing_mut().currency = Some(code);
            }
            "provider.wallet" => self.provider_mut().wallet = Some(non_empty(key, value)?),
            "provider.hours_per_day" => {
                let hours = non_negative(key, value)?;
                if hours > 24.0 {
                    return Err(invalid(key, value));
                }
                self.provider_mut().hours_per_day = Some(hours);
            }
            other => return Err(ConfigError::UnknownKey(other.to_string()).into()),
        }
        Ok(())
    }

    /// Remove a value. Returns whether anything was set.
    pub fn unset_value(&mut self, key: &str) -> Result<bool> {
        let had = self.get_value(key)?.is_some();
        match key {
            "api.token" => self.api_mut().token = None,
            "api.base_url" => self.api_mut().base_url = None,
            "api.timeout_secs" => self.api_mut().timeout_secs = None,
            "pricing.base_rate" => self.pricing_mut().base_rate = None,
            "pricing.currency" => self.pricing_mut().currency = None,
            "provider.wallet" => self.provider_mut().wallet = None,
            "provider.hours_per_day" => self.provider_mut().hours_per_day = None,
            other => return Err(ConfigError::UnknownKey(other.to_string()).into()),
        }
        self.prune_empty_sections();
        Ok(had)
    }

    fn api_mut(&mut self) -> &mut ApiSection {
        self.data.api.get_or_insert_with(ApiSection::default)
    }

    fn pricing_mut(&mut self) -> &mut PricingSection {
        self.data.pricing.get_or_insert_with(PricingSection::default)
    }

    fn provider_mut(&mut self) -> &mut ProviderSection {
        self.data.provider.get_or_insert_with(ProviderSection::default)
    }

    fn prune_empty_sections(&mut self) {
        if self.data.api.as_ref() == Some(&ApiSection::default()) {
            self.data.api = None;
        }
        if self.data.pricing.as_ref() == Some(&PricingSection::default()) {
            self.data.pricing = None;
        }
        if self.data.provider.as_ref() == Some(&ProviderSection::default()) {
            self.data.provider = None;
        }
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn invalid(field: &str, value: &str) -> CliError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn non_empty(field: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(invalid(field, value));
    }
    Ok(value.to_string())
}

fn non_negative(field: &str, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(invalid(field, value)),
    }
}

pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

/// Gets the path to the configuration directory (`~/.gridrent`)
fn get_config_dir() -> Result<PathBuf> {
    let home_dir = home::home_dir().ok_or_else(|| {
        ConfigError::DirectoryCreationFailed("Could not find home directory".to_string())
    })?;

    Ok(home_dir.join(".gridrent"))
}

/// Path of the default config file, for display
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}
