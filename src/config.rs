//! Runtime configuration read from the environment (`.env` supported)

use crate::document::InputDefaults;
use crate::error::AssistantError;
use crate::models::{DEFAULT_SENSITIVITY_RATE, DEFAULT_TAX_RATE};
use crate::Result;
use std::str::FromStr;
use std::time::Duration;

/// Placeholder copied from `.env.example`; treated as unset
const API_KEY_PLACEHOLDER: &str = "your_gemini_api_key_here";

/// How an external answer is combined with the local one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalMode {
    Off,
    /// Local answer followed by the external text
    Augment,
    /// External text instead of the local answer
    Replace,
}

impl FromStr for ExternalMode {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "disabled" | "local" => Ok(ExternalMode::Off),
            "augment" | "append" => Ok(ExternalMode::Augment),
            "replace" => Ok(ExternalMode::Replace),
            other => Err(AssistantError::Configuration(format!(
                "Unknown external mode '{}'; expected off, augment or replace",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub external_mode: ExternalMode,
    pub external_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub tax_rate: f64,
    pub sensitivity_rate: f64,
    pub default_hours_worked: f64,
    pub database_url: Option<String>,
    pub api_port: u16,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
            external_mode: ExternalMode::Augment,
            external_timeout: Duration::from_secs(30),
            max_tokens: 500,
            temperature: 0.7,
            tax_rate: DEFAULT_TAX_RATE,
            sensitivity_rate: DEFAULT_SENSITIVITY_RATE,
            default_hours_worked: 160.0,
            database_url: None,
            api_port: 8080,
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY").filter(|key| key != API_KEY_PLACEHOLDER);

        let external_mode = match get("ASSISTANT_EXTERNAL_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.external_mode,
        };

        let external_timeout = match get("ASSISTANT_EXTERNAL_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("ASSISTANT_EXTERNAL_TIMEOUT_SECS", &raw)?),
            None => defaults.external_timeout,
        };

        let database_url = get("POSTGRES_URL").or_else(|| get("DATABASE_URL"));

        let api_port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_number("PORT", &raw)?,
            None => defaults.api_port,
        };

        let config = Self {
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            external_mode,
            external_timeout,
            max_tokens: optional_number(&get, "ASSISTANT_MAX_TOKENS", defaults.max_tokens)?,
            temperature: optional_number(&get, "ASSISTANT_TEMPERATURE", defaults.temperature)?,
            tax_rate: optional_number(&get, "ASSISTANT_TAX_RATE", defaults.tax_rate)?,
            sensitivity_rate: optional_number(&get, "ASSISTANT_SENSITIVITY_RATE", defaults.sensitivity_rate)?,
            default_hours_worked: optional_number(&get, "ASSISTANT_DEFAULT_HOURS", defaults.default_hours_worked)?,
            database_url,
            api_port,
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults applied to every document must themselves be valid inputs
    fn validate(&self) -> Result<()> {
        ensure_fraction("ASSISTANT_TAX_RATE", self.tax_rate)?;
        ensure_fraction("ASSISTANT_SENSITIVITY_RATE", self.sensitivity_rate)?;
        if !self.default_hours_worked.is_finite() || self.default_hours_worked <= 0.0 {
            return Err(AssistantError::Configuration(format!(
                "ASSISTANT_DEFAULT_HOURS must be a positive number, got {}",
                self.default_hours_worked
            )));
        }
        Ok(())
    }

    pub fn input_defaults(&self) -> InputDefaults {
        InputDefaults {
            hours_worked: self.default_hours_worked,
            tax_rate: self.tax_rate,
            sensitivity_rate: self.sensitivity_rate,
        }
    }

    /// Whether an external enrichment call should be attempted at all
    pub fn external_enabled(&self) -> bool {
        self.external_mode != ExternalMode::Off && self.gemini_api_key.is_some()
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AssistantError::Configuration(format!("{} has invalid value '{}'", key, raw)))
}

fn ensure_fraction(key: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AssistantError::Configuration(format!(
            "{} must be a fraction between 0 and 1, got {}",
            key, value
        )))
    }
}

fn optional_number<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_number(key, &raw),
        None => Ok(default),
    }
}
