//! Environment configuration
//!
//! Values come from the process environment, with `.env` loaded first.

use crate::error::ExtractionError;
use crate::Result;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which extraction path serves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorMode {
    /// Deterministic rule engine
    Rules,
    /// Gemini backend wrapped by the repair layer
    Llm,
}

impl FromStr for ExtractorMode {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rules" | "rule" | "deterministic" => Ok(ExtractorMode::Rules),
            "llm" | "gemini" => Ok(ExtractorMode::Llm),
            other => Err(ExtractionError::ConfigError(format!(
                "EXTRACTOR_MODE must be 'rules' or 'llm', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub mode: ExtractorMode,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub fallback_to_rules: bool,
    pub timeout: Duration,
    pub port: u16,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            mode: ExtractorMode::Rules,
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            fallback_to_rules: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            port: DEFAULT_PORT,
        }
    }
}

impl ExtractorConfig {
    /// Load `.env`, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mode = match get("EXTRACTOR_MODE") {
            Some(v) => v.parse()?,
            None => defaults.mode,
        };

        let fallback_to_rules = match get("EXTRACTOR_FALLBACK_TO_RULES") {
            Some(v) => parse_bool("EXTRACTOR_FALLBACK_TO_RULES", &v)?,
            None => defaults.fallback_to_rules,
        };

        let timeout = match get("EXTRACTOR_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number("EXTRACTOR_TIMEOUT_SECS", &v)?),
            None => defaults.timeout,
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(v) => parse_number("PORT", &v)?,
            None => defaults.port,
        };

        let gemini_api_key = get("GEMINI_API_KEY");
        if mode == ExtractorMode::Llm && gemini_api_key.is_none() {
            return Err(ExtractionError::ConfigError(
                "GEMINI_API_KEY is required when EXTRACTOR_MODE=llm".to_string(),
            ));
        }

        Ok(Self {
            mode,
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            fallback_to_rules,
            timeout,
            port,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ExtractionError::ConfigError(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ExtractionError::ConfigError(format!("{} must be a number, got '{}'", key, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ExtractorConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ExtractorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.mode, ExtractorMode::Rules);
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert!(config.fallback_to_rules);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_llm_mode_requires_key() {
        assert!(matches!(
            config_from(&[("EXTRACTOR_MODE", "llm")]),
            Err(ExtractionError::ConfigError(_))
        ));

        let config = config_from(&[
            ("EXTRACTOR_MODE", "LLM"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("EXTRACTOR_FALLBACK_TO_RULES", "no"),
            ("API_PORT", "9090"),
        ])
        .unwrap();
        assert_eq!(config.mode, ExtractorMode::Llm);
        assert_eq!(config.gemini_model, "gemini-1.5-pro");
        assert!(!config.fallback_to_rules);
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("EXTRACTOR_MODE", "magic")]).is_err());
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("EXTRACTOR_TIMEOUT_SECS", "-1")]).is_err());
        assert!(config_from(&[("EXTRACTOR_FALLBACK_TO_RULES", "maybe")]).is_err());
    }
}
