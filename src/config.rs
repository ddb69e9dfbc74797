//! Startup configuration.
//!
//! Everything is read once from the process environment (optionally seeded from a `.env`
//! file) and then passed around explicitly. Only `GOOGLE_API_KEY` is required.

use crate::analyzer::DEFAULT_PROMPT;
use crate::error::{DishVisionError, Result};
use crate::llm::gateways::{GeminiConfig, DEFAULT_GEMINI_ENDPOINT};
use crate::llm::safety::{HarmBlockThreshold, HarmCategory, SafetySetting};
use crate::llm::CompletionConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 7860);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub gemini: GeminiConfig,
    pub completion: CompletionConfig,
    pub prompt: String,
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
}

/// Load variables from a local `.env` file if there is one.
///
/// Returns the file that was loaded, or `None` when there is no `.env` file.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    match dotenv::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(dotenv::Error::Io(_)) => Ok(None),
        Err(e) => Err(DishVisionError::ConfigError(format!("Malformed .env file: {}", e))),
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GOOGLE_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| DishVisionError::ConfigError("GOOGLE_API_KEY is not set".to_string()))?;

        let gemini = GeminiConfig {
            api_key,
            base_url: lookup("GEMINI_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            timeout: parse_timeout(&lookup)?,
        };

        let defaults = CompletionConfig::default();
        let completion = CompletionConfig {
            temperature: parse_var(&lookup, "GEMINI_TEMPERATURE")?.unwrap_or(defaults.temperature),
            top_p: parse_var(&lookup, "GEMINI_TOP_P")?.unwrap_or(defaults.top_p),
            top_k: parse_var(&lookup, "GEMINI_TOP_K")?.unwrap_or(defaults.top_k),
            max_output_tokens: parse_var(&lookup, "GEMINI_MAX_OUTPUT_TOKENS")?
                .unwrap_or(defaults.max_output_tokens),
            safety_settings: safety_settings_from(&lookup)?,
        };

        let prompt = match lookup("PROMPT_FILE") {
            Some(path) => std::fs::read_to_string(&path).map_err(|e| {
                DishVisionError::ConfigError(format!("Cannot read PROMPT_FILE {}: {}", path, e))
            })?,
            None => DEFAULT_PROMPT.to_string(),
        };

        let bind_addr = parse_var::<SocketAddr, _>(&lookup, "DISH_VISION_BIND")?
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND));

        let upload_dir = lookup("DISH_VISION_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("dish-vision-uploads"));

        Ok(Self {
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini,
            completion,
            prompt,
            bind_addr,
            upload_dir,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DishVisionError::ConfigError(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(None),
    }
}

fn parse_timeout<F>(lookup: &F) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<u64, _>(lookup, "GEMINI_TIMEOUT_SECS")? {
        Some(0) => Err(DishVisionError::ConfigError(
            "GEMINI_TIMEOUT_SECS must be at least 1; unset it for no timeout".to_string(),
        )),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

// GEMINI_SAFETY_THRESHOLD sets the baseline, GEMINI_SAFETY_<CATEGORY> overrides one category
fn safety_settings_from<F>(lookup: &F) -> Result<Vec<SafetySetting>>
where
    F: Fn(&str) -> Option<String>,
{
    let baseline = parse_var::<HarmBlockThreshold, _>(lookup, "GEMINI_SAFETY_THRESHOLD")?
        .unwrap_or(HarmBlockThreshold::BlockMediumAndAbove);

    HarmCategory::ALL
        .iter()
        .map(|&category| {
            let key = format!("GEMINI_SAFETY_{}", category.short_name());
            let threshold = parse_var::<HarmBlockThreshold, _>(lookup, &key)?.unwrap_or(baseline);
            Ok(SafetySetting {
                category,
                threshold,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = AppConfig::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "secret")])).unwrap();

        assert_eq!(config.gemini.api_key, "secret");
        assert_eq!(config.gemini.base_url, DEFAULT_GEMINI_ENDPOINT);
        assert_eq!(config.gemini.timeout, None);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.completion, CompletionConfig::default());
        assert_eq!(config.prompt, DEFAULT_PROMPT);
        assert_eq!(config.bind_addr, "127.0.0.1:7860".parse::<SocketAddr>().unwrap());
        assert!(config.upload_dir.ends_with("dish-vision-uploads"));
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(DishVisionError::ConfigError(_))));

        let blank = AppConfig::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "  ")]));
        assert!(matches!(blank, Err(DishVisionError::ConfigError(_))));
    }

    #[test]
    fn test_generation_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("GEMINI_TEMPERATURE", "0.2"),
            ("GEMINI_TOP_P", "0.95"),
            ("GEMINI_TOP_K", "40"),
            ("GEMINI_MAX_OUTPUT_TOKENS", "1024"),
            ("GEMINI_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.completion.temperature, 0.2);
        assert_eq!(config.completion.top_p, 0.95);
        assert_eq!(config.completion.top_k, 40);
        assert_eq!(config.completion.max_output_tokens, 1024);
        assert_eq!(config.gemini.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_timeout_is_config_error() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("GEMINI_TIMEOUT_SECS", "0"),
        ]));

        match result {
            Err(DishVisionError::ConfigError(msg)) => assert!(msg.contains("GEMINI_TIMEOUT_SECS")),
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("GEMINI_TOP_K", "lots"),
        ]));

        match result {
            Err(DishVisionError::ConfigError(msg)) => assert!(msg.contains("GEMINI_TOP_K")),
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_safety_baseline_and_override() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("GEMINI_SAFETY_THRESHOLD", "BLOCK_ONLY_HIGH"),
            ("GEMINI_SAFETY_HATE_SPEECH", "BLOCK_LOW_AND_ABOVE"),
        ]))
        .unwrap();

        let settings = &config.completion.safety_settings;
        assert_eq!(settings.len(), 4);
        for setting in settings {
            let expected = if setting.category == HarmCategory::HateSpeech {
                HarmBlockThreshold::BlockLowAndAbove
            } else {
                HarmBlockThreshold::BlockOnlyHigh
            };
            assert_eq!(setting.threshold, expected);
        }
    }

    #[test]
    fn test_unknown_safety_threshold() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("GEMINI_SAFETY_THRESHOLD", "BLOCK_ALL_THE_THINGS"),
        ]));

        assert!(matches!(result, Err(DishVisionError::ConfigError(_))));
    }

    #[test]
    fn test_prompt_file_and_server_settings() {
        let mut prompt_file = tempfile::NamedTempFile::new().unwrap();
        prompt_file.write_all(b"List the ingredients.").unwrap();
        let prompt_path = prompt_file.path().to_string_lossy().to_string();

        let config = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("PROMPT_FILE", prompt_path.as_str()),
            ("DISH_VISION_BIND", "0.0.0.0:8080"),
            ("DISH_VISION_UPLOAD_DIR", "/var/tmp/uploads"),
        ]))
        .unwrap();

        assert_eq!(config.prompt, "List the ingredients.");
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.upload_dir, PathBuf::from("/var/tmp/uploads"));
    }

    #[test]
    fn test_missing_prompt_file() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("PROMPT_FILE", "/definitely/not/here.txt"),
        ]));

        assert!(matches!(result, Err(DishVisionError::ConfigError(_))));
    }
}
