//! Model client implementations for Tether.
//!
//! Every client implements [`tether_core::Provider`]. [`build_from_config`]
//! picks one from the loaded [`AppConfig`].

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;
use tether_config::AppConfig;
use tether_core::{Provider, ProviderError};

/// Build the provider named by `config.provider`.
///
/// `api_url` overrides the preset's base URL. Every provider except
/// `ollama` needs an API key.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let key = || {
        config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "no API key for provider '{}' (set TETHER_API_KEY or api_key in {})",
                    config.provider,
                    AppConfig::config_path().display()
                ))
            })
    };

    let provider = match config.provider.as_str() {
        "openrouter" => OpenAiCompatProvider::openrouter(key()?)?,
        "openai" => OpenAiCompatProvider::openai(key()?)?,
        "ollama" => OpenAiCompatProvider::ollama(config.api_url.as_deref())?,
        "custom" => {
            let url = config.api_url.as_deref().ok_or_else(|| {
                ProviderError::NotConfigured("provider 'custom' requires api_url".into())
            })?;
            OpenAiCompatProvider::new("custom", url, key()?)?
        }
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider '{other}' (expected openrouter, openai, ollama or custom)"
            )));
        }
    };

    let provider = match (&config.api_url, config.provider.as_str()) {
        (Some(url), "openrouter" | "openai") => provider.with_base_url(url),
        _ => provider,
    };

    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, key: Option<&str>) -> AppConfig {
        AppConfig {
            provider: provider.into(),
            api_key: key.map(String::from),
            ..AppConfig::default()
        }
    }

    #[test]
    fn builds_presets() {
        let p = build_from_config(&config("openrouter", Some("sk-test"))).unwrap();
        assert_eq!(p.name(), "openrouter");
        let p = build_from_config(&config("openai", Some("sk-test"))).unwrap();
        assert_eq!(p.name(), "openai");
    }

    #[test]
    fn ollama_needs_no_key() {
        let p = build_from_config(&config("ollama", None)).unwrap();
        assert_eq!(p.name(), "ollama");
    }

    #[test]
    fn missing_key_is_not_configured() {
        let err = build_from_config(&config("openrouter", None)).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));

        let err = build_from_config(&config("openai", Some("  "))).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn custom_requires_url() {
        let err = build_from_config(&config("custom", Some("k"))).err().unwrap();
        assert!(err.to_string().contains("api_url"));

        let mut cfg = config("custom", Some("k"));
        cfg.api_url = Some("http://localhost:8080/v1".into());
        assert_eq!(build_from_config(&cfg).unwrap().name(), "custom");
    }

    #[test]
    fn unknown_provider_rejected() {
        let err = build_from_config(&config("anthropic-direct", Some("k")))
            .err()
            .unwrap();
        assert!(err.to_string().contains("unknown provider"));
    }
}
