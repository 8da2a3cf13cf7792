//! Gateway configuration.
//!
//! Everything is read from environment variables via the `config` crate.
//! Nested sections use `__` as the separator, so `POOL__READ_TIMEOUT_MS`
//! lands in [`PoolConfig::read_timeout_ms`] and `DEEPSEEK__API_KEY` in
//! [`DeepSeekSettings::api_key`].

use lamla_ai::{
    AzureSettings, DeepSeekSettings, GeminiSettings, HuggingFaceSettings, OrchestratorConfig,
    PoolConfig, ProviderSettings,
};
use serde::Deserialize;

/// Gateway configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Default provider priority, comma separated in `PROVIDER_ORDER`.
    #[serde(default = "default_provider_order")]
    pub provider_order: Vec<String>,

    /// Token budget when the command line does not set one.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Bound on a single provider call, in milliseconds.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Number of history entries included in prompts.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Connection pool settings.
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub azure: AzureSettings,

    #[serde(default)]
    pub deepseek: DeepSeekSettings,

    #[serde(default)]
    pub gemini: GeminiSettings,

    #[serde(default)]
    pub huggingface: HuggingFaceSettings,
}

fn default_provider_order() -> Vec<String> {
    OrchestratorConfig::default().provider_order
}

fn default_max_tokens() -> u32 {
    OrchestratorConfig::default().max_tokens
}

fn default_attempt_timeout_ms() -> u64 {
    OrchestratorConfig::default().attempt_timeout_ms
}

fn default_history_window() -> usize {
    6
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default())
    }

    fn load(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                environment
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("provider_order"),
            )
            .build()?
            .try_deserialize()
    }

    /// Orchestrator settings.
    #[must_use]
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            provider_order: self.provider_order.clone(),
            max_tokens: self.max_tokens,
            attempt_timeout_ms: self.attempt_timeout_ms,
        }
    }

    /// Credentials for the built-in providers.
    #[must_use]
    pub fn providers(&self) -> ProviderSettings {
        ProviderSettings {
            azure: self.azure.clone(),
            deepseek: self.deepseek.clone(),
            gemini: self.gemini.clone(),
            huggingface: self.huggingface.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> GatewayConfig {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        GatewayConfig::load(config::Environment::default().source(Some(source)))
            .expect("load config")
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]);
        assert_eq!(
            config.provider_order,
            vec!["azure", "deepseek", "gemini", "huggingface"]
        );
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.history_window, 6);
        assert_eq!(config.pool.read_timeout_ms, 60_000);
        assert!(config.deepseek.api_key.is_none());
    }

    #[test]
    fn nested_and_list_variables_are_parsed() {
        let config = load(&[
            ("PROVIDER_ORDER", "deepseek,hf"),
            ("MAX_TOKENS", "256"),
            ("POOL__MAX_CONNECTIONS", "8"),
            ("DEEPSEEK__API_KEY", "ds-key"),
            ("HUGGINGFACE__MODEL", "distilgpt2"),
        ]);
        assert_eq!(config.provider_order, vec!["deepseek", "hf"]);
        assert_eq!(config.orchestrator().max_tokens, 256);
        assert_eq!(config.pool.max_connections, 8);
        let providers = config.providers();
        assert_eq!(providers.deepseek.api_key.as_deref(), Some("ds-key"));
        assert_eq!(providers.huggingface.model, "distilgpt2");
    }

    #[test]
    fn unparsable_number_is_an_error() {
        let source: config::Map<String, String> =
            [("MAX_TOKENS".to_string(), "lots".to_string())].into_iter().collect();
        let result = GatewayConfig::load(config::Environment::default().source(Some(source)));
        assert!(result.is_err());
    }
}
