//! Configuration types for the pool, the providers and the orchestrator.
//!
//! These structs only describe settings. Loading them from the environment is
//! the binary's job; every field has a serde default so a partially
//! configured environment still deserializes, and a provider without
//! credentials simply reports itself as unconfigured.

use crate::error::ConnectionError;
use serde::Deserialize;
use std::time::Duration;

/// Connection pool and timeout settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// TCP/TLS connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds. Long, since model latency dominates.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Write timeout in milliseconds.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Maximum wait for a free connection slot, in milliseconds.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Upper bound on concurrent in-flight requests.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Idle connections kept per host.
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,

    /// Keep-alive expiry for idle connections, in milliseconds.
    #[serde(default = "default_keepalive_ms")]
    pub keepalive_ms: u64,

    /// Optional `User-Agent` header.
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    60_000
}

fn default_write_timeout_ms() -> u64 {
    5_000
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_max_connections() -> u32 {
    100
}

fn default_max_idle_connections() -> usize {
    20
}

fn default_keepalive_ms() -> u64 {
    30_000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            max_connections: default_max_connections(),
            max_idle_connections: default_max_idle_connections(),
            keepalive_ms: default_keepalive_ms(),
            user_agent: None,
        }
    }
}

impl PoolConfig {
    /// Connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write timeout.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Pool acquisition timeout.
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Keep-alive expiry.
    #[must_use]
    pub fn keepalive(&self) -> Duration {
        Duration::from_millis(self.keepalive_ms)
    }

    /// Checks that every timeout and limit is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        let checks = [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
            ("acquire_timeout_ms", self.acquire_timeout_ms),
            ("max_connections", u64::from(self.max_connections)),
            ("keepalive_ms", self.keepalive_ms),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConnectionError::InvalidConfig {
                    reason: format!("{field} must be greater than zero"),
                });
            }
        }
        Ok(())
    }
}

/// Orchestrator defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Default provider priority.
    #[serde(default = "default_provider_order")]
    pub provider_order: Vec<String>,

    /// Token budget used when a request does not set one.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Bound on a single provider call, in milliseconds.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

fn default_provider_order() -> Vec<String> {
    ["azure", "deepseek", "gemini", "huggingface"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_attempt_timeout_ms() -> u64 {
    30_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider_order: default_provider_order(),
            max_tokens: default_max_tokens(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
        }
    }
}

impl OrchestratorConfig {
    /// Per-attempt timeout.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Credentials and endpoints for every built-in provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub azure: AzureSettings,
    #[serde(default)]
    pub deepseek: DeepSeekSettings,
    #[serde(default)]
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub huggingface: HuggingFaceSettings,
}

/// Azure OpenAI deployment settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Resource endpoint, optionally already including `/openai/deployments/<name>`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,
    #[serde(default = "default_azure_temperature")]
    pub temperature: f32,
    #[serde(default = "default_azure_system_prompt")]
    pub system_prompt: String,
}

fn default_azure_api_version() -> String {
    "2024-12-01-preview".to_string()
}

fn default_azure_temperature() -> f32 {
    0.7
}

fn default_azure_system_prompt() -> String {
    "You are a helpful educational assistant. Provide accurate, helpful responses to student questions."
        .to_string()
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            deployment: None,
            api_version: default_azure_api_version(),
            temperature: default_azure_temperature(),
            system_prompt: default_azure_system_prompt(),
        }
    }
}

/// DeepSeek chat-completions settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DeepSeekSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_deepseek_url")]
    pub url: String,
    #[serde(default = "default_deepseek_model")]
    pub model: String,
}

fn default_deepseek_url() -> String {
    "https://api.deepseek.com/v1/chat/completions".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

impl Default for DeepSeekSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            url: default_deepseek_url(),
            model: default_deepseek_model(),
        }
    }
}

/// Google Gemini `generateContent` settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

/// Hugging Face inference API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HuggingFaceSettings {
    #[serde(default)]
    pub api_token: Option<String>,
    /// URL with a `{model}` placeholder.
    #[serde(default = "default_hf_url_template")]
    pub url_template: String,
    #[serde(default = "default_hf_model")]
    pub model: String,
}

fn default_hf_url_template() -> String {
    "https://api-inference.huggingface.co/models/{model}".to_string()
}

fn default_hf_model() -> String {
    "gpt2".to_string()
}

impl Default for HuggingFaceSettings {
    fn default() -> Self {
        Self {
            api_token: None,
            url_template: default_hf_url_template(),
            model: default_hf_model(),
        }
    }
}

/// Returns the trimmed value when it is present and not blank.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
