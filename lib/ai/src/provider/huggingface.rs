//! Hugging Face inference API.

use super::{ProviderAdapter, decoded_payload, http_failure};
use crate::config::{HuggingFaceSettings, non_blank};
use crate::connection::PooledClient;
use crate::normalize::UnwrapRule;
use crate::outcome::RawOutcome;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tracing::instrument;

/// Adapter for a hosted Hugging Face text-generation model.
#[derive(Debug, Clone)]
pub struct HuggingFace {
    settings: HuggingFaceSettings,
}

impl HuggingFace {
    /// Creates the adapter.
    #[must_use]
    pub fn new(settings: HuggingFaceSettings) -> Self {
        Self { settings }
    }

    /// Model URL with the template placeholder filled in.
    #[must_use]
    pub fn model_url(&self) -> String {
        self.settings
            .url_template
            .replace("{model}", &self.settings.model)
    }
}

/// `[0].generated_text` or `.generated_text`.
fn generated_text(value: &JsonValue) -> Option<JsonValue> {
    let first = match value {
        JsonValue::Array(items) => items.first()?,
        other => other,
    };
    first.get("generated_text").cloned()
}

#[async_trait]
impl ProviderAdapter for HuggingFace {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn configured(&self) -> bool {
        non_blank(&self.settings.api_token).is_some()
    }

    #[instrument(skip_all, fields(provider = "huggingface"))]
    async fn call(&self, client: &PooledClient, prompt: &str, max_tokens: u32) -> RawOutcome {
        let Some(token) = non_blank(&self.settings.api_token) else {
            return RawOutcome::Unconfigured;
        };

        let payload = json!({
            "inputs": prompt,
            "parameters": {"max_new_tokens": max_tokens},
        });
        let request = client
            .post(&self.model_url())
            .bearer_auth(token)
            .json(&payload);

        match client.send(request).await {
            Ok(reply) if reply.is_success() => RawOutcome::Success(decoded_payload(&reply)),
            Ok(reply) => http_failure(&reply),
            Err(e) => e.into(),
        }
    }

    fn unwrap_rule(&self) -> Option<UnwrapRule> {
        Some(generated_text)
    }
}
