//! DeepSeek chat completions.

use super::{ProviderAdapter, chat_completion_content, http_failure};
use crate::config::{DeepSeekSettings, non_blank};
use crate::connection::PooledClient;
use crate::normalize::UnwrapRule;
use crate::outcome::{Payload, RawOutcome};
use async_trait::async_trait;
use serde_json::json;
use tracing::{instrument, warn};

/// Marker DeepSeek puts in the error message of a moderation rejection.
const RISK_MARKER: &str = "Content Exists Risk";

/// Adapter for the DeepSeek API.
#[derive(Debug, Clone)]
pub struct DeepSeek {
    settings: DeepSeekSettings,
}

impl DeepSeek {
    /// Creates the adapter.
    #[must_use]
    pub fn new(settings: DeepSeekSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ProviderAdapter for DeepSeek {
    fn name(&self) -> &str {
        "deepseek"
    }

    fn configured(&self) -> bool {
        non_blank(&self.settings.api_key).is_some() && !self.settings.url.trim().is_empty()
    }

    #[instrument(skip_all, fields(provider = "deepseek"))]
    async fn call(&self, client: &PooledClient, prompt: &str, max_tokens: u32) -> RawOutcome {
        let Some(api_key) = non_blank(&self.settings.api_key) else {
            return RawOutcome::Unconfigured;
        };

        let payload = json!({
            "model": self.settings.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
        });
        let request = client
            .post(&self.settings.url)
            .bearer_auth(api_key)
            .json(&payload);

        let reply = match client.send(request).await {
            Ok(reply) => reply,
            Err(e) => return e.into(),
        };

        if !reply.is_success() {
            if reply.status.as_u16() == 400 && reply.body.contains(RISK_MARKER) {
                warn!("DeepSeek moderation rejected the prompt");
                return RawOutcome::SafetyBlocked(RISK_MARKER.to_string());
            }
            return http_failure(&reply);
        }

        // Kept as text; the normalizer parses and unwraps it.
        RawOutcome::Success(Payload::Text(reply.body))
    }

    fn unwrap_rule(&self) -> Option<UnwrapRule> {
        Some(chat_completion_content)
    }
}
