//! Azure OpenAI chat completions.
//!
//! Azure addresses a model by deployment and pins an API version in the query
//! string. The configured endpoint may be the bare resource URL or may
//! already include the `/openai/deployments/<name>` path.

use super::{ProviderAdapter, chat_completion_content, http_failure, preview};
use crate::config::{AzureSettings, non_blank};
use crate::connection::PooledClient;
use crate::normalize::UnwrapRule;
use crate::outcome::{Payload, RawOutcome};
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tracing::{instrument, warn};

const DEPLOYMENT_SEGMENT: &str = "/openai/deployments/";

/// Adapter for an Azure OpenAI deployment.
#[derive(Debug, Clone)]
pub struct AzureOpenAi {
    settings: AzureSettings,
}

impl AzureOpenAi {
    /// Creates the adapter.
    #[must_use]
    pub fn new(settings: AzureSettings) -> Self {
        Self { settings }
    }

    /// Full chat-completions URL, or `None` if it cannot be built.
    #[must_use]
    pub fn chat_url(&self) -> Option<String> {
        let endpoint = non_blank(&self.settings.endpoint)?.trim_end_matches('/');
        let version = &self.settings.api_version;
        if endpoint.to_lowercase().contains(DEPLOYMENT_SEGMENT) {
            return Some(format!("{endpoint}/chat/completions?api-version={version}"));
        }
        let deployment = non_blank(&self.settings.deployment)?;
        Some(format!(
            "{endpoint}{DEPLOYMENT_SEGMENT}{deployment}/chat/completions?api-version={version}"
        ))
    }
}

/// Azure reports content-filter rejections as a 400 with a policy code.
fn is_policy_violation(body: &JsonValue) -> bool {
    let error = &body["error"];
    error["innererror"]["code"] == "ResponsibleAIPolicyViolation"
        || error["code"] == "content_filter"
}

/// A 200 whose choice was stopped by the output filter before producing any
/// content. Partially filtered answers are still successes.
fn filtered_completion(body: &JsonValue) -> bool {
    let filtered = body
        .pointer("/choices/0/finish_reason")
        .is_some_and(|reason| *reason == "content_filter");
    let has_content = chat_completion_content(body)
        .is_some_and(|content| content.as_str().is_none_or(|text| !text.trim().is_empty()));
    filtered && !has_content
}

#[async_trait]
impl ProviderAdapter for AzureOpenAi {
    fn name(&self) -> &str {
        "azure"
    }

    fn configured(&self) -> bool {
        non_blank(&self.settings.api_key).is_some() && self.chat_url().is_some()
    }

    #[instrument(skip_all, fields(provider = "azure"))]
    async fn call(&self, client: &PooledClient, prompt: &str, max_tokens: u32) -> RawOutcome {
        let (Some(url), Some(api_key)) = (self.chat_url(), non_blank(&self.settings.api_key))
        else {
            return RawOutcome::Unconfigured;
        };

        let payload = json!({
            "messages": [
                {"role": "system", "content": self.settings.system_prompt},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": max_tokens,
            "temperature": self.settings.temperature,
        });
        let request = client.post(&url).header("api-key", api_key).json(&payload);

        let reply = match client.send(request).await {
            Ok(reply) => reply,
            Err(e) => return e.into(),
        };

        if !reply.is_success() {
            if reply.json().is_some_and(|body| is_policy_violation(&body)) {
                warn!("Azure content filter rejected the prompt");
                return RawOutcome::SafetyBlocked("Azure content filter".to_string());
            }
            return http_failure(&reply);
        }

        match reply.json() {
            Some(body) if filtered_completion(&body) => {
                warn!("Azure content filter truncated the completion");
                RawOutcome::SafetyBlocked("Azure content filter on completion".to_string())
            }
            Some(body) => RawOutcome::Success(Payload::Structured(body)),
            None => RawOutcome::TransportFailure(format!(
                "Azure returned invalid JSON: {}",
                preview(&reply.body)
            )),
        }
    }

    fn unwrap_rule(&self) -> Option<UnwrapRule> {
        Some(chat_completion_content)
    }
}
