//! Google Gemini `generateContent`.
//!
//! Gemini reports most policy rejections inside a 200 response, either as a
//! `promptFeedback.blockReason` or as a candidate finishing with `SAFETY`.

use super::{ProviderAdapter, decoded_payload, http_failure};
use crate::config::{GeminiSettings, non_blank};
use crate::connection::PooledClient;
use crate::normalize::UnwrapRule;
use crate::outcome::{Payload, RawOutcome};
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tracing::{instrument, warn};

/// Adapter for a Gemini model.
#[derive(Debug, Clone)]
pub struct Gemini {
    settings: GeminiSettings,
}

impl Gemini {
    /// Creates the adapter.
    #[must_use]
    pub fn new(settings: GeminiSettings) -> Self {
        Self { settings }
    }

    /// `generateContent` URL for the configured model.
    #[must_use]
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

fn block_reason(body: &JsonValue) -> Option<String> {
    if let Some(reason) = body
        .pointer("/promptFeedback/blockReason")
        .and_then(JsonValue::as_str)
    {
        return Some(format!("prompt blocked: {reason}"));
    }
    body.pointer("/candidates/0/finishReason")
        .and_then(JsonValue::as_str)
        .filter(|reason| *reason == "SAFETY")
        .map(|_| "candidate stopped for SAFETY".to_string())
}

/// Error statuses Gemini uses when a request is refused rather than failed.
const REFUSAL_STATUSES: [&str; 2] = ["PERMISSION_DENIED", "INVALID_ARGUMENT"];

/// Non-2xx refusals whose message names the safety system.
fn safety_error(body: &JsonValue) -> bool {
    let refused = body
        .pointer("/error/status")
        .and_then(JsonValue::as_str)
        .is_some_and(|status| REFUSAL_STATUSES.contains(&status));
    refused
        && body
            .pointer("/error/message")
            .and_then(JsonValue::as_str)
            .is_some_and(|message| message.to_lowercase().contains("safety"))
}

/// Concatenates the text parts of the first candidate.
fn candidate_text(value: &JsonValue) -> Option<JsonValue> {
    let parts = value.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(JsonValue::as_str))
        .collect();
    Some(JsonValue::String(text))
}

#[async_trait]
impl ProviderAdapter for Gemini {
    fn name(&self) -> &str {
        "gemini"
    }

    fn configured(&self) -> bool {
        non_blank(&self.settings.api_key).is_some() && !self.settings.model.trim().is_empty()
    }

    #[instrument(skip_all, fields(provider = "gemini"))]
    async fn call(&self, client: &PooledClient, prompt: &str, max_tokens: u32) -> RawOutcome {
        let Some(api_key) = non_blank(&self.settings.api_key) else {
            return RawOutcome::Unconfigured;
        };

        let payload = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"maxOutputTokens": max_tokens},
        });
        let request = client
            .post(&self.generate_url())
            .header("x-goog-api-key", api_key)
            .json(&payload);

        let reply = match client.send(request).await {
            Ok(reply) => reply,
            Err(e) => return e.into(),
        };

        if !reply.is_success() {
            if reply.json().is_some_and(|body| safety_error(&body)) {
                warn!("Gemini rejected the request on safety grounds");
                return RawOutcome::SafetyBlocked("Gemini safety error".to_string());
            }
            return http_failure(&reply);
        }

        match decoded_payload(&reply) {
            Payload::Structured(body) => match block_reason(&body) {
                Some(reason) => {
                    warn!(%reason, "Gemini safety block");
                    RawOutcome::SafetyBlocked(reason)
                }
                None => RawOutcome::Success(Payload::Structured(body)),
            },
            text => RawOutcome::Success(text),
        }
    }

    fn unwrap_rule(&self) -> Option<UnwrapRule> {
        Some(candidate_text)
    }
}
