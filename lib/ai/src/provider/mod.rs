//! Provider adapters.
//!
//! Each adapter translates a `(prompt, max_tokens)` pair into one provider's
//! wire format, sends it over the shared [`PooledClient`], and classifies the
//! reply into a [`RawOutcome`]. Adapters never retry and never normalize;
//! both are the orchestrator's business.

pub mod azure;
pub mod deepseek;
pub mod gemini;
pub mod huggingface;

pub use azure::AzureOpenAi;
pub use deepseek::DeepSeek;
pub use gemini::Gemini;
pub use huggingface::HuggingFace;

use crate::connection::{HttpReply, PooledClient};
use crate::error::ConnectionError;
use crate::normalize::UnwrapRule;
use crate::outcome::{Payload, RawOutcome};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Maximum number of body characters quoted in diagnostics.
const PREVIEW_CHARS: usize = 200;

/// Trait for provider adapters.
///
/// Implementations are registered by name in a
/// [`ProviderRegistry`](crate::registry::ProviderRegistry); the orchestrator
/// only ever sees this trait.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Unique lowercase name.
    fn name(&self) -> &str;

    /// True iff the credentials and endpoint settings needed to call the
    /// provider are present. Must not perform I/O.
    fn configured(&self) -> bool;

    /// Issues one request and classifies the reply.
    async fn call(&self, client: &PooledClient, prompt: &str, max_tokens: u32) -> RawOutcome;

    /// Rule peeling this provider's success envelope, if it has one.
    fn unwrap_rule(&self) -> Option<UnwrapRule> {
        None
    }
}

impl From<ConnectionError> for RawOutcome {
    fn from(err: ConnectionError) -> Self {
        RawOutcome::TransportFailure(err.to_string())
    }
}

/// Truncates a body for inclusion in a diagnostic message.
pub(crate) fn preview(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Transport failure for a non-2xx reply without a policy shape.
pub(crate) fn http_failure(reply: &HttpReply) -> RawOutcome {
    RawOutcome::TransportFailure(format!(
        "HTTP {}: {}",
        reply.status.as_u16(),
        preview(&reply.body)
    ))
}

/// Success payload: structured when the body is JSON, text otherwise.
pub(crate) fn decoded_payload(reply: &HttpReply) -> Payload {
    match reply.json() {
        Some(value) => Payload::Structured(value),
        None => Payload::Text(reply.body.clone()),
    }
}

/// `choices[0].message.content`, falling back to `choices[0].text`.
pub(crate) fn chat_completion_content(value: &JsonValue) -> Option<JsonValue> {
    let choice = value.get("choices")?.get(0)?;
    choice
        .get("message")
        .and_then(|message| message.get("content"))
        .or_else(|| choice.get("text"))
        .filter(|content| !content.is_null())
        .cloned()
}
