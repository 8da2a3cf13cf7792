//! Response normalization.
//!
//! Providers answer in very different shapes: a chat-completion envelope, a
//! bare JSON document, an array of generations, or free text that may or may
//! not contain JSON. [`Normalizer::normalize`] folds all of them into a
//! [`NormalizedResult`]. It never fails; the worst case is `Text`.
//!
//! Provider-specific envelopes are peeled off by an [`UnwrapRule`] registered
//! under the provider's name. When a rule yields a string, that string goes
//! through text normalization again so JSON inside a chat message is still
//! recovered. Unwrapping repeats until the rule no longer matches, so the
//! result normalizes to itself.

use crate::outcome::Payload;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;

/// Extracts the answer from a provider envelope, or `None` if the value is
/// not in that provider's envelope shape.
pub type UnwrapRule = fn(&JsonValue) -> Option<JsonValue>;

/// Bound on nested envelopes peeled from one payload.
const MAX_UNWRAP_DEPTH: usize = 8;

/// Canonical result of a successful generation.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// Plain text answer.
    Text(String),
    /// JSON answer (quiz documents, diagnostic envelopes).
    Structured(JsonValue),
}

impl NormalizedResult {
    /// Returns true when there is no usable content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Structured(value) => match value {
                JsonValue::Null => true,
                JsonValue::String(s) => s.trim().is_empty(),
                JsonValue::Array(items) => items.is_empty(),
                JsonValue::Object(map) => map.is_empty(),
                JsonValue::Bool(_) | JsonValue::Number(_) => false,
            },
        }
    }

    /// Returns the text, if this is a text result.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }

    /// Returns the JSON value, if this is a structured result.
    #[must_use]
    pub fn as_structured(&self) -> Option<&JsonValue> {
        match self {
            Self::Text(_) => None,
            Self::Structured(value) => Some(value),
        }
    }

    /// Boundary representation: `{"response": text}` for text, the value
    /// itself for structured results.
    #[must_use]
    pub fn to_response(&self) -> JsonValue {
        match self {
            Self::Text(text) => {
                let mut map = Map::new();
                map.insert("response".to_string(), JsonValue::String(text.clone()));
                JsonValue::Object(map)
            }
            Self::Structured(value) => value.clone(),
        }
    }
}

impl fmt::Display for NormalizedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(value) => write!(f, "{value}"),
        }
    }
}

/// Applies per-provider unwrap rules and JSON recovery.
#[derive(Clone, Default)]
pub struct Normalizer {
    rules: HashMap<String, UnwrapRule>,
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<_> = self.rules.keys().collect();
        providers.sort();
        f.debug_struct("Normalizer")
            .field("rules", &providers)
            .finish()
    }
}

impl Normalizer {
    /// Creates a normalizer with no unwrap rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the unwrap rule for a provider.
    pub fn register(&mut self, provider: impl Into<String>, rule: UnwrapRule) {
        self.rules.insert(provider.into(), rule);
    }

    /// Removes the unwrap rule for a provider, if any.
    pub fn unregister(&mut self, provider: &str) {
        self.rules.remove(provider);
    }

    /// Returns true if `provider` has an unwrap rule.
    #[must_use]
    pub fn has_rule(&self, provider: &str) -> bool {
        self.rules.contains_key(provider)
    }

    /// Normalizes a success payload from `provider`.
    #[must_use]
    pub fn normalize(&self, provider: &str, payload: Payload) -> NormalizedResult {
        match payload {
            Payload::Structured(value) => self.structured(provider, value, 0),
            Payload::Text(text) => match parse_text(text) {
                NormalizedResult::Structured(value) => self.structured(provider, value, 0),
                text => text,
            },
        }
    }

    fn structured(&self, provider: &str, value: JsonValue, depth: usize) -> NormalizedResult {
        if depth >= MAX_UNWRAP_DEPTH {
            return NormalizedResult::Structured(value);
        }
        let unwrapped = self.rules.get(provider).and_then(|rule| rule(&value));
        match unwrapped {
            Some(JsonValue::String(inner)) => match parse_text(inner) {
                NormalizedResult::Structured(inner) => self.structured(provider, inner, depth + 1),
                text => text,
            },
            Some(inner) => self.structured(provider, inner, depth + 1),
            None => NormalizedResult::Structured(value),
        }
    }
}

/// Turns free text into a structured value when it is, or contains, JSON.
#[must_use]
pub fn parse_text(text: String) -> NormalizedResult {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return NormalizedResult::Structured(value);
        }
    }
    match extract_json_substring(trimmed) {
        Some(value) => NormalizedResult::Structured(value),
        None => NormalizedResult::Text(text),
    }
}

/// Recovers a JSON document embedded in prose.
///
/// Takes the first `{` or `[`, pairs it with the last occurrence of the
/// matching closer, and parses that span. Brackets in the surrounding prose
/// can make the span invalid, in which case this returns `None`.
#[must_use]
pub fn extract_json_substring(text: &str) -> Option<JsonValue> {
    let start = text.find(['{', '['])?;
    let closing = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closing)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
