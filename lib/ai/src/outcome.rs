//! Values exchanged between adapters, the normalizer and the orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// A decoded provider body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body that decoded as JSON.
    Structured(JsonValue),
    /// Body kept as text, to be parsed by the normalizer.
    Text(String),
}

/// What a single adapter call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// 2xx response with its raw payload.
    Success(Payload),
    /// The provider explicitly rejected the content on policy grounds.
    SafetyBlocked(String),
    /// Timeout, connection error, or a non-2xx without a policy shape.
    TransportFailure(String),
    /// The adapter is missing credentials or endpoint settings.
    Unconfigured,
}

/// Classification of one provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Normalized to non-empty content; ends the loop.
    Succeeded,
    /// Skipped for lack of credentials, or the name is not registered.
    Unconfigured,
    /// Technical failure, including empty successful responses.
    TransportFailure,
    /// Content-policy rejection.
    SafetyBlocked,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Succeeded => "succeeded",
            Self::Unconfigured => "unconfigured",
            Self::TransportFailure => "transport failure",
            Self::SafetyBlocked => "safety blocked",
        };
        f.write_str(label)
    }
}

/// One entry of the per-call attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Provider name as resolved (or as requested, if unknown).
    pub provider: String,
    /// Outcome tag.
    pub status: AttemptStatus,
    /// Human-readable diagnostic.
    pub message: String,
}

impl AttemptRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        status: AttemptStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.provider, self.status, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_status_serializes_snake_case() {
        let json = serde_json::to_string(&AttemptStatus::SafetyBlocked).expect("serialize");
        assert_eq!(json, "\"safety_blocked\"");
    }

    #[test]
    fn attempt_record_display() {
        let record = AttemptRecord::new("hf", AttemptStatus::Succeeded, "ok");
        assert_eq!(record.to_string(), "hf: succeeded: ok");
    }
}
