//! Conversation history entries.

use chrono::{DateTime, Utc};
use lamla_core::MessageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who said it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The learner.
    User,
    /// The model's reply.
    Assistant,
}

impl Role {
    /// Speaker label used in transcripts.
    #[must_use]
    pub const fn speaker(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "AI",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.speaker())
    }
}

/// One turn of a conversation.
///
/// Stored records usually only carry `role` and `text`; the id and timestamp
/// are filled in when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry identifier.
    #[serde(default)]
    pub id: MessageId,
    /// Speaker.
    pub role: Role,
    /// What was said.
    pub text: String,
    /// When it was said.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Creates an entry stamped now.
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a user entry.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Creates an assistant entry.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Transcript line, `"User: text"` or `"AI: text"`.
    #[must_use]
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.role.speaker(), self.text)
    }
}
