//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConnectionError`: pooled client lifecycle and individual HTTP exchanges
//! - `GenerateError`: the only failures a `generate()` caller ever sees
//!
//! Per-provider failures are not errors at this level. They are recorded as
//! [`AttemptRecord`]s and only surface once every provider has been tried.

use crate::outcome::AttemptRecord;
use std::fmt;

/// Errors from the connection manager and pooled sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Pool configuration is unusable.
    InvalidConfig { reason: String },
    /// The HTTP client could not be constructed.
    Build { reason: String },
    /// The manager has been closed.
    Closed,
    /// No connection slot became free within the acquisition timeout.
    PoolTimeout { waited_ms: u64 },
    /// Connect, write or read phase timed out.
    Timeout { reason: String },
    /// Connection-level failure.
    Transport { reason: String },
    /// The response body could not be read.
    Body { reason: String },
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => {
                write!(f, "invalid connection pool configuration: {reason}")
            }
            Self::Build { reason } => write!(f, "failed to build HTTP client: {reason}"),
            Self::Closed => write!(f, "connection manager is closed"),
            Self::PoolTimeout { waited_ms } => {
                write!(f, "no pooled connection available after {waited_ms}ms")
            }
            Self::Timeout { reason } => write!(f, "request timed out: {reason}"),
            Self::Transport { reason } => write!(f, "transport error: {reason}"),
            Self::Body { reason } => write!(f, "failed to read response body: {reason}"),
        }
    }
}

impl std::error::Error for ConnectionError {}

/// Errors surfaced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// Every provider in the order was skipped or failed.
    AllProvidersExhausted { attempts: Vec<AttemptRecord> },
    /// The caller's deadline elapsed while a provider call was in flight.
    DeadlineExceeded { attempts: Vec<AttemptRecord> },
}

impl GenerateError {
    /// Returns the attempt log accumulated before the failure.
    #[must_use]
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            Self::AllProvidersExhausted { attempts } | Self::DeadlineExceeded { attempts } => {
                attempts
            }
        }
    }

    /// Consumes the error and returns its attempt log.
    #[must_use]
    pub fn into_attempts(self) -> Vec<AttemptRecord> {
        match self {
            Self::AllProvidersExhausted { attempts } | Self::DeadlineExceeded { attempts } => {
                attempts
            }
        }
    }
}

fn join_attempts(attempts: &[AttemptRecord]) -> String {
    if attempts.is_empty() {
        return "no providers in order".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllProvidersExhausted { attempts } => {
                write!(f, "all providers exhausted: {}", join_attempts(attempts))
            }
            Self::DeadlineExceeded { attempts } => {
                write!(f, "generation deadline exceeded: {}", join_attempts(attempts))
            }
        }
    }
}

impl std::error::Error for GenerateError {}
