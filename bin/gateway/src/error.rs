//! Gateway error types.
//!
//! Details are logged; the user only ever sees [`UNAVAILABLE_MESSAGE`].

use std::fmt;

/// Message printed to the caller on any failure.
pub const UNAVAILABLE_MESSAGE: &str = "AI service temporarily unavailable";

/// Errors from a gateway run.
#[derive(Debug)]
pub enum GatewayError {
    /// Environment configuration could not be loaded.
    Config { reason: String },
    /// A history or document file could not be read.
    Input { path: String, reason: String },
    /// The connection pool could not be set up.
    Connection { reason: String },
    /// No provider produced an answer.
    Generation { reason: String },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "failed to load configuration: {reason}"),
            Self::Input { path, reason } => write!(f, "failed to read '{path}': {reason}"),
            Self::Connection { reason } => write!(f, "connection setup failed: {reason}"),
            Self::Generation { reason } => write!(f, "generation failed: {reason}"),
        }
    }
}

impl std::error::Error for GatewayError {}
