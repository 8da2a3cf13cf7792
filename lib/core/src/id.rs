//! Strongly-typed identifiers.
//!
//! IDs wrap a ULID so they sort by creation time, which keeps log lines for
//! one generation easy to correlate.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Generates a ULID-backed ID newtype displayed as `<prefix>_<ulid>`.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new, time-ordered ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// Identifies one `generate()` call across all of its provider attempts.
    GenerationId,
    "gen"
);

define_id!(
    /// Identifies a single conversation history entry.
    MessageId,
    "msg"
);
