//! Shared foundation for the lamla AI gateway crates.
//!
//! Holds the rootcause-based `Result` alias and the identifier types that
//! appear in more than one crate.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{GenerationId, MessageId};
