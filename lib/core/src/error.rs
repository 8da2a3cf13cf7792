//! Error handling foundation.
//!
//! Only the `Result` alias lives here. Each crate owns its own error enums
//! and wraps them in a rootcause [`Report`] at its public boundary.

use rootcause::Report;

/// Result alias carrying a rootcause [`Report`] with context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_alias_accepts_custom_context() {
        let ok: Result<u8, std::fmt::Error> = Ok(7);
        assert_eq!(ok.ok(), Some(7));
    }
}
