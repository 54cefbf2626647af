//! # Core Error Type
//!
//! Errors raised while constructing or parsing the foundational types.
//! Domain errors (ledger, escrow) live in their own crates.

use thiserror::Error;

/// Errors from parsing identifiers and token types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier string could not be parsed.
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Identifier namespace (e.g. "escrow", "principal").
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
