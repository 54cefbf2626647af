//! # Identity Newtypes
//!
//! Newtype wrappers for every identifier the custody stack passes around.
//! An `AccountAddress` cannot be handed to a function expecting a
//! `PrincipalId`: ledger addresses and the principals that control them are
//! distinct namespaces.
//!
//! UUID-backed identifiers are `Copy` and display with a namespace prefix
//! (`escrow:…`, `principal:…`, `account:…`). `FromStr` accepts either the
//! bare UUID or the prefixed form.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|e| CoreError::InvalidIdentifier {
                        kind: $prefix,
                        value: s.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    };
}

uuid_identifier!(
    /// Identity of an escrow record. `initialize` binds exactly one record
    /// to each `EscrowId`.
    EscrowId,
    "escrow"
);

uuid_identifier!(
    /// An authenticated principal: a record owner, an account holder, or
    /// the custodian the escrow service acts as.
    PrincipalId,
    "principal"
);

uuid_identifier!(
    /// Address of a token account on the ledger.
    AccountAddress,
    "account"
);

/// The token type (mint) an account holds.
///
/// Every ledger account holds exactly one token type; transfers between
/// accounts of different types are rejected by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenType(String);

impl TokenType {
    /// Create a token type from its symbol.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidIdentifier`] for an empty or
    /// whitespace-bearing symbol.
    pub fn new(symbol: impl Into<String>) -> Result<Self, CoreError> {
        let symbol = symbol.into();
        if symbol.is_empty() || symbol.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidIdentifier {
                kind: "token",
                value: symbol,
                reason: "token symbol must be non-empty and contain no whitespace".to_string(),
            });
        }
        Ok(Self(symbol))
    }

    /// The token symbol.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TokenType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
