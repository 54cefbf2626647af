//! # Ledger Error Types

use custody_core::{AccountAddress, PrincipalId, TokenType};
use thiserror::Error;

/// Errors returned by a [`TokenLedger`](crate::TokenLedger).
///
/// A failed transfer never moves value: every variant means the ledger is
/// exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The source account holds less than the requested amount.
    #[error("insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// The source account.
        account: AccountAddress,
        /// Amount requested.
        requested: u64,
        /// Amount the account holds.
        available: u64,
    },

    /// The address is unknown to the ledger or cannot take part in the call.
    #[error("invalid account {address}: {reason}")]
    InvalidAccount {
        /// The offending address.
        address: AccountAddress,
        /// Why the account was rejected.
        reason: String,
    },

    /// The authority does not hold the source account.
    #[error("{authority} is not the holder of {account}")]
    Unauthorized {
        /// The principal that attempted to authorize the transfer.
        authority: PrincipalId,
        /// The source account.
        account: AccountAddress,
    },

    /// Source and destination hold different token types.
    #[error("token mismatch: cannot transfer {source_token} into an account holding {destination_token}")]
    TokenMismatch {
        /// Token type of the source account.
        source_token: TokenType,
        /// Token type of the destination account.
        destination_token: TokenType,
    },

    /// Crediting the destination would exceed the balance range.
    #[error("balance overflow crediting {account}")]
    BalanceOverflow {
        /// The destination account.
        account: AccountAddress,
    },

    /// The ledger backend is unreachable.
    #[error("ledger unavailable: {reason}")]
    Unavailable {
        /// Description of the outage.
        reason: String,
    },
}
