//! # Token Ledger Trait
//!
//! Operations:
//!
//! - **create_account**: open a zero-balance account for a holder
//! - **transfer**: atomically move an amount between two accounts
//! - **balance_of**: read an account balance
//! - **account**: read holder, token type and balance together

use std::future::Future;

use custody_core::{AccountAddress, PrincipalId, TokenType};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A ledger account as reported by [`TokenLedger::account`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    /// The account address.
    pub address: AccountAddress,
    /// The principal allowed to authorize transfers out of this account.
    pub holder: PrincipalId,
    /// The single token type this account holds.
    pub token: TokenType,
    /// Current balance.
    pub balance: u64,
}

/// A ledger of single-token accounts with an atomic transfer primitive.
///
/// Implementations must be safe to share across async tasks behind an
/// `Arc`. Each call is a potential suspension point: a remote ledger may
/// take arbitrarily long, so callers bound it with their own timeout.
///
/// ## Atomicity Contract
///
/// `transfer` either debits `from` and credits `to` by exactly `amount`, or
/// returns an error and changes nothing. If the returned future is dropped
/// before completion, the transfer must not have been applied.
pub trait TokenLedger: Send + Sync {
    /// Open a zero-balance account holding `token`, controlled by `holder`.
    fn create_account(
        &self,
        holder: PrincipalId,
        token: TokenType,
    ) -> impl Future<Output = Result<AccountAddress, LedgerError>> + Send;

    /// Move `amount` from `from` to `to`, authorized by `authority`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientFunds`] if `from` holds less than `amount`.
    /// - [`LedgerError::Unauthorized`] if `authority` does not hold `from`.
    /// - [`LedgerError::InvalidAccount`] / [`LedgerError::TokenMismatch`]
    ///   for unknown or incompatible accounts.
    /// - [`LedgerError::Unavailable`] if the backend cannot be reached.
    fn transfer(
        &self,
        authority: PrincipalId,
        from: AccountAddress,
        to: AccountAddress,
        amount: u64,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Current balance of `address`.
    fn balance_of(
        &self,
        address: AccountAddress,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Full account view of `address`.
    fn account(
        &self,
        address: AccountAddress,
    ) -> impl Future<Output = Result<LedgerAccount, LedgerError>> + Send;
}
