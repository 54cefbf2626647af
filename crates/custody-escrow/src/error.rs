//! # Escrow Error Types
//!
//! Every variant carries the escrow id plus the values needed to diagnose
//! the failure without inspecting logs. A returned error always means the
//! escrow record and the ledger are exactly as they were before the call.
//!
//! Local precondition failures (`Unauthorized`, `InvalidAmount`,
//! `InsufficientEscrowBalance`, `Overflow`, `InvalidCounterparty`) are
//! raised before any ledger call. Ledger failures are mapped one-to-one and never retried.

use custody_core::{AccountAddress, EscrowId, PrincipalId};
use custody_ledger::LedgerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors arising from escrow operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// A record is already bound to this escrow id.
    #[error("{escrow_id} is already initialized")]
    AlreadyInitialized {
        /// The escrow identifier.
        escrow_id: EscrowId,
    },

    /// No record is bound to this escrow id.
    #[error("{escrow_id} is not initialized")]
    NotInitialized {
        /// The escrow identifier.
        escrow_id: EscrowId,
    },

    /// The custody account cannot be bound to this escrow.
    #[error("custody account {account} rejected for {escrow_id}: {reason}")]
    InvalidCustodyAccount {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The rejected custody account.
        account: AccountAddress,
        /// Why the account was rejected.
        reason: String,
    },

    /// The caller is not the record owner.
    #[error("{caller} is not authorized to operate {escrow_id}")]
    Unauthorized {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The principal that attempted the operation.
        caller: PrincipalId,
    },

    /// Deposit and withdrawal amounts must be positive.
    #[error("{operation} amount for {escrow_id} must be positive")]
    InvalidAmount {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The attempted operation.
        operation: &'static str,
    },

    /// The deposit source or withdrawal destination is a custody account
    /// bound to an escrow.
    #[error("{operation} for {escrow_id} cannot use custody account {account} of {bound_to}")]
    InvalidCounterparty {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The attempted operation.
        operation: &'static str,
        /// The rejected counterparty account.
        account: AccountAddress,
        /// The escrow that account is bound to.
        bound_to: EscrowId,
    },

    /// The ledger reported that the source account cannot cover the amount.
    #[error("insufficient funds in {account} for {escrow_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The source account.
        account: AccountAddress,
        /// Amount requested.
        requested: u64,
        /// Amount the source account holds.
        available: u64,
    },

    /// Withdrawal exceeds the escrow balance.
    #[error("withdrawal of {requested} exceeds balance {balance} of {escrow_id}")]
    InsufficientEscrowBalance {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The requested withdrawal.
        requested: u64,
        /// The escrow balance.
        balance: u64,
    },

    /// Deposit would push the escrow balance past `u64::MAX`.
    #[error("deposit of {amount} overflows balance {balance} of {escrow_id}")]
    Overflow {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The escrow balance.
        balance: u64,
        /// The requested deposit.
        amount: u64,
    },

    /// The ledger rejected the transfer for a reason other than funds.
    #[error("ledger rejected {operation} for {escrow_id}: {error}")]
    TransferRejected {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The attempted operation.
        operation: &'static str,
        /// The ledger's error, unchanged.
        #[source]
        error: LedgerError,
    },

    /// The ledger could not be reached.
    #[error("ledger unavailable during {operation} for {escrow_id}: {reason}")]
    LedgerUnavailable {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The attempted operation.
        operation: &'static str,
        /// The ledger's description of the outage.
        reason: String,
    },

    /// The ledger call did not complete within the configured timeout.
    #[error("ledger {operation} for {escrow_id} timed out after {timeout_ms}ms")]
    TransferTimeout {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// The attempted operation.
        operation: &'static str,
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The recorded balance disagrees with the ledger or with the
    /// transaction history.
    #[error("{escrow_id} diverged: recorded balance {recorded}, observed {observed} ({source_of_truth})")]
    BalanceDiverged {
        /// The escrow identifier.
        escrow_id: EscrowId,
        /// Balance held in the escrow record.
        recorded: u64,
        /// Balance observed elsewhere.
        observed: u64,
        /// Where `observed` came from ("ledger" or "history").
        source_of_truth: &'static str,
    },
}

/// Stable classification of [`EscrowError`] for callers that branch on the
/// error class rather than its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`EscrowError::AlreadyInitialized`].
    AlreadyInitialized,
    /// See [`EscrowError::NotInitialized`].
    NotInitialized,
    /// See [`EscrowError::InvalidCustodyAccount`].
    InvalidCustodyAccount,
    /// See [`EscrowError::Unauthorized`].
    Unauthorized,
    /// See [`EscrowError::InvalidAmount`].
    InvalidAmount,
    /// See [`EscrowError::InvalidCounterparty`].
    InvalidCounterparty,
    /// See [`EscrowError::InsufficientFunds`].
    InsufficientFunds,
    /// See [`EscrowError::InsufficientEscrowBalance`].
    InsufficientEscrowBalance,
    /// See [`EscrowError::Overflow`].
    Overflow,
    /// See [`EscrowError::TransferRejected`].
    TransferRejected,
    /// See [`EscrowError::LedgerUnavailable`].
    LedgerUnavailable,
    /// See [`EscrowError::TransferTimeout`].
    TransferTimeout,
    /// See [`EscrowError::BalanceDiverged`].
    BalanceDiverged,
}

impl EscrowError {
    /// The error class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInitialized { .. } => ErrorKind::AlreadyInitialized,
            Self::NotInitialized { .. } => ErrorKind::NotInitialized,
            Self::InvalidCustodyAccount { .. } => ErrorKind::InvalidCustodyAccount,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::InvalidCounterparty { .. } => ErrorKind::InvalidCounterparty,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::InsufficientEscrowBalance { .. } => ErrorKind::InsufficientEscrowBalance,
            Self::Overflow { .. } => ErrorKind::Overflow,
            Self::TransferRejected { .. } => ErrorKind::TransferRejected,
            Self::LedgerUnavailable { .. } => ErrorKind::LedgerUnavailable,
            Self::TransferTimeout { .. } => ErrorKind::TransferTimeout,
            Self::BalanceDiverged { .. } => ErrorKind::BalanceDiverged,
        }
    }

    /// Map a ledger failure during `operation` on `escrow_id`.
    pub(crate) fn from_ledger(escrow_id: EscrowId, operation: &'static str, error: LedgerError) -> Self {
        match error {
            LedgerError::InsufficientFunds {
                account,
                requested,
                available,
            } => Self::InsufficientFunds {
                escrow_id,
                account,
                requested,
                available,
            },
            LedgerError::Unavailable { reason } => Self::LedgerUnavailable {
                escrow_id,
                operation,
                reason,
            },
            error => Self::TransferRejected {
                escrow_id,
                operation,
                error,
            },
        }
    }
}
