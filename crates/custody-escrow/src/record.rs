//! # Escrow Record
//!
//! The escrow's mirror of its custody account: who owns it, where the
//! tokens sit on the ledger, and how many there should be.
//!
//! ## States
//!
//! ```text
//! Uninitialized ──initialize──▶ Active ──deposit / withdraw──▶ Active
//! ```
//!
//! `Active` is terminal; there is no close operation.
//!
//! ## Invariants
//!
//! - `balance` equals the ledger balance of `custody_account` whenever the
//!   record is not locked by an in-flight operation.
//! - `balance` equals the sum of deposits minus the sum of withdrawals in
//!   `transactions`.
//! - `custody_account` and `owner` never change after initialization.
//!
//! The record itself never talks to the ledger. The `plan_*` methods check
//! local preconditions and compute the post-operation balance; `commit`
//! applies it once the ledger transfer has succeeded.

use custody_core::{AccountAddress, EscrowId, PrincipalId, Timestamp, TokenType};
use serde::{Deserialize, Serialize};

use crate::error::EscrowError;

/// Lifecycle status of an escrow id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// No record is bound to the id.
    Uninitialized,
    /// A record exists and accepts deposits and withdrawals.
    Active,
}

impl EscrowStatus {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Active => "ACTIVE",
        }
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a completed escrow transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Tokens moved into custody.
    Deposit,
    /// Tokens moved out of custody.
    Withdrawal,
}

impl TransactionKind {
    /// Operation name used in errors and logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdraw",
        }
    }
}

/// A completed deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    /// Direction.
    pub kind: TransactionKind,
    /// Amount moved.
    pub amount: u64,
    /// Source account for deposits, destination account for withdrawals.
    pub counterparty: AccountAddress,
    /// Escrow balance after the transaction.
    pub balance_after: u64,
    /// When the transaction was committed.
    pub timestamp: Timestamp,
}

/// An escrow record bound to one custody account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// Escrow identifier.
    pub id: EscrowId,
    /// The only principal allowed to deposit or withdraw.
    pub owner: PrincipalId,
    /// Ledger account holding the escrowed tokens.
    pub custody_account: AccountAddress,
    /// Token type of the custody account.
    pub token: TokenType,
    /// Tokens the record believes are held in `custody_account`.
    pub balance: u64,
    /// Completed transactions, oldest first.
    pub transactions: Vec<EscrowTransaction>,
    /// When the record was initialized.
    pub created_at: Timestamp,
    /// When the record last changed.
    pub updated_at: Timestamp,
}

impl EscrowRecord {
    pub(crate) fn new(
        id: EscrowId,
        owner: PrincipalId,
        custody_account: AccountAddress,
        token: TokenType,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            owner,
            custody_account,
            token,
            balance: 0,
            transactions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reject any caller other than the owner.
    pub fn authorize(&self, caller: PrincipalId) -> Result<(), EscrowError> {
        if caller != self.owner {
            return Err(EscrowError::Unauthorized {
                escrow_id: self.id,
                caller,
            });
        }
        Ok(())
    }

    /// Validate a deposit of `amount` and return the resulting balance.
    ///
    /// # Errors
    ///
    /// [`EscrowError::InvalidAmount`] for zero, [`EscrowError::Overflow`] if
    /// the balance would exceed `u64::MAX`.
    pub fn plan_deposit(&self, amount: u64) -> Result<u64, EscrowError> {
        self.require_positive(amount, TransactionKind::Deposit)?;
        self.balance
            .checked_add(amount)
            .ok_or(EscrowError::Overflow {
                escrow_id: self.id,
                balance: self.balance,
                amount,
            })
    }

    /// Validate a withdrawal of `amount` and return the resulting balance.
    ///
    /// Checked against the mirrored balance only.
    ///
    /// # Errors
    ///
    /// [`EscrowError::InvalidAmount`] for zero,
    /// [`EscrowError::InsufficientEscrowBalance`] if `amount > balance`.
    pub fn plan_withdrawal(&self, amount: u64) -> Result<u64, EscrowError> {
        self.require_positive(amount, TransactionKind::Withdrawal)?;
        self.balance
            .checked_sub(amount)
            .ok_or(EscrowError::InsufficientEscrowBalance {
                escrow_id: self.id,
                requested: amount,
                balance: self.balance,
            })
    }

    /// Apply a transfer the ledger has already completed.
    pub(crate) fn commit(
        &mut self,
        kind: TransactionKind,
        amount: u64,
        counterparty: AccountAddress,
        balance_after: u64,
    ) {
        let timestamp = Timestamp::now();
        self.balance = balance_after;
        self.updated_at = timestamp;
        self.transactions.push(EscrowTransaction {
            kind,
            amount,
            counterparty,
            balance_after,
            timestamp,
        });
    }

    /// Sum of deposits minus sum of withdrawals, as recorded in the history.
    ///
    /// Returns `None` if the history itself is inconsistent (withdrawals
    /// exceeding deposits at any point).
    pub fn net_flow(&self) -> Option<u64> {
        self.transactions.iter().try_fold(0u64, |acc, tx| match tx.kind {
            TransactionKind::Deposit => acc.checked_add(tx.amount),
            TransactionKind::Withdrawal => acc.checked_sub(tx.amount),
        })
    }

    fn require_positive(&self, amount: u64, kind: TransactionKind) -> Result<(), EscrowError> {
        if amount == 0 {
            return Err(EscrowError::InvalidAmount {
                escrow_id: self.id,
                operation: kind.operation(),
            });
        }
        Ok(())
    }
}
