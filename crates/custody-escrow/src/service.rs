//! # Escrow Service
//!
//! Owns every escrow record and is the only component allowed to mutate
//! one. Each operation follows the same shape:
//!
//! ```text
//! lookup ─▶ lock record ─▶ local checks ─▶ ledger transfer ─▶ commit mirror
//! ```
//!
//! ## Concurrency
//!
//! Each record sits behind its own `tokio::sync::Mutex`, held across the
//! ledger `.await`. The mutex is fair, so operations against one record run
//! one at a time in arrival order, while operations against different
//! records never contend. The record index is a `parking_lot::RwLock` that
//! is only held for map lookups and inserts, never across `.await`.
//!
//! The ledger call is the only suspension point and is bounded by
//! [`EscrowConfig::transfer_timeout`]. The mirror is committed only after the
//! ledger reports success: a failed, timed-out, or dropped call leaves the
//! record untouched.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use custody_core::{AccountAddress, EscrowId, PrincipalId, Timestamp};
use custody_ledger::{LedgerError, TokenLedger};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::EscrowConfig;
use crate::error::EscrowError;
use crate::record::{EscrowRecord, EscrowStatus, TransactionKind};

type RecordCell = Arc<Mutex<EscrowRecord>>;

#[derive(Debug, Default)]
struct Registry {
    records: HashMap<EscrowId, RecordCell>,
    custody_bindings: HashMap<AccountAddress, EscrowId>,
}

/// Result of [`EscrowService::audit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// The audited escrow.
    pub escrow_id: EscrowId,
    /// Its custody account.
    pub custody_account: AccountAddress,
    /// Balance held in the record.
    pub recorded_balance: u64,
    /// Balance reported by the ledger.
    pub ledger_balance: u64,
    /// Number of committed transactions.
    pub transaction_count: usize,
    /// When the audit ran.
    pub audited_at: Timestamp,
}

/// The escrow state machine, generic over the ledger it custodies on.
#[derive(Debug)]
pub struct EscrowService<L> {
    config: EscrowConfig,
    ledger: Arc<L>,
    registry: RwLock<Registry>,
}

impl<L: TokenLedger> EscrowService<L> {
    /// Create a service with no records.
    pub fn new(config: EscrowConfig, ledger: Arc<L>) -> Self {
        Self {
            config,
            ledger,
            registry: RwLock::new(Registry::default()),
        }
    }

    /// The service configuration.
    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    /// The injected ledger.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Bind a new escrow record to `escrow_id`.
    ///
    /// The custody account must already exist on the ledger, hold the
    /// configured token type, be held by the configured custodian, have a
    /// zero balance, and not be bound to any other escrow.
    ///
    /// # Errors
    ///
    /// [`EscrowError::AlreadyInitialized`], [`EscrowError::InvalidCustodyAccount`],
    /// or [`EscrowError::LedgerUnavailable`] / [`EscrowError::TransferTimeout`]
    /// if the custody account cannot be inspected.
    pub async fn initialize(
        &self,
        escrow_id: EscrowId,
        owner: PrincipalId,
        custody_account: AccountAddress,
    ) -> Result<EscrowRecord, EscrowError> {
        let result = self.initialize_inner(escrow_id, owner, custody_account).await;
        match &result {
            Ok(_) => tracing::info!(
                escrow_id = %escrow_id,
                owner = %owner,
                custody_account = %custody_account,
                "escrow initialized"
            ),
            Err(e) => tracing::warn!(escrow_id = %escrow_id, error = %e, "initialize rejected"),
        }
        result
    }

    async fn initialize_inner(
        &self,
        escrow_id: EscrowId,
        owner: PrincipalId,
        custody_account: AccountAddress,
    ) -> Result<EscrowRecord, EscrowError> {
        if self.registry.read().records.contains_key(&escrow_id) {
            return Err(EscrowError::AlreadyInitialized { escrow_id });
        }

        let reject = |reason: String| EscrowError::InvalidCustodyAccount {
            escrow_id,
            account: custody_account,
            reason,
        };

        let account = match self
            .bounded(escrow_id, "initialize", self.ledger.account(custody_account))
            .await?
        {
            Ok(account) => account,
            Err(LedgerError::Unavailable { reason }) => {
                return Err(EscrowError::LedgerUnavailable {
                    escrow_id,
                    operation: "initialize",
                    reason,
                })
            }
            Err(e) => return Err(reject(e.to_string())),
        };

        if account.token != self.config.token {
            return Err(reject(format!(
                "holds {} but this escrow custodies {}",
                account.token, self.config.token
            )));
        }
        if account.holder != self.config.custodian {
            return Err(reject(format!(
                "held by {} rather than the custodian {}",
                account.holder, self.config.custodian
            )));
        }
        if account.balance != 0 {
            return Err(reject(format!(
                "balance must be zero at bind time, found {}",
                account.balance
            )));
        }

        let record = EscrowRecord::new(escrow_id, owner, custody_account, account.token);

        let mut registry = self.registry.write();
        if registry.records.contains_key(&escrow_id) {
            return Err(EscrowError::AlreadyInitialized { escrow_id });
        }
        if let Some(bound) = registry.custody_bindings.get(&custody_account) {
            return Err(reject(format!("already bound to {bound}")));
        }
        registry.custody_bindings.insert(custody_account, escrow_id);
        registry
            .records
            .insert(escrow_id, Arc::new(Mutex::new(record.clone())));
        Ok(record)
    }

    /// Move `amount` from the caller's `source` account into custody.
    ///
    /// Returns the escrow balance after the deposit.
    ///
    /// # Errors
    ///
    /// Local checks, in order: [`EscrowError::NotInitialized`],
    /// [`EscrowError::Unauthorized`], [`EscrowError::InvalidAmount`],
    /// [`EscrowError::Overflow`], [`EscrowError::InvalidCounterparty`] if
    /// `source` is a custody account. Ledger failures:
    /// [`EscrowError::InsufficientFunds`], [`EscrowError::TransferRejected`],
    /// [`EscrowError::LedgerUnavailable`], [`EscrowError::TransferTimeout`].
    pub async fn deposit(
        &self,
        escrow_id: EscrowId,
        caller: PrincipalId,
        source: AccountAddress,
        amount: u64,
    ) -> Result<u64, EscrowError> {
        self.execute(escrow_id, caller, source, amount, TransactionKind::Deposit)
            .await
    }

    /// Move `amount` out of custody into `destination`.
    ///
    /// Returns the escrow balance after the withdrawal.
    ///
    /// # Errors
    ///
    /// Local checks, in order: [`EscrowError::NotInitialized`],
    /// [`EscrowError::Unauthorized`], [`EscrowError::InvalidAmount`],
    /// [`EscrowError::InsufficientEscrowBalance`],
    /// [`EscrowError::InvalidCounterparty`] if `destination` is a custody
    /// account. Ledger failures as for
    /// [`deposit`](Self::deposit).
    pub async fn withdraw(
        &self,
        escrow_id: EscrowId,
        caller: PrincipalId,
        destination: AccountAddress,
        amount: u64,
    ) -> Result<u64, EscrowError> {
        self.execute(
            escrow_id,
            caller,
            destination,
            amount,
            TransactionKind::Withdrawal,
        )
        .await
    }

    async fn execute(
        &self,
        escrow_id: EscrowId,
        caller: PrincipalId,
        counterparty: AccountAddress,
        amount: u64,
        kind: TransactionKind,
    ) -> Result<u64, EscrowError> {
        let operation = kind.operation();
        let result = self
            .execute_inner(escrow_id, caller, counterparty, amount, kind)
            .await;
        match &result {
            Ok(balance) => tracing::info!(
                escrow_id = %escrow_id,
                operation,
                amount,
                balance,
                "escrow transfer committed"
            ),
            Err(e) => tracing::warn!(
                escrow_id = %escrow_id,
                operation,
                amount,
                kind = ?e.kind(),
                error = %e,
                "escrow transfer rejected"
            ),
        }
        result
    }

    async fn execute_inner(
        &self,
        escrow_id: EscrowId,
        caller: PrincipalId,
        counterparty: AccountAddress,
        amount: u64,
        kind: TransactionKind,
    ) -> Result<u64, EscrowError> {
        let operation = kind.operation();
        let cell = self.cell(escrow_id)?;
        let mut record = cell.lock().await;

        record.authorize(caller)?;
        let (balance_after, authority, from, to) = match kind {
            TransactionKind::Deposit => (
                record.plan_deposit(amount)?,
                caller,
                counterparty,
                record.custody_account,
            ),
            TransactionKind::Withdrawal => (
                record.plan_withdrawal(amount)?,
                self.config.custodian,
                record.custody_account,
                counterparty,
            ),
        };
        self.reject_custody_counterparty(escrow_id, operation, counterparty)?;

        self.bounded(
            escrow_id,
            operation,
            self.ledger.transfer(authority, from, to, amount),
        )
        .await?
        .map_err(|e| EscrowError::from_ledger(escrow_id, operation, e))?;

        record.commit(kind, amount, counterparty, balance_after);
        Ok(balance_after)
    }

    /// Snapshot of the record bound to `escrow_id`.
    ///
    /// Waits for any in-flight operation on the record, so the snapshot is
    /// never taken between a ledger transfer and its mirror update.
    pub async fn record(&self, escrow_id: EscrowId) -> Option<EscrowRecord> {
        let cell = self.cell(escrow_id).ok()?;
        let record = cell.lock().await;
        Some(record.clone())
    }

    /// Snapshots of every record, in no particular order.
    pub async fn records(&self) -> Vec<EscrowRecord> {
        let cells: Vec<RecordCell> = self.registry.read().records.values().cloned().collect();
        let mut snapshots = Vec::with_capacity(cells.len());
        for cell in cells {
            snapshots.push(cell.lock().await.clone());
        }
        snapshots
    }

    /// Lifecycle status of `escrow_id`.
    pub fn status(&self, escrow_id: EscrowId) -> EscrowStatus {
        if self.registry.read().records.contains_key(&escrow_id) {
            EscrowStatus::Active
        } else {
            EscrowStatus::Uninitialized
        }
    }

    /// Compare the record against the ledger and its own history.
    ///
    /// Holds the record lock for the duration, so no deposit or withdrawal
    /// interleaves with the comparison.
    ///
    /// # Errors
    ///
    /// [`EscrowError::BalanceDiverged`] if the recorded balance differs from
    /// the custody account's ledger balance or from the transaction history.
    pub async fn audit(&self, escrow_id: EscrowId) -> Result<AuditReport, EscrowError> {
        let cell = self.cell(escrow_id)?;
        let record = cell.lock().await;

        let ledger_balance = self
            .bounded(
                escrow_id,
                "audit",
                self.ledger.balance_of(record.custody_account),
            )
            .await?
            .map_err(|e| EscrowError::from_ledger(escrow_id, "audit", e))?;

        if ledger_balance != record.balance {
            tracing::error!(
                escrow_id = %escrow_id,
                recorded = record.balance,
                ledger = ledger_balance,
                "escrow balance diverged from ledger"
            );
            return Err(EscrowError::BalanceDiverged {
                escrow_id,
                recorded: record.balance,
                observed: ledger_balance,
                source_of_truth: "ledger",
            });
        }

        let net_flow = record.net_flow();
        if net_flow != Some(record.balance) {
            tracing::error!(
                escrow_id = %escrow_id,
                recorded = record.balance,
                history = ?net_flow,
                "escrow balance diverged from transaction history"
            );
            return Err(EscrowError::BalanceDiverged {
                escrow_id,
                recorded: record.balance,
                observed: net_flow.unwrap_or_default(),
                source_of_truth: "history",
            });
        }

        tracing::debug!(escrow_id = %escrow_id, balance = record.balance, "escrow audit passed");
        Ok(AuditReport {
            escrow_id,
            custody_account: record.custody_account,
            recorded_balance: record.balance,
            ledger_balance,
            transaction_count: record.transactions.len(),
            audited_at: Timestamp::now(),
        })
    }

    /// Deposit sources and withdrawal destinations must not be bound
    /// custody accounts, including the escrow's own.
    fn reject_custody_counterparty(
        &self,
        escrow_id: EscrowId,
        operation: &'static str,
        counterparty: AccountAddress,
    ) -> Result<(), EscrowError> {
        match self.registry.read().custody_bindings.get(&counterparty) {
            Some(&bound_to) => Err(EscrowError::InvalidCounterparty {
                escrow_id,
                operation,
                account: counterparty,
                bound_to,
            }),
            None => Ok(()),
        }
    }

    fn cell(&self, escrow_id: EscrowId) -> Result<RecordCell, EscrowError> {
        self.registry
            .read()
            .records
            .get(&escrow_id)
            .cloned()
            .ok_or(EscrowError::NotInitialized { escrow_id })
    }

    /// Run a ledger call under the configured timeout. The outer `Result`
    /// carries the timeout, the inner one the ledger's own answer.
    async fn bounded<T>(
        &self,
        escrow_id: EscrowId,
        operation: &'static str,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<Result<T, LedgerError>, EscrowError> {
        let timeout = self.config.transfer_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| EscrowError::TransferTimeout {
                escrow_id,
                operation,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
    }
}
