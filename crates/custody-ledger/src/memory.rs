//! # In-Memory Ledger
//!
//! A [`TokenLedger`] backed by a `HashMap` behind a `parking_lot::RwLock`.
//! Each transfer runs under a single write lock, so debit and credit are
//! applied together or not at all. The lock is never held across `.await`.
//!
//! Beyond the trait, the in-memory ledger exposes provisioning helpers
//! ([`mint_to`](InMemoryLedger::mint_to)) and a simulated outage switch
//! ([`set_available`](InMemoryLedger::set_available)) so callers can
//! exercise the unavailable-ledger path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use custody_core::{AccountAddress, PrincipalId, TokenType};
use parking_lot::RwLock;

use crate::error::LedgerError;
use crate::traits::{LedgerAccount, TokenLedger};

/// Thread-safe in-memory token ledger.
#[derive(Debug)]
pub struct InMemoryLedger {
    accounts: RwLock<HashMap<AccountAddress, LedgerAccount>>,
    available: AtomicBool,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Credit `amount` newly issued tokens to `address`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAccount`] for an unknown address and
    /// [`LedgerError::BalanceOverflow`] if the credit exceeds `u64::MAX`.
    pub fn mint_to(&self, address: AccountAddress, amount: u64) -> Result<u64, LedgerError> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(&address)
            .ok_or_else(|| unknown_account(address))?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { account: address })?;
        tracing::debug!(account = %address, amount, "minted tokens");
        Ok(account.balance)
    }

    /// Sum of all balances of `token`.
    pub fn total_supply(&self, token: &TokenType) -> u128 {
        self.accounts
            .read()
            .values()
            .filter(|a| &a.token == token)
            .map(|a| u128::from(a.balance))
            .sum()
    }

    /// Number of accounts on the ledger.
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    /// Whether the ledger has no accounts.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Toggle a simulated outage. While unavailable, every trait call fails
    /// with [`LedgerError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), LedgerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable {
                reason: "in-memory ledger is offline".to_string(),
            })
        }
    }

    fn apply_transfer(
        &self,
        authority: PrincipalId,
        from: AccountAddress,
        to: AccountAddress,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.ensure_available()?;
        let mut accounts = self.accounts.write();

        let source = accounts.get(&from).ok_or_else(|| unknown_account(from))?;
        let destination = accounts.get(&to).ok_or_else(|| unknown_account(to))?;

        if source.holder != authority {
            return Err(LedgerError::Unauthorized {
                authority,
                account: from,
            });
        }
        if source.token != destination.token {
            return Err(LedgerError::TokenMismatch {
                source_token: source.token.clone(),
                destination_token: destination.token.clone(),
            });
        }
        if source.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from,
                requested: amount,
                available: source.balance,
            });
        }
        if from == to {
            return Ok(());
        }

        let debited = source.balance - amount;
        let credited = destination
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { account: to })?;

        // Both balances are validated above; commit under the same guard.
        if let Some(account) = accounts.get_mut(&from) {
            account.balance = debited;
        }
        if let Some(account) = accounts.get_mut(&to) {
            account.balance = credited;
        }
        tracing::debug!(from = %from, to = %to, amount, "ledger transfer applied");
        Ok(())
    }

    fn read_account(&self, address: AccountAddress) -> Result<LedgerAccount, LedgerError> {
        self.ensure_available()?;
        self.accounts
            .read()
            .get(&address)
            .cloned()
            .ok_or_else(|| unknown_account(address))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenLedger for InMemoryLedger {
    async fn create_account(
        &self,
        holder: PrincipalId,
        token: TokenType,
    ) -> Result<AccountAddress, LedgerError> {
        self.ensure_available()?;
        let address = AccountAddress::new();
        self.accounts.write().insert(
            address,
            LedgerAccount {
                address,
                holder,
                token,
                balance: 0,
            },
        );
        tracing::debug!(account = %address, holder = %holder, "ledger account created");
        Ok(address)
    }

    async fn transfer(
        &self,
        authority: PrincipalId,
        from: AccountAddress,
        to: AccountAddress,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.apply_transfer(authority, from, to, amount)
    }

    async fn balance_of(&self, address: AccountAddress) -> Result<u64, LedgerError> {
        self.read_account(address).map(|a| a.balance)
    }

    async fn account(&self, address: AccountAddress) -> Result<LedgerAccount, LedgerError> {
        self.read_account(address)
    }
}

fn unknown_account(address: AccountAddress) -> LedgerError {
    LedgerError::InvalidAccount {
        address,
        reason: "account does not exist".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spl() -> TokenType {
        TokenType::new("SPL").unwrap()
    }

    async fn funded(ledger: &InMemoryLedger, holder: PrincipalId, amount: u64) -> AccountAddress {
        let address = ledger.create_account(holder, spl()).await.unwrap();
        ledger.mint_to(address, amount).unwrap();
        address
    }

    #[tokio::test]
    async fn create_account_starts_at_zero() {
        let ledger = InMemoryLedger::new();
        let holder = PrincipalId::new();
        let address = ledger.create_account(holder, spl()).await.unwrap();
        let account = ledger.account(address).await.unwrap();
        assert_eq!(account.balance, 0);
        assert_eq!(account.holder, holder);
        assert_eq!(account.token, spl());
    }

    #[tokio::test]
    async fn transfer_moves_exact_amount() {
        let ledger = InMemoryLedger::new();
        let alice = PrincipalId::new();
        let from = funded(&ledger, alice, 1_000).await;
        let to = ledger.create_account(PrincipalId::new(), spl()).await.unwrap();

        ledger.transfer(alice, from, to, 400).await.unwrap();

        assert_eq!(ledger.balance_of(from).await.unwrap(), 600);
        assert_eq!(ledger.balance_of(to).await.unwrap(), 400);
        assert_eq!(ledger.total_supply(&spl()), 1_000);
    }

    #[tokio::test]
    async fn transfer_insufficient_funds_changes_nothing() {
        let ledger = InMemoryLedger::new();
        let alice = PrincipalId::new();
        let from = funded(&ledger, alice, 100).await;
        let to = ledger.create_account(PrincipalId::new(), spl()).await.unwrap();

        let err = ledger.transfer(alice, from, to, 101).await.unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                requested: 101,
                available: 100,
                ..
            }
        ));
        assert_eq!(ledger.balance_of(from).await.unwrap(), 100);
        assert_eq!(ledger.balance_of(to).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn transfer_requires_holder_authority() {
        let ledger = InMemoryLedger::new();
        let from = funded(&ledger, PrincipalId::new(), 100).await;
        let to = ledger.create_account(PrincipalId::new(), spl()).await.unwrap();

        let err = ledger
            .transfer(PrincipalId::new(), from, to, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert_eq!(ledger.balance_of(from).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn transfer_rejects_token_mismatch() {
        let ledger = InMemoryLedger::new();
        let alice = PrincipalId::new();
        let from = funded(&ledger, alice, 100).await;
        let to = ledger
            .create_account(alice, TokenType::new("USDC").unwrap())
            .await
            .unwrap();

        let err = ledger.transfer(alice, from, to, 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::TokenMismatch { .. }));
    }

    #[tokio::test]
    async fn transfer_to_unknown_account_rejected() {
        let ledger = InMemoryLedger::new();
        let alice = PrincipalId::new();
        let from = funded(&ledger, alice, 100).await;

        let err = ledger
            .transfer(alice, from, AccountAddress::new(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccount { .. }));
        assert_eq!(ledger.balance_of(from).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn self_transfer_is_a_no_op() {
        let ledger = InMemoryLedger::new();
        let alice = PrincipalId::new();
        let account = funded(&ledger, alice, 50).await;
        ledger.transfer(alice, account, account, 50).await.unwrap();
        assert_eq!(ledger.balance_of(account).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn credit_overflow_rejected() {
        let ledger = InMemoryLedger::new();
        let alice = PrincipalId::new();
        let from = funded(&ledger, alice, 10).await;
        let to = funded(&ledger, PrincipalId::new(), u64::MAX).await;

        let err = ledger.transfer(alice, from, to, 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::BalanceOverflow { .. }));
        assert_eq!(ledger.balance_of(from).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn offline_ledger_reports_unavailable() {
        let ledger = InMemoryLedger::new();
        let alice = PrincipalId::new();
        let from = funded(&ledger, alice, 100).await;
        let to = ledger.create_account(alice, spl()).await.unwrap();

        ledger.set_available(false);
        let err = ledger.transfer(alice, from, to, 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable { .. }));
        assert!(ledger.balance_of(from).await.is_err());

        ledger.set_available(true);
        assert_eq!(ledger.balance_of(from).await.unwrap(), 100);
    }

    #[test]
    fn mint_to_unknown_account_rejected() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.mint_to(AccountAddress::new(), 1).is_err());
        assert!(ledger.is_empty());
    }
}
