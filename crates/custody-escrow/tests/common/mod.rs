//! Shared harness for escrow integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use custody_core::{AccountAddress, EscrowId, PrincipalId, TokenType};
use custody_escrow::{EscrowConfig, EscrowService};
use custody_ledger::{InMemoryLedger, LedgerAccount, LedgerError, TokenLedger};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// In-memory ledger whose transfers touching a gated account park for
/// `delay` before being applied. Dropping the transfer future while it is
/// parked means the transfer never happens.
pub struct GatedLedger {
    pub inner: InMemoryLedger,
    gated: Mutex<HashSet<AccountAddress>>,
    delay: Duration,
    /// Signalled each time a gated transfer parks.
    pub entered: Notify,
}

impl GatedLedger {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryLedger::new(),
            gated: Mutex::new(HashSet::new()),
            delay,
            entered: Notify::new(),
        }
    }

    pub fn gate(&self, account: AccountAddress) {
        self.gated.lock().insert(account);
    }

    pub fn open(&self, account: AccountAddress) {
        self.gated.lock().remove(&account);
    }

    fn is_gated(&self, from: AccountAddress, to: AccountAddress) -> bool {
        let gated = self.gated.lock();
        gated.contains(&from) || gated.contains(&to)
    }
}

impl TokenLedger for GatedLedger {
    async fn create_account(
        &self,
        holder: PrincipalId,
        token: TokenType,
    ) -> Result<AccountAddress, LedgerError> {
        self.inner.create_account(holder, token).await
    }

    async fn transfer(
        &self,
        authority: PrincipalId,
        from: AccountAddress,
        to: AccountAddress,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if self.is_gated(from, to) {
            self.entered.notify_one();
            tokio::time::sleep(self.delay).await;
        }
        self.inner.transfer(authority, from, to, amount).await
    }

    async fn balance_of(&self, address: AccountAddress) -> Result<u64, LedgerError> {
        self.inner.balance_of(address).await
    }

    async fn account(&self, address: AccountAddress) -> Result<LedgerAccount, LedgerError> {
        self.inner.account(address).await
    }
}

pub fn spl() -> TokenType {
    TokenType::new("SPL").unwrap()
}

/// One initialized escrow: owner U with a funded account, and an empty
/// custody account held by the service custodian.
pub struct Escrow {
    pub id: EscrowId,
    pub owner: PrincipalId,
    pub owner_account: AccountAddress,
    pub custody_account: AccountAddress,
}

pub struct Harness<L> {
    pub service: Arc<EscrowService<L>>,
    pub ledger: Arc<L>,
}

impl<L: TokenLedger> Harness<L> {
    pub fn with_ledger(ledger: Arc<L>, transfer_timeout: Duration) -> Self {
        let config = EscrowConfig::new(spl(), PrincipalId::new()).with_transfer_timeout(transfer_timeout);
        let service = Arc::new(EscrowService::new(config, Arc::clone(&ledger)));
        Self { service, ledger }
    }

    /// Create owner and custody accounts and initialize an escrow. The
    /// caller mints into `owner_account`.
    pub async fn open_escrow(&self) -> Escrow {
        let owner = PrincipalId::new();
        let owner_account = self.ledger.create_account(owner, spl()).await.unwrap();
        let custody_account = self
            .ledger
            .create_account(self.service.config().custodian, spl())
            .await
            .unwrap();
        let id = EscrowId::new();
        self.service
            .initialize(id, owner, custody_account)
            .await
            .unwrap();
        Escrow {
            id,
            owner,
            owner_account,
            custody_account,
        }
    }

    pub async fn balance(&self, account: AccountAddress) -> u64 {
        self.ledger.balance_of(account).await.unwrap()
    }

    pub async fn escrow_balance(&self, id: EscrowId) -> u64 {
        self.service.record(id).await.unwrap().balance
    }

    /// Mirror and ledger agree for `escrow`.
    pub async fn assert_in_sync(&self, escrow: &Escrow) {
        let recorded = self.escrow_balance(escrow.id).await;
        let actual = self.balance(escrow.custody_account).await;
        assert_eq!(recorded, actual, "escrow mirror diverged from ledger");
        self.service.audit(escrow.id).await.unwrap();
    }
}

pub fn in_memory() -> Harness<InMemoryLedger> {
    Harness::with_ledger(Arc::new(InMemoryLedger::new()), Duration::from_secs(30))
}

pub fn gated(delay: Duration, transfer_timeout: Duration) -> Harness<GatedLedger> {
    Harness::with_ledger(Arc::new(GatedLedger::new(delay)), transfer_timeout)
}
