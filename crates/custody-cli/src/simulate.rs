//! # Simulate Subcommand
//!
//! Runs one escrow through a mint, a deposit, and a sequence of withdrawals
//! against an in-memory ledger. Rejected steps are recorded in the report
//! and the run continues, so over-withdrawals show up as failures rather
//! than aborting the simulation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use custody_core::{AccountAddress, EscrowId, PrincipalId, TokenType};
use custody_escrow::{EscrowConfig, EscrowError, EscrowRecord, EscrowService, ErrorKind};
use custody_ledger::{InMemoryLedger, TokenLedger};

/// Arguments for the `custody simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Tokens minted into the owner's account before the run.
    #[arg(long)]
    pub mint: u64,

    /// Amount deposited into the escrow.
    #[arg(long)]
    pub deposit: u64,

    /// Amount withdrawn back to the owner. Repeat for several withdrawals.
    #[arg(long)]
    pub withdraw: Vec<u64>,

    /// Token type of every account in the run.
    #[arg(long, default_value = "SPL")]
    pub token: String,

    /// Upper bound on each ledger call, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,
}

/// Outcome of one escrow operation in a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// `"deposit"` or `"withdraw"`.
    pub operation: &'static str,
    /// Requested amount.
    pub amount: u64,
    /// Escrow balance after the step, if it was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<u64>,
    /// Error class, if the step was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Error message, if the step was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    fn from_result(operation: &'static str, amount: u64, result: Result<u64, EscrowError>) -> Self {
        match result {
            Ok(balance) => Self {
                operation,
                amount,
                balance: Some(balance),
                error_kind: None,
                error: None,
            },
            Err(e) => Self {
                operation,
                amount,
                balance: None,
                error_kind: Some(e.kind()),
                error: Some(e.to_string()),
            },
        }
    }

    /// Whether the step was applied.
    pub fn applied(&self) -> bool {
        self.balance.is_some()
    }
}

/// Full simulation report, printed as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Escrow owner.
    pub owner: PrincipalId,
    /// Account the owner deposits from and withdraws to.
    pub owner_account: AccountAddress,
    /// Custody account bound to the escrow.
    pub custody_account: AccountAddress,
    /// Deposit first, then each withdrawal in order.
    pub steps: Vec<StepOutcome>,
    /// Ledger balance of `owner_account` after the run.
    pub owner_balance: u64,
    /// Ledger balance of `custody_account` after the run.
    pub custody_balance: u64,
    /// Final escrow record, transaction history included.
    pub record: EscrowRecord,
}

/// Execute the simulate subcommand. Returns the process exit code.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(simulate(args))?;

    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    println!("{json}");
    Ok(0)
}

/// Run the simulation and collect its report.
pub async fn simulate(args: &SimulateArgs) -> Result<SimulationReport> {
    let token: TokenType = args
        .token
        .parse()
        .with_context(|| format!("invalid --token {:?}", args.token))?;
    let custodian = PrincipalId::new();
    let config = EscrowConfig::new(token.clone(), custodian)
        .with_transfer_timeout(Duration::from_millis(args.timeout_ms.max(1)));

    let ledger = Arc::new(InMemoryLedger::new());
    let service = EscrowService::new(config, Arc::clone(&ledger));

    let owner = PrincipalId::new();
    let owner_account = ledger.create_account(owner, token.clone()).await?;
    let custody_account = ledger.create_account(custodian, token).await?;
    ledger
        .mint_to(owner_account, args.mint)
        .context("failed to mint into the owner account")?;

    let escrow_id = EscrowId::new();
    service
        .initialize(escrow_id, owner, custody_account)
        .await
        .context("failed to initialize escrow")?;
    tracing::debug!(escrow_id = %escrow_id, mint = args.mint, "simulation escrow ready");

    let mut steps = Vec::with_capacity(1 + args.withdraw.len());
    let deposited = service
        .deposit(escrow_id, owner, owner_account, args.deposit)
        .await;
    steps.push(StepOutcome::from_result("deposit", args.deposit, deposited));
    for &amount in &args.withdraw {
        let withdrawn = service
            .withdraw(escrow_id, owner, owner_account, amount)
            .await;
        steps.push(StepOutcome::from_result("withdraw", amount, withdrawn));
    }

    service
        .audit(escrow_id)
        .await
        .context("escrow diverged from the ledger")?;
    let record = service
        .record(escrow_id)
        .await
        .context("escrow record disappeared")?;

    Ok(SimulationReport {
        owner,
        owner_account,
        custody_account,
        steps,
        owner_balance: ledger.balance_of(owner_account).await?,
        custody_balance: ledger.balance_of(custody_account).await?,
        record,
    })
}
