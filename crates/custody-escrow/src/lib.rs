//! # custody-escrow — Escrow State Machine
//!
//! Custodies fungible tokens on behalf of an owner. Three operations:
//!
//! - **initialize**: bind an escrow record to a fresh, empty custody account
//!   held by the service's custodian.
//! - **deposit**: move tokens from the owner's account into custody.
//! - **withdraw**: move tokens from custody back to an account of the
//!   owner's choosing.
//!
//! The record's `balance` mirrors the ledger balance of its custody account.
//! Every operation checks authorization and amount locally, performs one
//! atomic ledger transfer, and only then updates the mirror.
//!
//! ## Modules
//!
//! - **Record** (`record.rs`): the escrow record, its local precondition
//!   checks, and transaction history.
//! - **Service** (`service.rs`): record registry, per-record serialization,
//!   bounded ledger calls, and audits.
//! - **Config** (`config.rs`): custodian, token type, and timeout.
//! - **Error** (`error.rs`): the `EscrowError` taxonomy.
//!
//! ## Crate Policy
//!
//! - Depends on `custody-core` and `custody-ledger` internally.
//! - The ledger is injected; there is no global ledger handle.
//! - No `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod record;
pub mod service;

pub use config::{ConfigError, EscrowConfig};
pub use error::{ErrorKind, EscrowError};
pub use record::{EscrowRecord, EscrowStatus, EscrowTransaction, TransactionKind};
pub use service::{AuditReport, EscrowService};
