//! # custody-ledger — Token Ledger Interface
//!
//! The ledger is the system of record for token balances. The escrow state
//! machine never writes a balance directly; every movement of value goes
//! through [`TokenLedger::transfer`], which is atomic: it either moves the
//! full amount or changes nothing.
//!
//! ## Architecture
//!
//! The [`TokenLedger`] trait abstracts over the ledger backend. Production
//! deployments implement it against a live token program; tests, the CLI,
//! and single-process deployments use [`InMemoryLedger`]. The escrow service
//! takes the ledger by injection, never through a global.
//!
//! ## Crate Policy
//!
//! - Depends on `custody-core` only.
//! - No `.unwrap()` outside tests.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use traits::{LedgerAccount, TokenLedger};
