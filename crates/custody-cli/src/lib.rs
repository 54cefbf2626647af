//! # custody-cli — Custody Stack Command-Line Interface
//!
//! Provides the `custody` binary.
//!
//! ## Subcommands
//!
//! - `custody simulate`: open an escrow on a fresh in-memory ledger, mint,
//!   deposit and withdraw, and print a JSON report of every step.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives next to its handler; `main.rs` only dispatches.
//! - Handlers delegate to `custody-escrow`; no escrow rules are duplicated here.

pub mod simulate;
