//! # custody-core — Foundational Types for the Custody Stack
//!
//! Every other crate in the workspace depends on `custody-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `EscrowId`, `PrincipalId`,
//!    `AccountAddress`, `TokenType`; no bare UUIDs or strings cross a crate
//!    boundary. Passing an account address where a principal is expected is
//!    a compile error.
//!
//! 2. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `custody-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::CoreError;
pub use identity::{AccountAddress, EscrowId, PrincipalId, TokenType};
pub use temporal::Timestamp;
