//! Deterministic contract-call simulator.
//!
//! Tests build a [`Simnet`] from a [`SimnetConfig`], pass it around
//! explicitly, and drive it with public and read-only calls:
//!
//! * [`value`]: the typed values crossing the call boundary.
//! * [`principal`]: account and contract addresses.
//! * [`ledger`]: per-principal, per-asset balances with atomic mutation.
//! * [`contracts`]: the [`Contract`](contracts::Contract) trait and the
//!   bundled native contracts.
//! * [`simnet`]: the simulator itself.

pub mod config;
pub mod contracts;
pub mod ledger;
pub mod principal;
pub mod script;
pub mod simnet;
pub mod telemetry;
pub mod value;

mod error;

pub use config::SimnetConfig;
pub use error::{RuntimeError, SimnetError};
pub use principal::{ContractId, Principal};
pub use simnet::{CallReceipt, Simnet};
pub use value::Value;
