//! Core types and constants for the Monetarium dual-coin wallet.
//!
//! This crate provides the foundational types used across all Monetarium
//! crates: the dual-representation `Amount` (bounded for VAR, arbitrary
//! precision for SKA coin types), network chain parameters, subsidy and
//! maturity rules, and the shared error taxonomy.

pub mod amount;
pub mod consensus;
pub mod constants;
pub mod error;

pub use amount::{Amount, AmountError, AssetClass, CoinType};
pub use constants::{ChainParams, Network};
pub use error::ErrorKind;
