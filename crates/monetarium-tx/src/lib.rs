//! Monetarium transaction sizing, fee rules and authoring.
//!
//! Provides the dual-coin wire transaction model, worst-case size estimation
//! for VAR and SKA wire formats, relay fee and dust rules, the legacy stake
//! pool fee formula, the fee-convergent unsigned transaction author, and
//! structural recognition of SSFee distribution transactions.

pub mod wire;
pub mod size;
pub mod rules;
pub mod author;
pub mod ssfee;

pub use author::{new_unsigned_transaction, AuthoredTx, ChangeSource, InputDetail, InputSource};
pub use rules::{fee_for_serialize_size, is_dust_amount, stake_pool_ticket_fee, FeeSchedule};
pub use size::{estimate_serialize_size, WireFormat};
pub use ssfee::{classify_ssfee, is_ssfee, SsFee, SsFeeKind};
pub use wire::{MsgTx, OutPoint, TxIn, TxOut};

use monetarium_types::{AmountError, ErrorKind};
use thiserror::Error;

/// Error type for collaborators (input and change sources).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("{op}: invalid: {reason}")]
    Invalid { op: &'static str, reason: String },

    #[error("{op}: insufficient balance: need {need}, have {have}")]
    InsufficientBalance { op: &'static str, need: String, have: String },

    #[error("{op}: estimated size {size} exceeds maximum {max}")]
    ExceedsMaximumSize { op: &'static str, size: usize, max: usize },

    #[error("{op}: {source}")]
    Source { op: &'static str, source: BoxError },

    #[error("{op}: {source}")]
    Amount { op: &'static str, source: AmountError },
}

impl TxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TxError::Invalid { .. } | TxError::Amount { .. } => ErrorKind::Invalid,
            TxError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            TxError::ExceedsMaximumSize { .. } => ErrorKind::ExceedsMaximumSize,
            TxError::Source { .. } => ErrorKind::Source,
        }
    }

    /// Name of the operation that failed.
    pub fn op(&self) -> &'static str {
        match self {
            TxError::Invalid { op, .. }
            | TxError::InsufficientBalance { op, .. }
            | TxError::ExceedsMaximumSize { op, .. }
            | TxError::Source { op, .. }
            | TxError::Amount { op, .. } => op,
        }
    }
}
