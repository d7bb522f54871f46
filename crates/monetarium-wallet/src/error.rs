//! Wallet error types.

use monetarium_tx::{BoxError, TxError};
use monetarium_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("{op}: invalid: {reason}")]
    Invalid { op: &'static str, reason: String },

    #[error("{op}: storage error: {source}")]
    Storage { op: &'static str, source: rusqlite::Error },

    #[error("{op}: corrupted record: {reason}")]
    Corrupt { op: &'static str, reason: String },

    #[error("{op}: write attempted in a read-only transaction")]
    ReadOnly { op: &'static str },

    #[error("{op}: insufficient balance: need {need}, have {have}")]
    InsufficientBalance { op: &'static str, need: String, have: String },

    #[error("{op}: {source}")]
    Source { op: &'static str, source: BoxError },

    #[error(transparent)]
    Tx(#[from] TxError),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::Invalid { .. } | WalletError::ReadOnly { .. } => ErrorKind::Invalid,
            WalletError::Storage { .. } | WalletError::Corrupt { .. } => ErrorKind::Io,
            WalletError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            WalletError::Source { .. } => ErrorKind::Source,
            WalletError::Tx(e) => e.kind(),
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            WalletError::Invalid { op, .. }
            | WalletError::Storage { op, .. }
            | WalletError::Corrupt { op, .. }
            | WalletError::ReadOnly { op }
            | WalletError::InsufficientBalance { op, .. }
            | WalletError::Source { op, .. } => op,
            WalletError::Tx(e) => e.op(),
        }
    }
}

impl From<rusqlite::Error> for WalletError {
    fn from(source: rusqlite::Error) -> Self {
        WalletError::Storage { op: "walletdb", source }
    }
}
