//! Error taxonomy shared by every Monetarium crate.
//!
//! Each crate keeps its own `thiserror` enum, but all of them map onto
//! `ErrorKind` so callers can branch on the class of failure without
//! matching crate-specific variants.

use std::fmt;

/// Class of a wallet-core failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed caller input (empty outputs, bad hash length, mixed coin types).
    Invalid,
    /// Inputs do not cover outputs plus fee.
    InsufficientBalance,
    /// Storage failure or corrupted persisted data.
    Io,
    /// Estimated transaction size is above the caller's limit.
    ExceedsMaximumSize,
    /// A collaborator (input source, change source) failed with its own error.
    Source,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Invalid => "invalid",
            ErrorKind::InsufficientBalance => "insufficient balance",
            ErrorKind::Io => "io",
            ErrorKind::ExceedsMaximumSize => "exceeds maximum size",
            ErrorKind::Source => "source",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
