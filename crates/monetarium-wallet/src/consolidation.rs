//! Per-account consolidation address overrides.
//!
//! SSFee rewards for an account are paid to its consolidation address. By
//! default that is the account's first external address; an override stored
//! here replaces it. Records are keyed by the UTF-8 account name and hold a
//! raw 20-byte address hash.

use log::{debug, warn};
use monetarium_tx::BoxError;

use crate::error::WalletError;
use crate::store::StoreTx;

pub const CONSOLIDATION_BUCKET: &str = "accountconsolidation";
pub const HASH160_SIZE: usize = 20;

fn check_account(op: &'static str, account: &str) -> Result<(), WalletError> {
    if account.is_empty() {
        return Err(WalletError::Invalid { op, reason: "account name cannot be empty".into() });
    }
    Ok(())
}

/// Set the consolidation address for `account`.
///
/// `hash160` must be exactly 20 bytes. Use [`clear_account_consolidation_addr`]
/// to revert to the default address.
pub fn set_account_consolidation_addr(tx: &StoreTx<'_>, account: &str, hash160: &[u8]) -> Result<(), WalletError> {
    const OP: &str = "consolidation.set_account_consolidation_addr";
    if hash160.len() != HASH160_SIZE {
        return Err(WalletError::Invalid {
            op: OP,
            reason: format!("hash160 must be exactly {} bytes, got {}", HASH160_SIZE, hash160.len()),
        });
    }
    check_account(OP, account)?;

    tx.create_bucket_if_not_exists(CONSOLIDATION_BUCKET)?;
    tx.put(CONSOLIDATION_BUCKET, account.as_bytes(), hash160)?;
    debug!("consolidation address for account {:?} set to {}", account, hex::encode(hash160));
    Ok(())
}

/// The override for `account`, or `None` when the default address applies.
pub fn account_consolidation_addr(tx: &StoreTx<'_>, account: &str) -> Result<Option<[u8; HASH160_SIZE]>, WalletError> {
    const OP: &str = "consolidation.account_consolidation_addr";
    check_account(OP, account)?;

    let Some(raw) = tx.get(CONSOLIDATION_BUCKET, account.as_bytes())? else {
        return Ok(None);
    };
    let hash: [u8; HASH160_SIZE] = raw.as_slice().try_into().map_err(|_| {
        warn!("corrupted consolidation record for account {:?}: {} bytes", account, raw.len());
        WalletError::Corrupt {
            op: OP,
            reason: format!("invalid hash160 length {} for account {:?}", raw.len(), account),
        }
    })?;
    Ok(Some(hash))
}

/// Remove any override for `account`. Clearing an account with no override is a no-op.
pub fn clear_account_consolidation_addr(tx: &StoreTx<'_>, account: &str) -> Result<(), WalletError> {
    const OP: &str = "consolidation.clear_account_consolidation_addr";
    check_account(OP, account)?;
    tx.delete(CONSOLIDATION_BUCKET, account.as_bytes())
}

/// Supplies the default consolidation address of an account.
pub trait DefaultAddressSource {
    /// Hash of the first externally-derived address of `account`.
    fn first_external_address(&mut self, account: &str) -> Result<[u8; HASH160_SIZE], BoxError>;
}

impl<F> DefaultAddressSource for F
where
    F: FnMut(&str) -> Result<[u8; HASH160_SIZE], BoxError>,
{
    fn first_external_address(&mut self, account: &str) -> Result<[u8; HASH160_SIZE], BoxError> {
        self(account)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsolidationDestination {
    pub hash160: [u8; HASH160_SIZE],
    /// True when no override exists and the account's default address is used.
    pub is_default: bool,
}

/// Where SSFee rewards for `account` should be paid.
pub fn resolve_destination<D: DefaultAddressSource + ?Sized>(
    tx: &StoreTx<'_>,
    account: &str,
    defaults: &mut D,
) -> Result<ConsolidationDestination, WalletError> {
    const OP: &str = "consolidation.resolve_destination";
    match account_consolidation_addr(tx, account)? {
        Some(hash160) => Ok(ConsolidationDestination { hash160, is_default: false }),
        None => {
            let hash160 = defaults
                .first_external_address(account)
                .map_err(|source| WalletError::Source { op: OP, source })?;
            Ok(ConsolidationDestination { hash160, is_default: true })
        }
    }
}
