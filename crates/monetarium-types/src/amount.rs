//! Coin types and the dual-representation amount.
//!
//! VAR (coin type 0) amounts are bounded signed 64-bit atom counts. SKA coin
//! types (1..=255) can be issued beyond 63 bits, so their amounts are held as
//! arbitrary-precision integers. Every API that moves value takes the coin type
//! alongside the amount and never infers the class from position.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

// =============================================================================
// Amount Constants
// =============================================================================

/// Atoms per whole coin (10^8), shared by every coin type.
pub const ATOMS_PER_COIN: i64 = 100_000_000;

/// Maximum VAR amount in atoms (21 million coins).
pub const MAX_ATOMS: i64 = 21_000_000 * ATOMS_PER_COIN;

/// Worst-case magnitude length of a serialized SKA amount.
pub const MAX_SECONDARY_AMOUNT_BYTES: usize = 16;

/// Number of decimal places for display.
pub const DISPLAY_DECIMAL_POINT: usize = 8;

// =============================================================================
// Coin Types
// =============================================================================

/// Coin type discriminator carried by every output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CoinType(pub u8);

/// Which amount representation a coin type uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    /// VAR: bounded i64 atoms.
    Primary,
    /// SKA: arbitrary-precision atoms.
    Secondary,
}

impl CoinType {
    /// The native VAR coin.
    pub const PRIMARY: CoinType = CoinType(0);

    pub fn is_primary(&self) -> bool {
        self.0 == 0
    }

    pub fn is_secondary(&self) -> bool {
        self.0 != 0
    }

    pub fn asset_class(&self) -> AssetClass {
        if self.is_primary() {
            AssetClass::Primary
        } else {
            AssetClass::Secondary
        }
    }
}

impl From<u8> for CoinType {
    fn from(v: u8) -> Self {
        CoinType(v)
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_primary() {
            f.write_str("VAR")
        } else {
            write!(f, "SKA-{}", self.0)
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("{op}: cannot combine VAR and SKA amounts")]
    ClassMismatch { op: &'static str },

    #[error("{op}: amount overflow")]
    Overflow { op: &'static str },

    #[error("{op}: negative SKA amount cannot be serialized")]
    Negative { op: &'static str },

    #[error("{op}: truncated amount encoding: need {need} bytes, have {have}")]
    Truncated { op: &'static str, need: usize, have: usize },

    #[error("{op}: SKA amount length {len} exceeds {max} bytes")]
    TooLong { op: &'static str, len: usize, max: usize },
}

impl AmountError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Invalid
    }
}

// =============================================================================
// Amount
// =============================================================================

/// A quantity of atoms in either representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Amount {
    Primary(i64),
    Secondary(BigInt),
}

impl Amount {
    /// Zero in the representation used by `coin_type`.
    pub fn zero(coin_type: CoinType) -> Amount {
        match coin_type.asset_class() {
            AssetClass::Primary => Amount::Primary(0),
            AssetClass::Secondary => Amount::Secondary(BigInt::zero()),
        }
    }

    /// Build an amount for `coin_type` from a bounded atom count.
    pub fn from_atoms(coin_type: CoinType, atoms: i64) -> Amount {
        match coin_type.asset_class() {
            AssetClass::Primary => Amount::Primary(atoms),
            AssetClass::Secondary => Amount::Secondary(BigInt::from(atoms)),
        }
    }

    pub fn class(&self) -> AssetClass {
        match self {
            Amount::Primary(_) => AssetClass::Primary,
            Amount::Secondary(_) => AssetClass::Secondary,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Amount::Primary(v) => *v == 0,
            Amount::Secondary(v) => v.is_zero(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Amount::Primary(v) => *v < 0,
            Amount::Secondary(v) => v.is_negative(),
        }
    }

    pub fn is_positive(&self) -> bool {
        match self {
            Amount::Primary(v) => *v > 0,
            Amount::Secondary(v) => v.is_positive(),
        }
    }

    /// Add two amounts of the same class.
    pub fn checked_add(&self, other: &Amount) -> Result<Amount, AmountError> {
        const OP: &str = "amount.checked_add";
        match (self, other) {
            (Amount::Primary(a), Amount::Primary(b)) => a
                .checked_add(*b)
                .map(Amount::Primary)
                .ok_or(AmountError::Overflow { op: OP }),
            (Amount::Secondary(a), Amount::Secondary(b)) => Ok(Amount::Secondary(a + b)),
            _ => Err(AmountError::ClassMismatch { op: OP }),
        }
    }

    /// Subtract `other` from `self`; both must share a class.
    pub fn checked_sub(&self, other: &Amount) -> Result<Amount, AmountError> {
        const OP: &str = "amount.checked_sub";
        match (self, other) {
            (Amount::Primary(a), Amount::Primary(b)) => a
                .checked_sub(*b)
                .map(Amount::Primary)
                .ok_or(AmountError::Overflow { op: OP }),
            (Amount::Secondary(a), Amount::Secondary(b)) => Ok(Amount::Secondary(a - b)),
            _ => Err(AmountError::ClassMismatch { op: OP }),
        }
    }

    /// Bounded view of the amount, if it fits in an i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Amount::Primary(v) => Some(*v),
            Amount::Secondary(v) => v.to_i64(),
        }
    }

    /// Arbitrary-precision view of the amount.
    pub fn to_bigint(&self) -> BigInt {
        match self {
            Amount::Primary(v) => BigInt::from(*v),
            Amount::Secondary(v) => v.clone(),
        }
    }

    /// Serialize the amount as it appears in an output.
    ///
    /// VAR: 8-byte signed little endian.
    /// SKA: 1-byte length followed by the big-endian magnitude (zero has length 0).
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, AmountError> {
        const OP: &str = "amount.to_wire_bytes";
        match self {
            Amount::Primary(v) => Ok(v.to_le_bytes().to_vec()),
            Amount::Secondary(v) => {
                if v.is_negative() {
                    return Err(AmountError::Negative { op: OP });
                }
                let magnitude = if v.is_zero() {
                    Vec::new()
                } else {
                    v.magnitude().to_bytes_be()
                };
                if magnitude.len() > u8::MAX as usize {
                    return Err(AmountError::TooLong { op: OP, len: magnitude.len(), max: u8::MAX as usize });
                }
                let mut out = Vec::with_capacity(1 + magnitude.len());
                out.push(magnitude.len() as u8);
                out.extend_from_slice(&magnitude);
                Ok(out)
            }
        }
    }

    /// Parse an output amount for `coin_type`. Returns the amount and the number
    /// of bytes consumed.
    pub fn from_wire_bytes(coin_type: CoinType, bytes: &[u8]) -> Result<(Amount, usize), AmountError> {
        const OP: &str = "amount.from_wire_bytes";
        match coin_type.asset_class() {
            AssetClass::Primary => {
                let raw: [u8; 8] = bytes
                    .get(..8)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(AmountError::Truncated { op: OP, need: 8, have: bytes.len() })?;
                Ok((Amount::Primary(i64::from_le_bytes(raw)), 8))
            }
            AssetClass::Secondary => {
                let len = *bytes
                    .first()
                    .ok_or(AmountError::Truncated { op: OP, need: 1, have: 0 })? as usize;
                let magnitude = bytes
                    .get(1..1 + len)
                    .ok_or(AmountError::Truncated { op: OP, need: 1 + len, have: bytes.len() })?;
                let value = BigInt::from_bytes_be(Sign::Plus, magnitude);
                Ok((Amount::Secondary(value), 1 + len))
            }
        }
    }
}

impl PartialOrd for Amount {
    /// Amounts of different classes are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Amount::Primary(a), Amount::Primary(b)) => Some(a.cmp(b)),
            (Amount::Secondary(a), Amount::Secondary(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_atoms(&self.to_bigint()))
    }
}

/// Format an atom count as a human-readable coin value (e.g. 1.23456789).
pub fn format_atoms(atoms: &BigInt) -> String {
    let coin = BigInt::from(ATOMS_PER_COIN);
    let sign = if atoms.is_negative() { "-" } else { "" };
    let magnitude = atoms.abs();
    let whole = &magnitude / &coin;
    let frac = (&magnitude % &coin).to_u64().unwrap_or(0);
    if frac == 0 {
        format!("{}{}.0", sign, whole)
    } else {
        let s = format!("{:0width$}", frac, width = DISPLAY_DECIMAL_POINT);
        format!("{}{}.{}", sign, whole, s.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_type_class() {
        assert!(CoinType::PRIMARY.is_primary());
        assert!(CoinType(1).is_secondary());
        assert_eq!(CoinType(255).asset_class(), AssetClass::Secondary);
        assert_eq!(CoinType(0).to_string(), "VAR");
        assert_eq!(CoinType(7).to_string(), "SKA-7");
    }

    #[test]
    fn test_zero_matches_class() {
        assert_eq!(Amount::zero(CoinType::PRIMARY), Amount::Primary(0));
        assert_eq!(Amount::zero(CoinType(3)), Amount::Secondary(BigInt::zero()));
        assert!(Amount::zero(CoinType(3)).is_zero());
    }

    #[test]
    fn test_checked_add_sub_primary() {
        let a = Amount::Primary(500);
        let b = Amount::Primary(200);
        assert_eq!(a.checked_add(&b).unwrap(), Amount::Primary(700));
        assert_eq!(b.checked_sub(&a).unwrap(), Amount::Primary(-300));
        assert!(b.checked_sub(&a).unwrap().is_negative());
    }

    #[test]
    fn test_checked_add_overflow() {
        let err = Amount::Primary(i64::MAX).checked_add(&Amount::Primary(1)).unwrap_err();
        assert!(matches!(err, AmountError::Overflow { .. }));
    }

    #[test]
    fn test_secondary_exceeds_i64() {
        let big = Amount::Secondary(BigInt::from(i64::MAX));
        let sum = big.checked_add(&Amount::Secondary(BigInt::from(i64::MAX))).unwrap();
        assert!(sum.is_positive());
        assert_eq!(sum.to_i64(), None);
        assert_eq!(sum.to_bigint(), BigInt::from(i64::MAX) * 2);
    }

    #[test]
    fn test_class_mismatch() {
        let err = Amount::Primary(1).checked_add(&Amount::Secondary(BigInt::from(1))).unwrap_err();
        assert_eq!(err, AmountError::ClassMismatch { op: "amount.checked_add" });
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(Amount::Primary(1).partial_cmp(&Amount::Secondary(BigInt::from(1))), None);
    }

    #[test]
    fn test_ordering_within_class() {
        assert!(Amount::Primary(2) > Amount::Primary(1));
        assert!(Amount::Secondary(BigInt::from(5)) < Amount::Secondary(BigInt::from(6)));
    }

    #[test]
    fn test_primary_wire_encoding() {
        let bytes = Amount::Primary(100_000_000).to_wire_bytes().unwrap();
        assert_eq!(hex::encode(&bytes), "00e1f50500000000");
        let (back, used) = Amount::from_wire_bytes(CoinType::PRIMARY, &bytes).unwrap();
        assert_eq!(back, Amount::Primary(100_000_000));
        assert_eq!(used, 8);
    }

    #[test]
    fn test_secondary_wire_encoding() {
        let amt = Amount::Secondary(BigInt::from(0x0102_0304u32));
        let bytes = amt.to_wire_bytes().unwrap();
        assert_eq!(hex::encode(&bytes), "0401020304");
        let (back, used) = Amount::from_wire_bytes(CoinType(1), &bytes).unwrap();
        assert_eq!(back, amt);
        assert_eq!(used, 5);
    }

    #[test]
    fn test_secondary_zero_wire_encoding() {
        let bytes = Amount::zero(CoinType(2)).to_wire_bytes().unwrap();
        assert_eq!(bytes, vec![0u8]);
    }

    #[test]
    fn test_secondary_negative_rejected() {
        let err = Amount::Secondary(BigInt::from(-1)).to_wire_bytes().unwrap_err();
        assert!(matches!(err, AmountError::Negative { .. }));
    }

    #[test]
    fn test_truncated_decoding() {
        assert!(matches!(
            Amount::from_wire_bytes(CoinType::PRIMARY, &[1, 2, 3]),
            Err(AmountError::Truncated { need: 8, have: 3, .. })
        ));
        assert!(matches!(
            Amount::from_wire_bytes(CoinType(1), &[4, 1, 2]),
            Err(AmountError::Truncated { need: 5, have: 3, .. })
        ));
    }

    #[test]
    fn test_format_atoms() {
        assert_eq!(Amount::Primary(100_000_000).to_string(), "1.0");
        assert_eq!(Amount::Primary(123_456_789).to_string(), "1.23456789");
        assert_eq!(Amount::Primary(-50_000_000).to_string(), "-0.5");
        assert_eq!(Amount::Primary(1_000).to_string(), "0.00001");
    }
}
