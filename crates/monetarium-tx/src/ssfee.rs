//! SSFee distribution transaction recognition.
//!
//! An SSFee transaction pays fees accumulated in a block to its voters
//! ("SF", stake fee) or to its miner ("MF", miner fee). It is recognised
//! purely by shape:
//!
//! - version 3 or later
//! - exactly one input, either null (zero hash, maximum index) or spending a
//!   real output with an empty signature script (augmented)
//! - one to four reward outputs sharing a single coin type
//! - a final zero-value marker output `OP_RETURN OP_DATA_6 <M|S> F <height LE>`
//!
//! Value conservation is a consensus concern and is not checked here.

use monetarium_types::amount::CoinType;
use monetarium_types::constants::SSFEE_MIN_TX_VERSION;
use monetarium_types::ErrorKind;
use thiserror::Error;

use crate::rules::OP_RETURN;
use crate::wire::MsgTx;

/// OP_DATA_6 push opcode.
const OP_DATA_6: u8 = 0x06;

/// Serialized length of the marker script.
pub const SSFEE_MARKER_SIZE: usize = 8;

/// Maximum outputs including the marker.
pub const SSFEE_MAX_OUTPUTS: usize = 5;

/// Maximum reward outputs.
pub const SSFEE_MAX_REWARDS: usize = SSFEE_MAX_OUTPUTS - 1;

/// Who an SSFee pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SsFeeKind {
    /// "MF": fees paid to the block's miner.
    MinerFee,
    /// "SF": fees paid to the block's voters.
    StakerFee,
}

impl SsFeeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SsFeeKind::MinerFee => "MF",
            SsFeeKind::StakerFee => "SF",
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'M' => Some(SsFeeKind::MinerFee),
            b'S' => Some(SsFeeKind::StakerFee),
            _ => None,
        }
    }
}

/// Shape of the single SSFee input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Null outpoint; the value is created by the block.
    Null,
    /// Spends an existing output with an empty signature script.
    Augmented,
}

/// A recognised SSFee transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsFee {
    pub kind: SsFeeKind,
    /// Block height carried by the marker.
    pub height: u32,
    /// Coin type shared by the reward outputs.
    pub coin_type: CoinType,
    pub input_kind: InputKind,
    pub reward_count: usize,
}

/// First SSFee rule a transaction violates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SsFeeRule {
    #[error("transaction version {0} is below {min}", min = SSFEE_MIN_TX_VERSION)]
    Version(u16),

    #[error("expected exactly one input, found {0}")]
    InputCount(usize),

    #[error("input spends a real output but carries a signature script")]
    SignedInput,

    #[error("expected 2 to {max} outputs, found {0}", max = SSFEE_MAX_OUTPUTS)]
    OutputCount(usize),

    #[error("final output is not an SSFee marker")]
    MarkerScript,

    #[error("marker output carries a non-zero value")]
    MarkerValue,

    #[error("reward output {index} has coin type {found}, expected {expected}")]
    MixedCoinTypes { index: usize, expected: CoinType, found: CoinType },
}

impl SsFeeRule {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Invalid
    }
}

/// Parse an SSFee marker script into its kind and height.
pub fn parse_marker(script: &[u8]) -> Option<(SsFeeKind, u32)> {
    if script.len() != SSFEE_MARKER_SIZE || script[0] != OP_RETURN || script[1] != OP_DATA_6 || script[3] != b'F' {
        return None;
    }
    let kind = SsFeeKind::from_tag(script[2])?;
    let height = u32::from_le_bytes([script[4], script[5], script[6], script[7]]);
    Some((kind, height))
}

/// Build the marker script for `kind` at `height`.
pub fn marker_script(kind: SsFeeKind, height: u32) -> Vec<u8> {
    let tag = kind.as_str().as_bytes();
    let mut script = vec![OP_RETURN, OP_DATA_6, tag[0], tag[1]];
    script.extend_from_slice(&height.to_le_bytes());
    script
}

/// Check every SSFee rule, returning the first violation.
pub fn check_ssfee(tx: &MsgTx) -> Result<SsFee, SsFeeRule> {
    if tx.version < SSFEE_MIN_TX_VERSION {
        return Err(SsFeeRule::Version(tx.version));
    }

    if tx.tx_in.len() != 1 {
        return Err(SsFeeRule::InputCount(tx.tx_in.len()));
    }
    let input = &tx.tx_in[0];
    let input_kind = if input.previous_outpoint.is_null() {
        InputKind::Null
    } else if input.signature_script.is_empty() {
        InputKind::Augmented
    } else {
        return Err(SsFeeRule::SignedInput);
    };

    let n = tx.tx_out.len();
    if !(2..=SSFEE_MAX_OUTPUTS).contains(&n) {
        return Err(SsFeeRule::OutputCount(n));
    }

    let marker = &tx.tx_out[n - 1];
    let (kind, height) = parse_marker(&marker.pk_script).ok_or(SsFeeRule::MarkerScript)?;
    if !marker.value.is_zero() {
        return Err(SsFeeRule::MarkerValue);
    }

    let rewards = &tx.tx_out[..n - 1];
    let coin_type = rewards[0].coin_type;
    for (index, out) in rewards.iter().enumerate() {
        if out.coin_type != coin_type {
            return Err(SsFeeRule::MixedCoinTypes { index, expected: coin_type, found: out.coin_type });
        }
    }

    Ok(SsFee { kind, height, coin_type, input_kind, reward_count: rewards.len() })
}

/// Classify `tx` as an SSFee, or `None` if it does not have the shape.
pub fn classify_ssfee(tx: &MsgTx) -> Option<SsFee> {
    check_ssfee(tx).ok()
}

pub fn is_ssfee(tx: &MsgTx) -> bool {
    classify_ssfee(tx).is_some()
}

/// Marker tag of an SSFee ("MF" or "SF"), or an empty string.
pub fn ssfee_type(tx: &MsgTx) -> &'static str {
    classify_ssfee(tx).map(|s| s.kind.as_str()).unwrap_or("")
}

/// Whether `tx` is an SSFee paying the block's miner.
pub fn is_ssfee_miner_tx(tx: &MsgTx) -> bool {
    matches!(classify_ssfee(tx), Some(SsFee { kind: SsFeeKind::MinerFee, .. }))
}
