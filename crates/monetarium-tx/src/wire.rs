//! Dual-coin wire transaction model.
//!
//! Transactions carry a prefix (inputs by outpoint, outputs) and a witness
//! (input values, block locations and signature scripts). Every output names
//! its coin type; VAR outputs serialize an 8-byte value, SKA outputs a
//! length-prefixed big-endian magnitude.

use std::fmt;

use monetarium_types::amount::{Amount, AssetClass, CoinType};
use monetarium_types::constants::MAX_PREV_OUT_INDEX;
use num_bigint::BigInt;
use serde::Serialize;

/// Sequence number of an input that does not use relative lock times.
pub const MAX_TX_IN_SEQUENCE_NUM: u32 = 0xffff_ffff;

/// Block height recorded for inputs whose origin is not yet known.
pub const NULL_BLOCK_HEIGHT: u32 = 0;

/// Block index recorded for inputs whose origin is not yet known.
pub const NULL_BLOCK_INDEX: u32 = 0xffff_ffff;

/// Regular transaction tree.
pub const TX_TREE_REGULAR: i8 = 0;

/// Number of bytes needed to encode `n` as a compact-size varint.
pub fn varint_serialize_size(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

// ─── Outpoints ──────────────────────────────────────────────────────────────

/// Reference to a previous transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OutPoint {
    pub hash: [u8; 32],
    pub index: u32,
    pub tree: i8,
}

impl OutPoint {
    pub fn new(hash: [u8; 32], index: u32, tree: i8) -> Self {
        Self { hash, index, tree }
    }

    /// The outpoint used by coinbase-style inputs: zero hash, maximum index.
    pub fn null() -> Self {
        Self { hash: [0u8; 32], index: MAX_PREV_OUT_INDEX, tree: TX_TREE_REGULAR }
    }

    pub fn is_null(&self) -> bool {
        self.index == MAX_PREV_OUT_INDEX && self.hash.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for OutPoint {
    /// Hashes display byte-reversed, as block explorers show them.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut h = self.hash;
        h.reverse();
        write!(f, "{}:{}", hex::encode(h), self.index)
    }
}

// ─── Inputs ─────────────────────────────────────────────────────────────────

/// Transaction input with its witness fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxIn {
    pub previous_outpoint: OutPoint,
    pub sequence: u32,
    /// Value of the output being spent, in the representation of its coin type.
    pub value_in: Amount,
    pub block_height: u32,
    pub block_index: u32,
    pub signature_script: Vec<u8>,
}

impl TxIn {
    pub fn new(previous_outpoint: OutPoint, value_in: Amount, signature_script: Vec<u8>) -> Self {
        Self {
            previous_outpoint,
            sequence: MAX_TX_IN_SEQUENCE_NUM,
            value_in,
            block_height: NULL_BLOCK_HEIGHT,
            block_index: NULL_BLOCK_INDEX,
            signature_script,
        }
    }

    /// Prefix bytes: outpoint hash, index, tree, sequence.
    pub fn serialize_size_prefix(&self) -> usize {
        32 + 4 + 1 + 4
    }

    /// Witness bytes: value, SKA value length and magnitude, height, index, script.
    pub fn serialize_size_witness(&self) -> usize {
        let ska_len = match &self.value_in {
            Amount::Primary(_) => 0,
            Amount::Secondary(v) => magnitude_len(v),
        };
        8 + 1 + ska_len + 4 + 4
            + varint_serialize_size(self.signature_script.len() as u64)
            + self.signature_script.len()
    }
}

// ─── Outputs ────────────────────────────────────────────────────────────────

/// Transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOut {
    pub value: Amount,
    pub coin_type: CoinType,
    pub version: u16,
    pub pk_script: Vec<u8>,
}

impl TxOut {
    /// Output paying `value` atoms of VAR.
    pub fn primary(value: i64, pk_script: Vec<u8>) -> Self {
        Self { value: Amount::Primary(value), coin_type: CoinType::PRIMARY, version: 0, pk_script }
    }

    /// Output paying `value` atoms of the SKA coin `coin_type`.
    pub fn secondary(coin_type: CoinType, value: BigInt, pk_script: Vec<u8>) -> Self {
        Self { value: Amount::Secondary(value), coin_type, version: 0, pk_script }
    }

    /// Output whose value representation follows `coin_type`.
    pub fn new(coin_type: CoinType, value: Amount, pk_script: Vec<u8>) -> Self {
        Self { value, coin_type, version: 0, pk_script }
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// Whether the amount representation agrees with the coin type.
    pub fn is_well_formed(&self) -> bool {
        self.value.class() == self.coin_type.asset_class()
    }

    /// Exact serialized size of this output.
    pub fn serialize_size(&self) -> usize {
        let script = varint_serialize_size(self.pk_script.len() as u64) + self.pk_script.len();
        match self.coin_type.asset_class() {
            // value + coin type + script version
            AssetClass::Primary => 8 + 1 + 2 + script,
            // coin type + value length + magnitude + script version
            AssetClass::Secondary => {
                let mag = match &self.value {
                    Amount::Secondary(v) => magnitude_len(v),
                    Amount::Primary(_) => 8,
                };
                1 + 1 + mag + 2 + script
            }
        }
    }
}

fn magnitude_len(v: &BigInt) -> usize {
    if v.sign() == num_bigint::Sign::NoSign {
        0
    } else {
        v.magnitude().to_bytes_be().len()
    }
}

// ─── Transactions ───────────────────────────────────────────────────────────

/// A full (prefix + witness) transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgTx {
    pub version: u16,
    pub tx_in: Vec<TxIn>,
    pub tx_out: Vec<TxOut>,
    pub lock_time: u32,
    pub expiry: u32,
}

impl MsgTx {
    pub fn new(version: u16) -> Self {
        Self { version, tx_in: Vec::new(), tx_out: Vec::new(), lock_time: 0, expiry: 0 }
    }

    pub fn add_tx_in(&mut self, tx_in: TxIn) {
        self.tx_in.push(tx_in);
    }

    pub fn add_tx_out(&mut self, tx_out: TxOut) {
        self.tx_out.push(tx_out);
    }

    /// Whether the transaction has exactly one input and it spends the null outpoint.
    pub fn has_single_null_input(&self) -> bool {
        self.tx_in.len() == 1 && self.tx_in[0].previous_outpoint.is_null()
    }

    /// Exact size of the full serialization.
    pub fn serialize_size(&self) -> usize {
        // version(4) + lock time(4) + expiry(4), input count in prefix and witness
        let mut size = 12
            + 2 * varint_serialize_size(self.tx_in.len() as u64)
            + varint_serialize_size(self.tx_out.len() as u64);
        for txin in &self.tx_in {
            size += txin.serialize_size_prefix() + txin.serialize_size_witness();
        }
        for txout in &self.tx_out {
            size += txout.serialize_size();
        }
        size
    }
}
