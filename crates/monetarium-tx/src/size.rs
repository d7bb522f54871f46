//! Worst-case serialized size estimation.
//!
//! Estimates are taken before signing, so signature scripts are sized from
//! their largest possible encoding and SKA amounts from their widest
//! magnitude. The estimate must never undershoot the signed size or the
//! resulting fee could be rejected by relay policy.

use log::trace;
use monetarium_types::amount::{AssetClass, CoinType, MAX_SECONDARY_AMOUNT_BYTES};

use crate::wire::{varint_serialize_size, TxOut};

// ─── Worst-case Script Sizes ────────────────────────────────────────────────

/// Signature script redeeming a compressed P2PK output:
/// OP_DATA_73 + 72-byte DER signature + sighash byte.
pub const REDEEM_P2PK_SIG_SCRIPT_SIZE: usize = 1 + 73;

/// Signature script redeeming a compressed P2PKH output:
/// OP_DATA_73 + signature, OP_DATA_33 + compressed pubkey.
pub const REDEEM_P2PKH_SIG_SCRIPT_SIZE: usize = 1 + 73 + 1 + 33;

/// Signature script redeeming a P2SH output wrapping a single-key script.
pub const REDEEM_P2SH_SIG_SCRIPT_SIZE: usize = 1 + 73 + 1 + 1 + 33 + 1;

/// OP_DUP OP_HASH160 OP_DATA_20 <hash> OP_EQUALVERIFY OP_CHECKSIG
pub const P2PKH_PK_SCRIPT_SIZE: usize = 1 + 1 + 1 + 20 + 1 + 1;

/// P2PKH script behind OP_SSTXCHANGE, used for treasury-add change.
pub const P2PKH_PK_TREASURY_SCRIPT_SIZE: usize = 1 + P2PKH_PK_SCRIPT_SIZE;

/// OP_HASH160 OP_DATA_20 <hash> OP_EQUAL
pub const P2SH_PK_SCRIPT_SIZE: usize = 1 + 1 + 20 + 1;

/// OP_RETURN OP_DATA_30 <20-byte hash> <8-byte amount> <2-byte fee limits>
pub const TICKET_COMMITMENT_SCRIPT_SIZE: usize = 1 + 1 + 20 + 8 + 2;

/// Treasury spend signature script: signature, pubkey and OP_TSPEND.
pub const TSPEND_INPUT_SIZE: usize = 1 + 73 + 1 + 33 + 1;

/// Serialized VAR output paying to a P2PKH script.
pub const P2PKH_OUTPUT_SIZE: usize = 8 + 1 + 2 + 1 + P2PKH_PK_SCRIPT_SIZE;

// ─── Wire Formats ───────────────────────────────────────────────────────────

/// Amount encoding used by a transaction's inputs and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Fixed 8-byte VAR amounts.
    Primary,
    /// Length-prefixed SKA magnitudes.
    Secondary,
}

impl WireFormat {
    pub fn for_coin_type(coin_type: CoinType) -> Self {
        match coin_type.asset_class() {
            AssetClass::Primary => WireFormat::Primary,
            AssetClass::Secondary => WireFormat::Secondary,
        }
    }
}

// ─── Per-part Estimates ─────────────────────────────────────────────────────

/// Version, lock time and expiry plus the input count (prefix and witness)
/// and the output count.
pub fn estimate_header_size(input_count: usize, output_count: usize) -> usize {
    12 + 2 * varint_serialize_size(input_count as u64) + varint_serialize_size(output_count as u64)
}

/// Prefix part of an input.
pub fn estimate_input_prefix_size() -> usize {
    32  // previous tx hash
    + 4 // output index
    + 1 // tree
    + 4 // sequence
}

/// Witness part of an input redeemed by a script of `script_size` bytes.
pub fn estimate_input_witness_size(script_size: usize, format: WireFormat) -> usize {
    let ska_value = match format {
        WireFormat::Primary => 0,
        WireFormat::Secondary => MAX_SECONDARY_AMOUNT_BYTES,
    };
    8           // value in
    + 1         // SKA value length
    + ska_value // SKA value magnitude
    + 4         // block height
    + 4         // block index
    + varint_serialize_size(script_size as u64)
    + script_size
}

/// Full (prefix + witness) size of one input.
pub fn estimate_input_size(script_size: usize, format: WireFormat) -> usize {
    estimate_input_prefix_size() + estimate_input_witness_size(script_size, format)
}

/// Size of an output paying to a script of `script_size` bytes.
pub fn estimate_output_size(script_size: usize, format: WireFormat) -> usize {
    let script = varint_serialize_size(script_size as u64) + script_size;
    match format {
        // value + coin type + script version
        WireFormat::Primary => 8 + 1 + 2 + script,
        // coin type + value length + widest magnitude + script version
        WireFormat::Secondary => 1 + 1 + MAX_SECONDARY_AMOUNT_BYTES + 2 + script,
    }
}

// ─── Transaction Estimates ──────────────────────────────────────────────────

/// Worst-case size of a signed VAR transaction spending inputs redeemed by
/// scripts of `redeem_script_sizes` and paying `outputs`. A non-zero
/// `change_script_size` adds a change output.
pub fn estimate_serialize_size(redeem_script_sizes: &[usize], outputs: &[TxOut], change_script_size: usize) -> usize {
    estimate_serialize_size_for(WireFormat::Primary, redeem_script_sizes, outputs, change_script_size)
}

/// Worst-case size of a signed SKA transaction.
pub fn estimate_serialize_size_secondary(
    redeem_script_sizes: &[usize],
    outputs: &[TxOut],
    change_script_size: usize,
) -> usize {
    estimate_serialize_size_for(WireFormat::Secondary, redeem_script_sizes, outputs, change_script_size)
}

/// Worst-case signed size with inputs and change sized for `format`.
///
/// Each requested output is sized by its own coin type.
pub fn estimate_serialize_size_for(
    format: WireFormat,
    redeem_script_sizes: &[usize],
    outputs: &[TxOut],
    change_script_size: usize,
) -> usize {
    let mut output_count = outputs.len();
    let mut change_size = 0;
    if change_script_size != 0 {
        change_size = estimate_output_size(change_script_size, format);
        output_count += 1;
    }

    let inputs: usize = redeem_script_sizes
        .iter()
        .map(|s| estimate_input_size(*s, format))
        .sum();
    let outs: usize = outputs
        .iter()
        .map(|o| estimate_output_size(o.pk_script.len(), WireFormat::for_coin_type(o.coin_type)))
        .sum();

    let size = estimate_header_size(redeem_script_sizes.len(), output_count) + inputs + outs + change_size;
    trace!(
        "estimated size {} ({:?}, {} inputs, {} outputs, change script {})",
        size,
        format,
        redeem_script_sizes.len(),
        outputs.len(),
        change_script_size
    );
    size
}

/// Worst-case signed size from abstract script sizes only, for fee estimation
/// before outputs are built. Uses the same per-part figures as
/// [`estimate_serialize_size_for`].
pub fn estimate_serialize_size_from_script_sizes(
    input_sizes: &[usize],
    output_sizes: &[usize],
    change_script_size: usize,
    format: WireFormat,
) -> usize {
    let mut output_count = output_sizes.len();
    let mut change_size = 0;
    if change_script_size > 0 {
        change_size = estimate_output_size(change_script_size, format);
        output_count += 1;
    }
    let inputs: usize = input_sizes.iter().map(|s| estimate_input_size(*s, format)).sum();
    let outs: usize = output_sizes.iter().map(|s| estimate_output_size(*s, format)).sum();
    estimate_header_size(input_sizes.len(), output_count) + inputs + outs + change_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn p2pkh_outputs(n: usize) -> Vec<TxOut> {
        (0..n).map(|_| TxOut::primary(1, vec![0u8; P2PKH_PK_SCRIPT_SIZE])).collect()
    }

    #[test]
    fn test_script_constants() {
        assert_eq!(REDEEM_P2PK_SIG_SCRIPT_SIZE, 74);
        assert_eq!(REDEEM_P2PKH_SIG_SCRIPT_SIZE, 108);
        assert_eq!(REDEEM_P2SH_SIG_SCRIPT_SIZE, 110);
        assert_eq!(P2PKH_PK_SCRIPT_SIZE, 25);
        assert_eq!(P2PKH_PK_TREASURY_SCRIPT_SIZE, 26);
        assert_eq!(P2SH_PK_SCRIPT_SIZE, 23);
        assert_eq!(TICKET_COMMITMENT_SCRIPT_SIZE, 32);
        assert_eq!(TSPEND_INPUT_SIZE, 109);
        assert_eq!(P2PKH_OUTPUT_SIZE, 37);
    }

    #[test]
    fn test_baseline_estimate() {
        assert_eq!(estimate_serialize_size(&[REDEEM_P2PKH_SIG_SCRIPT_SIZE], &[], 0), 182);
    }

    #[test]
    fn test_single_input_vectors() {
        let r = [REDEEM_P2PKH_SIG_SCRIPT_SIZE];
        let p2sh = vec![TxOut::primary(1, vec![0u8; P2SH_PK_SCRIPT_SIZE])];
        assert_eq!(estimate_serialize_size(&r, &p2pkh_outputs(1), 0), 219);
        assert_eq!(estimate_serialize_size(&r, &[], P2PKH_PK_SCRIPT_SIZE), 219);
        assert_eq!(estimate_serialize_size(&r, &p2pkh_outputs(1), P2PKH_PK_SCRIPT_SIZE), 256);
        assert_eq!(estimate_serialize_size(&r, &p2sh, 0), 217);
        assert_eq!(estimate_serialize_size(&r, &p2sh, P2PKH_PK_SCRIPT_SIZE), 254);
    }

    #[test]
    fn test_two_input_vectors() {
        let r = [REDEEM_P2PKH_SIG_SCRIPT_SIZE; 2];
        let p2sh = vec![TxOut::primary(1, vec![0u8; P2SH_PK_SCRIPT_SIZE])];
        assert_eq!(estimate_serialize_size(&r, &[], 0), 349);
        assert_eq!(estimate_serialize_size(&r, &p2pkh_outputs(1), 0), 386);
        assert_eq!(estimate_serialize_size(&r, &[], P2PKH_PK_SCRIPT_SIZE), 386);
        assert_eq!(estimate_serialize_size(&r, &p2pkh_outputs(1), P2PKH_PK_SCRIPT_SIZE), 423);
        assert_eq!(estimate_serialize_size(&r, &p2sh, 0), 384);
        assert_eq!(estimate_serialize_size(&r, &p2sh, P2PKH_PK_SCRIPT_SIZE), 421);
    }

    #[test]
    fn test_varint_boundary_vectors() {
        let r = [REDEEM_P2PKH_SIG_SCRIPT_SIZE];
        assert_eq!(estimate_serialize_size(&r, &p2pkh_outputs(0xfc), 0), 9506);
        assert_eq!(estimate_serialize_size(&r, &p2pkh_outputs(0xfd), 0), 9545);
        assert_eq!(estimate_serialize_size(&r, &p2pkh_outputs(0xfc), P2PKH_PK_SCRIPT_SIZE), 9545);
        assert_eq!(estimate_serialize_size(&[REDEEM_P2PKH_SIG_SCRIPT_SIZE; 0xfc], &[], 0), 42099);
        assert_eq!(estimate_serialize_size(&[REDEEM_P2PKH_SIG_SCRIPT_SIZE; 0xfd], &[], 0), 42270);
    }

    #[test]
    fn test_secondary_adds_magnitude_bytes() {
        let r = [REDEEM_P2PKH_SIG_SCRIPT_SIZE];
        let primary = estimate_serialize_size(&r, &[], P2PKH_PK_SCRIPT_SIZE);
        let secondary = estimate_serialize_size_secondary(&r, &[], P2PKH_PK_SCRIPT_SIZE);
        // 16 witness bytes per input, change trades 8 value bytes for 1 + 16
        assert_eq!(secondary - primary, 16 + 9);
    }

    #[test]
    fn test_secondary_output_assumes_widest_amount() {
        let small = TxOut::secondary(CoinType(1), BigInt::from(1), vec![0u8; 25]);
        assert_eq!(
            estimate_output_size(small.pk_script.len(), WireFormat::Secondary),
            1 + 1 + 16 + 2 + 1 + 25
        );
        assert!(estimate_output_size(25, WireFormat::Secondary) >= small.serialize_size());
    }

    #[test]
    fn test_estimate_covers_actual_size() {
        let mut tx = crate::wire::MsgTx::new(1);
        for i in 0..3u8 {
            tx.add_tx_in(crate::wire::TxIn::new(
                crate::wire::OutPoint::new([i; 32], 0, 0),
                monetarium_types::Amount::Secondary(BigInt::from(u128::MAX)),
                vec![0u8; REDEEM_P2PKH_SIG_SCRIPT_SIZE],
            ));
        }
        tx.add_tx_out(TxOut::secondary(CoinType(4), BigInt::from(u128::MAX), vec![0u8; 25]));
        let est = estimate_serialize_size_secondary(&[REDEEM_P2PKH_SIG_SCRIPT_SIZE; 3], &tx.tx_out, 0);
        assert!(est >= tx.serialize_size());
    }

    #[test]
    fn test_from_script_sizes_matches_full_estimator() {
        let outs = p2pkh_outputs(2);
        let full = estimate_serialize_size(&[108, 108, 74], &outs, 25);
        let abstract_sizes = estimate_serialize_size_from_script_sizes(&[108, 108, 74], &[25, 25], 25, WireFormat::Primary);
        assert_eq!(full, abstract_sizes);
    }

    #[test]
    fn test_from_script_sizes_secondary() {
        let a = estimate_serialize_size_from_script_sizes(&[108], &[25], 0, WireFormat::Secondary);
        let b = estimate_serialize_size_from_script_sizes(&[108], &[25], 0, WireFormat::Primary);
        assert_eq!(a - b, 16 + 9);
    }

    #[test]
    fn test_estimate_is_pure() {
        let outs = p2pkh_outputs(3);
        let a = estimate_serialize_size(&[108, 110], &outs, 25);
        let b = estimate_serialize_size(&[108, 110], &outs, 25);
        assert_eq!(a, b);
    }
}
