//! Relay fee, dust and stake pool fee rules.

use log::trace;
use monetarium_types::amount::{Amount, CoinType, MAX_ATOMS};
use monetarium_types::consensus::vote_subsidy;
use monetarium_types::constants::{ChainParams, VoteSplit, DUST_MULTIPLIER};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::wire::{varint_serialize_size, MsgTx, TxOut};

/// OP_RETURN opcode; outputs starting with it only carry data.
pub const OP_RETURN: u8 = 0x6a;

/// Worst-case size of the input that will later spend an output.
pub const DUST_SPEND_INPUT_SIZE: usize = 165;

/// Signature-script prefix that marks an SKA emission input.
pub const SKA_EMISSION_MARKER: &[u8] = b"SKA";

// ─── Relay Fees ─────────────────────────────────────────────────────────────

/// Minimum fee for a transaction of `size` bytes at `relay_fee_per_kb`.
///
/// Rounds up so a fractional kilobyte is never undercharged, and clamps to
/// the maximum VAR amount.
pub fn fee_for_serialize_size(relay_fee_per_kb: i64, size: usize) -> i64 {
    if relay_fee_per_kb <= 0 {
        return 0;
    }
    let product = size as i128 * relay_fee_per_kb as i128;
    let fee = (product + 999) / 1000;
    fee.min(MAX_ATOMS as i128) as i64
}

/// Fee for `size` bytes expressed in the representation of `coin_type`.
///
/// Every coin type pays the same atoms per kilobyte.
pub fn fee_for_serialize_size_dual_coin(relay_fee_per_kb: i64, size: usize, coin_type: CoinType) -> Amount {
    Amount::from_atoms(coin_type, fee_for_serialize_size(relay_fee_per_kb, size))
}

// ─── Dust ───────────────────────────────────────────────────────────────────

/// Whether an output of `amount` atoms with a `script_size`-byte script costs
/// more to create and spend than `DUST_MULTIPLIER` times its value allows.
pub fn is_dust_amount(amount: i64, script_size: usize, relay_fee_per_kb: i64) -> bool {
    // value(8) + script version(2) + script + input that spends it
    let total_size = 8 + 2 + varint_serialize_size(script_size as u64) + script_size + DUST_SPEND_INPUT_SIZE;
    let cost = DUST_MULTIPLIER as i128 * total_size as i128;
    (amount as i128 * 1000) / cost < relay_fee_per_kb as i128
}

/// Dust check for a complete output. SKA outputs and data-carrier outputs
/// are never dust.
pub fn is_dust_output(output: &TxOut, relay_fee_per_kb: i64) -> bool {
    if output.coin_type.is_secondary() {
        return false;
    }
    if output.pk_script.first() == Some(&OP_RETURN) {
        return false;
    }
    match &output.value {
        Amount::Primary(v) => is_dust_amount(*v, output.pk_script.len(), relay_fee_per_kb),
        Amount::Secondary(_) => false,
    }
}

// ─── Dual-coin Helpers ──────────────────────────────────────────────────────

/// Coin type of the first output, or VAR when there are none.
pub fn coin_type_from_outputs(outputs: &[TxOut]) -> CoinType {
    outputs.first().map(|o| o.coin_type).unwrap_or(CoinType::PRIMARY)
}

/// Whether `tx` is an SKA emission: one null input whose signature script
/// carries the emission marker, paying only SKA outputs. Emissions pay no fee.
pub fn is_emission_transaction(tx: &MsgTx) -> bool {
    if !tx.has_single_null_input() || tx.tx_out.is_empty() {
        return false;
    }
    tx.tx_in[0].signature_script.starts_with(SKA_EMISSION_MARKER)
        && tx.tx_out.iter().all(|o| o.coin_type.is_secondary())
}

// ─── Stake Pool Fees ────────────────────────────────────────────────────────

/// Subsidy split in force when computing a stake pool fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSchedule {
    Original,
    Dcp0010,
    Dcp0012,
}

impl FeeSchedule {
    /// Resolve the agenda flags. The later agenda takes precedence.
    pub fn from_agendas(dcp0010_active: bool, dcp0012_active: bool) -> Self {
        if dcp0012_active {
            FeeSchedule::Dcp0012
        } else if dcp0010_active {
            FeeSchedule::Dcp0010
        } else {
            FeeSchedule::Original
        }
    }

    pub fn vote_split(&self, params: &ChainParams) -> VoteSplit {
        match self {
            FeeSchedule::Original => params.vote_split_original,
            FeeSchedule::Dcp0010 => params.vote_split_dcp0010,
            FeeSchedule::Dcp0012 => params.vote_split_dcp0012,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeeSchedule::Original => "original",
            FeeSchedule::Dcp0010 => "dcp0010",
            FeeSchedule::Dcp0012 => "dcp0012",
        }
    }
}

/// Stake pool operator's fee for a ticket bought at `stake_diff` with `fee`
/// at `height`, for a pool charging `pool_fee_percent` (e.g. 2.59).
pub fn stake_pool_ticket_fee(
    stake_diff: i64,
    fee: i64,
    height: i64,
    pool_fee_percent: f64,
    params: &ChainParams,
    dcp0010_active: bool,
    dcp0012_active: bool,
) -> i64 {
    let schedule = FeeSchedule::from_agendas(dcp0010_active, dcp0012_active);
    trace!("stake pool fee schedule {} at height {}", schedule.as_str(), height);
    match schedule {
        FeeSchedule::Original => pool_fee_original(stake_diff, fee, height, pool_fee_percent, params),
        FeeSchedule::Dcp0010 => pool_fee_dcp0010(stake_diff, fee, height, pool_fee_percent, params),
        FeeSchedule::Dcp0012 => pool_fee_dcp0012(stake_diff, fee, height, pool_fee_percent, params),
    }
}

fn pool_fee_original(stake_diff: i64, fee: i64, height: i64, pool_fee_percent: f64, params: &ChainParams) -> i64 {
    let subsidy = vote_subsidy(params, height, params.vote_split_original);
    pool_fee_for_subsidy(stake_diff, fee, subsidy, pool_fee_percent, params)
}

fn pool_fee_dcp0010(stake_diff: i64, fee: i64, height: i64, pool_fee_percent: f64, params: &ChainParams) -> i64 {
    let subsidy = vote_subsidy(params, height, params.vote_split_dcp0010);
    pool_fee_for_subsidy(stake_diff, fee, subsidy, pool_fee_percent, params)
}

fn pool_fee_dcp0012(stake_diff: i64, fee: i64, height: i64, pool_fee_percent: f64, params: &ChainParams) -> i64 {
    let subsidy = vote_subsidy(params, height, params.vote_split_dcp0012);
    pool_fee_for_subsidy(stake_diff, fee, subsidy, pool_fee_percent, params)
}

/// Shared arithmetic: the vote subsidy is decayed across the expected ticket
/// lifetime, then the pool takes its percentage of the ticket's reward share.
///
///   fee = ((pool_fee × subsidy × (stake_diff + fee)) << 64)
///         / ((subsidy + stake_diff) × 10000) >> 64
fn pool_fee_for_subsidy(stake_diff: i64, fee: i64, subsidy: i64, pool_fee_percent: f64, params: &ChainParams) -> i64 {
    let pool_fee_int = (pool_fee_percent * 100.0).floor() as i64;

    let pool_size = i64::from(params.ticket_pool_size);
    let interval = params.subsidy_reduction_interval.max(1);
    let adjustments = (pool_size + interval - 1) / interval;
    let mut subsidy = subsidy;
    for _ in 0..adjustments {
        subsidy = subsidy * params.mul_subsidy / params.div_subsidy;
    }

    let stake_diff = BigInt::from(stake_diff);
    let denom = (BigInt::from(subsidy) + &stake_diff) * BigInt::from(10_000);
    if denom.is_zero() {
        return 0;
    }
    let numer = (BigInt::from(pool_fee_int) * BigInt::from(subsidy) * (stake_diff + BigInt::from(fee))) << 64u32;
    let result: BigInt = (numer / denom) >> 64u32;
    result.to_i64().unwrap_or(MAX_ATOMS)
}
