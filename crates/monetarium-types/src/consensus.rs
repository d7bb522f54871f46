//! Monetarium subsidy and maturity rules.
//!
//! Block subsidy decays geometrically: the base subsidy is multiplied by
//! `mul_subsidy / div_subsidy` once per reduction interval. Votes receive a
//! fixed share of the full subsidy, split evenly across the votes of a block.

use crate::constants::{ChainParams, VoteSplit};

// =============================================================================
// Subsidy
// =============================================================================

/// Number of completed reduction intervals at `height`.
pub fn subsidy_reductions(params: &ChainParams, height: i64) -> i64 {
    if height <= 0 || params.subsidy_reduction_interval <= 0 {
        return 0;
    }
    height / params.subsidy_reduction_interval
}

/// Full block subsidy (work + stake + treasury) at `height`.
pub fn block_subsidy(params: &ChainParams, height: i64) -> i64 {
    if height <= 0 {
        return 0;
    }
    let mut subsidy = params.base_subsidy;
    for _ in 0..subsidy_reductions(params, height) {
        subsidy = subsidy * params.mul_subsidy / params.div_subsidy;
        if subsidy == 0 {
            break;
        }
    }
    subsidy
}

/// Subsidy paid to a single vote at `height` under `split`.
///
/// Votes are only included from the block before stake validation starts.
pub fn vote_subsidy(params: &ChainParams, height: i64, split: VoteSplit) -> i64 {
    if height < params.stake_validation_height - 1 || split.denominator == 0 {
        return 0;
    }
    let votes = i64::from(params.tickets_per_block.max(1));
    block_subsidy(params, height) * split.numerator / split.denominator / votes
}

// =============================================================================
// Maturity
// =============================================================================

/// Whether a coinbase-style output mined at `tx_height` is spendable at `tip_height`.
///
/// Negative heights denote unmined transactions and are never mature.
pub fn coinbase_matured(params: &ChainParams, tx_height: i64, tip_height: i64) -> bool {
    tx_height >= 0 && tip_height >= tx_height + i64::from(params.coinbase_maturity)
}

/// Number of confirmations at `tip_height` for a transaction mined at `tx_height`.
pub fn confirmations(tx_height: i64, tip_height: i64) -> i64 {
    if tx_height < 0 || tip_height < tx_height {
        0
    } else {
        tip_height - tx_height + 1
    }
}

/// Whether a transaction mined at `tx_height` has at least `required` confirmations.
pub fn confirmed(required: i64, tx_height: i64, tip_height: i64) -> bool {
    confirmations(tx_height, tip_height) >= required
}
