//! UTXO selection strategies and the wallet-backed input source.
//!
//! Candidates are filtered by an [`OutputSelectionPolicy`] (account, coin
//! type, maturity and minimum amount) before a [`SelectionStrategy`] picks
//! enough of them to cover a VAR target. SKA requests always receive every
//! eligible output, since their totals may not fit a bounded target.

use log::debug;
use monetarium_tx::author::{InputDetail, InputSource};
use monetarium_tx::rules::{fee_for_serialize_size, is_dust_amount};
use monetarium_tx::size::{estimate_serialize_size_for, WireFormat};
use monetarium_tx::wire::{MsgTx, OutPoint, TxIn, TxOut};
use monetarium_tx::BoxError;
use monetarium_types::amount::{Amount, CoinType, MAX_SECONDARY_AMOUNT_BYTES};
use monetarium_types::constants::GENERATED_TX_VERSION;
use monetarium_types::ChainParams;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::txtype::MaturityRule;

/// Available UTXO selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Smallest single output that covers the target, else largest-first.
    Default,
    /// Prefer largest outputs first (minimizes number of inputs).
    LargestFirst,
    /// Prefer smallest outputs first (consolidates dust).
    SmallestFirst,
    /// Purely random selection.
    Random,
    /// Use all available outputs (sweep).
    All,
    /// Oldest outputs first (by block height).
    Fifo,
}

/// A spendable output known to the wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct UtxoCandidate {
    pub outpoint: OutPoint,
    pub coin_type: CoinType,
    pub amount: Amount,
    /// Height of the block containing the output, or -1 if unmined.
    pub block_height: i64,
    pub pk_script: Vec<u8>,
    /// Worst-case signature script size to spend this output.
    pub redeem_script_size: usize,
    pub maturity: MaturityRule,
    pub account: u32,
}

impl UtxoCandidate {
    /// Value in atoms, saturating for SKA amounts beyond `i64`.
    fn atoms(&self) -> i64 {
        match &self.amount {
            Amount::Primary(v) => *v,
            Amount::Secondary(v) => i64::try_from(v).unwrap_or(i64::MAX),
        }
    }

    fn to_tx_in(&self) -> TxIn {
        let mut input = TxIn::new(self.outpoint, self.amount.clone(), Vec::new());
        if self.block_height >= 0 {
            input.block_height = u32::try_from(self.block_height).unwrap_or(u32::MAX);
        }
        input
    }
}

/// Which outputs may be spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSelectionPolicy {
    pub account: u32,
    pub required_confirmations: i64,
    pub coin_type: CoinType,
    /// Outputs below this many atoms are skipped.
    pub min_amount: i64,
}

impl OutputSelectionPolicy {
    pub fn new(account: u32, coin_type: CoinType) -> Self {
        Self { account, required_confirmations: 1, coin_type, min_amount: 0 }
    }

    pub fn is_eligible(&self, candidate: &UtxoCandidate, params: &ChainParams, tip_height: i64) -> bool {
        candidate.account == self.account
            && candidate.coin_type == self.coin_type
            && candidate.amount.to_bigint() >= BigInt::from(self.min_amount)
            && candidate.maturity.is_mature(params, candidate.block_height, tip_height, self.required_confirmations)
    }

    /// Candidates eligible under this policy, in their original order.
    pub fn filter(&self, candidates: &[UtxoCandidate], params: &ChainParams, tip_height: i64) -> Vec<UtxoCandidate> {
        candidates.iter().filter(|c| self.is_eligible(c, params, tip_height)).cloned().collect()
    }
}

/// Select UTXOs covering `target` atoms.
///
/// Returns `None` if the candidates cannot cover the target.
pub fn select_utxos(candidates: &[UtxoCandidate], target: i64, strategy: SelectionStrategy) -> Option<Vec<UtxoCandidate>> {
    if candidates.is_empty() {
        return None;
    }

    match strategy {
        SelectionStrategy::All => {
            let total = candidates.iter().fold(0i64, |acc, c| acc.saturating_add(c.atoms()));
            (total >= target).then(|| candidates.to_vec())
        }
        SelectionStrategy::LargestFirst => select_sorted(candidates, target, true),
        SelectionStrategy::SmallestFirst => select_sorted(candidates, target, false),
        SelectionStrategy::Random => select_random(candidates, target),
        SelectionStrategy::Default => select_default(candidates, target),
        SelectionStrategy::Fifo => select_fifo(candidates, target),
    }
}

fn select_sorted(candidates: &[UtxoCandidate], target: i64, largest_first: bool) -> Option<Vec<UtxoCandidate>> {
    let mut sorted = candidates.to_vec();
    if largest_first {
        sorted.sort_by(|a, b| b.atoms().cmp(&a.atoms()));
    } else {
        sorted.sort_by_key(|c| c.atoms());
    }
    accumulate(&sorted, target)
}

fn select_random(candidates: &[UtxoCandidate], target: i64) -> Option<Vec<UtxoCandidate>> {
    use rand::seq::SliceRandom;
    let mut shuffled = candidates.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());
    accumulate(&shuffled, target)
}

fn select_default(candidates: &[UtxoCandidate], target: i64) -> Option<Vec<UtxoCandidate>> {
    let best = candidates.iter().filter(|c| c.atoms() >= target).min_by_key(|c| c.atoms());
    match best {
        Some(single) => Some(vec![single.clone()]),
        None => select_sorted(candidates, target, true),
    }
}

fn select_fifo(candidates: &[UtxoCandidate], target: i64) -> Option<Vec<UtxoCandidate>> {
    let mut sorted = candidates.to_vec();
    // Unmined outputs (negative height) go last.
    sorted.sort_by_key(|c| if c.block_height < 0 { i64::MAX } else { c.block_height });
    accumulate(&sorted, target)
}

/// Accumulate outputs in order until the target is met.
fn accumulate(ordered: &[UtxoCandidate], target: i64) -> Option<Vec<UtxoCandidate>> {
    let mut selected = Vec::new();
    let mut total = 0i64;

    for candidate in ordered {
        selected.push(candidate.clone());
        total = total.saturating_add(candidate.atoms());
        if total >= target {
            return Some(selected);
        }
    }

    None
}

fn input_detail(selected: &[UtxoCandidate]) -> InputDetail {
    let mut detail = InputDetail::default();
    for c in selected {
        match &c.amount {
            Amount::Primary(v) => detail.total_amount = detail.total_amount.saturating_add(*v),
            Amount::Secondary(v) => detail.total_secondary_amount += v,
        }
        detail.inputs.push(c.to_tx_in());
        detail.scripts.push(c.pk_script.clone());
        detail.redeem_script_sizes.push(c.redeem_script_size);
    }
    detail
}

// ─── Input source ───────────────────────────────────────────────────────────

/// [`InputSource`] over a snapshot of wallet outputs.
pub struct UtxoInputSource<'a> {
    candidates: Vec<UtxoCandidate>,
    policy: OutputSelectionPolicy,
    params: &'a ChainParams,
    tip_height: i64,
    strategy: SelectionStrategy,
}

impl<'a> UtxoInputSource<'a> {
    pub fn new(
        candidates: Vec<UtxoCandidate>,
        policy: OutputSelectionPolicy,
        params: &'a ChainParams,
        tip_height: i64,
    ) -> Self {
        Self { candidates, policy, params, tip_height, strategy: SelectionStrategy::Default }
    }

    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn policy(&self) -> &OutputSelectionPolicy {
        &self.policy
    }
}

impl InputSource for UtxoInputSource<'_> {
    fn select_inputs(&mut self, target: i64) -> Result<InputDetail, BoxError> {
        let eligible = self.policy.filter(&self.candidates, self.params, self.tip_height);

        let selected = if target <= 0 || self.policy.coin_type.is_secondary() {
            eligible
        } else {
            // Short of funds: hand back everything so the caller can report the shortfall.
            select_utxos(&eligible, target, self.strategy).unwrap_or(eligible)
        };
        debug!(
            "selected {} of {} outputs for target {} {}",
            selected.len(),
            self.candidates.len(),
            target,
            self.policy.coin_type
        );
        Ok(input_detail(&selected))
    }
}

// ─── Consolidation ──────────────────────────────────────────────────────────

/// A transaction merging several outputs of one coin type into one.
#[derive(Debug, Clone)]
pub struct ConsolidationPlan {
    pub tx: MsgTx,
    pub selected: Vec<UtxoCandidate>,
    pub fee: Amount,
    pub estimated_signed_serialize_size: usize,
}

/// Plan a sweep of up to `max_inputs` eligible outputs into one output paying `pay_script`.
///
/// Only outputs matching `policy` (including its coin type) are used, smallest
/// first. At least two must be eligible. The output carries the policy's coin
/// type and the fee is paid in that coin.
pub fn plan_consolidation(
    candidates: &[UtxoCandidate],
    policy: &OutputSelectionPolicy,
    params: &ChainParams,
    tip_height: i64,
    max_inputs: usize,
    relay_fee_per_kb: i64,
    pay_script: Vec<u8>,
) -> Result<ConsolidationPlan, WalletError> {
    const OP: &str = "wallet.plan_consolidation";
    let coin_type = policy.coin_type;

    let mut selected = policy.filter(candidates, params, tip_height);
    selected.sort_by_key(|c| c.atoms());
    selected.truncate(max_inputs);
    if selected.len() < 2 {
        return Err(WalletError::Invalid {
            op: OP,
            reason: format!("need at least 2 mature {} outputs to consolidate, found {}", coin_type, selected.len()),
        });
    }

    let mut total = Amount::zero(coin_type);
    for c in &selected {
        total = total
            .checked_add(&c.amount)
            .map_err(|e| WalletError::Invalid { op: OP, reason: e.to_string() })?;
    }

    if let Amount::Secondary(v) = &total {
        if v.bits() > (MAX_SECONDARY_AMOUNT_BYTES * 8) as u64 {
            return Err(WalletError::Invalid { op: OP, reason: format!("{} total exceeds the output amount width", coin_type) });
        }
    }

    let redeem_sizes: Vec<usize> = selected.iter().map(|c| c.redeem_script_size).collect();
    let placeholder = TxOut::new(coin_type, Amount::zero(coin_type), pay_script.clone());
    let size = estimate_serialize_size_for(
        WireFormat::for_coin_type(coin_type),
        &redeem_sizes,
        std::slice::from_ref(&placeholder),
        0,
    );
    let fee = Amount::from_atoms(coin_type, fee_for_serialize_size(relay_fee_per_kb, size));

    let value = total
        .checked_sub(&fee)
        .map_err(|e| WalletError::Invalid { op: OP, reason: e.to_string() })?;
    if !value.is_positive() {
        return Err(WalletError::InsufficientBalance { op: OP, need: fee.to_string(), have: total.to_string() });
    }
    if let Amount::Primary(v) = value {
        if is_dust_amount(v, pay_script.len(), relay_fee_per_kb) {
            return Err(WalletError::InsufficientBalance {
                op: OP,
                need: format!("non-dust output after fee {}", fee),
                have: total.to_string(),
            });
        }
    }

    let mut tx = MsgTx::new(GENERATED_TX_VERSION);
    for c in &selected {
        tx.add_tx_in(c.to_tx_in());
    }
    tx.add_tx_out(TxOut::new(coin_type, value, pay_script));
    debug!("consolidating {} {} outputs, fee {}", selected.len(), coin_type, fee);

    Ok(ConsolidationPlan { tx, selected, fee, estimated_signed_serialize_size: size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use monetarium_tx::size::REDEEM_P2PKH_SIG_SCRIPT_SIZE;
    use monetarium_types::constants::{chain_params, Network};
    use monetarium_types::ErrorKind;

    const TIP: i64 = 1000;

    fn candidate(n: u8, amount: Amount, coin_type: CoinType, block_height: i64) -> UtxoCandidate {
        UtxoCandidate {
            outpoint: OutPoint::new([n; 32], 0, 0),
            coin_type,
            amount,
            block_height,
            pk_script: vec![0x76; 25],
            redeem_script_size: REDEEM_P2PKH_SIG_SCRIPT_SIZE,
            maturity: MaturityRule::Confirmations,
            account: 0,
        }
    }

    fn make_candidates(amounts: &[i64]) -> Vec<UtxoCandidate> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &v)| candidate(i as u8, Amount::Primary(v), CoinType::PRIMARY, 100 + i as i64))
            .collect()
    }

    fn values(selected: &[UtxoCandidate]) -> Vec<i64> {
        selected.iter().map(|c| c.atoms()).collect()
    }

    #[test]
    fn test_select_all() {
        let candidates = make_candidates(&[100, 200, 300]);
        let selected = select_utxos(&candidates, 0, SelectionStrategy::All).unwrap();
        assert_eq!(selected.len(), 3);
        assert!(select_utxos(&candidates, 601, SelectionStrategy::All).is_none());
    }

    #[test]
    fn test_largest_first() {
        let candidates = make_candidates(&[50, 200, 100]);
        let selected = select_utxos(&candidates, 160, SelectionStrategy::LargestFirst).unwrap();
        assert_eq!(values(&selected), vec![200]);
        let selected = select_utxos(&candidates, 250, SelectionStrategy::LargestFirst).unwrap();
        assert_eq!(values(&selected), vec![200, 100]);
    }

    #[test]
    fn test_smallest_first() {
        let candidates = make_candidates(&[50, 200, 100]);
        let selected = select_utxos(&candidates, 120, SelectionStrategy::SmallestFirst).unwrap();
        assert_eq!(values(&selected), vec![50, 100]);
    }

    #[test]
    fn test_default_prefers_smallest_covering_single() {
        let candidates = make_candidates(&[500, 150, 1000]);
        let selected = select_utxos(&candidates, 140, SelectionStrategy::Default).unwrap();
        assert_eq!(values(&selected), vec![150]);
        let selected = select_utxos(&candidates, 1200, SelectionStrategy::Default).unwrap();
        assert_eq!(values(&selected), vec![1000, 500]);
    }

    #[test]
    fn test_fifo_orders_by_height() {
        let mut candidates = make_candidates(&[10, 20, 30]);
        candidates[0].block_height = 500;
        candidates[1].block_height = -1;
        candidates[2].block_height = 200;
        let selected = select_utxos(&candidates, 35, SelectionStrategy::Fifo).unwrap();
        assert_eq!(values(&selected), vec![30, 10]);
    }

    #[test]
    fn test_random_covers_target() {
        let candidates = make_candidates(&[10, 20, 30, 40]);
        let selected = select_utxos(&candidates, 95, SelectionStrategy::Random).unwrap();
        assert!(values(&selected).iter().sum::<i64>() >= 95);
        assert!(select_utxos(&candidates, 101, SelectionStrategy::Random).is_none());
    }

    #[test]
    fn test_insufficient_and_empty() {
        assert!(select_utxos(&[], 1, SelectionStrategy::LargestFirst).is_none());
        assert!(select_utxos(&make_candidates(&[10]), 11, SelectionStrategy::SmallestFirst).is_none());
    }

    #[test]
    fn test_policy_filters() {
        let params = chain_params(Network::Simnet);
        let ska = CoinType(2);
        let mut candidates = make_candidates(&[5_000, 50]);
        candidates.push(candidate(9, Amount::Secondary(BigInt::from(7)), ska, 100));
        let mut other_account = candidate(10, Amount::Primary(9_000), CoinType::PRIMARY, 100);
        other_account.account = 1;
        candidates.push(other_account);
        let mut young_coinbase = candidate(11, Amount::Primary(9_000), CoinType::PRIMARY, TIP - 1);
        young_coinbase.maturity = MaturityRule::Coinbase;
        candidates.push(young_coinbase);

        let mut policy = OutputSelectionPolicy::new(0, CoinType::PRIMARY);
        policy.min_amount = 100;
        assert_eq!(values(&policy.filter(&candidates, params, TIP)), vec![5_000]);

        let ska_policy = OutputSelectionPolicy::new(0, ska);
        let eligible = ska_policy.filter(&candidates, params, TIP);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].coin_type, ska);
    }

    #[test]
    fn test_input_source_var() {
        let params = chain_params(Network::Simnet);
        let mut source = UtxoInputSource::new(
            make_candidates(&[1_000, 3_000, 2_000]),
            OutputSelectionPolicy::new(0, CoinType::PRIMARY),
            params,
            TIP,
        )
        .with_strategy(SelectionStrategy::LargestFirst);

        let detail = source.select_inputs(2_500).unwrap();
        assert_eq!(detail.total_amount, 3_000);
        assert_eq!(detail.inputs.len(), 1);
        assert_eq!(detail.scripts.len(), 1);
        assert_eq!(detail.redeem_script_sizes, vec![REDEEM_P2PKH_SIG_SCRIPT_SIZE]);

        // Short of funds: everything eligible comes back.
        let detail = source.select_inputs(10_000).unwrap();
        assert_eq!(detail.total_amount, 6_000);
        assert_eq!(detail.inputs.len(), 3);

        let detail = source.select_inputs(0).unwrap();
        assert_eq!(detail.inputs.len(), 3);
    }

    #[test]
    fn test_input_source_secondary_returns_all() {
        let params = chain_params(Network::Simnet);
        let ska = CoinType(1);
        let big: BigInt = BigInt::from(i64::MAX) * 4;
        let candidates = vec![
            candidate(1, Amount::Secondary(big.clone()), ska, 10),
            candidate(2, Amount::Secondary(BigInt::from(5)), ska, 11),
        ];
        let mut source = UtxoInputSource::new(candidates, OutputSelectionPolicy::new(0, ska), params, TIP);
        let detail = source.select_inputs(0).unwrap();
        assert_eq!(detail.inputs.len(), 2);
        assert_eq!(detail.total_secondary_amount, big + 5);
        assert_eq!(detail.total_amount, 0);
        assert_eq!(detail.inputs[0].block_height, 10);
    }

    #[test]
    fn test_plan_consolidation_var() {
        let params = chain_params(Network::Simnet);
        let candidates = make_candidates(&[400_000, 100_000, 300_000, 200_000]);
        let policy = OutputSelectionPolicy::new(0, CoinType::PRIMARY);

        let plan = plan_consolidation(&candidates, &policy, params, TIP, 3, 10_000, vec![0x76; 25]).unwrap();
        assert_eq!(values(&plan.selected), vec![100_000, 200_000, 300_000]);
        assert_eq!(plan.tx.tx_in.len(), 3);
        assert_eq!(plan.tx.tx_out.len(), 1);
        let fee = fee_for_serialize_size(10_000, plan.estimated_signed_serialize_size);
        assert_eq!(plan.fee, Amount::Primary(fee));
        assert_eq!(plan.tx.tx_out[0].value, Amount::Primary(600_000 - fee));
    }

    #[test]
    fn test_plan_consolidation_secondary_keeps_coin_type() {
        let params = chain_params(Network::Simnet);
        let ska = CoinType(3);
        let candidates = vec![
            candidate(1, Amount::Secondary(BigInt::from(10_000_000)), ska, 10),
            candidate(2, Amount::Primary(10_000_000), CoinType::PRIMARY, 10),
            candidate(3, Amount::Secondary(BigInt::from(20_000_000)), ska, 10),
        ];
        let policy = OutputSelectionPolicy::new(0, ska);
        let plan = plan_consolidation(&candidates, &policy, params, TIP, 10, 10_000, vec![0x76; 25]).unwrap();
        assert_eq!(plan.selected.len(), 2);
        assert_eq!(plan.tx.tx_out[0].coin_type, ska);
        assert!(matches!(plan.fee, Amount::Secondary(_)));
    }

    #[test]
    fn test_plan_consolidation_rejects_overwide_total() {
        let params = chain_params(Network::Simnet);
        let ska = CoinType(3);
        let half: BigInt = BigInt::from(1) << 127u32;
        let candidates = vec![
            candidate(1, Amount::Secondary(half.clone()), ska, 10),
            candidate(2, Amount::Secondary(half), ska, 10),
        ];
        let policy = OutputSelectionPolicy::new(0, ska);
        let err = plan_consolidation(&candidates, &policy, params, TIP, 10, 10_000, vec![0x76; 25]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn test_plan_consolidation_needs_two() {
        let params = chain_params(Network::Simnet);
        let policy = OutputSelectionPolicy::new(0, CoinType::PRIMARY);
        let err = plan_consolidation(&make_candidates(&[1_000_000]), &policy, params, TIP, 10, 10_000, vec![0x76; 25])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        let err = plan_consolidation(&make_candidates(&[100, 100]), &policy, params, TIP, 10, 10_000, vec![0x76; 25])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    }
}
