//! Unsigned transaction authoring.
//!
//! `new_unsigned_transaction` turns a set of requested outputs into an
//! unsigned transaction whose inputs pay for the outputs plus a relay fee
//! computed from the worst-case signed size. Inputs come from an
//! [`InputSource`]; a change output, when one is worth adding, gets its script
//! from a [`ChangeSource`].

use log::debug;
use monetarium_types::amount::{Amount, CoinType, MAX_SECONDARY_AMOUNT_BYTES};
use monetarium_types::constants::{GENERATED_TX_VERSION, MAX_SCRIPT_ELEMENT_SIZE};
use num_bigint::BigInt;
use num_traits::Zero;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::rules::{fee_for_serialize_size, is_dust_amount, is_emission_transaction};
use crate::size::{estimate_serialize_size_for, WireFormat, REDEEM_P2PKH_SIG_SCRIPT_SIZE};
use crate::wire::{MsgTx, TxIn, TxOut};
use crate::{BoxError, TxError};

const OP: &str = "txauthor.new_unsigned_transaction";

/// Upper bound on input-source round trips for one authoring call.
const MAX_FEE_ITERATIONS: usize = 64;

// ─── Collaborators ──────────────────────────────────────────────────────────

/// Spendable inputs returned by an [`InputSource`].
#[derive(Debug, Clone, Default)]
pub struct InputDetail {
    /// Total VAR value of `inputs`.
    pub total_amount: i64,
    /// Total SKA value of `inputs`.
    pub total_secondary_amount: BigInt,
    pub inputs: Vec<TxIn>,
    /// Previous output scripts, one per input.
    pub scripts: Vec<Vec<u8>>,
    /// Worst-case signature script size for each input.
    pub redeem_script_sizes: Vec<usize>,
}

/// Provides inputs covering a target amount of atoms.
///
/// A target of zero asks for every spendable input; SKA authoring always
/// passes zero since SKA totals may not fit the bounded target.
pub trait InputSource {
    fn select_inputs(&mut self, target: i64) -> Result<InputDetail, BoxError>;
}

impl<F> InputSource for F
where
    F: FnMut(i64) -> Result<InputDetail, BoxError>,
{
    fn select_inputs(&mut self, target: i64) -> Result<InputDetail, BoxError> {
        self(target)
    }
}

/// Provides the change output script.
pub trait ChangeSource {
    /// Script and script version for the change output.
    fn script(&mut self) -> Result<(Vec<u8>, u16), BoxError>;
    /// Size of the script [`ChangeSource::script`] will return.
    fn script_size(&self) -> usize;
}

/// Change source with a fixed script.
#[derive(Debug, Clone)]
pub struct StaticChangeSource {
    pub script: Vec<u8>,
    pub version: u16,
}

impl StaticChangeSource {
    pub fn new(script: Vec<u8>) -> Self {
        Self { script, version: 0 }
    }
}

impl ChangeSource for StaticChangeSource {
    fn script(&mut self) -> Result<(Vec<u8>, u16), BoxError> {
        Ok((self.script.clone(), self.version))
    }

    fn script_size(&self) -> usize {
        self.script.len()
    }
}

// ─── Authored Transactions ──────────────────────────────────────────────────

/// A newly authored, unsigned transaction.
#[derive(Debug, Clone)]
pub struct AuthoredTx {
    pub tx: MsgTx,
    /// Previous output scripts, one per input, for signing.
    pub prev_scripts: Vec<Vec<u8>>,
    pub total_input: i64,
    pub total_secondary_input: BigInt,
    /// Index of the change output, if one was added.
    pub change_index: Option<usize>,
    pub estimated_signed_serialize_size: usize,
    /// Fee paid: inputs minus all outputs, including change.
    pub fee: Amount,
}

impl AuthoredTx {
    /// Coin type shared by the transaction's outputs.
    pub fn coin_type(&self) -> CoinType {
        crate::rules::coin_type_from_outputs(&self.tx.tx_out)
    }

    /// Total input value in the representation of the transaction's coin type.
    pub fn total_input_amount(&self) -> Amount {
        if self.coin_type().is_secondary() {
            Amount::Secondary(self.total_secondary_input.clone())
        } else {
            Amount::Primary(self.total_input)
        }
    }

    /// Swap the change output with a uniformly chosen output (possibly itself).
    pub fn randomize_change_position(&mut self) {
        self.randomize_change_position_with(&mut rand::thread_rng());
    }

    pub fn randomize_change_position_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if let Some(index) = self.change_index {
            self.change_index = Some(randomize_output_position(&mut self.tx.tx_out, index, rng));
        }
    }

    /// Uniformly permute every output, tracking the change output.
    pub fn shuffle_outputs(&mut self) {
        self.shuffle_outputs_with(&mut rand::thread_rng());
    }

    pub fn shuffle_outputs_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.tx.tx_out.len()).collect();
        order.shuffle(rng);
        let old = std::mem::take(&mut self.tx.tx_out);
        let mut slots: Vec<Option<TxOut>> = old.into_iter().map(Some).collect();
        self.tx.tx_out = order.iter().filter_map(|i| slots[*i].take()).collect();
        if let Some(change) = self.change_index {
            self.change_index = order.iter().position(|i| *i == change);
        }
    }
}

/// Swap `outputs[index]` with a uniformly chosen output and return its new index.
pub fn randomize_output_position<R: Rng + ?Sized>(outputs: &mut [TxOut], index: usize, rng: &mut R) -> usize {
    if outputs.is_empty() || index >= outputs.len() {
        return index;
    }
    let r = rng.gen_range(0..outputs.len());
    outputs.swap(r, index);
    r
}

// ─── Authoring ──────────────────────────────────────────────────────────────

/// Sum of requested outputs in the representation of `coin_type`. Outputs of
/// another coin type, or with a mismatched amount representation, are invalid.
fn sum_outputs(outputs: &[TxOut], coin_type: CoinType) -> Result<Amount, TxError> {
    let mut total = Amount::zero(coin_type);
    for (i, out) in outputs.iter().enumerate() {
        if out.coin_type != coin_type {
            return Err(TxError::Invalid {
                op: OP,
                reason: format!("output {} has coin type {}, expected {}", i, out.coin_type, coin_type),
            });
        }
        if !out.is_well_formed() {
            return Err(TxError::Invalid {
                op: OP,
                reason: format!("output {} amount does not match coin type {}", i, coin_type),
            });
        }
        if out.value.is_negative() {
            return Err(TxError::Invalid { op: OP, reason: format!("output {} has negative value", i) });
        }
        check_secondary_width(&out.value, "output")?;
        total = total
            .checked_add(&out.value)
            .map_err(|source| TxError::Amount { op: OP, source })?;
    }
    Ok(total)
}

/// SKA magnitudes wider than the estimator's worst case would make the
/// size estimate undershoot.
fn check_secondary_width(amount: &Amount, what: &str) -> Result<(), TxError> {
    if let Amount::Secondary(v) = amount {
        let width = ((v.bits() + 7) / 8) as usize;
        if width > MAX_SECONDARY_AMOUNT_BYTES {
            return Err(TxError::Invalid {
                op: OP,
                reason: format!("{} amount needs {} bytes, maximum is {}", what, width, MAX_SECONDARY_AMOUNT_BYTES),
            });
        }
    }
    Ok(())
}

fn input_total(detail: &InputDetail, coin_type: CoinType) -> Amount {
    if coin_type.is_secondary() {
        Amount::Secondary(detail.total_secondary_amount.clone())
    } else {
        Amount::Primary(detail.total_amount)
    }
}

fn sub(a: &Amount, b: &Amount) -> Result<Amount, TxError> {
    a.checked_sub(b).map_err(|source| TxError::Amount { op: OP, source })
}

fn add(a: &Amount, b: &Amount) -> Result<Amount, TxError> {
    a.checked_add(b).map_err(|source| TxError::Amount { op: OP, source })
}

/// Author an unsigned transaction paying `outputs`.
///
/// Inputs are requested from `inputs` with a target that grows with the
/// required fee until the selected inputs cover the outputs and the fee for
/// the worst-case signed size. Change is added unless it would be zero or,
/// for VAR, dust. Fails with `InsufficientBalance` as soon as the source
/// cannot cover the current target, and never returns a partial transaction.
pub fn new_unsigned_transaction<I, C>(
    outputs: Vec<TxOut>,
    relay_fee_per_kb: i64,
    inputs: &mut I,
    change: &mut C,
    max_tx_size: usize,
) -> Result<AuthoredTx, TxError>
where
    I: InputSource + ?Sized,
    C: ChangeSource + ?Sized,
{
    let Some(first) = outputs.first() else {
        return Err(TxError::Invalid { op: OP, reason: "no outputs".into() });
    };
    let coin_type = first.coin_type;
    let format = WireFormat::for_coin_type(coin_type);
    let target = sum_outputs(&outputs, coin_type)?;

    let change_script_size = change.script_size();
    let seed_size = estimate_serialize_size_for(format, &[REDEEM_P2PKH_SIG_SCRIPT_SIZE], &outputs, change_script_size);
    let mut target_fee = fee_for_serialize_size(relay_fee_per_kb, seed_size);

    // Emission is only recognisable once the inputs are known.
    let mut probe = MsgTx::new(GENERATED_TX_VERSION);
    probe.tx_out = outputs.clone();

    for iteration in 0..MAX_FEE_ITERATIONS {
        let request = match format {
            WireFormat::Primary => target.to_i64().unwrap_or(0).saturating_add(target_fee),
            WireFormat::Secondary => 0,
        };
        debug!("fee loop {}: requesting {} {} (fee estimate {})", iteration, request, coin_type, target_fee);

        let detail = inputs
            .select_inputs(request)
            .map_err(|source| TxError::Source { op: OP, source })?;
        let total_in = input_total(&detail, coin_type);
        check_secondary_width(&total_in, "input total")?;
        for input in &detail.inputs {
            check_secondary_width(&input.value_in, "input")?;
        }

        probe.tx_in = detail.inputs.clone();
        let emission = is_emission_transaction(&probe);
        if emission {
            target_fee = 0;
        }

        let need = add(&target, &Amount::from_atoms(coin_type, target_fee))?;
        if total_in < need {
            return Err(TxError::InsufficientBalance { op: OP, need: need.to_string(), have: total_in.to_string() });
        }

        let mut size = estimate_serialize_size_for(format, &detail.redeem_script_sizes, &outputs, change_script_size);

        let required_fee = if emission {
            0
        } else {
            fee_for_serialize_size(relay_fee_per_kb, size)
        };
        let required = Amount::from_atoms(coin_type, required_fee);

        let remaining = sub(&total_in, &target)?;
        if remaining < required {
            target_fee = target_fee.max(required_fee);
            continue;
        }

        if size > max_tx_size {
            return Err(TxError::ExceedsMaximumSize { op: OP, size, max: max_tx_size });
        }

        let mut tx = MsgTx::new(GENERATED_TX_VERSION);
        tx.tx_in = detail.inputs;
        tx.tx_out = outputs;

        let change_amount = sub(&remaining, &required)?;
        let add_change = match &change_amount {
            Amount::Primary(v) => *v != 0 && !is_dust_amount(*v, change_script_size, relay_fee_per_kb),
            Amount::Secondary(v) => v > &BigInt::zero(),
        };

        let mut change_index = None;
        let fee;
        if add_change {
            let (script, version) = change.script().map_err(|source| TxError::Source { op: OP, source })?;
            if script.len() > MAX_SCRIPT_ELEMENT_SIZE {
                return Err(TxError::Invalid {
                    op: OP,
                    reason: format!("change script size {} exceeds maximum pushable {}", script.len(), MAX_SCRIPT_ELEMENT_SIZE),
                });
            }
            debug!("adding change output of {} {}", change_amount, coin_type);
            change_index = Some(tx.tx_out.len());
            tx.add_tx_out(TxOut::new(coin_type, change_amount, script).with_version(version));
            fee = required;
        } else {
            debug!("no change output (leftover {} {})", change_amount, coin_type);
            size = estimate_serialize_size_for(format, &detail.redeem_script_sizes, &tx.tx_out, 0);
            fee = remaining;
        }

        return Ok(AuthoredTx {
            tx,
            prev_scripts: detail.scripts,
            total_input: detail.total_amount,
            total_secondary_input: detail.total_secondary_amount,
            change_index,
            estimated_signed_serialize_size: size,
            fee,
        });
    }

    Err(TxError::Invalid { op: OP, reason: "fee estimate did not converge".into() })
}
