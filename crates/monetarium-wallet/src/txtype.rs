//! Transaction classification for notifications and spend gating.

use monetarium_tx::ssfee::{classify_ssfee, InputKind, SsFeeKind};
use monetarium_tx::MsgTx;
use monetarium_types::consensus::{coinbase_matured, confirmed};
use monetarium_types::ChainParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Regular,
    Coinbase,
    SsFee,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Regular => "regular",
            TransactionType::Coinbase => "coinbase",
            TransactionType::SsFee => "ssfee",
        }
    }
}

/// Classify `tx`. SSFee shape is checked before the coinbase shape, since both
/// can carry a single null input.
pub fn tx_transaction_type(tx: &MsgTx) -> TransactionType {
    if classify_ssfee(tx).is_some() {
        TransactionType::SsFee
    } else if tx.has_single_null_input() {
        TransactionType::Coinbase
    } else {
        TransactionType::Regular
    }
}

/// How outputs of a transaction become spendable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaturityRule {
    /// Needs the network's coinbase maturity as well as the requested confirmations.
    Coinbase,
    /// Needs only the requested confirmations.
    Confirmations,
}

impl MaturityRule {
    pub fn for_transaction(tx: &MsgTx) -> Self {
        if let Some(ssfee) = classify_ssfee(tx) {
            if ssfee.input_kind == InputKind::Null || ssfee.kind == SsFeeKind::MinerFee {
                return MaturityRule::Coinbase;
            }
            return MaturityRule::Confirmations;
        }
        if tx.has_single_null_input() {
            MaturityRule::Coinbase
        } else {
            MaturityRule::Confirmations
        }
    }

    pub fn is_mature(&self, params: &ChainParams, tx_height: i64, tip_height: i64, required_confirmations: i64) -> bool {
        let confs = confirmed(required_confirmations, tx_height, tip_height);
        match self {
            MaturityRule::Coinbase => confs && coinbase_matured(params, tx_height, tip_height),
            MaturityRule::Confirmations => confs,
        }
    }
}
