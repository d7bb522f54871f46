//! Monetarium wallet layer.
//!
//! Provides transactional key-value storage, per-account consolidation
//! address overrides, transaction typing and maturity gating, and UTXO
//! selection feeding the transaction author.

pub mod error;
pub mod store;
pub mod consolidation;
pub mod txtype;
pub mod utxo;

pub use error::WalletError;
pub use store::{StoreTx, WalletStore};
pub use consolidation::{
    account_consolidation_addr, clear_account_consolidation_addr, resolve_destination,
    set_account_consolidation_addr, ConsolidationDestination, DefaultAddressSource,
};
pub use txtype::{tx_transaction_type, MaturityRule, TransactionType};
pub use utxo::{
    plan_consolidation, select_utxos, ConsolidationPlan, OutputSelectionPolicy, SelectionStrategy,
    UtxoCandidate, UtxoInputSource,
};
