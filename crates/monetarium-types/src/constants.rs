//! Monetarium network parameters and wallet policy constants.

use serde::{Deserialize, Serialize};

// =============================================================================
// Network Types
// =============================================================================

/// Network type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
    Simnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Simnet => "simnet",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Some(Network::Mainnet),
            "testnet" | "test" => Some(Network::Testnet),
            "simnet" | "sim" => Some(Network::Simnet),
            _ => None,
        }
    }

    pub fn params(&self) -> &'static ChainParams {
        chain_params(*self)
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Relay Policy
// =============================================================================

/// Default minimum relay fee in atoms per kilobyte.
pub const DEFAULT_RELAY_FEE_PER_KB: i64 = 10_000;

/// Largest data push a script may carry; bounds the change script.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 2048;

/// Default maximum serialized transaction size accepted by the author.
pub const DEFAULT_MAX_TX_SIZE: usize = 393_216;

/// Dust threshold multiplier applied to the cost of spending an output.
pub const DUST_MULTIPLIER: i64 = 3;

/// Previous-output index used by null (coinbase-style) inputs.
pub const MAX_PREV_OUT_INDEX: u32 = 0xffff_ffff;

/// Transaction version produced by the author.
pub const GENERATED_TX_VERSION: u16 = 1;

/// Lowest transaction version that may carry an SSFee distribution.
pub const SSFEE_MIN_TX_VERSION: u16 = 3;

// =============================================================================
// Chain Parameters
// =============================================================================

/// Share of the full block subsidy paid to all votes of one block.
///
/// The per-vote subsidy is `full * numerator / denominator / votes_per_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteSplit {
    pub numerator: i64,
    pub denominator: i64,
}

/// Consensus parameters consumed by the wallet core.
#[derive(Debug, Clone, Serialize)]
pub struct ChainParams {
    pub network: Network,
    /// Block subsidy at height 1 before any reductions.
    pub base_subsidy: i64,
    /// Subsidy is multiplied by `mul_subsidy / div_subsidy` once per interval.
    pub mul_subsidy: i64,
    pub div_subsidy: i64,
    pub subsidy_reduction_interval: i64,
    pub tickets_per_block: u16,
    pub ticket_pool_size: u16,
    pub stake_validation_height: i64,
    pub coinbase_maturity: u16,
    /// Vote split before any subsidy-split agenda. Networks that never changed
    /// their split repeat it in the two agenda fields.
    pub vote_split_original: VoteSplit,
    /// Vote split once the first subsidy-split agenda is active.
    pub vote_split_dcp0010: VoteSplit,
    /// Vote split once the second subsidy-split agenda is active.
    pub vote_split_dcp0012: VoteSplit,
}

// Mainnet and testnet keep one vote split across every agenda, so stake pool
// fees there are the same under every fee schedule. Only simnet exercises the
// per-schedule splits.
static MAINNET_PARAMS: ChainParams = ChainParams {
    network: Network::Mainnet,
    base_subsidy: 3_119_582_664,
    mul_subsidy: 100,
    div_subsidy: 101,
    subsidy_reduction_interval: 6144,
    tickets_per_block: 5,
    ticket_pool_size: 8192,
    stake_validation_height: 4096,
    coinbase_maturity: 256,
    vote_split_original: VoteSplit { numerator: 5, denominator: 10 },
    vote_split_dcp0010: VoteSplit { numerator: 5, denominator: 10 },
    vote_split_dcp0012: VoteSplit { numerator: 5, denominator: 10 },
};

static TESTNET_PARAMS: ChainParams = ChainParams {
    network: Network::Testnet,
    base_subsidy: 2_500_000_000,
    mul_subsidy: 100,
    div_subsidy: 101,
    subsidy_reduction_interval: 2048,
    tickets_per_block: 5,
    ticket_pool_size: 1024,
    stake_validation_height: 768,
    coinbase_maturity: 16,
    vote_split_original: VoteSplit { numerator: 5, denominator: 10 },
    vote_split_dcp0010: VoteSplit { numerator: 5, denominator: 10 },
    vote_split_dcp0012: VoteSplit { numerator: 5, denominator: 10 },
};

static SIMNET_PARAMS: ChainParams = ChainParams {
    network: Network::Simnet,
    base_subsidy: 50_000_000_000,
    mul_subsidy: 100,
    div_subsidy: 101,
    subsidy_reduction_interval: 128,
    tickets_per_block: 5,
    ticket_pool_size: 64,
    stake_validation_height: 144,
    coinbase_maturity: 16,
    vote_split_original: VoteSplit { numerator: 3, denominator: 10 },
    vote_split_dcp0010: VoteSplit { numerator: 8, denominator: 10 },
    vote_split_dcp0012: VoteSplit { numerator: 89, denominator: 100 },
};

/// Get the chain parameters for a network.
pub fn chain_params(network: Network) -> &'static ChainParams {
    match network {
        Network::Mainnet => &MAINNET_PARAMS,
        Network::Testnet => &TESTNET_PARAMS,
        Network::Simnet => &SIMNET_PARAMS,
    }
}
