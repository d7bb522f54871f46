use clap::{Parser, Subcommand};
use monetarium_types::constants::{Network, DEFAULT_RELAY_FEE_PER_KB};
use std::path::PathBuf;

mod commands;

/// Monetarium wallet command-line tools.
#[derive(Parser)]
#[command(name = "monetarium-wallet-cli")]
#[command(about = "Size, fee and consolidation tools for the Monetarium wallet")]
#[command(version)]
struct Cli {
    /// Network to use.
    #[arg(long, default_value = "mainnet")]
    network: NetworkArg,

    /// Relay fee in atoms per kilobyte.
    #[arg(long)]
    relay_fee: Option<i64>,

    /// Wallet database path.
    #[arg(long)]
    db: Option<String>,

    /// Log filter (overrides RUST_LOG).
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug)]
struct NetworkArg(Network);

impl std::str::FromStr for NetworkArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        Network::from_name(s)
            .map(NetworkArg)
            .ok_or_else(|| format!("unknown network: {} (use mainnet, testnet, or simnet)", s))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the worst-case signed size of a P2PKH transaction.
    EstimateSize {
        /// Number of P2PKH inputs.
        #[arg(long, default_value = "1")]
        inputs: usize,

        /// Number of P2PKH outputs.
        #[arg(long, default_value = "1")]
        outputs: usize,

        /// Include a P2PKH change output.
        #[arg(long)]
        change: bool,

        /// Coin type of the outputs (0 for VAR).
        #[arg(long, default_value = "0")]
        coin_type: u8,
    },

    /// Fee required for a transaction of the given size.
    Fee {
        /// Serialized size in bytes.
        #[arg(long)]
        size: usize,

        /// Coin type the fee is paid in.
        #[arg(long, default_value = "0")]
        coin_type: u8,
    },

    /// Stake pool fee for a ticket.
    PoolFee {
        /// Ticket price in coins (e.g. "10.5").
        #[arg(long)]
        stake_diff: String,

        /// Ticket transaction fee in coins.
        #[arg(long)]
        fee: String,

        /// Height the ticket is purchased at.
        #[arg(long)]
        height: i64,

        /// Pool fee percentage (e.g. 2.59).
        #[arg(long)]
        percent: f64,

        /// Treat the DCP0010 subsidy split as active.
        #[arg(long)]
        dcp0010: bool,

        /// Treat the DCP0012 subsidy split as active.
        #[arg(long)]
        dcp0012: bool,
    },

    /// Manage per-account consolidation addresses.
    Consolidation {
        #[command(subcommand)]
        action: ConsolidationAction,
    },
}

#[derive(Subcommand)]
enum ConsolidationAction {
    /// Show the override for an account.
    Get {
        #[arg(long, default_value = "default")]
        account: String,
    },

    /// Set the override to a 20-byte address hash (hex).
    Set {
        #[arg(long, default_value = "default")]
        account: String,

        #[arg(long)]
        hash160: String,
    },

    /// Remove the override for an account.
    Clear {
        #[arg(long, default_value = "default")]
        account: String,
    },
}

/// Application context shared across commands.
struct AppContext {
    network: Network,
    relay_fee: i64,
    db_path: PathBuf,
}

impl AppContext {
    fn from_cli(cli: &Cli) -> Self {
        let network = cli.network.0;
        let db_path = match cli.db {
            Some(ref path) => PathBuf::from(path),
            None => default_wallet_dir(network).join("wallet.db"),
        };
        Self {
            network,
            relay_fee: cli.relay_fee.unwrap_or(DEFAULT_RELAY_FEE_PER_KB),
            db_path,
        }
    }
}

fn default_wallet_dir(network: Network) -> PathBuf {
    let base = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("monetarium");
    match network {
        Network::Mainnet => base,
        Network::Testnet => base.join("testnet"),
        Network::Simnet => base.join("simnet"),
    }
}

fn init_logging(level: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    let ctx = AppContext::from_cli(&cli);

    let result = match cli.command {
        Commands::EstimateSize { inputs, outputs, change, coin_type } => {
            commands::estimate_size(&ctx, inputs, outputs, change, coin_type)
        }
        Commands::Fee { size, coin_type } => commands::fee(&ctx, size, coin_type),
        Commands::PoolFee { stake_diff, fee, height, percent, dcp0010, dcp0012 } => {
            commands::pool_fee(&ctx, &stake_diff, &fee, height, percent, dcp0010, dcp0012)
        }
        Commands::Consolidation { action } => match action {
            ConsolidationAction::Get { account } => commands::consolidation_get(&ctx, &account),
            ConsolidationAction::Set { account, hash160 } => commands::consolidation_set(&ctx, &account, &hash160),
            ConsolidationAction::Clear { account } => commands::consolidation_clear(&ctx, &account),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
