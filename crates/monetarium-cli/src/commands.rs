//! CLI command implementations.

use crate::AppContext;
use log::info;
use monetarium_tx::rules::{fee_for_serialize_size_dual_coin, stake_pool_ticket_fee, FeeSchedule};
use monetarium_tx::size::{
    estimate_serialize_size_from_script_sizes, WireFormat, P2PKH_PK_SCRIPT_SIZE, REDEEM_P2PKH_SIG_SCRIPT_SIZE,
};
use monetarium_types::amount::{format_atoms, CoinType, ATOMS_PER_COIN, DISPLAY_DECIMAL_POINT};
use monetarium_wallet::{
    account_consolidation_addr, clear_account_consolidation_addr, set_account_consolidation_addr, WalletStore,
};

type Result = std::result::Result<(), Box<dyn std::error::Error>>;

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Parse a decimal coin amount (e.g. "1.5") into atoms.
fn parse_coin_amount(s: &str) -> std::result::Result<i64, Box<dyn std::error::Error>> {
    if s.starts_with('-') {
        return Err("amount cannot be negative".into());
    }
    let (whole_str, frac_str) = s.split_once('.').unwrap_or((s, ""));
    let whole: i64 = if whole_str.is_empty() { 0 } else { whole_str.parse()? };
    if frac_str.len() > DISPLAY_DECIMAL_POINT {
        return Err(format!("too many decimal places (max {})", DISPLAY_DECIMAL_POINT).into());
    }
    let frac: i64 = if frac_str.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac_str, width = DISPLAY_DECIMAL_POINT).parse()?
    };
    whole
        .checked_mul(ATOMS_PER_COIN)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| "amount too large".into())
}

fn hex_to_20(s: &str) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
    let bytes = hex::decode(s)?;
    if bytes.len() != 20 {
        return Err(format!("expected 20 bytes, got {}", bytes.len()).into());
    }
    Ok(bytes)
}

fn open_store(ctx: &AppContext) -> std::result::Result<WalletStore, Box<dyn std::error::Error>> {
    if let Some(dir) = ctx.db_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    info!("using wallet database {}", ctx.db_path.display());
    Ok(WalletStore::open(&ctx.db_path)?)
}

// ─── Commands ───────────────────────────────────────────────────────────────

pub fn estimate_size(ctx: &AppContext, inputs: usize, outputs: usize, change: bool, coin_type: u8) -> Result {
    let coin_type = CoinType(coin_type);
    let format = WireFormat::for_coin_type(coin_type);
    let change_size = if change { P2PKH_PK_SCRIPT_SIZE } else { 0 };
    let size = estimate_serialize_size_from_script_sizes(
        &vec![REDEEM_P2PKH_SIG_SCRIPT_SIZE; inputs],
        &vec![P2PKH_PK_SCRIPT_SIZE; outputs],
        change_size,
        format,
    );
    let fee = fee_for_serialize_size_dual_coin(ctx.relay_fee, size, coin_type);

    println!("Coin type:      {}", coin_type);
    println!("Estimated size: {} bytes", size);
    println!("Fee:            {} ({} atoms/kB)", fee, ctx.relay_fee);
    Ok(())
}

pub fn fee(ctx: &AppContext, size: usize, coin_type: u8) -> Result {
    let coin_type = CoinType(coin_type);
    let fee = fee_for_serialize_size_dual_coin(ctx.relay_fee, size, coin_type);
    println!("{} {}", fee, coin_type);
    Ok(())
}

pub fn pool_fee(
    ctx: &AppContext,
    stake_diff: &str,
    fee: &str,
    height: i64,
    percent: f64,
    dcp0010: bool,
    dcp0012: bool,
) -> Result {
    let stake_diff = parse_coin_amount(stake_diff)?;
    let fee = parse_coin_amount(fee)?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(format!("pool fee percent {} out of range", percent).into());
    }
    let schedule = FeeSchedule::from_agendas(dcp0010, dcp0012);
    let pool_fee = stake_pool_ticket_fee(stake_diff, fee, height, percent, ctx.network.params(), dcp0010, dcp0012);

    println!("Network:  {}", ctx.network);
    println!("Schedule: {}", schedule.as_str());
    println!("Pool fee: {} ({} atoms)", format_atoms(&pool_fee.into()), pool_fee);
    Ok(())
}

pub fn consolidation_get(ctx: &AppContext, account: &str) -> Result {
    let store = open_store(ctx)?;
    match store.view(|tx| account_consolidation_addr(tx, account))? {
        Some(hash) => println!("{}: {}", account, hex::encode(hash)),
        None => println!("{}: no override (first external address is used)", account),
    }
    Ok(())
}

pub fn consolidation_set(ctx: &AppContext, account: &str, hash160: &str) -> Result {
    let hash = hex_to_20(hash160)?;
    let store = open_store(ctx)?;
    store.update(|tx| set_account_consolidation_addr(tx, account, &hash))?;
    println!("Consolidation address for {} set to {}", account, hash160);
    Ok(())
}

pub fn consolidation_clear(ctx: &AppContext, account: &str) -> Result {
    let store = open_store(ctx)?;
    store.update(|tx| clear_account_consolidation_addr(tx, account))?;
    println!("Consolidation address for {} cleared", account);
    Ok(())
}
