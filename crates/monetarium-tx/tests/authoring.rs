//! End-to-end authoring scenarios over in-memory input sources.
//! Run: cargo test -p monetarium-tx --test authoring

use monetarium_tx::author::{new_unsigned_transaction, InputDetail, StaticChangeSource};
use monetarium_tx::rules::{fee_for_serialize_size, is_dust_amount};
use monetarium_tx::size::{estimate_serialize_size, P2PKH_PK_SCRIPT_SIZE, REDEEM_P2PKH_SIG_SCRIPT_SIZE};
use monetarium_tx::ssfee::{classify_ssfee, marker_script, SsFeeKind};
use monetarium_tx::wire::{MsgTx, OutPoint, TxIn, TxOut};
use monetarium_tx::BoxError;
use monetarium_types::amount::{Amount, CoinType};
use monetarium_types::constants::DEFAULT_MAX_TX_SIZE;
use num_bigint::BigInt;

fn pay_script(tag: u8) -> Vec<u8> {
    let mut s = vec![0x76, 0xa9, 0x14];
    s.extend(std::iter::repeat(tag).take(20));
    s.extend([0x88, 0xac]);
    s
}

/// Input source over a fixed wallet of VAR outputs, smallest first.
fn var_wallet(mut utxos: Vec<i64>) -> impl FnMut(i64) -> Result<InputDetail, BoxError> {
    utxos.sort();
    move |target| {
        let mut detail = InputDetail::default();
        for (i, v) in utxos.iter().enumerate() {
            if target > 0 && detail.total_amount >= target {
                break;
            }
            detail.total_amount += v;
            detail.inputs.push(TxIn::new(OutPoint::new([i as u8 + 1; 32], 0, 0), Amount::Primary(*v), vec![]));
            detail.scripts.push(pay_script(0x11));
            detail.redeem_script_sizes.push(REDEEM_P2PKH_SIG_SCRIPT_SIZE);
        }
        Ok(detail)
    }
}

#[test]
fn single_p2pkh_payment_with_change() {
    let relay = 1_000;
    let mut source = var_wallet(vec![100_100_000]);
    let mut change = StaticChangeSource::new(pay_script(0x22));
    let outputs = vec![TxOut::primary(100_000_000, pay_script(0x33))];

    let authored = new_unsigned_transaction(outputs, relay, &mut source, &mut change, DEFAULT_MAX_TX_SIZE)
        .expect("authoring failed");

    let size = authored.estimated_signed_serialize_size;
    let fee = fee_for_serialize_size(relay, size);
    assert_eq!(fee, (size as i64 * relay + 999) / 1000);

    let idx = authored.change_index.expect("change expected");
    let change_value = authored.tx.tx_out[idx].value.to_i64().expect("bounded");
    assert!(!is_dust_amount(change_value, P2PKH_PK_SCRIPT_SIZE, relay));
    assert_eq!(authored.total_input, 100_000_000 + change_value + fee);
    assert_eq!(authored.fee, Amount::Primary(fee));
}

#[test]
fn leftover_without_change_covers_fee() {
    let relay = 10_000;
    let mut source = var_wallet(vec![30_000, 40_000]);
    let mut change = StaticChangeSource::new(pay_script(0x22));
    let outputs = vec![TxOut::primary(64_000, pay_script(0x33))];

    let authored = new_unsigned_transaction(outputs, relay, &mut source, &mut change, DEFAULT_MAX_TX_SIZE)
        .expect("authoring failed");

    assert_eq!(authored.change_index, None);
    let leftover = authored.total_input - 64_000;
    assert!(leftover >= fee_for_serialize_size(relay, authored.estimated_signed_serialize_size));
    assert_eq!(
        authored.estimated_signed_serialize_size,
        estimate_serialize_size(&[REDEEM_P2PKH_SIG_SCRIPT_SIZE; 2], &authored.tx.tx_out, 0)
    );
}

#[test]
fn many_outputs_sum_and_conserve() {
    let relay = 10_000;
    let mut source = var_wallet(vec![5_000_000, 3_000_000, 2_000_000, 1_000_000]);
    let mut change = StaticChangeSource::new(pay_script(0x22));
    let outputs: Vec<TxOut> = (1..=4).map(|i| TxOut::primary(i * 1_000_000, pay_script(i as u8))).collect();

    let mut authored = new_unsigned_transaction(outputs, relay, &mut source, &mut change, DEFAULT_MAX_TX_SIZE)
        .expect("authoring failed");
    authored.shuffle_outputs();

    let total_out: i64 = authored.tx.tx_out.iter().filter_map(|o| o.value.to_i64()).sum();
    let fee = authored.fee.to_i64().expect("bounded fee");
    assert_eq!(authored.total_input, total_out + fee);
    assert!(fee >= fee_for_serialize_size(relay, authored.estimated_signed_serialize_size));
    if let Some(idx) = authored.change_index {
        assert_eq!(authored.tx.tx_out[idx].pk_script, pay_script(0x22));
    }
}

#[test]
fn secondary_payment_beyond_i64() {
    let coin = CoinType(7);
    let balance: BigInt = BigInt::from(i64::MAX) * 1000;
    let send: BigInt = BigInt::from(i64::MAX) * 10;
    let mut source = {
        let balance = balance.clone();
        move |target: i64| -> Result<InputDetail, BoxError> {
            assert_eq!(target, 0);
            Ok(InputDetail {
                total_amount: 0,
                total_secondary_amount: balance.clone(),
                inputs: vec![TxIn::new(OutPoint::new([0xee; 32], 0, 0), Amount::Secondary(balance.clone()), vec![])],
                scripts: vec![pay_script(0x11)],
                redeem_script_sizes: vec![REDEEM_P2PKH_SIG_SCRIPT_SIZE],
            })
        }
    };
    let mut change = StaticChangeSource::new(pay_script(0x22));
    let outputs = vec![TxOut::secondary(coin, send.clone(), pay_script(0x33))];

    let authored = new_unsigned_transaction(outputs, 10_000, &mut source, &mut change, DEFAULT_MAX_TX_SIZE)
        .expect("authoring failed");

    let idx = authored.change_index.expect("change expected");
    let change_out = &authored.tx.tx_out[idx];
    assert_eq!(change_out.coin_type, coin);
    let fee = BigInt::from(fee_for_serialize_size(10_000, authored.estimated_signed_serialize_size));
    assert_eq!(change_out.value.to_bigint() + &send + &fee, balance);
    assert_eq!(authored.fee, Amount::Secondary(fee));
}

#[test]
fn authored_transaction_is_not_ssfee() {
    let mut source = var_wallet(vec![10_000_000]);
    let mut change = StaticChangeSource::new(pay_script(0x22));
    let outputs = vec![TxOut::primary(1_000_000, pay_script(0x33))];
    let authored = new_unsigned_transaction(outputs, 1_000, &mut source, &mut change, DEFAULT_MAX_TX_SIZE)
        .expect("authoring failed");
    assert!(classify_ssfee(&authored.tx).is_none());
}

#[test]
fn ssfee_scenarios() {
    for (kind, tag) in [(SsFeeKind::StakerFee, "SF"), (SsFeeKind::MinerFee, "MF")] {
        let mut tx = MsgTx::new(3);
        tx.add_tx_in(TxIn::new(OutPoint::null(), Amount::Primary(3000), vec![]));
        for i in 0..3u8 {
            tx.add_tx_out(TxOut::secondary(CoinType(1), BigInt::from(1000), pay_script(i)));
        }
        tx.add_tx_out(TxOut::secondary(CoinType(1), BigInt::from(0), marker_script(kind, 123_456)));

        let ssfee = classify_ssfee(&tx).expect("ssfee shape");
        assert_eq!(ssfee.kind.as_str(), tag);
        assert_eq!(ssfee.height, 123_456);

        tx.version = 2;
        assert!(classify_ssfee(&tx).is_none());
    }
}
