use wdk_engine::{EditPolicy, EngineError, NewBuy, NewSell};
use wdk_numeric::{Money, Price, Shares};
use wdk_schemas::{EventKind, LedgerEvent, StrategyAssignment};
use wdk_store::LotStore;
use wdk_testkit::{d, Harness};
use wdk_wallet::{WalletError, WalletWarning};

fn committed_setup(h: &Harness) -> (wdk_schemas::Stock, LedgerEvent, wdk_schemas::LotRecord) {
    let stock = h.add_stock("ACME");
    let engine = h.engine();
    let buy = engine
        .record_buy(
            stock.id,
            NewBuy {
                date: d(2024, 1, 2),
                price: Price::from_units(100),
                investment: Money::from_units(1000),
                assignment: StrategyAssignment::Swing,
            },
        )
        .unwrap()
        .value;
    let lot = LotStore::list(&h.store, stock.id).unwrap().remove(0);
    engine
        .record_sell(
            stock.id,
            NewSell {
                date: d(2024, 2, 1),
                price: Price::from_units(110),
                quantity: Shares::from_units(1),
                lot_id: lot.id,
            },
        )
        .unwrap();
    let committed = LotStore::list(&h.store, stock.id).unwrap().remove(0);
    assert!(committed.is_committed());
    (stock, buy, committed)
}

fn reprice(buy: &LedgerEvent, new_price: Price) -> LedgerEvent {
    let EventKind::Buy {
        investment,
        assignment,
        swing_shares,
        hold_shares,
        drop_buy_target,
        take_profit_target,
        ..
    } = &buy.kind
    else {
        panic!("fixture is a buy event");
    };
    LedgerEvent {
        id: buy.id,
        stock_id: buy.stock_id,
        date: buy.date,
        kind: EventKind::Buy {
            price: new_price,
            investment: *investment,
            assignment: *assignment,
            swing_shares: *swing_shares,
            hold_shares: *hold_shares,
            drop_buy_target: *drop_buy_target,
            take_profit_target: *take_profit_target,
        },
    }
}

#[test]
fn strict_edit_of_committed_lot_is_refused() {
    let h = Harness::new();
    let (stock, buy, committed) = committed_setup(&h);
    let engine = h.engine();

    let err = engine
        .update_event(reprice(&buy, Price::from_units(105)), EditPolicy::Strict)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Wallet(WalletError::CommittedLotConflict { .. })
    ));

    // nothing moved: event and lot are exactly as they were
    let lots = LotStore::list(&h.store, stock.id).unwrap();
    assert_eq!(lots[0], committed);
    let report = engine.stock_report(stock.id).unwrap();
    assert_eq!(report.counts.buys, 1);
}

#[test]
fn event_only_edit_saves_event_and_warns() {
    let h = Harness::new();
    let (stock, buy, committed) = committed_setup(&h);
    let engine = h.engine();

    let out = engine
        .update_event(reprice(&buy, Price::from_units(105)), EditPolicy::AllowEventOnly)
        .unwrap();
    assert!(out
        .warnings
        .iter()
        .any(|w| matches!(w, WalletWarning::WalletNotUpdated { .. })));

    // the ledger reflects the edit...
    match out.value.kind {
        EventKind::Buy { price, .. } => assert_eq!(price, Price::from_units(105)),
        ref other => panic!("expected buy event, got {other:?}"),
    }
    // ...but the committed lot keeps its original basis
    let lots = LotStore::list(&h.store, stock.id).unwrap();
    assert_eq!(lots[0].buy_price, committed.buy_price);
    assert_eq!(lots[0].total_shares, committed.total_shares);
}

#[test]
fn strict_delete_of_committed_buy_is_refused() {
    let h = Harness::new();
    let (_, buy, _) = committed_setup(&h);
    let engine = h.engine();

    let err = engine.delete_event(buy.id, EditPolicy::Strict).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Wallet(WalletError::CommittedLotConflict { .. })
    ));
}

#[test]
fn event_only_delete_removes_event_and_keeps_lot() {
    let h = Harness::new();
    let (stock, buy, committed) = committed_setup(&h);
    let engine = h.engine();

    let out = engine
        .delete_event(buy.id, EditPolicy::AllowEventOnly)
        .unwrap();
    assert!(out
        .warnings
        .iter()
        .any(|w| matches!(w, WalletWarning::WalletNotUpdated { .. })));

    let report = engine.stock_report(stock.id).unwrap();
    assert_eq!(report.counts.buys, 0);
    let lots = LotStore::list(&h.store, stock.id).unwrap();
    assert_eq!(lots[0].total_shares, committed.total_shares);
}
