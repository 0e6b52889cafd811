use wdk_engine::{NewBuy, NewSell};
use wdk_numeric::{Money, Price, Shares};
use wdk_schemas::{EventKind, Strategy, StrategyAssignment};
use wdk_signals::SignalFlags;
use wdk_store::LotStore;
use wdk_testkit::{d, Harness};

#[test]
fn scenario_even_split_buy_then_partial_swing_sale() {
    let h = Harness::new();
    let stock = h.add_stock("ACME");
    let engine = h.engine();

    // GIVEN: buy 10 shares at $100 ($1,000 investment), split 50/50
    let buy = engine
        .record_buy(
            stock.id,
            NewBuy {
                date: d(2024, 1, 2),
                price: Price::from_units(100),
                investment: Money::from_units(1000),
                assignment: StrategyAssignment::SplitByRatio,
            },
        )
        .unwrap();
    assert!(buy.warnings.is_empty(), "even split leaves no residual");

    let lots = LotStore::list(&h.store, stock.id).unwrap();
    assert_eq!(lots.len(), 2);
    let swing = lots.iter().find(|l| l.strategy == Strategy::Swing).unwrap();
    let hold = lots.iter().find(|l| l.strategy == Strategy::Hold).unwrap();

    // Swing lot 5 shares / $500, Hold lot 5 shares / $500
    assert_eq!(swing.total_shares, Shares::from_units(5));
    assert_eq!(swing.total_investment, Money::from_units(500));
    assert_eq!(hold.total_shares, Shares::from_units(5));
    assert_eq!(hold.total_investment, Money::from_units(500));
    // STP 10% / HTP 10%, no commission: both targets at $110
    assert_eq!(swing.tp_value, Some(Price::from_units(110)));
    assert_eq!(hold.tp_value, Some(Price::from_units(110)));

    // WHEN: sell 3 Swing shares at $110
    let sell = engine
        .record_sell(
            stock.id,
            NewSell {
                date: d(2024, 2, 1),
                price: Price::from_units(110),
                quantity: Shares::from_units(3),
                lot_id: swing.id,
            },
        )
        .unwrap();

    // THEN: realized Swing P/L = $30.00, stored on the event
    match sell.value.kind {
        EventKind::Sell { profit, .. } => assert_eq!(profit, Some(Money::from_units(30))),
        ref other => panic!("expected sell event, got {other:?}"),
    }

    // AND at a current price of $120 the hold take-profit is active
    h.set_price("ACME", 120.0);
    let report = engine.stock_report(stock.id).unwrap();

    assert_eq!(report.swing.realized.profit, Money::from_units(30));
    assert_eq!(report.swing.realized.pct, Some(10.0));

    // 2 swing shares remain: (120-100)*2 = $40 unrealized
    let swing_unreal = report.swing.unrealized.available().unwrap();
    assert_eq!(swing_unreal.profit, Money::from_units(40));
    // hold untouched: (120-100)*5 = $100
    let hold_unreal = report.hold.unrealized.available().unwrap();
    assert_eq!(hold_unreal.profit, Money::from_units(100));

    assert_eq!(
        report.signals,
        Some(SignalFlags {
            drop_buy: false,
            swing_take_profit: true,
            hold_take_profit: true,
        })
    );

    // tied up: 7 shares still held at $100 average
    assert_eq!(report.tied_up, Money::from_units(700));
    // every open lot's target is met at $120: nothing left at risk
    assert_eq!(report.risk_investment, Money::ZERO);
    // budget: $1,000 out of pocket, $330 returned by the sale
    assert_eq!(report.budget_used, Money::from_units(670));
    assert_eq!(report.budget_available, Money::from_units(9330));

    assert_eq!(report.counts.buys, 1);
    assert_eq!(report.counts.sells, 1);
    assert!(report.inconsistencies.is_empty());
}
