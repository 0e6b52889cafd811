use wdk_engine::NewBuy;
use wdk_numeric::{Money, Percent, Price};
use wdk_schemas::{EventKind, StrategyAssignment};
use wdk_store::StockStore;
use wdk_testkit::{d, stock_fixture, Harness};

/// For every ratio in [0, 100], the derived swing and hold shares must
/// sum exactly to the full quantity — rounding residue is nudged into
/// the hold slice, never lost.
#[test]
fn scenario_proportional_split_sums_exactly() {
    let h = Harness::new();
    let engine = h.engine();

    // awkward price and investment so the slices almost always round
    let price = Price::from_f64(7.77).unwrap();
    let investment = Money::from_f64(1037.53).unwrap();
    let expected_qty = investment.div_price(price).unwrap();

    for ratio in 0..=100 {
        let mut stock = stock_fixture(&format!("S{ratio}"));
        stock.swing_ratio_pct = Percent::from_units(ratio);
        StockStore::create(&h.store, stock.clone()).unwrap();

        let out = engine
            .record_buy(
                stock.id,
                NewBuy {
                    date: d(2024, 1, 2),
                    price,
                    investment,
                    assignment: StrategyAssignment::SplitByRatio,
                },
            )
            .unwrap();

        match out.value.kind {
            EventKind::Buy {
                swing_shares,
                hold_shares,
                ..
            } => {
                assert_eq!(
                    swing_shares + hold_shares,
                    expected_qty,
                    "ratio {ratio}% must not lose shares"
                );
            }
            ref other => panic!("expected buy event, got {other:?}"),
        }
    }
}
