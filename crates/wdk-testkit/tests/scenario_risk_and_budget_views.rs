use wdk_engine::NewBuy;
use wdk_numeric::{Money, Price};
use wdk_schemas::StrategyAssignment;
use wdk_testkit::{d, Harness};

/// Two $500 lots tied up; the one whose take-profit is already met at
/// the current price drops out of the at-risk figure.
#[test]
fn scenario_risk_and_budget_views() {
    let h = Harness::new();
    let stock = h.add_stock("ACME");
    let engine = h.engine();

    // lot 1: $500 at $100 -> TP $110; lot 2: $500 at $200 -> TP $220
    for price in [100, 200] {
        engine
            .record_buy(
                stock.id,
                NewBuy {
                    date: d(2024, 1, 2),
                    price: Price::from_units(price),
                    investment: Money::from_units(500),
                    assignment: StrategyAssignment::Swing,
                },
            )
            .unwrap();
    }

    // at $115 the first lot's target is met, the second's is not
    h.set_price("ACME", 115.0);
    let report = engine.stock_report(stock.id).unwrap();

    assert_eq!(report.tied_up, Money::from_units(1000));
    assert_eq!(report.risk_investment, Money::from_units(500));

    // budget: $1,000 out of pocket against the $10,000 risk budget
    assert_eq!(report.budget_used, Money::from_units(1000));
    assert_eq!(report.budget_available, Money::from_units(9000));

    // unrealized: (115-100)*5 + (115-200)*2.5 = 75 - 212.50
    let unreal = report.swing.unrealized.available().unwrap();
    assert_eq!(unreal.profit, Money::new(-13_750));

    // portfolio view is a plain sum over the single stock
    let portfolio = engine.portfolio_report().unwrap();
    assert_eq!(portfolio.totals.tied_up, Money::from_units(1000));
    assert_eq!(portfolio.totals.risk_investment, Money::from_units(500));
    assert_eq!(
        portfolio.totals.unrealized_profit.available(),
        Some(Money::new(-13_750))
    );
    assert_eq!(portfolio.totals.counts.buys, 2);
}
