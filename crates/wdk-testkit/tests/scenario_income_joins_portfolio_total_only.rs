use wdk_engine::NewBuy;
use wdk_numeric::{Money, Price};
use wdk_schemas::StrategyAssignment;
use wdk_testkit::{d, Harness};

/// Dividend and lending income joins the portfolio-level combined total
/// and the cash balance, but never a percent-of-cost-basis figure.
#[test]
fn scenario_income_joins_portfolio_total_only() {
    let h = Harness::new();
    let stock = h.add_stock("ACME");
    let engine = h.engine();

    engine
        .record_buy(
            stock.id,
            NewBuy {
                date: d(2024, 1, 2),
                price: Price::from_units(100),
                investment: Money::from_units(1000),
                assignment: StrategyAssignment::Hold,
            },
        )
        .unwrap();
    engine
        .record_dividend(stock.id, d(2024, 3, 15), Money::from_units(50))
        .unwrap();
    engine
        .record_lending_payment(stock.id, d(2024, 4, 1), Money::from_units(10))
        .unwrap();

    h.set_price("ACME", 110.0);
    let report = engine.stock_report(stock.id).unwrap();
    assert_eq!(report.income, Money::from_units(60));
    // income leaves the hold P/L percentages untouched
    let hold = report.hold.unrealized.available().unwrap();
    assert_eq!(hold.profit, Money::from_units(100));
    assert_eq!(hold.pct, Some(10.0));

    let portfolio = engine.portfolio_report().unwrap();
    // combined = realized 0 + unrealized 100 + income 60
    assert_eq!(
        portfolio.totals.combined_with_income.available(),
        Some(Money::from_units(160))
    );
    // cash: $60 income; ROIC = (60 + 1100 - 1000) / 1000 = 16%
    assert_eq!(portfolio.totals.cash_balance, Money::from_units(60));
    assert_eq!(portfolio.totals.roic_pct, Some(16.0));

    assert_eq!(portfolio.totals.counts.dividends, 1);
    assert_eq!(portfolio.totals.counts.lending_payments, 1);
}
