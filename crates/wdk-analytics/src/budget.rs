use wdk_numeric::{Money, Price};
use wdk_schemas::{LotRecord, Stock};

use crate::Valuation;

/// Capital still tied up in open lots: Σ per-lot average cost × shares
/// still held.
///
/// The average cost per share is `total_investment / total_shares`,
/// which — unlike the quoted buy price — carries the fractional-cent
/// remainder of the original investment.  A lot with zero total shares
/// contributes nothing.
pub fn tied_up_investment<'a>(lots: impl IntoIterator<Item = &'a LotRecord>) -> Money {
    lots.into_iter()
        .map(per_lot_tied_up)
        .fold(Money::ZERO, |acc, m| acc + m)
}

fn per_lot_tied_up(lot: &LotRecord) -> Money {
    match lot.total_investment.per_share(lot.total_shares) {
        Some(avg) => avg.times(lot.remaining_shares),
        None => Money::ZERO,
    }
}

/// Tied-up capital in lots whose take-profit has not yet been reached —
/// capital still at risk of a pullback.
///
/// Requires a current price to tell which targets are met; without one
/// the conservative answer is the full tied-up amount.
pub fn risk_investment<'a>(
    lots: impl IntoIterator<Item = &'a LotRecord>,
    current: Option<Price>,
) -> Money {
    lots.into_iter()
        .filter(|lot| match (lot.tp_value, current) {
            (Some(tp), Some(px)) => tp > px,
            // no target or no price: still at risk
            _ => true,
        })
        .map(per_lot_tied_up)
        .fold(Money::ZERO, |acc, m| acc + m)
}

/// Mark-to-market value of the open position.
pub fn market_value<'a>(
    lots: impl IntoIterator<Item = &'a LotRecord>,
    current: Option<Price>,
) -> Valuation<Money> {
    let Some(current) = current else {
        return Valuation::Unavailable;
    };
    Valuation::Available(
        lots.into_iter()
            .filter(|lot| lot.is_open())
            .map(|lot| current.times(lot.remaining_shares))
            .fold(Money::ZERO, |acc, m| acc + m),
    )
}

/// Out-of-pocket cash not yet returned: `max(0, out_of_pocket - cash)`.
pub fn budget_used(stock: &Stock) -> Money {
    (stock.out_of_pocket - stock.cash_balance).clamp_min_zero()
}

/// Risk budget headroom: `max(0, risk_budget - used)`.
pub fn budget_available(stock: &Stock) -> Money {
    (stock.risk_budget - budget_used(stock)).clamp_min_zero()
}

/// Return on invested capital across the portfolio:
/// `(cash + market value - out of pocket) / out of pocket * 100`.
///
/// `None` when nothing is out of pocket.
pub fn roic(cash: Money, market_value: Money, out_of_pocket: Money) -> Option<f64> {
    if !out_of_pocket.is_positive() {
        return None;
    }
    (cash + market_value - out_of_pocket).percent_of_basis(out_of_pocket)
}
