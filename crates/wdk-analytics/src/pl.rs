use std::collections::BTreeMap;

use wdk_numeric::{Money, Percent, Price};
use wdk_schemas::{EventId, EventKind, LedgerEvent, LotId, LotRecord, Strategy};

use crate::splits::SplitTable;
use crate::Valuation;

/// A pair of per-strategy values.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PerStrategy<T> {
    pub swing: T,
    pub hold: T,
}

impl<T> PerStrategy<T> {
    pub fn get(&self, strategy: Strategy) -> &T {
        match strategy {
            Strategy::Swing => &self.swing,
            Strategy::Hold => &self.hold,
        }
    }

    pub fn get_mut(&mut self, strategy: Strategy) -> &mut T {
        match strategy {
            Strategy::Swing => &mut self.swing,
            Strategy::Hold => &mut self.hold,
        }
    }
}

/// Realized P/L over the sell events of one strategy.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RealizedPl {
    pub profit: Money,
    /// Σ `buy price (as of sale date) * quantity` over the same sales.
    pub cost_basis: Money,
    pub pct: Option<f64>,
}

/// Mark-to-market P/L over the open lots of one strategy.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct UnrealizedPl {
    pub profit: Money,
    /// Σ `buy price * remaining shares` over open lots.
    pub cost_basis: Money,
    pub pct: Option<f64>,
}

/// Realized plus unrealized, over the combined cost basis.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CombinedPl {
    pub profit: Money,
    pub cost_basis: Money,
    pub pct: Option<f64>,
}

/// Data problems found while aggregating.  Non-fatal: the affected sale
/// is skipped (or its percent suppressed) and aggregation continues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inconsistency {
    /// A sell event references a lot that no longer exists.
    MissingLot { event: EventId, lot: LotId },
    /// Non-zero realized profit against a zero cost basis.
    ZeroBasisProfit { strategy: Strategy },
}

impl std::fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingLot { event, lot } => {
                write!(f, "sell event {event} references missing lot {lot}")
            }
            Self::ZeroBasisProfit { strategy } => write!(
                f,
                "{} strategy has realized profit on a zero cost basis",
                strategy.as_str()
            ),
        }
    }
}

/// Aggregate realized P/L per strategy from a stock's sell events.
///
/// The profit recorded on the event at sale time is authoritative; a
/// sale imported without one is re-derived from `(price - buy) * qty`
/// minus sell-leg commission, with the buy price unwound through the
/// split table to its value on the sale date.
pub fn realized_for_stock(
    events: &[LedgerEvent],
    lots_by_id: &BTreeMap<LotId, &LotRecord>,
    splits: &SplitTable,
    commission: Percent,
) -> (PerStrategy<RealizedPl>, Vec<Inconsistency>) {
    let mut out = PerStrategy::<RealizedPl>::default();
    let mut notes = Vec::new();

    for ev in events {
        let EventKind::Sell {
            price,
            quantity,
            lot_id,
            profit,
            ..
        } = &ev.kind
        else {
            continue;
        };
        let (price, quantity, lot_id, profit) = (*price, *quantity, *lot_id, *profit);
        let Some(lot) = lots_by_id.get(&lot_id) else {
            notes.push(Inconsistency::MissingLot {
                event: ev.id,
                lot: lot_id,
            });
            continue;
        };

        let buy_at_sale = splits.price_as_of(lot.buy_price, ev.date);
        let profit = profit.unwrap_or_else(|| {
            let gross = (price - buy_at_sale).times(quantity);
            gross - price.times(quantity).pct_of(commission)
        });

        let bucket = out.get_mut(lot.strategy);
        bucket.profit += profit;
        bucket.cost_basis += buy_at_sale.times(quantity);
    }

    for strategy in [Strategy::Swing, Strategy::Hold] {
        let bucket = out.get_mut(strategy);
        bucket.pct = bucket.profit.percent_of_basis(bucket.cost_basis);
        if bucket.pct.is_none() {
            notes.push(Inconsistency::ZeroBasisProfit { strategy });
        }
    }

    (out, notes)
}

/// Mark open lots to the current price, per strategy.
///
/// `Unavailable` when there is no current price — the caller must keep
/// that distinct from a zero P/L.
pub fn unrealized_for_stock<'a>(
    lots: impl IntoIterator<Item = &'a LotRecord>,
    current: Option<Price>,
) -> Valuation<PerStrategy<UnrealizedPl>> {
    let Some(current) = current else {
        return Valuation::Unavailable;
    };

    let mut out = PerStrategy::<UnrealizedPl>::default();
    for lot in lots {
        if !lot.is_open() {
            continue;
        }
        let bucket = out.get_mut(lot.strategy);
        bucket.profit += (current - lot.buy_price).times(lot.remaining_shares);
        bucket.cost_basis += lot.buy_price.times(lot.remaining_shares);
    }
    for strategy in [Strategy::Swing, Strategy::Hold] {
        let bucket = out.get_mut(strategy);
        bucket.pct = bucket.profit.percent_of_basis(bucket.cost_basis);
    }
    Valuation::Available(out)
}

/// Realized + unrealized over the combined basis.  Unavailable marks
/// propagate: without a price there is no combined view.
pub fn combined_pl(
    realized: &RealizedPl,
    unrealized: Valuation<&UnrealizedPl>,
) -> Valuation<CombinedPl> {
    unrealized.map(|u| {
        let profit = realized.profit + u.profit;
        let cost_basis = realized.cost_basis + u.cost_basis;
        CombinedPl {
            profit,
            cost_basis,
            pct: profit.percent_of_basis(cost_basis),
        }
    })
}

/// Dividend and stock-lending income for a stock.
///
/// Tracked separately from trading P/L: income is not proportional to
/// any cost basis, so it joins only the portfolio-level combined total
/// and never a percent calculation.
pub fn income_for_stock(events: &[LedgerEvent]) -> Money {
    events
        .iter()
        .map(|ev| match ev.kind {
            EventKind::Dividend { amount } | EventKind::LendingPayment { amount } => amount,
            _ => Money::ZERO,
        })
        .fold(Money::ZERO, |acc, m| acc + m)
}
