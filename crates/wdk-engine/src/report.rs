use std::collections::BTreeMap;

use wdk_analytics::{
    budget_available, budget_used, combined_pl, income_for_stock, market_value,
    realized_for_stock, risk_investment, tied_up_investment, unrealized_for_stock, CombinedPl,
    Inconsistency, RealizedPl, SplitTable, UnrealizedPl, Valuation,
};
use wdk_numeric::{Money, Price};
use wdk_schemas::{
    EventKind, LedgerEvent, LotId, LotRecord, Stock, StockId, Strategy,
};
use wdk_signals::{drop_buy_active, take_profit_active, SignalFlags};
use wdk_store::read_all_events;
use wdk_wallet::WalletBook;

use crate::engine::Engine;
use crate::errors::EngineError;

/// Per-kind event tallies for a stock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub buys: usize,
    pub sells: usize,
    pub dividends: usize,
    pub lending_payments: usize,
    pub splits: usize,
}

impl EventCounts {
    fn tally(events: &[LedgerEvent]) -> Self {
        let mut counts = Self::default();
        for ev in events {
            match ev.kind {
                EventKind::Buy { .. } => counts.buys += 1,
                EventKind::Sell { .. } => counts.sells += 1,
                EventKind::Dividend { .. } => counts.dividends += 1,
                EventKind::LendingPayment { .. } => counts.lending_payments += 1,
                EventKind::StockSplit { .. } => counts.splits += 1,
            }
        }
        counts
    }

    fn add(&mut self, other: &EventCounts) {
        self.buys += other.buys;
        self.sells += other.sells;
        self.dividends += other.dividends;
        self.lending_payments += other.lending_payments;
        self.splits += other.splits;
    }
}

/// One strategy's P/L view for a stock.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StrategyView {
    pub realized: RealizedPl,
    pub unrealized: Valuation<UnrealizedPl>,
    pub combined: Valuation<CombinedPl>,
}

/// Everything the engine can say about one stock, given the current
/// lot/event sets and an optional price.
#[derive(Clone, Debug)]
pub struct StockReport {
    pub stock_id: StockId,
    pub symbol: String,
    pub current_price: Option<Price>,
    pub swing: StrategyView,
    pub hold: StrategyView,
    /// Dividend + lending income; portfolio-level only, never folded
    /// into percent denominators.
    pub income: Money,
    pub tied_up: Money,
    pub risk_investment: Money,
    pub market_value: Valuation<Money>,
    pub budget_used: Money,
    pub budget_available: Money,
    /// `None` when no current price is available.
    pub signals: Option<SignalFlags>,
    pub counts: EventCounts,
    pub open_lots: usize,
    pub inconsistencies: Vec<Inconsistency>,
}

impl StockReport {
    /// Total unrealized profit across both strategies; zero is a valid
    /// answer only when there is nothing open to mark.
    fn unrealized_total(&self) -> Valuation<Money> {
        match (&self.swing.unrealized, &self.hold.unrealized) {
            (Valuation::Available(s), Valuation::Available(h)) => {
                Valuation::Available(s.profit + h.profit)
            }
            _ if self.open_lots == 0 => Valuation::Available(Money::ZERO),
            _ => Valuation::Unavailable,
        }
    }
}

/// Portfolio-wide sums of the per-stock reports.  Plain sums only — no
/// cross-stock normalization.
#[derive(Clone, Debug)]
pub struct PortfolioTotals {
    pub realized_profit: Money,
    pub unrealized_profit: Valuation<Money>,
    pub income: Money,
    /// Realized + unrealized + income; the only place income joins a
    /// P/L figure.
    pub combined_with_income: Valuation<Money>,
    pub tied_up: Money,
    pub risk_investment: Money,
    pub market_value: Valuation<Money>,
    pub cash_balance: Money,
    pub out_of_pocket: Money,
    pub roic_pct: Option<f64>,
    pub counts: EventCounts,
}

#[derive(Clone, Debug)]
pub struct PortfolioReport {
    pub stocks: Vec<StockReport>,
    pub totals: PortfolioTotals,
}

impl Engine<'_> {
    /// Recompute the full derived view for one stock.  Read-only and
    /// lock-free; concurrent mutation of other stocks is harmless.
    pub fn stock_report(&self, stock_id: StockId) -> Result<StockReport, EngineError> {
        let stock = self.stock_store().get(stock_id)?;
        let events = read_all_events(
            self.event_store(),
            stock_id,
            self.defaults.event_page_size,
        )?;
        let loaded = self.load_book(stock_id)?;
        let current = self.feed.current_price(&stock.symbol);
        Ok(build_stock_report(&stock, &events, &loaded.book, current))
    }

    /// Reports for every non-archived stock plus plain-sum totals.
    pub fn portfolio_report(&self) -> Result<PortfolioReport, EngineError> {
        let mut reports = Vec::new();
        for stock in self.stock_store().list()? {
            if stock.archived {
                continue;
            }
            reports.push(self.stock_report(stock.id)?);
        }

        let mut cash_balance = Money::ZERO;
        let mut out_of_pocket = Money::ZERO;
        for stock in self.stock_store().list()? {
            if stock.archived {
                continue;
            }
            cash_balance += stock.cash_balance;
            out_of_pocket += stock.out_of_pocket;
        }

        let totals = aggregate(&reports, cash_balance, out_of_pocket);
        Ok(PortfolioReport {
            stocks: reports,
            totals,
        })
    }
}

pub(crate) fn build_stock_report(
    stock: &Stock,
    events: &[LedgerEvent],
    book: &WalletBook,
    current: Option<Price>,
) -> StockReport {
    let splits = SplitTable::from_events(events);
    let lots_by_id: BTreeMap<LotId, &LotRecord> =
        book.records().map(|rec| (rec.id, rec)).collect();

    let (realized, inconsistencies) =
        realized_for_stock(events, &lots_by_id, &splits, stock.commission_pct);
    let unrealized = unrealized_for_stock(book.records(), current);

    let view = |strategy: Strategy| -> StrategyView {
        let realized = *realized.get(strategy);
        let unrealized_one = unrealized.as_ref().map(|u| *u.get(strategy));
        StrategyView {
            realized,
            unrealized: unrealized_one,
            combined: combined_pl(
                &realized,
                unrealized.as_ref().map(|u| u.get(strategy)),
            ),
        }
    };

    StockReport {
        stock_id: stock.id,
        symbol: stock.symbol.clone(),
        current_price: current,
        swing: view(Strategy::Swing),
        hold: view(Strategy::Hold),
        income: income_for_stock(events),
        tied_up: tied_up_investment(book.records()),
        risk_investment: risk_investment(book.records(), current),
        market_value: market_value(book.records(), current),
        budget_used: budget_used(stock),
        budget_available: budget_available(stock),
        signals: current.map(|px| signal_flags(events, book, px)),
        counts: EventCounts::tally(events),
        open_lots: book.records().filter(|l| l.is_open()).count(),
        inconsistencies,
    }
}

/// Active signals at the current price: buy-the-dip against the most
/// recent buy's stored drop target, take-profit against each open lot's
/// target.
fn signal_flags(events: &[LedgerEvent], book: &WalletBook, current: Price) -> SignalFlags {
    let last_drop_target = events.iter().rev().find_map(|ev| match ev.kind {
        EventKind::Buy {
            drop_buy_target, ..
        } => Some(drop_buy_target),
        _ => None,
    });

    let tp_met = |strategy: Strategy| {
        book.records()
            .filter(|lot| lot.strategy == strategy && lot.is_open())
            .any(|lot| match lot.tp_value {
                Some(tp) => take_profit_active(current, tp),
                None => false,
            })
    };

    SignalFlags {
        drop_buy: last_drop_target
            .map(|t| drop_buy_active(current, t))
            .unwrap_or(false),
        swing_take_profit: tp_met(Strategy::Swing),
        hold_take_profit: tp_met(Strategy::Hold),
    }
}

fn aggregate(
    reports: &[StockReport],
    cash_balance: Money,
    out_of_pocket: Money,
) -> PortfolioTotals {
    let mut realized_profit = Money::ZERO;
    let mut income = Money::ZERO;
    let mut tied_up = Money::ZERO;
    let mut risk = Money::ZERO;
    let mut counts = EventCounts::default();

    let mut unrealized_sum = Money::ZERO;
    let mut unrealized_known = true;
    let mut mv_sum = Money::ZERO;
    let mut mv_known = true;

    for report in reports {
        realized_profit += report.swing.realized.profit + report.hold.realized.profit;
        income += report.income;
        tied_up += report.tied_up;
        risk += report.risk_investment;
        counts.add(&report.counts);

        match report.unrealized_total() {
            Valuation::Available(u) => unrealized_sum += u,
            Valuation::Unavailable => unrealized_known = false,
        }
        match report.market_value {
            Valuation::Available(mv) => mv_sum += mv,
            Valuation::Unavailable if report.open_lots == 0 => {}
            Valuation::Unavailable => mv_known = false,
        }
    }

    let unrealized_profit = if unrealized_known {
        Valuation::Available(unrealized_sum)
    } else {
        Valuation::Unavailable
    };
    let market_value = if mv_known {
        Valuation::Available(mv_sum)
    } else {
        Valuation::Unavailable
    };

    let combined_with_income = unrealized_profit
        .map(|u| realized_profit + u + income);
    let roic_pct = match market_value {
        Valuation::Available(mv) => wdk_analytics::roic(cash_balance, mv, out_of_pocket),
        Valuation::Unavailable => None,
    };

    PortfolioTotals {
        realized_profit,
        unrealized_profit,
        income,
        combined_with_income,
        tied_up,
        risk_investment: risk,
        market_value,
        cash_balance,
        out_of_pocket,
        roic_pct,
        counts,
    }
}
