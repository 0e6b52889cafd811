use std::collections::BTreeMap;

use chrono::NaiveDate;

use wdk_numeric::{Money, Percent, Price, Ratio, Shares};
use wdk_schemas::{EventId, LotId, LotRecord, StockId, Strategy};

use crate::errors::WalletError;
use crate::outcome::{Outcome, WalletWarning};

/// Per-sale result handed back to the caller for event recording.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleResult {
    /// Net profit: `(price - buy) * qty` minus sell-leg commission.
    pub profit: Money,
    /// Profit relative to the sale's own cost basis, percent.
    pub profit_pct: Option<f64>,
}

/// All cost-basis lots of one stock, indexed by `(strategy, buy price)`.
///
/// The index normally holds one lot per key; a reverse split can collapse
/// two nearby prices onto the same key, so it tolerates multiple.  All
/// maps are `BTreeMap`s for deterministic iteration.
///
/// Every mutating operation validates first and writes only on success —
/// a returned [`WalletError`] means the book is unchanged.
#[derive(Debug, Clone)]
pub struct WalletBook {
    stock_id: StockId,
    lots: BTreeMap<LotId, LotRecord>,
    index: BTreeMap<(Strategy, Price), Vec<LotId>>,
}

impl WalletBook {
    pub fn new(stock_id: StockId) -> Self {
        Self {
            stock_id,
            lots: BTreeMap::new(),
            index: BTreeMap::new(),
        }
    }

    /// Rebuild a book from persisted records.
    ///
    /// `remaining_shares` is derived state and is re-derived here rather
    /// than trusted from the store.
    pub fn from_records(stock_id: StockId, records: Vec<LotRecord>) -> Self {
        let mut book = Self::new(stock_id);
        for mut rec in records {
            debug_assert_eq!(rec.stock_id, stock_id, "lot belongs to another stock");
            rec.remaining_shares = rec.total_shares - rec.shares_sold;
            debug_assert!(
                !rec.remaining_shares.is_negative(),
                "stored lot {} oversold",
                rec.id
            );
            book.index
                .entry((rec.strategy, rec.buy_price))
                .or_default()
                .push(rec.id);
            book.lots.insert(rec.id, rec);
        }
        book
    }

    pub fn stock_id(&self) -> StockId {
        self.stock_id
    }

    pub fn lot(&self, id: LotId) -> Option<&LotRecord> {
        self.lots.get(&id)
    }

    /// Iterate all lots in id order.
    pub fn records(&self) -> impl Iterator<Item = &LotRecord> {
        self.lots.values()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// The lot a contribution at `(strategy, price)` would land in:
    /// an uncommitted match first, then a committed one.
    pub fn find(&self, strategy: Strategy, price: Price) -> Option<&LotRecord> {
        let ids = self.index.get(&(strategy, price))?;
        ids.iter()
            .map(|id| &self.lots[id])
            .find(|l| !l.is_committed())
            .or_else(|| ids.first().map(|id| &self.lots[id]))
    }

    // -----------------------------------------------------------------------
    // contribute
    // -----------------------------------------------------------------------

    /// Add (or, for undo paths, subtract) a buy contribution at
    /// `(strategy, buy_price)`.
    ///
    /// Finds the matching lot, creating one on first contribution.  A
    /// committed lot accepts only additive deltas at its existing price;
    /// anything shrinking it fails with `CommittedLotConflict`.
    ///
    /// # Errors
    /// `NonPositivePrice`, `NonPositiveQuantity` (zero delta),
    /// `NoMatchingLot` (negative delta with nothing to subtract from),
    /// `CommittedLotConflict`, `NegativeBalance`.
    pub fn contribute(
        &mut self,
        strategy: Strategy,
        buy_price: Price,
        delta_shares: Shares,
        delta_investment: Money,
        tp_value: Option<Price>,
        date: NaiveDate,
    ) -> Result<Outcome<LotId>, WalletError> {
        if !buy_price.is_positive() {
            return Err(WalletError::NonPositivePrice { price: buy_price });
        }
        if delta_shares.is_zero() {
            return Err(WalletError::NonPositiveQuantity { qty: delta_shares });
        }

        let shrinking = delta_shares.is_negative() || delta_investment.is_negative();
        let target = self.index.get(&(strategy, buy_price)).and_then(|ids| {
            ids.iter()
                .copied()
                .find(|id| !self.lots[id].is_committed())
                .or_else(|| ids.first().copied())
        });

        match target {
            Some(id) => {
                let (total, invest, remaining) = {
                    let lot = match self.lots.get(&id) {
                        Some(l) => l,
                        None => return Err(WalletError::UnknownLot { lot: id }),
                    };
                    if lot.is_committed() && shrinking {
                        return Err(WalletError::CommittedLotConflict { lot: id });
                    }
                    checked_delta(lot, delta_shares, delta_investment)?
                };
                let lot = match self.lots.get_mut(&id) {
                    Some(l) => l,
                    None => return Err(WalletError::UnknownLot { lot: id }),
                };
                lot.total_shares = total;
                lot.total_investment = invest;
                lot.remaining_shares = remaining;
                if lot.tp_value.is_none() {
                    lot.tp_value = tp_value;
                }
                Ok(Outcome::clean(id))
            }
            None => {
                if shrinking {
                    return Err(WalletError::NoMatchingLot {
                        strategy,
                        price: buy_price,
                    });
                }
                let id = LotId::generate();
                let rec = LotRecord {
                    id,
                    stock_id: self.stock_id,
                    strategy,
                    buy_price,
                    opened: date,
                    total_shares: delta_shares,
                    total_investment: delta_investment,
                    shares_sold: Shares::ZERO,
                    remaining_shares: delta_shares,
                    realized_pl: Money::ZERO,
                    realized_pl_pct: None,
                    tp_value,
                    sell_txn_count: 0,
                    applied_splits: Default::default(),
                };
                self.index
                    .entry((strategy, buy_price))
                    .or_default()
                    .push(id);
                self.lots.insert(id, rec);
                Ok(Outcome::clean(id))
            }
        }
    }

    // -----------------------------------------------------------------------
    // apply_sale / reverse_sale
    // -----------------------------------------------------------------------

    /// Draw `quantity` shares out of a lot at `price`.
    ///
    /// Net profit is `(price - buy) * qty` minus the sell-leg commission
    /// `price * qty * commission/100`.  Updates sold/remaining shares,
    /// realized P/L (amount and percent), and the sale counter.
    ///
    /// # Errors
    /// `OverdrawnLot` when `quantity` exceeds the remaining shares;
    /// `UnknownLot`, `NonPositiveQuantity`, `NonPositivePrice`.
    pub fn apply_sale(
        &mut self,
        lot_id: LotId,
        quantity: Shares,
        price: Price,
        commission_pct: Percent,
    ) -> Result<Outcome<SaleResult>, WalletError> {
        if !quantity.is_positive() {
            return Err(WalletError::NonPositiveQuantity { qty: quantity });
        }
        if !price.is_positive() {
            return Err(WalletError::NonPositivePrice { price });
        }
        let lot = self
            .lots
            .get(&lot_id)
            .ok_or(WalletError::UnknownLot { lot: lot_id })?;
        if quantity > lot.remaining_shares {
            return Err(WalletError::OverdrawnLot {
                lot: lot_id,
                requested: quantity,
                available: lot.remaining_shares,
            });
        }

        let profit = sale_profit(lot.buy_price, price, quantity, commission_pct);
        let sale_basis = lot.buy_price.times(quantity);

        let lot = match self.lots.get_mut(&lot_id) {
            Some(l) => l,
            None => return Err(WalletError::UnknownLot { lot: lot_id }),
        };
        lot.shares_sold += quantity;
        lot.remaining_shares = lot.total_shares - lot.shares_sold;
        lot.realized_pl += profit;
        lot.realized_pl_pct = realized_pct(lot);
        lot.sell_txn_count += 1;

        Ok(Outcome::clean(SaleResult {
            profit,
            profit_pct: profit.percent_of_basis(sale_basis),
        }))
    }

    /// Exact inverse of [`apply_sale`](Self::apply_sale) for the same
    /// `(lot, quantity, price, commission)`: applying then reversing
    /// restores every lot field bit-for-bit.
    ///
    /// # Errors
    /// `OverdrawnLot` when `quantity` exceeds the shares actually sold.
    pub fn reverse_sale(
        &mut self,
        lot_id: LotId,
        quantity: Shares,
        price: Price,
        commission_pct: Percent,
    ) -> Result<Outcome<()>, WalletError> {
        if !quantity.is_positive() {
            return Err(WalletError::NonPositiveQuantity { qty: quantity });
        }
        if !price.is_positive() {
            return Err(WalletError::NonPositivePrice { price });
        }
        let lot = self
            .lots
            .get(&lot_id)
            .ok_or(WalletError::UnknownLot { lot: lot_id })?;
        if quantity > lot.shares_sold {
            return Err(WalletError::OverdrawnLot {
                lot: lot_id,
                requested: quantity,
                available: lot.shares_sold,
            });
        }

        let profit = sale_profit(lot.buy_price, price, quantity, commission_pct);

        let lot = match self.lots.get_mut(&lot_id) {
            Some(l) => l,
            None => return Err(WalletError::UnknownLot { lot: lot_id }),
        };
        lot.shares_sold -= quantity;
        lot.remaining_shares = lot.total_shares - lot.shares_sold;
        lot.realized_pl -= profit;
        lot.realized_pl_pct = realized_pct(lot);
        lot.sell_txn_count = lot.sell_txn_count.saturating_sub(1);

        Ok(Outcome::clean(()))
    }

    // -----------------------------------------------------------------------
    // apply_stock_split
    // -----------------------------------------------------------------------

    /// Permanently adjust every lot for a stock split.
    ///
    /// Per-share values divide by the multiplier, share counts multiply;
    /// currency amounts (investment, realized P/L) are untouched — a
    /// split moves no capital.  Lots that already carry `split_event` in
    /// their applied set are skipped with an `AlreadyApplied` warning, so
    /// re-processing the same split event is harmless.
    ///
    /// Returns the ids of the lots actually adjusted.
    pub fn apply_stock_split(
        &mut self,
        split_event: EventId,
        multiplier: Ratio,
    ) -> Result<Outcome<Vec<LotId>>, WalletError> {
        if !multiplier.is_positive() {
            return Err(WalletError::NonPositiveMultiplier { multiplier });
        }

        let mut changed = Vec::new();
        let mut warnings = Vec::new();

        for lot in self.lots.values_mut() {
            if lot.applied_splits.contains(&split_event) {
                warnings.push(WalletWarning::AlreadyApplied {
                    lot: lot.id,
                    split: split_event,
                });
                continue;
            }
            lot.buy_price = lot.buy_price.div_ratio(multiplier);
            lot.total_shares = lot.total_shares.mul_ratio(multiplier);
            lot.shares_sold = lot.shares_sold.mul_ratio(multiplier);
            lot.remaining_shares = lot.total_shares - lot.shares_sold;
            lot.tp_value = lot.tp_value.map(|tp| tp.div_ratio(multiplier));
            lot.realized_pl_pct = realized_pct(lot);
            lot.applied_splits.insert(split_event);
            changed.push(lot.id);
        }

        self.rebuild_index();
        Ok(Outcome::with_warnings(changed, warnings))
    }

    // -----------------------------------------------------------------------
    // relocate
    // -----------------------------------------------------------------------

    /// Move a buy contribution out of `lot_id` and into the lot at
    /// `(new_strategy, new_price)` — the price/strategy-edit path.
    ///
    /// Implemented as the negated-then-positive contribution pair: the
    /// event's share/investment delta leaves the old lot, then enters the
    /// new one.  Refused outright when the old lot is committed.
    ///
    /// Returns the id of the receiving lot.
    pub fn relocate(
        &mut self,
        lot_id: LotId,
        new_strategy: Strategy,
        new_price: Price,
        shares: Shares,
        investment: Money,
        new_tp: Option<Price>,
        date: NaiveDate,
    ) -> Result<Outcome<LotId>, WalletError> {
        if !shares.is_positive() {
            return Err(WalletError::NonPositiveQuantity { qty: shares });
        }
        if !new_price.is_positive() {
            return Err(WalletError::NonPositivePrice { price: new_price });
        }
        let lot = self
            .lots
            .get(&lot_id)
            .ok_or(WalletError::UnknownLot { lot: lot_id })?;
        if lot.is_committed() {
            return Err(WalletError::CommittedLotConflict { lot: lot_id });
        }
        let (total, invest, remaining) = checked_delta(lot, -shares, -investment)?;

        let lot = match self.lots.get_mut(&lot_id) {
            Some(l) => l,
            None => return Err(WalletError::UnknownLot { lot: lot_id }),
        };
        lot.total_shares = total;
        lot.total_investment = invest;
        lot.remaining_shares = remaining;

        self.contribute(new_strategy, new_price, shares, investment, new_tp, date)
    }

    // -----------------------------------------------------------------------
    // remove_empty
    // -----------------------------------------------------------------------

    /// Explicitly remove a drained lot.  Never automatic: the caller asks.
    ///
    /// # Errors
    /// `LotNotEmpty` while any shares remain; `UnknownLot`.
    pub fn remove_empty(&mut self, lot_id: LotId) -> Result<LotRecord, WalletError> {
        let lot = self
            .lots
            .get(&lot_id)
            .ok_or(WalletError::UnknownLot { lot: lot_id })?;
        if !lot.remaining_shares.is_zero() {
            return Err(WalletError::LotNotEmpty {
                lot: lot_id,
                remaining: lot.remaining_shares,
            });
        }
        let rec = match self.lots.remove(&lot_id) {
            Some(r) => r,
            None => return Err(WalletError::UnknownLot { lot: lot_id }),
        };
        if let Some(ids) = self.index.get_mut(&(rec.strategy, rec.buy_price)) {
            ids.retain(|id| *id != lot_id);
            if ids.is_empty() {
                self.index.remove(&(rec.strategy, rec.buy_price));
            }
        }
        Ok(rec)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (id, rec) in &self.lots {
            self.index
                .entry((rec.strategy, rec.buy_price))
                .or_default()
                .push(*id);
        }
    }
}

/// Net sale profit: gross price improvement minus sell-leg commission.
fn sale_profit(buy: Price, sell: Price, qty: Shares, commission_pct: Percent) -> Money {
    let gross = (sell - buy).times(qty);
    let commission = sell.times(qty).pct_of(commission_pct);
    gross - commission
}

/// Cumulative realized percent: `realized / (buy * sold) * 100`.
/// `None` before any sale survives reversal round-trips exactly.
fn realized_pct(lot: &LotRecord) -> Option<f64> {
    if lot.shares_sold.is_zero() {
        return None;
    }
    lot.realized_pl
        .percent_of_basis(lot.buy_price.times(lot.shares_sold))
}

/// Validate an additive delta without writing anything back.
fn checked_delta(
    lot: &LotRecord,
    delta_shares: Shares,
    delta_investment: Money,
) -> Result<(Shares, Money, Shares), WalletError> {
    let total = lot.total_shares + delta_shares;
    let invest = lot.total_investment + delta_investment;
    let remaining = total - lot.shares_sold;
    if total.is_negative() || invest.is_negative() || remaining.is_negative() {
        return Err(WalletError::NegativeBalance {
            lot: lot.id,
            total_shares: total,
            shares_sold: lot.shares_sold,
        });
    }
    Ok((total, invest, remaining))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
