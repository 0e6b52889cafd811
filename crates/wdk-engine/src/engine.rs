use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use wdk_analytics::SplitTable;
use wdk_config::EngineDefaults;
use wdk_numeric::{Money, Price, Ratio, Shares};
use wdk_schemas::{
    EventId, EventKind, FieldError, LedgerEvent, LotId, Stock, StockId, Strategy,
    StrategyAssignment,
};
use wdk_signals::{drop_buy_target, take_profit_target};
use wdk_store::{read_all_events, EventStore, LotStore, PriceFeed, StockStore};
use wdk_wallet::{Outcome, WalletBook, WalletWarning};

use crate::errors::EngineError;
use crate::locks::StockLocks;

/// How to proceed when a ledger edit cannot be applied to the lot pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EditPolicy {
    /// Refuse the whole edit.
    Strict,
    /// Save the event anyway and attach a "wallet not updated" warning —
    /// the deliberate soft-fail that keeps the ledger editable while the
    /// lots await manual reconciliation.
    AllowEventOnly,
}

/// Input for a new buy event.
#[derive(Clone, Debug)]
pub struct NewBuy {
    pub date: NaiveDate,
    pub price: Price,
    pub investment: Money,
    pub assignment: StrategyAssignment,
}

/// Input for a new sell event.
#[derive(Clone, Debug)]
pub struct NewSell {
    pub date: NaiveDate,
    pub price: Price,
    pub quantity: Shares,
    pub lot_id: LotId,
}

/// The lot accounting and signal engine.
///
/// Synchronous and single-writer-per-stock: every mutating entry point
/// takes the stock's guard for its whole read-modify-write window.  The
/// store and feed are injected collaborators; any store error aborts the
/// operation with nothing further applied.
pub struct Engine<'a> {
    stocks: &'a dyn StockStore,
    events: &'a dyn EventStore,
    lots: &'a dyn LotStore,
    pub(crate) feed: &'a dyn PriceFeed,
    pub(crate) defaults: EngineDefaults,
    locks: StockLocks,
}

/// A wallet book plus the set of lot ids that already exist in the
/// store, so persistence knows create from update.
pub(crate) struct LoadedBook {
    pub(crate) book: WalletBook,
    existing: BTreeSet<LotId>,
}

impl<'a> Engine<'a> {
    pub fn new(
        stocks: &'a dyn StockStore,
        events: &'a dyn EventStore,
        lots: &'a dyn LotStore,
        feed: &'a dyn PriceFeed,
        defaults: EngineDefaults,
    ) -> Self {
        Self {
            stocks,
            events,
            lots,
            feed,
            defaults,
            locks: StockLocks::new(),
        }
    }

    pub(crate) fn stock_store(&self) -> &dyn StockStore {
        self.stocks
    }

    pub(crate) fn event_store(&self) -> &dyn EventStore {
        self.events
    }

    pub(crate) fn load_book(&self, stock_id: StockId) -> Result<LoadedBook, EngineError> {
        let records = self.lots.list(stock_id)?;
        let existing = records.iter().map(|r| r.id).collect();
        Ok(LoadedBook {
            book: WalletBook::from_records(stock_id, records),
            existing,
        })
    }

    fn persist_lots(
        &self,
        loaded: &LoadedBook,
        touched: impl IntoIterator<Item = LotId>,
    ) -> Result<(), EngineError> {
        for id in touched {
            if let Some(rec) = loaded.book.lot(id) {
                if loaded.existing.contains(&id) {
                    self.lots.update(rec.clone())?;
                } else {
                    self.lots.create(rec.clone())?;
                }
            }
        }
        Ok(())
    }

    fn log_warnings(&self, stock_id: StockId, warnings: &[WalletWarning]) {
        for w in warnings {
            warn!(stock = %stock_id, "{w}");
        }
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Record a buy: derive quantity and the strategy split, compute the
    /// commission-adjusted targets, and contribute to one or two lots.
    pub fn record_buy(
        &self,
        stock_id: StockId,
        buy: NewBuy,
    ) -> Result<Outcome<LedgerEvent>, EngineError> {
        let lock = self.locks.handle(stock_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut stock = self.stocks.get(stock_id)?;
        let derived = derive_buy(&stock, buy.price, buy.investment, buy.assignment)?;
        let mut warnings = derived.warnings.clone();

        let mut loaded = self.load_book(stock_id)?;
        let mut touched = Vec::new();
        if derived.swing_shares.is_positive() {
            let out = loaded.book.contribute(
                Strategy::Swing,
                buy.price,
                derived.swing_shares,
                derived.swing_investment,
                Some(derived.take_profit_target),
                buy.date,
            )?;
            warnings.extend(out.warnings);
            touched.push(out.value);
        }
        if derived.hold_shares.is_positive() {
            let out = loaded.book.contribute(
                Strategy::Hold,
                buy.price,
                derived.hold_shares,
                derived.hold_investment,
                Some(derived.hold_take_profit_target),
                buy.date,
            )?;
            warnings.extend(out.warnings);
            touched.push(out.value);
        }

        let event = LedgerEvent {
            id: EventId::generate(),
            stock_id,
            date: buy.date,
            kind: EventKind::Buy {
                price: buy.price,
                investment: buy.investment,
                assignment: buy.assignment,
                swing_shares: derived.swing_shares,
                hold_shares: derived.hold_shares,
                drop_buy_target: derived.drop_buy_target,
                take_profit_target: derived.take_profit_target,
            },
        };
        self.events.create(event.clone())?;
        self.persist_lots(&loaded, touched)?;

        stock.out_of_pocket += buy.investment;
        self.stocks.update(stock)?;

        debug!(stock = %stock_id, event = %event.id, "buy recorded");
        self.log_warnings(stock_id, &warnings);
        Ok(Outcome::with_warnings(event, warnings))
    }

    /// Record a sale against a specific lot.  The per-sale profit is
    /// computed here and stored on the event.
    pub fn record_sell(
        &self,
        stock_id: StockId,
        sell: NewSell,
    ) -> Result<Outcome<LedgerEvent>, EngineError> {
        let lock = self.locks.handle(stock_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut stock = self.stocks.get(stock_id)?;
        validate_sale_input(sell.price, sell.quantity)?;

        let mut loaded = self.load_book(stock_id)?;
        let out = loaded
            .book
            .apply_sale(sell.lot_id, sell.quantity, sell.price, stock.commission_pct)?;
        let sale = out.value;

        let event = LedgerEvent {
            id: EventId::generate(),
            stock_id,
            date: sell.date,
            kind: EventKind::Sell {
                price: sell.price,
                quantity: sell.quantity,
                lot_id: sell.lot_id,
                profit: Some(sale.profit),
                profit_pct: sale.profit_pct,
            },
        };
        self.events.create(event.clone())?;
        self.persist_lots(&loaded, [sell.lot_id])?;

        let proceeds = net_proceeds(&stock, sell.price, sell.quantity);
        stock.cash_balance += proceeds;
        self.stocks.update(stock)?;

        debug!(stock = %stock_id, event = %event.id, profit = %sale.profit, "sell recorded");
        self.log_warnings(stock_id, &out.warnings);
        Ok(Outcome::with_warnings(event, out.warnings))
    }

    /// Record dividend income.  No lot interaction.
    pub fn record_dividend(
        &self,
        stock_id: StockId,
        date: NaiveDate,
        amount: Money,
    ) -> Result<Outcome<LedgerEvent>, EngineError> {
        self.record_cash_income(stock_id, date, EventKind::Dividend { amount }, amount)
    }

    /// Record a stock-lending payment.  No lot interaction.
    pub fn record_lending_payment(
        &self,
        stock_id: StockId,
        date: NaiveDate,
        amount: Money,
    ) -> Result<Outcome<LedgerEvent>, EngineError> {
        self.record_cash_income(stock_id, date, EventKind::LendingPayment { amount }, amount)
    }

    fn record_cash_income(
        &self,
        stock_id: StockId,
        date: NaiveDate,
        kind: EventKind,
        amount: Money,
    ) -> Result<Outcome<LedgerEvent>, EngineError> {
        let lock = self.locks.handle(stock_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut stock = self.stocks.get(stock_id)?;
        if !amount.is_positive() {
            return Err(EngineError::invalid("amount", "must be positive"));
        }

        let event = LedgerEvent {
            id: EventId::generate(),
            stock_id,
            date,
            kind,
        };
        self.events.create(event.clone())?;

        stock.cash_balance += amount;
        self.stocks.update(stock)?;
        Ok(Outcome::clean(event))
    }

    /// Record a stock split and permanently adjust every open lot.
    ///
    /// The split event id rides along as the per-lot idempotency marker:
    /// processing the same event twice skips already-adjusted lots.
    pub fn record_split(
        &self,
        stock_id: StockId,
        date: NaiveDate,
        multiplier: Ratio,
    ) -> Result<Outcome<LedgerEvent>, EngineError> {
        let lock = self.locks.handle(stock_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        // existence check; split parameters live on the event only
        self.stocks.get(stock_id)?;
        if !multiplier.is_positive() {
            return Err(EngineError::invalid("multiplier", "must be positive"));
        }

        let event = LedgerEvent {
            id: EventId::generate(),
            stock_id,
            date,
            kind: EventKind::StockSplit { multiplier },
        };
        self.events.create(event.clone())?;

        let mut loaded = self.load_book(stock_id)?;
        let out = loaded.book.apply_stock_split(event.id, multiplier)?;
        self.persist_lots(&loaded, out.value.clone())?;

        info!(
            stock = %stock_id,
            multiplier = %multiplier,
            lots = out.value.len(),
            "stock split applied"
        );
        self.log_warnings(stock_id, &out.warnings);
        Ok(Outcome::with_warnings(event, out.warnings))
    }

    // -----------------------------------------------------------------------
    // Editing and deleting
    // -----------------------------------------------------------------------

    /// Delete a ledger event, unwinding its effect on the lot pool.
    ///
    /// Stock splits are immutable: deleting one would require unwinding
    /// every later event at the old scale; record a compensating split
    /// instead.
    pub fn delete_event(
        &self,
        event_id: EventId,
        policy: EditPolicy,
    ) -> Result<Outcome<()>, EngineError> {
        let event = self.events.get(event_id)?;
        let stock_id = event.stock_id;
        let lock = self.locks.handle(stock_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut stock = self.stocks.get(stock_id)?;
        let mut warnings = Vec::new();

        match &event.kind {
            EventKind::Sell {
                price,
                quantity,
                lot_id,
                ..
            } => {
                let mut loaded = self.load_book(stock_id)?;
                loaded
                    .book
                    .reverse_sale(*lot_id, *quantity, *price, stock.commission_pct)?;
                self.events.delete(event_id)?;
                self.persist_lots(&loaded, [*lot_id])?;
                let proceeds = net_proceeds(&stock, *price, *quantity);
                stock.cash_balance -= proceeds;
                self.stocks.update(stock)?;
            }
            EventKind::Buy {
                price,
                investment,
                swing_shares,
                hold_shares,
                ..
            } => {
                let mut loaded = self.load_book(stock_id)?;
                let unwound = self.unwind_buy(
                    &mut loaded.book,
                    &event,
                    *price,
                    *investment,
                    *swing_shares,
                    *hold_shares,
                );
                match unwound {
                    Ok(touched) => {
                        self.events.delete(event_id)?;
                        self.persist_lots(&loaded, touched)?;
                        stock.out_of_pocket -= *investment;
                        self.stocks.update(stock)?;
                    }
                    Err(EngineError::Wallet(w)) if policy == EditPolicy::AllowEventOnly => {
                        self.events.delete(event_id)?;
                        stock.out_of_pocket -= *investment;
                        self.stocks.update(stock)?;
                        warnings.push(WalletWarning::WalletNotUpdated {
                            reason: w.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            EventKind::Dividend { amount } | EventKind::LendingPayment { amount } => {
                self.events.delete(event_id)?;
                stock.cash_balance -= *amount;
                self.stocks.update(stock)?;
            }
            EventKind::StockSplit { .. } => {
                return Err(EngineError::UnsupportedEdit {
                    reason: "stock splits are immutable; record a compensating split instead"
                        .into(),
                });
            }
        }

        self.log_warnings(stock_id, &warnings);
        Ok(Outcome::with_warnings((), warnings))
    }

    /// Edit a ledger event in place, reconciling the lot pool.
    ///
    /// The event keeps its id and kind; changing the kind is not an edit.
    /// Buy edits on a committed lot follow `policy` — strict refusal, or
    /// event-only save with a `WalletNotUpdated` warning.
    pub fn update_event(
        &self,
        updated: LedgerEvent,
        policy: EditPolicy,
    ) -> Result<Outcome<LedgerEvent>, EngineError> {
        let old = self.events.get(updated.id)?;
        if old.stock_id != updated.stock_id {
            return Err(EngineError::UnsupportedEdit {
                reason: "events cannot move between stocks".into(),
            });
        }
        let stock_id = old.stock_id;
        let lock = self.locks.handle(stock_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut stock = self.stocks.get(stock_id)?;
        let mut warnings = Vec::new();

        let stored = match (&old.kind, &updated.kind) {
            (
                EventKind::Sell {
                    price: old_price,
                    quantity: old_qty,
                    lot_id: old_lot,
                    ..
                },
                EventKind::Sell {
                    price: new_price,
                    quantity: new_qty,
                    lot_id: new_lot,
                    ..
                },
            ) => {
                validate_sale_input(*new_price, *new_qty)?;
                let mut loaded = self.load_book(stock_id)?;
                loaded
                    .book
                    .reverse_sale(*old_lot, *old_qty, *old_price, stock.commission_pct)?;
                let out =
                    loaded
                        .book
                        .apply_sale(*new_lot, *new_qty, *new_price, stock.commission_pct)?;
                let sale = out.value;
                warnings.extend(out.warnings);

                let stored = LedgerEvent {
                    id: updated.id,
                    stock_id: updated.stock_id,
                    date: updated.date,
                    kind: EventKind::Sell {
                        price: *new_price,
                        quantity: *new_qty,
                        lot_id: *new_lot,
                        profit: Some(sale.profit),
                        profit_pct: sale.profit_pct,
                    },
                };
                self.events.update(stored.clone())?;
                self.persist_lots(&loaded, [*old_lot, *new_lot])?;

                let old_proceeds = net_proceeds(&stock, *old_price, *old_qty);
                let new_proceeds = net_proceeds(&stock, *new_price, *new_qty);
                stock.cash_balance -= old_proceeds;
                stock.cash_balance += new_proceeds;
                self.stocks.update(stock)?;
                stored
            }
            (
                EventKind::Buy {
                    price: old_price,
                    investment: old_investment,
                    swing_shares: old_swing,
                    hold_shares: old_hold,
                    ..
                },
                EventKind::Buy {
                    price: new_price,
                    investment: new_investment,
                    assignment: new_assignment,
                    ..
                },
            ) => {
                let derived = derive_buy(&stock, *new_price, *new_investment, *new_assignment)?;
                warnings.extend(derived.warnings.clone());

                let mut loaded = self.load_book(stock_id)?;
                let reconciled: Result<Vec<LotId>, EngineError> = (|| {
                    let mut touched = self.unwind_buy(
                        &mut loaded.book,
                        &old,
                        *old_price,
                        *old_investment,
                        *old_swing,
                        *old_hold,
                    )?;
                    if derived.swing_shares.is_positive() {
                        let out = loaded.book.contribute(
                            Strategy::Swing,
                            *new_price,
                            derived.swing_shares,
                            derived.swing_investment,
                            Some(derived.take_profit_target),
                            updated.date,
                        )?;
                        touched.push(out.value);
                    }
                    if derived.hold_shares.is_positive() {
                        let out = loaded.book.contribute(
                            Strategy::Hold,
                            *new_price,
                            derived.hold_shares,
                            derived.hold_investment,
                            Some(derived.hold_take_profit_target),
                            updated.date,
                        )?;
                        touched.push(out.value);
                    }
                    Ok(touched)
                })();

                let stored = LedgerEvent {
                    id: updated.id,
                    stock_id: updated.stock_id,
                    date: updated.date,
                    kind: EventKind::Buy {
                        price: *new_price,
                        investment: *new_investment,
                        assignment: *new_assignment,
                        swing_shares: derived.swing_shares,
                        hold_shares: derived.hold_shares,
                        drop_buy_target: derived.drop_buy_target,
                        take_profit_target: derived.take_profit_target,
                    },
                };

                match reconciled {
                    Ok(touched) => {
                        self.events.update(stored.clone())?;
                        self.persist_lots(&loaded, touched)?;
                    }
                    Err(EngineError::Wallet(w)) if policy == EditPolicy::AllowEventOnly => {
                        self.events.update(stored.clone())?;
                        warnings.push(WalletWarning::WalletNotUpdated {
                            reason: w.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }

                stock.out_of_pocket += *new_investment - *old_investment;
                self.stocks.update(stock)?;
                stored
            }
            (
                EventKind::Dividend { amount: old_amount },
                EventKind::Dividend { amount: new_amount },
            )
            | (
                EventKind::LendingPayment { amount: old_amount },
                EventKind::LendingPayment { amount: new_amount },
            ) => {
                if !new_amount.is_positive() {
                    return Err(EngineError::invalid("amount", "must be positive"));
                }
                let stored = updated.clone();
                self.events.update(stored.clone())?;
                stock.cash_balance += *new_amount - *old_amount;
                self.stocks.update(stock)?;
                stored
            }
            (EventKind::StockSplit { .. }, _) => {
                return Err(EngineError::UnsupportedEdit {
                    reason: "stock splits are immutable; record a compensating split instead"
                        .into(),
                });
            }
            _ => {
                return Err(EngineError::UnsupportedEdit {
                    reason: format!(
                        "cannot change a {} event into a {} event",
                        old.kind.kind_name(),
                        updated.kind.kind_name()
                    ),
                });
            }
        };

        self.log_warnings(stock_id, &warnings);
        Ok(Outcome::with_warnings(stored, warnings))
    }

    /// Explicitly remove a drained lot from book and store.
    pub fn remove_empty_lot(&self, stock_id: StockId, lot_id: LotId) -> Result<(), EngineError> {
        let lock = self.locks.handle(stock_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut loaded = self.load_book(stock_id)?;
        loaded.book.remove_empty(lot_id)?;
        self.lots.delete(lot_id)?;
        Ok(())
    }

    /// Subtract a buy event's contribution from its lots, at today's
    /// split-adjusted scale.
    ///
    /// The event stores pre-split price and shares; lots have since been
    /// adjusted permanently, so both are run through the split table
    /// before the negative contribution.
    fn unwind_buy(
        &self,
        book: &mut WalletBook,
        event: &LedgerEvent,
        price: Price,
        investment: Money,
        swing_shares: Shares,
        hold_shares: Shares,
    ) -> Result<Vec<LotId>, EngineError> {
        let all_events =
            read_all_events(self.events, event.stock_id, self.defaults.event_page_size)?;
        let table = SplitTable::from_events(&all_events);

        let (swing_investment, hold_investment) =
            split_investment(price, investment, swing_shares, hold_shares);

        let mut touched = Vec::new();
        for (strategy, shares, slice_investment) in [
            (Strategy::Swing, swing_shares, swing_investment),
            (Strategy::Hold, hold_shares, hold_investment),
        ] {
            if !shares.is_positive() {
                continue;
            }
            let (adj_price, adj_shares) =
                table.adjust(price, shares, event.date, NaiveDate::MAX);
            let out = book.contribute(
                strategy,
                adj_price,
                -adj_shares,
                -slice_investment,
                None,
                event.date,
            )?;
            touched.push(out.value);
        }
        Ok(touched)
    }
}

// ---------------------------------------------------------------------------
// Buy derivation
// ---------------------------------------------------------------------------

/// Everything derived from a buy's raw inputs: quantity, the strategy
/// split (with the residual-nudge rule), and the commission-adjusted
/// targets.
#[derive(Clone, Debug)]
pub(crate) struct BuyDerived {
    pub quantity: Shares,
    pub swing_shares: Shares,
    pub hold_shares: Shares,
    pub swing_investment: Money,
    pub hold_investment: Money,
    pub drop_buy_target: Price,
    pub take_profit_target: Price,
    pub hold_take_profit_target: Price,
    pub warnings: Vec<WalletWarning>,
}

pub(crate) fn derive_buy(
    stock: &Stock,
    price: Price,
    investment: Money,
    assignment: StrategyAssignment,
) -> Result<BuyDerived, EngineError> {
    let mut errors = Vec::new();
    if !price.is_positive() {
        errors.push(FieldError::new("price", "must be positive"));
    }
    if !investment.is_positive() {
        errors.push(FieldError::new("investment", "must be positive"));
    }
    if !errors.is_empty() {
        return Err(EngineError::Validation(errors));
    }

    let quantity = match investment.div_price(price) {
        Some(q) if q.is_positive() => q,
        _ => {
            return Err(EngineError::invalid(
                "investment",
                "too small to buy any shares at this price",
            ))
        }
    };

    let mut warnings = Vec::new();
    let (swing_shares, hold_shares) = match assignment {
        StrategyAssignment::Swing => (quantity, Shares::ZERO),
        StrategyAssignment::Hold => (Shares::ZERO, quantity),
        StrategyAssignment::SplitByRatio => {
            let ratio = stock.swing_ratio_pct;
            let swing = quantity.pct_of(ratio);
            // hold is defined as the exact complement so the pair always
            // sums to the full quantity; the independently rounded value
            // is only consulted to report the nudge
            let hold = quantity - swing;
            let hold_independent = quantity.pct_of(ratio.complement());
            let (swing_investment, _) = split_investment(price, investment, swing, hold);
            let money_independent = investment.pct_of(ratio);
            let share_residual = hold - hold_independent;
            let money_residual = swing_investment - money_independent;
            if !share_residual.is_zero() || !money_residual.is_zero() {
                warnings.push(WalletWarning::ResidualNudged {
                    share_residual,
                    money_residual,
                });
            }
            (swing, hold)
        }
    };
    let (swing_investment, hold_investment) =
        split_investment(price, investment, swing_shares, hold_shares);

    Ok(BuyDerived {
        quantity,
        swing_shares,
        hold_shares,
        swing_investment,
        hold_investment,
        drop_buy_target: drop_buy_target(price, stock.price_drop_pct, stock.commission_pct),
        take_profit_target: take_profit_target(
            price,
            stock.swing_take_profit_pct,
            stock.commission_pct,
        ),
        hold_take_profit_target: take_profit_target(
            price,
            stock.hold_take_profit_pct,
            stock.commission_pct,
        ),
        warnings,
    })
}

/// Deterministic money split for a share split: the swing slice is
/// `price * swing_shares` (capped by the total), hold takes the
/// remainder including the fractional-cent residue.  Shared by the
/// record and unwind paths so deletion is an exact inverse.
pub(crate) fn split_investment(
    price: Price,
    investment: Money,
    swing_shares: Shares,
    hold_shares: Shares,
) -> (Money, Money) {
    if hold_shares.is_zero() {
        (investment, Money::ZERO)
    } else if swing_shares.is_zero() {
        (Money::ZERO, investment)
    } else {
        let swing = price.times(swing_shares).min(investment);
        (swing, investment - swing)
    }
}

fn validate_sale_input(price: Price, quantity: Shares) -> Result<(), EngineError> {
    let mut errors = Vec::new();
    if !price.is_positive() {
        errors.push(FieldError::new("price", "must be positive"));
    }
    if !quantity.is_positive() {
        errors.push(FieldError::new("quantity", "must be positive"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(errors))
    }
}

/// Sale proceeds net of the sell-leg commission — what actually lands in
/// the cash balance.
fn net_proceeds(stock: &Stock, price: Price, quantity: Shares) -> Money {
    let gross = price.times(quantity);
    gross - gross.pct_of(stock.commission_pct)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
