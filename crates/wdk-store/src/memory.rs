//! Deterministic in-memory store and feed, used by tests and the CLI
//! replay path.  Thread-safe behind plain mutexes; every record is
//! visible all-or-nothing, matching the per-record atomicity the engine
//! assumes of a real store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use wdk_numeric::Price;
use wdk_schemas::{
    EventId, EventKind, FieldError, LedgerEvent, LotId, LotRecord, Stock, StockId,
};

use crate::{
    EventStore, LotStore, Page, PageResult, PriceFeed, Quote, StockStore, StoreError,
};

#[derive(Default)]
struct Inner {
    stocks: BTreeMap<StockId, Stock>,
    events: Vec<LedgerEvent>,
    lots: BTreeMap<LotId, LotRecord>,
}

/// In-memory implementation of all three store traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_stock(stock: &Stock) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if stock.symbol.trim().is_empty() {
        errors.push(FieldError::new("symbol", "must not be empty"));
    }
    if !stock.swing_ratio_pct.is_valid_ratio() {
        errors.push(FieldError::new("swing_ratio_pct", "must be within 0..=100"));
    }
    if stock.price_drop_pct.is_negative() {
        errors.push(FieldError::new("price_drop_pct", "must not be negative"));
    }
    if stock.swing_take_profit_pct.is_negative() {
        errors.push(FieldError::new("swing_take_profit_pct", "must not be negative"));
    }
    if stock.hold_take_profit_pct.is_negative() {
        errors.push(FieldError::new("hold_take_profit_pct", "must not be negative"));
    }
    if stock.commission_pct.is_negative() {
        errors.push(FieldError::new("commission_pct", "must not be negative"));
    }
    if stock.risk_budget.is_negative() {
        errors.push(FieldError::new("risk_budget", "must not be negative"));
    }
    errors
}

fn validate_event(event: &LedgerEvent) -> Vec<FieldError> {
    let mut errors = Vec::new();
    match &event.kind {
        EventKind::Buy {
            price, investment, ..
        } => {
            if !price.is_positive() {
                errors.push(FieldError::new("price", "must be positive"));
            }
            if !investment.is_positive() {
                errors.push(FieldError::new("investment", "must be positive"));
            }
        }
        EventKind::Sell {
            price, quantity, ..
        } => {
            if !price.is_positive() {
                errors.push(FieldError::new("price", "must be positive"));
            }
            if !quantity.is_positive() {
                errors.push(FieldError::new("quantity", "must be positive"));
            }
        }
        EventKind::Dividend { amount } | EventKind::LendingPayment { amount } => {
            if !amount.is_positive() {
                errors.push(FieldError::new("amount", "must be positive"));
            }
        }
        EventKind::StockSplit { multiplier } => {
            if !multiplier.is_positive() {
                errors.push(FieldError::new("multiplier", "must be positive"));
            }
        }
    }
    errors
}

fn reject_if_invalid(errors: Vec<FieldError>) -> Result<(), StoreError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(errors))
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl StockStore for MemoryStore {
    fn get(&self, id: StockId) -> Result<Stock, StoreError> {
        self.with_inner(|inner| {
            inner
                .stocks
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("stock", id))
        })
    }

    fn list(&self) -> Result<Vec<Stock>, StoreError> {
        self.with_inner(|inner| Ok(inner.stocks.values().cloned().collect()))
    }

    fn create(&self, stock: Stock) -> Result<(), StoreError> {
        reject_if_invalid(validate_stock(&stock))?;
        self.with_inner(|inner| {
            if inner.stocks.contains_key(&stock.id) {
                return Err(StoreError::Conflict {
                    message: format!("stock {} already exists", stock.id),
                });
            }
            inner.stocks.insert(stock.id, stock);
            Ok(())
        })
    }

    fn update(&self, stock: Stock) -> Result<(), StoreError> {
        reject_if_invalid(validate_stock(&stock))?;
        self.with_inner(|inner| {
            if !inner.stocks.contains_key(&stock.id) {
                return Err(StoreError::not_found("stock", stock.id));
            }
            inner.stocks.insert(stock.id, stock);
            Ok(())
        })
    }

    fn archive(&self, id: StockId) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            let stock = inner
                .stocks
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found("stock", id))?;
            stock.archived = true;
            Ok(())
        })
    }
}

impl EventStore for MemoryStore {
    fn get(&self, id: EventId) -> Result<LedgerEvent, StoreError> {
        self.with_inner(|inner| {
            inner
                .events
                .iter()
                .find(|ev| ev.id == id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("event", id))
        })
    }

    fn list_page(
        &self,
        stock_id: StockId,
        page: Page,
    ) -> Result<PageResult<LedgerEvent>, StoreError> {
        self.with_inner(|inner| {
            let mut all: Vec<LedgerEvent> = inner
                .events
                .iter()
                .filter(|ev| ev.stock_id == stock_id)
                .cloned()
                .collect();
            // chronological; insertion order breaks date ties
            all.sort_by_key(|ev| ev.date);
            let total = all.len();
            let items = all
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect();
            Ok(PageResult { items, total })
        })
    }

    fn create(&self, event: LedgerEvent) -> Result<(), StoreError> {
        reject_if_invalid(validate_event(&event))?;
        self.with_inner(|inner| {
            if inner.events.iter().any(|ev| ev.id == event.id) {
                return Err(StoreError::Conflict {
                    message: format!("event {} already exists", event.id),
                });
            }
            inner.events.push(event);
            Ok(())
        })
    }

    fn update(&self, event: LedgerEvent) -> Result<(), StoreError> {
        reject_if_invalid(validate_event(&event))?;
        self.with_inner(|inner| {
            match inner.events.iter_mut().find(|ev| ev.id == event.id) {
                Some(slot) => {
                    *slot = event;
                    Ok(())
                }
                None => Err(StoreError::not_found("event", event.id)),
            }
        })
    }

    fn delete(&self, id: EventId) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            let before = inner.events.len();
            inner.events.retain(|ev| ev.id != id);
            if inner.events.len() == before {
                return Err(StoreError::not_found("event", id));
            }
            Ok(())
        })
    }
}

impl LotStore for MemoryStore {
    fn list(&self, stock_id: StockId) -> Result<Vec<LotRecord>, StoreError> {
        self.with_inner(|inner| {
            Ok(inner
                .lots
                .values()
                .filter(|lot| lot.stock_id == stock_id)
                .cloned()
                .collect())
        })
    }

    fn create(&self, lot: LotRecord) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            if inner.lots.contains_key(&lot.id) {
                return Err(StoreError::Conflict {
                    message: format!("lot {} already exists", lot.id),
                });
            }
            inner.lots.insert(lot.id, lot);
            Ok(())
        })
    }

    fn update(&self, lot: LotRecord) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            if !inner.lots.contains_key(&lot.id) {
                return Err(StoreError::not_found("lot", lot.id));
            }
            inner.lots.insert(lot.id, lot);
            Ok(())
        })
    }

    fn delete(&self, id: LotId) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            let lot = inner
                .lots
                .get(&id)
                .ok_or_else(|| StoreError::not_found("lot", id))?;
            if !lot.remaining_shares.is_zero() {
                return Err(StoreError::Conflict {
                    message: format!(
                        "lot {id} still holds {} shares",
                        lot.remaining_shares
                    ),
                });
            }
            inner.lots.remove(&id);
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Fixed feed
// ---------------------------------------------------------------------------

/// A scriptable price feed: tests and replays set exactly the quotes
/// they want, including "symbol known but current price missing".
#[derive(Default)]
pub struct FixedFeed {
    quotes: Mutex<BTreeMap<String, Quote>>,
}

impl FixedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current(&self, symbol: &str, price: Price) {
        let mut quotes = self.quotes.lock().unwrap_or_else(|e| e.into_inner());
        quotes.entry(symbol.to_string()).or_default().current = Some(price);
    }

    pub fn set_quote(&self, symbol: &str, quote: Quote) {
        let mut quotes = self.quotes.lock().unwrap_or_else(|e| e.into_inner());
        quotes.insert(symbol.to_string(), quote);
    }

    /// Keep the symbol known but drop its current price (stale feed).
    pub fn clear_current(&self, symbol: &str) {
        let mut quotes = self.quotes.lock().unwrap_or_else(|e| e.into_inner());
        quotes.entry(symbol.to_string()).or_default().current = None;
    }
}

impl PriceFeed for FixedFeed {
    fn quote(&self, symbol: &str) -> Option<Quote> {
        let quotes = self.quotes.lock().unwrap_or_else(|e| e.into_inner());
        quotes.get(symbol).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_all_events;
    use chrono::NaiveDate;
    use wdk_numeric::{Money, Percent};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn stock() -> Stock {
        Stock {
            id: StockId::generate(),
            symbol: "ACME".into(),
            swing_ratio_pct: Percent::from_units(50),
            price_drop_pct: Percent::from_units(5),
            swing_take_profit_pct: Percent::from_units(10),
            hold_take_profit_pct: Percent::from_units(20),
            commission_pct: Percent::ZERO,
            risk_budget: Money::from_units(10_000),
            out_of_pocket: Money::ZERO,
            cash_balance: Money::ZERO,
            archived: false,
        }
    }

    fn dividend(stock_id: StockId, date: NaiveDate) -> LedgerEvent {
        LedgerEvent {
            id: EventId::generate(),
            stock_id,
            date,
            kind: EventKind::Dividend {
                amount: Money::from_units(1),
            },
        }
    }

    #[test]
    fn stock_create_validates_fields() {
        let store = MemoryStore::new();
        let mut s = stock();
        s.symbol = "  ".into();
        s.swing_ratio_pct = Percent::from_units(120);
        let err = StockStore::create(&store, s).unwrap_err();
        match err {
            StoreError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "symbol");
                assert_eq!(errors[1].field, "swing_ratio_pct");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn stock_archive_is_soft() {
        let store = MemoryStore::new();
        let s = stock();
        let id = s.id;
        StockStore::create(&store, s).unwrap();
        StockStore::archive(&store, id).unwrap();
        assert!(StockStore::get(&store, id).unwrap().archived);
    }

    #[test]
    fn event_pages_assemble_in_date_order() {
        let store = MemoryStore::new();
        let stock_id = StockId::generate();
        // insert out of order across several pages
        for day in [5u32, 1, 9, 3, 7, 2, 8, 4, 6] {
            EventStore::create(&store, dividend(stock_id, d(2024, 1, day))).unwrap();
        }
        let all = read_all_events(&store, stock_id, 4).unwrap();
        assert_eq!(all.len(), 9);
        let days: Vec<u32> = all
            .iter()
            .map(|ev| {
                use chrono::Datelike;
                ev.date.day()
            })
            .collect();
        assert_eq!(days, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn event_validation_rejects_bad_split() {
        let store = MemoryStore::new();
        let ev = LedgerEvent {
            id: EventId::generate(),
            stock_id: StockId::generate(),
            date: d(2024, 1, 1),
            kind: EventKind::StockSplit {
                multiplier: wdk_numeric::Ratio::ZERO,
            },
        };
        assert!(matches!(
            EventStore::create(&store, ev),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn lot_delete_requires_empty() {
        use std::collections::BTreeSet;
        use wdk_numeric::Shares;
        use wdk_schemas::Strategy;

        let store = MemoryStore::new();
        let lot = LotRecord {
            id: LotId::generate(),
            stock_id: StockId::generate(),
            strategy: Strategy::Swing,
            buy_price: Price::from_units(100),
            opened: d(2024, 1, 2),
            total_shares: Shares::from_units(10),
            total_investment: Money::from_units(1000),
            shares_sold: Shares::ZERO,
            remaining_shares: Shares::from_units(10),
            realized_pl: Money::ZERO,
            realized_pl_pct: None,
            tp_value: None,
            sell_txn_count: 0,
            applied_splits: BTreeSet::new(),
        };
        let id = lot.id;
        LotStore::create(&store, lot.clone()).unwrap();
        assert!(matches!(
            LotStore::delete(&store, id),
            Err(StoreError::Conflict { .. })
        ));

        let drained = LotRecord {
            shares_sold: Shares::from_units(10),
            remaining_shares: Shares::ZERO,
            sell_txn_count: 1,
            ..lot
        };
        LotStore::update(&store, drained).unwrap();
        LotStore::delete(&store, id).unwrap();
        assert!(LotStore::list(&store, StockId::generate()).unwrap().is_empty());
    }

    #[test]
    fn fixed_feed_distinguishes_missing_price_from_missing_symbol() {
        let feed = FixedFeed::new();
        assert!(feed.quote("GHOST").is_none());

        feed.clear_current("ACME");
        let quote = feed.quote("ACME").unwrap();
        assert_eq!(quote.current, None);

        feed.set_current("ACME", Price::from_units(42));
        assert_eq!(feed.current_price("ACME"), Some(Price::from_units(42)));
    }
}
