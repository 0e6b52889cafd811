//! wdk-store
//!
//! Contracts between the engine and its collaborators: the persistent
//! store (stocks, ledger events, lots) and the price feed.
//!
//! The engine takes these as injected `&dyn` references — no process-wide
//! store handle anywhere.  Write operations either succeed or return a
//! [`StoreError`]; the engine treats any error as fatal to the triggering
//! operation and keeps no partial in-memory state.  Retry policy belongs
//! to the caller, never to the engine.
//!
//! [`MemoryStore`] and [`FixedFeed`] are the deterministic in-memory
//! implementations used by tests and the CLI replay path.

mod memory;

pub use memory::{FixedFeed, MemoryStore};

use chrono::NaiveDate;

use wdk_numeric::Price;
use wdk_schemas::{EventId, FieldError, LedgerEvent, LotId, LotRecord, Stock, StockId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record was rejected; one entry per offending field.
    Validation(Vec<FieldError>),
    /// The referenced record does not exist.
    NotFound { entity: &'static str, id: String },
    /// The operation conflicts with stored state (e.g. deleting a lot
    /// that still holds shares).
    Conflict { message: String },
    /// The backing store is unreachable or failed mid-operation.
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(errors) => {
                write!(f, "validation failed:")?;
                for e in errors {
                    write!(f, " [{e}]")?;
                }
                Ok(())
            }
            Self::NotFound { entity, id } => write!(f, "{entity} {id} not found"),
            Self::Conflict { message } => write!(f, "conflict: {message}"),
            Self::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// A window into an event list.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// One page of results plus the total count across all pages.
#[derive(Clone, Debug, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

pub trait StockStore {
    fn get(&self, id: StockId) -> Result<Stock, StoreError>;
    fn list(&self) -> Result<Vec<Stock>, StoreError>;
    fn create(&self, stock: Stock) -> Result<(), StoreError>;
    fn update(&self, stock: Stock) -> Result<(), StoreError>;
    /// Soft-archive; stocks referenced by lots or events are never
    /// physically deleted.
    fn archive(&self, id: StockId) -> Result<(), StoreError>;
}

pub trait EventStore {
    fn get(&self, id: EventId) -> Result<LedgerEvent, StoreError>;
    /// One page of a stock's events in chronological order.  Callers
    /// needing the full list should go through [`read_all_events`] —
    /// aggregating over a partial list produces wrong totals.
    fn list_page(&self, stock_id: StockId, page: Page) -> Result<PageResult<LedgerEvent>, StoreError>;
    fn create(&self, event: LedgerEvent) -> Result<(), StoreError>;
    fn update(&self, event: LedgerEvent) -> Result<(), StoreError>;
    fn delete(&self, id: EventId) -> Result<(), StoreError>;
}

pub trait LotStore {
    fn list(&self, stock_id: StockId) -> Result<Vec<LotRecord>, StoreError>;
    fn create(&self, lot: LotRecord) -> Result<(), StoreError>;
    fn update(&self, lot: LotRecord) -> Result<(), StoreError>;
    /// Only drained lots may be deleted.
    fn delete(&self, id: LotId) -> Result<(), StoreError>;
}

/// Assemble a stock's complete chronological event list, walking pages
/// until exhaustion.
pub fn read_all_events(
    events: &dyn EventStore,
    stock_id: StockId,
    page_size: usize,
) -> Result<Vec<LedgerEvent>, StoreError> {
    let mut out = Vec::new();
    let mut page = Page::first(page_size.max(1));
    loop {
        let result = events.list_page(stock_id, page)?;
        let fetched = result.items.len();
        out.extend(result.items);
        if out.len() >= result.total || fetched == 0 {
            break;
        }
        page = page.next();
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Price feed
// ---------------------------------------------------------------------------

/// One historical daily close.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: Price,
}

/// A feed answer for one symbol.  `current` may be absent (stale or
/// loading feed); consumers must propagate that as "unavailable", never
/// coerce it to zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Quote {
    pub current: Option<Price>,
    pub closes: Vec<DailyClose>,
}

pub trait PriceFeed {
    /// `None` when the feed knows nothing about the symbol at all.
    fn quote(&self, symbol: &str) -> Option<Quote>;

    /// Convenience: the current price if the feed has one.
    fn current_price(&self, symbol: &str) -> Option<Price> {
        self.quote(symbol).and_then(|q| q.current)
    }
}
