//! wdk-testkit
//!
//! Shared fixtures for the scenario tests under `tests/` and for the CLI
//! replay path: canonical stock parameters, date helpers, and a fully
//! wired engine harness over the in-memory store and feed.

use chrono::NaiveDate;

use wdk_config::EngineDefaults;
use wdk_engine::Engine;
use wdk_numeric::{Money, Percent, Price};
use wdk_schemas::{Stock, StockId};
use wdk_store::{FixedFeed, MemoryStore, StockStore};

/// Shorthand date constructor for fixtures.
///
/// # Panics
/// On an invalid calendar date.
pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("valid fixture date")
}

/// A stock with the canonical test parameters: 50/50 strategy split,
/// PDP 5%, STP 10%, HTP 10%, no commission, $10,000 risk budget.
pub fn stock_fixture(symbol: &str) -> Stock {
    Stock {
        id: StockId::generate(),
        symbol: symbol.to_string(),
        swing_ratio_pct: Percent::from_units(50),
        price_drop_pct: Percent::from_units(5),
        swing_take_profit_pct: Percent::from_units(10),
        hold_take_profit_pct: Percent::from_units(10),
        commission_pct: Percent::ZERO,
        risk_budget: Money::from_units(10_000),
        out_of_pocket: Money::ZERO,
        cash_balance: Money::ZERO,
        archived: false,
    }
}

/// The in-memory collaborators an [`Engine`] borrows.
#[derive(Default)]
pub struct Harness {
    pub store: MemoryStore,
    pub feed: FixedFeed,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire an engine over this harness with sane defaults.
    pub fn engine(&self) -> Engine<'_> {
        Engine::new(
            &self.store,
            &self.store,
            &self.store,
            &self.feed,
            EngineDefaults::sane_defaults(),
        )
    }

    /// Create and return a stock with the canonical fixture parameters.
    ///
    /// # Panics
    /// On store rejection.
    pub fn add_stock(&self, symbol: &str) -> Stock {
        let stock = stock_fixture(symbol);
        self.store
            .create(stock.clone())
            .expect("fixture stock accepted");
        stock
    }

    /// Post a current price for a symbol.
    pub fn set_price(&self, symbol: &str, price: f64) {
        self.feed.set_current(
            symbol,
            Price::from_f64(price).expect("finite fixture price"),
        );
    }
}
