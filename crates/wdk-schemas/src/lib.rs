//! wdk-schemas
//!
//! Shared record types for the wallet ledger: stocks, ledger events, and
//! cost-basis lots.  Everything here is plain serde-derived data — the
//! mutation rules live in `wdk-wallet`, derived views in `wdk-analytics`.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wdk_numeric::{Money, Percent, Price, Ratio, Shares};

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a tracked stock.
    StockId
);
id_newtype!(
    /// Identifier of a ledger event.
    EventId
);
id_newtype!(
    /// Identifier of a cost-basis lot.
    LotId
);

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// The two parallel sub-portfolios per stock.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Swing,
    Hold,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Swing => "swing",
            Strategy::Hold => "hold",
        }
    }
}

/// How a Buy event is assigned across strategies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyAssignment {
    /// Entire buy goes to the Swing sub-portfolio.
    Swing,
    /// Entire buy goes to the Hold sub-portfolio.
    Hold,
    /// Proportional split by the stock's swing ratio.
    SplitByRatio,
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

/// A tradable instrument plus its per-stock trading parameters.
///
/// Stocks are never physically deleted while lots or events reference
/// them; `archived` is the soft-delete flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    /// Unique key for price-feed lookup.
    pub symbol: String,
    /// Percent of each split buy allocated to Swing, in `[0, 100]`.
    pub swing_ratio_pct: Percent,
    /// Price-drop percent for the buy-the-dip target (PDP).
    pub price_drop_pct: Percent,
    /// Swing take-profit percent (STP).
    pub swing_take_profit_pct: Percent,
    /// Hold take-profit percent (HTP).
    pub hold_take_profit_pct: Percent,
    /// Commission percent applied on the sell leg and compensated in
    /// target pricing.
    pub commission_pct: Percent,
    /// Annual risk budget.
    pub risk_budget: Money,
    /// Cumulative out-of-pocket cash put into this stock.
    pub out_of_pocket: Money,
    /// Current cash balance attributed to this stock.
    pub cash_balance: Money,
    pub archived: bool,
}

// ---------------------------------------------------------------------------
// Ledger events
// ---------------------------------------------------------------------------

/// An immutable record of something that happened to a position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: EventId,
    pub stock_id: StockId,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Per-kind payload of a [`LedgerEvent`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Buy {
        price: Price,
        /// Total invested, including fractional-share remainder.
        investment: Money,
        assignment: StrategyAssignment,
        /// Derived at record time: shares allocated to Swing.
        swing_shares: Shares,
        /// Derived at record time: shares allocated to Hold.
        hold_shares: Shares,
        /// Commission-adjusted buy-the-dip target.
        drop_buy_target: Price,
        /// Commission-adjusted take-profit target for the swing slice.
        take_profit_target: Price,
    },
    Sell {
        price: Price,
        quantity: Shares,
        /// The lot this sale draws down.
        lot_id: LotId,
        /// Net per-sale profit as recorded at sale time.  Absent on
        /// imported history; consumers fall back to recomputation through
        /// the split adjuster.
        profit: Option<Money>,
        profit_pct: Option<f64>,
    },
    Dividend {
        amount: Money,
    },
    LendingPayment {
        amount: Money,
    },
    StockSplit {
        /// Split factor, strictly positive (`2` = 2-for-1).
        multiplier: Ratio,
    },
}

impl EventKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            EventKind::Buy { .. } => "buy",
            EventKind::Sell { .. } => "sell",
            EventKind::Dividend { .. } => "dividend",
            EventKind::LendingPayment { .. } => "lending_payment",
            EventKind::StockSplit { .. } => "stock_split",
        }
    }
}

// ---------------------------------------------------------------------------
// Lots
// ---------------------------------------------------------------------------

/// A cost-basis bucket: shares bought at one price under one strategy.
///
/// Identified by `(stock, strategy, buy_price)`; the fixed-point price is
/// an exact map key, so there is no tolerance matching anywhere.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LotRecord {
    pub id: LotId,
    pub stock_id: StockId,
    pub strategy: Strategy,
    pub buy_price: Price,
    /// Date of the first contribution; anchors split adjustment.
    pub opened: NaiveDate,
    /// Total shares ever bought into this lot.
    pub total_shares: Shares,
    /// Total investment ever allocated to this lot.
    pub total_investment: Money,
    pub shares_sold: Shares,
    /// Always `total_shares - shares_sold`; never negative.
    pub remaining_shares: Shares,
    pub realized_pl: Money,
    pub realized_pl_pct: Option<f64>,
    /// Commission-adjusted take-profit target for this lot, when set.
    pub tp_value: Option<Price>,
    pub sell_txn_count: u32,
    /// Split events already absorbed by this lot; a split event present
    /// here is skipped on re-application.
    pub applied_splits: BTreeSet<EventId>,
}

impl LotRecord {
    /// A lot with recorded sales is committed: its buy price and strategy
    /// are frozen, and only additive contributions are allowed.
    pub fn is_committed(&self) -> bool {
        self.shares_sold.is_positive() || self.sell_txn_count > 0
    }

    /// `true` while the lot still holds shares.
    pub fn is_open(&self) -> bool {
        self.remaining_shares.is_positive()
    }
}

// ---------------------------------------------------------------------------
// Field-level validation errors
// ---------------------------------------------------------------------------

/// One field-level validation failure, as returned by store writes and by
/// pre-mutation validation in the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
