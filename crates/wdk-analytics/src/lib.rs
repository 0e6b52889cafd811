//! wdk-analytics
//!
//! Read-only derived views over the stock/event/lot sets: realized and
//! unrealized P/L per strategy, tied-up and at-risk capital, budget
//! consumption, and the transient split adjustment used when recomputing
//! historical per-sale profit across a split boundary.
//!
//! Everything here is a pure function of its inputs.  The current price
//! is an injected, possibly-absent value: absence propagates as
//! [`Valuation::Unavailable`], never as a silent zero.

mod budget;
mod pl;
mod splits;

pub use budget::{budget_available, budget_used, market_value, risk_investment, roic, tied_up_investment};
pub use pl::{
    combined_pl, income_for_stock, realized_for_stock, unrealized_for_stock, CombinedPl,
    Inconsistency, PerStrategy, RealizedPl, UnrealizedPl,
};
pub use splits::SplitTable;

/// A derived value that may be unavailable because the price feed has no
/// current quote.  Distinct from zero by construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Valuation<T> {
    Available(T),
    Unavailable,
}

impl<T> Valuation<T> {
    pub fn available(self) -> Option<T> {
        match self {
            Valuation::Available(v) => Some(v),
            Valuation::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Valuation::Available(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Valuation<U> {
        match self {
            Valuation::Available(v) => Valuation::Available(f(v)),
            Valuation::Unavailable => Valuation::Unavailable,
        }
    }

    pub fn as_ref(&self) -> Valuation<&T> {
        match self {
            Valuation::Available(v) => Valuation::Available(v),
            Valuation::Unavailable => Valuation::Unavailable,
        }
    }
}

impl<T> From<Option<T>> for Valuation<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Valuation::Available(v),
            None => Valuation::Unavailable,
        }
    }
}
