//! wdk-numeric
//!
//! Fixed-point numeric core for the wallet ledger.
//!
//! # Motivation
//!
//! Every quantity the ledger stores or compares is a fixed-point `i64`
//! newtype: share counts at 1e-5, currency at 1e-2 (cents), per-share
//! prices at 1e-4, percent/ratio parameters at 1e-4.  Using raw `i64` (or
//! worse, `f64`) for these is error-prone: it allows accidental arithmetic
//! between values at different scales without any compile-time signal, and
//! floating accumulation forces epsilon-tolerant comparisons everywhere.
//!
//! With exact integer representation, "within tolerance" degenerates to
//! `==`: two lots match on buy price iff their raw values are equal, and
//! `remaining == total - sold` holds bit-for-bit after every mutation.
//!
//! # Scales
//!
//! | type      | scale | one unit        |
//! |-----------|-------|-----------------|
//! | [`Shares`]  | 1e5 | `Shares(100_000)` = 1 share |
//! | [`Money`]   | 1e2 | `Money(100)` = $1.00        |
//! | [`Price`]   | 1e4 | `Price(10_000)` = $1.0000   |
//! | [`Percent`] | 1e4 | `Percent(10_000)` = 1%      |
//! | [`Ratio`]   | 1e4 | `Ratio(10_000)` = ×1        |
//!
//! `Price` carries four decimals so that a sale executed exactly at a
//! commission-adjusted take-profit target reconciles to the cent.
//!
//! # Arithmetic
//!
//! Cross-scale products and quotients go through `i128` intermediates,
//! round half away from zero back to the result scale, and clamp to the
//! `i64` range on overflow.  Conversions from `f64` happen only at the
//! boundary (user input, config, wire) and are the single lossy step.

#[macro_use]
mod macros;

mod arith;
mod money;
mod price;
mod rate;
mod shares;

pub use money::Money;
pub use price::Price;
pub use rate::{Percent, Ratio};
pub use shares::Shares;

/// Shares per whole share: 1e-5 resolution (5 decimals).
pub const SHARE_SCALE: i64 = 100_000;

/// Money units per currency unit: cents (2 decimals).
pub const MONEY_SCALE: i64 = 100;

/// Price units per currency unit: 1e-4 resolution (4 decimals).
pub const PRICE_SCALE: i64 = 10_000;

/// Rate units per percent point / per unit ratio (4 decimals).
pub const RATE_SCALE: i64 = 10_000;
