//! wdk-wallet
//!
//! The lot pool: creation, lookup, and mutation of cost-basis lots
//! ("wallets") for a single stock.
//!
//! - One lot per `(strategy, buy price)`; the fixed-point price is an
//!   exact index key, so there is no tolerance matching.
//! - `remaining_shares` is derived (`total - sold`) and re-derived after
//!   every mutation; a state where it would go negative is rejected
//!   before anything is written.
//! - A lot with recorded sales is *committed*: price and strategy are
//!   frozen, shrinking it or relocating it is refused.
//! - Stock splits adjust lots permanently in place, once per split event
//!   (each lot remembers which split events it has absorbed).
//! - Pure deterministic logic — no IO, no time, no randomness beyond lot
//!   id generation.

mod book;
mod errors;
mod outcome;

pub use book::{SaleResult, WalletBook};
pub use errors::WalletError;
pub use outcome::{Outcome, WalletWarning};
