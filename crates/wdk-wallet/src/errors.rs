use wdk_numeric::{Price, Ratio, Shares};
use wdk_schemas::{LotId, Strategy};

/// All invariant violations the lot pool can surface.
///
/// The book is **not** mutated when any of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Buy/sell price must be strictly positive.
    NonPositivePrice { price: Price },
    /// Sale or contribution quantity must be non-zero (and positive where
    /// the operation is not an explicit negative delta).
    NonPositiveQuantity { qty: Shares },
    /// Split multiplier must be strictly positive.
    NonPositiveMultiplier { multiplier: Ratio },
    /// The referenced lot does not exist in this book.
    UnknownLot { lot: LotId },
    /// A negative delta was aimed at `(strategy, price)` but no lot is
    /// there to subtract from.
    NoMatchingLot { strategy: Strategy, price: Price },
    /// Sale (or reversal) quantity exceeds what the lot can give back.
    OverdrawnLot {
        lot: LotId,
        requested: Shares,
        available: Shares,
    },
    /// The lot has recorded sales; its buy price and strategy are frozen.
    /// Manual reconciliation: reverse the recorded sales first, or record
    /// the change as a fresh buy at the new price.
    CommittedLotConflict { lot: LotId },
    /// A negative delta would drive the lot's totals below zero.
    NegativeBalance {
        lot: LotId,
        total_shares: Shares,
        shares_sold: Shares,
    },
    /// Explicit removal requested for a lot that still holds shares.
    LotNotEmpty { lot: LotId, remaining: Shares },
}

impl std::fmt::Display for WalletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositivePrice { price } => {
                write!(f, "wallet invariant: price must be > 0, got {price}")
            }
            Self::NonPositiveQuantity { qty } => {
                write!(f, "wallet invariant: quantity must be > 0, got {qty}")
            }
            Self::NonPositiveMultiplier { multiplier } => {
                write!(
                    f,
                    "wallet invariant: split multiplier must be > 0, got {multiplier}"
                )
            }
            Self::UnknownLot { lot } => write!(f, "unknown lot {lot}"),
            Self::NoMatchingLot { strategy, price } => write!(
                f,
                "no {} lot at {price} to subtract from",
                strategy.as_str()
            ),
            Self::OverdrawnLot {
                lot,
                requested,
                available,
            } => write!(
                f,
                "lot {lot} overdrawn: requested {requested} shares, {available} available"
            ),
            Self::CommittedLotConflict { lot } => write!(
                f,
                "lot {lot} has recorded sales; buy price and strategy are frozen — \
                 reverse its sales first or record the change as a new buy"
            ),
            Self::NegativeBalance {
                lot,
                total_shares,
                shares_sold,
            } => write!(
                f,
                "lot {lot}: delta would drive totals negative \
                 (total {total_shares}, sold {shares_sold})"
            ),
            Self::LotNotEmpty { lot, remaining } => {
                write!(f, "lot {lot} still holds {remaining} shares; not removable")
            }
        }
    }
}

impl std::error::Error for WalletError {}
