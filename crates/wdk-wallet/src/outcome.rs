use wdk_numeric::{Money, Shares};
use wdk_schemas::{EventId, LotId};

/// A successful result plus zero or more non-fatal diagnostics.
///
/// Warnings never abort an operation; they record the places where the
/// engine corrected or skipped something and the caller should know.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<WalletWarning>,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<WalletWarning>) -> Self {
        Self { value, warnings }
    }

    /// Map the payload, keeping the warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Typed non-fatal diagnostics, accumulated alongside results.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletWarning {
    /// Proportional-split rounding left a residual; the hold slice was
    /// nudged so the pair sums exactly.
    ResidualNudged {
        share_residual: Shares,
        money_residual: Money,
    },
    /// The split event was already applied to this lot and was skipped.
    AlreadyApplied { lot: LotId, split: EventId },
    /// The ledger event was saved but the lot pool was deliberately left
    /// untouched (committed-lot soft-fail).
    WalletNotUpdated { reason: String },
}

impl std::fmt::Display for WalletWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResidualNudged {
                share_residual,
                money_residual,
            } => write!(
                f,
                "split rounding residual corrected: {share_residual} shares, {money_residual}"
            ),
            Self::AlreadyApplied { lot, split } => {
                write!(f, "split {split} already applied to lot {lot}; skipped")
            }
            Self::WalletNotUpdated { reason } => {
                write!(f, "event saved but wallet not updated: {reason}")
            }
        }
    }
}
