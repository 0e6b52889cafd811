use crate::arith::mul_div_round;
use crate::rate::{Percent, Ratio};
use crate::{RATE_SCALE, SHARE_SCALE};

fixed_newtype!(
    /// A share quantity at 1e-5 resolution (5 decimals).
    ///
    /// `Shares(100_000)` is exactly one share.  Fractional share counts
    /// arise from quantity derivation (`investment / price`) and from
    /// stock-split scaling; both round half away from zero at this
    /// resolution, so a magnitude below 0.5e-5 is exactly zero.
    Shares,
    scale = SHARE_SCALE,
    decimals = 5
);

impl Shares {
    /// Proportional slice: `self * pct / 100`, rounded at share resolution.
    pub fn pct_of(self, pct: Percent) -> Shares {
        Shares::new(mul_div_round(self.raw(), pct.raw(), Percent::HUNDRED_RAW))
    }

    /// Scale by a split multiplier: `self * ratio`.
    pub fn mul_ratio(self, ratio: Ratio) -> Shares {
        Shares::new(mul_div_round(self.raw(), ratio.raw(), RATE_SCALE))
    }
}
