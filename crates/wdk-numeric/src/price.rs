use crate::arith::mul_div_round;
use crate::money::Money;
use crate::rate::{Percent, Ratio};
use crate::shares::Shares;
use crate::{MONEY_SCALE, PRICE_SCALE, RATE_SCALE, SHARE_SCALE};

fixed_newtype!(
    /// A per-share price at 1e-4 resolution (4 decimals).
    ///
    /// The extra two decimals over [`Money`] exist for commission-adjusted
    /// target prices: rounding a target to whole cents makes a sale that
    /// executes exactly at the target miss the nominal profit by a cent.
    /// Differences of prices are signed and may legitimately be negative.
    Price,
    scale = PRICE_SCALE,
    decimals = 4
);

impl Price {
    /// `self * qty`, rounded to the cent.
    pub fn times(self, qty: Shares) -> Money {
        Money::new(mul_div_round(
            self.raw(),
            qty.raw(),
            PRICE_SCALE * SHARE_SCALE / MONEY_SCALE,
        ))
    }

    /// `self * (1 - pct/100)` — e.g. a nominal drop-buy target.
    pub fn scale_down_pct(self, pct: Percent) -> Price {
        Price::new(mul_div_round(
            self.raw(),
            Percent::HUNDRED_RAW - pct.raw(),
            Percent::HUNDRED_RAW,
        ))
    }

    /// `self * (1 + pct/100)` — e.g. a nominal take-profit target.
    pub fn scale_up_pct(self, pct: Percent) -> Price {
        Price::new(mul_div_round(
            self.raw(),
            Percent::HUNDRED_RAW + pct.raw(),
            Percent::HUNDRED_RAW,
        ))
    }

    /// `self / (1 + pct/100)` — buy-side commission compensation.
    pub fn div_one_plus_pct(self, pct: Percent) -> Price {
        Price::new(mul_div_round(
            self.raw(),
            Percent::HUNDRED_RAW,
            Percent::HUNDRED_RAW + pct.raw(),
        ))
    }

    /// `self / (1 - pct/100)` — sell-side commission compensation.
    ///
    /// Callers must guard `pct < 100`; at or above that the divisor is
    /// non-positive and the operation is meaningless.
    pub fn div_one_minus_pct(self, pct: Percent) -> Price {
        debug_assert!(
            pct.raw() < Percent::HUNDRED_RAW,
            "div_one_minus_pct requires pct < 100, got {pct}"
        );
        Price::new(mul_div_round(
            self.raw(),
            Percent::HUNDRED_RAW,
            Percent::HUNDRED_RAW - pct.raw(),
        ))
    }

    /// `self / ratio` — permanent split adjustment of a per-share value.
    pub fn div_ratio(self, ratio: Ratio) -> Price {
        debug_assert!(ratio.is_positive(), "split ratio must be > 0, got {ratio}");
        Price::new(mul_div_round(self.raw(), RATE_SCALE, ratio.raw()))
    }

    /// `self * ratio` — the inverse adjustment, used when re-deriving a
    /// historical pre-split price from the current adjusted value.
    pub fn mul_ratio(self, ratio: Ratio) -> Price {
        Price::new(mul_div_round(self.raw(), ratio.raw(), RATE_SCALE))
    }
}
