use crate::arith::mul_div_round;
use crate::price::Price;
use crate::rate::Percent;
use crate::shares::Shares;
use crate::{MONEY_SCALE, PRICE_SCALE, SHARE_SCALE};

/// `(PRICE_SCALE * SHARE_SCALE) / MONEY_SCALE` — the combined rescale
/// factor between a price×quantity product and cents.
const PRICE_QTY_TO_MONEY: i64 = PRICE_SCALE * SHARE_SCALE / MONEY_SCALE;

fixed_newtype!(
    /// A currency amount in cents (2 decimals).
    ///
    /// Investments, proceeds, profit/loss, budgets, and cash balances are
    /// all `Money`.  Signed: realized losses and negative deltas are valid
    /// values; whether a negative amount is *acceptable* is the caller's
    /// invariant, not this type's.
    Money,
    scale = MONEY_SCALE,
    decimals = 2
);

impl Money {
    /// Derive a share quantity: `self / price`.
    ///
    /// `None` when `price` is zero or negative — quantity derivation from
    /// a non-positive price has no meaning.
    pub fn div_price(self, price: Price) -> Option<Shares> {
        if !price.is_positive() {
            return None;
        }
        Some(Shares::new(mul_div_round(
            self.raw(),
            PRICE_QTY_TO_MONEY,
            price.raw(),
        )))
    }

    /// Average per-share cost: `self / qty`, rounded at price resolution.
    ///
    /// `None` when `qty` is zero or negative.
    pub fn per_share(self, qty: Shares) -> Option<Price> {
        if !qty.is_positive() {
            return None;
        }
        Some(Price::new(mul_div_round(
            self.raw(),
            PRICE_QTY_TO_MONEY,
            qty.raw(),
        )))
    }

    /// Proportional slice: `self * pct / 100`, rounded to the cent.
    pub fn pct_of(self, pct: Percent) -> Money {
        Money::new(mul_div_round(self.raw(), pct.raw(), Percent::HUNDRED_RAW))
    }

    /// `self / basis * 100` as a display float.
    ///
    /// Exactly `Some(0.0)` when both are zero; `None` when the basis is
    /// zero with a non-zero numerator (the caller flags that as a data
    /// inconsistency).
    pub fn percent_of_basis(self, basis: Money) -> Option<f64> {
        if basis.is_zero() {
            if self.is_zero() {
                return Some(0.0);
            }
            return None;
        }
        // multiply before dividing so ratios like 10% come out exact
        Some(self.raw() as f64 * 100.0 / basis.raw() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_price_derives_quantity() {
        // $1000 / $100 = 10 shares
        let inv = Money::from_units(1000);
        let px = Price::from_units(100);
        assert_eq!(inv.div_price(px), Some(Shares::from_units(10)));
    }

    #[test]
    fn div_price_fractional_quantity() {
        // $1000 / $300 = 3.33333 (rounded at 1e-5)
        let inv = Money::from_units(1000);
        let px = Price::from_units(300);
        assert_eq!(inv.div_price(px), Some(Shares::new(333_333)));
    }

    #[test]
    fn div_price_rejects_non_positive_price() {
        let inv = Money::from_units(100);
        assert_eq!(inv.div_price(Price::ZERO), None);
        assert_eq!(inv.div_price(Price::from_units(-1)), None);
    }

    #[test]
    fn per_share_average_cost() {
        // $500 over 5 shares = $100.0000
        let inv = Money::from_units(500);
        assert_eq!(inv.per_share(Shares::from_units(5)), Some(Price::from_units(100)));
        assert_eq!(inv.per_share(Shares::ZERO), None);
    }

    #[test]
    fn pct_of_commission() {
        // 1% of $330.00 = $3.30
        let proceeds = Money::from_units(330);
        let pct = Percent::from_units(1);
        assert_eq!(proceeds.pct_of(pct), Money::new(330));
    }

    #[test]
    fn percent_of_basis_zero_over_zero_is_zero() {
        assert_eq!(Money::ZERO.percent_of_basis(Money::ZERO), Some(0.0));
    }

    #[test]
    fn percent_of_basis_nonzero_over_zero_is_none() {
        assert_eq!(Money::from_units(5).percent_of_basis(Money::ZERO), None);
    }

    #[test]
    fn percent_of_basis_plain_ratio() {
        let profit = Money::from_units(30);
        let basis = Money::from_units(300);
        assert_eq!(profit.percent_of_basis(basis), Some(10.0));
    }

    #[test]
    fn clamp_min_zero() {
        assert_eq!(Money::from_units(-5).clamp_min_zero(), Money::ZERO);
        assert_eq!(Money::from_units(5).clamp_min_zero(), Money::from_units(5));
    }

    #[test]
    fn display_cents() {
        assert_eq!(format!("{}", Money::new(150)), "1.50");
        assert_eq!(format!("{}", Money::new(-75)), "-0.75");
    }
}
