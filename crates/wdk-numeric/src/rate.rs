use crate::RATE_SCALE;

fixed_newtype!(
    /// A percent parameter at 1e-4 resolution.
    ///
    /// `Percent::from_units(5)` is 5%.  Stock parameters (strategy split
    /// ratio, price-drop percent, take-profit percents, commission) are
    /// all `Percent` values in `[0, 100]`; validation of that range
    /// belongs to the schema layer, not this type.
    Percent,
    scale = RATE_SCALE,
    decimals = 4
);

impl Percent {
    /// Raw value of 100%.
    pub const HUNDRED_RAW: i64 = 100 * RATE_SCALE;

    /// 100%.
    pub const HUNDRED: Percent = Percent(Self::HUNDRED_RAW);

    /// `100 - self` — the complementary slice of a proportional split.
    pub fn complement(self) -> Percent {
        Percent::new(Self::HUNDRED_RAW - self.raw())
    }

    /// `true` when the value lies in the closed range `[0, 100]`.
    pub fn is_valid_ratio(self) -> bool {
        self.raw() >= 0 && self.raw() <= Self::HUNDRED_RAW
    }
}

fixed_newtype!(
    /// A plain multiplier at 1e-4 resolution.
    ///
    /// Used for stock-split factors: `Ratio::from_units(2)` is a 2-for-1
    /// split, `Ratio::from_f64(0.5)` a 1-for-2 reverse split.
    Ratio,
    scale = RATE_SCALE,
    decimals = 4
);

impl Ratio {
    /// The identity multiplier.
    pub const ONE: Ratio = Ratio(RATE_SCALE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_is_one_million_raw() {
        assert_eq!(Percent::HUNDRED.raw(), 1_000_000);
    }

    #[test]
    fn complement_splits_hundred() {
        let swing = Percent::from_f64(62.5).unwrap();
        assert_eq!(swing + swing.complement(), Percent::HUNDRED);
    }

    #[test]
    fn ratio_range_check() {
        assert!(Percent::ZERO.is_valid_ratio());
        assert!(Percent::HUNDRED.is_valid_ratio());
        assert!(!Percent::from_units(101).is_valid_ratio());
        assert!(!Percent::from_units(-1).is_valid_ratio());
    }

    #[test]
    fn ratio_one_is_identity_marker() {
        assert_eq!(Ratio::ONE.raw(), 10_000);
        assert!(Ratio::ONE.is_positive());
    }
}
