//! wdk-signals
//!
//! Commission-adjusted target-price math and signal evaluation.
//!
//! Every function here is pure and stateless: identical input produces
//! identical output regardless of call order.  A "commission-adjusted"
//! target is shifted so that, after paying commission, the realized
//! result matches the nominal (unadjusted) target:
//!
//! - buying at the adjusted drop target *plus* commission lands exactly
//!   at the nominal drop price;
//! - selling at the adjusted take-profit target *minus* commission nets
//!   exactly the nominal profit percent.
//!
//! Targets are [`Price`] values (4 decimals) so a sale executing exactly
//! at an adjusted target reconciles to the cent.

use wdk_numeric::{Percent, Price};

/// Buy-the-dip target: `buy * (1 - pdp/100)`, divided by
/// `(1 + commission/100)` when a commission is modeled.
///
/// A commission at or above 100% makes the compensation meaningless; the
/// adjustment is skipped in that degenerate case.
pub fn drop_buy_target(buy_price: Price, pdp: Percent, commission: Percent) -> Price {
    let nominal = buy_price.scale_down_pct(pdp);
    if commission.is_positive() && commission < Percent::HUNDRED {
        nominal.div_one_plus_pct(commission)
    } else {
        nominal
    }
}

/// Take-profit target: `buy * (1 + tp/100)`, divided by
/// `(1 - commission/100)` when `0 < commission < 100`.
///
/// Parameterize with the swing percent (STP) for swing lots and the hold
/// percent (HTP) for hold lots — the formula is the same.
pub fn take_profit_target(buy_price: Price, tp: Percent, commission: Percent) -> Price {
    let nominal = buy_price.scale_up_pct(tp);
    if commission.is_positive() && commission < Percent::HUNDRED {
        nominal.div_one_minus_pct(commission)
    } else {
        nominal
    }
}

/// Distance from `current` to `target` in percent:
/// `(current / target - 1) * 100`.
///
/// Display and sorting only — signal activation compares prices
/// directly.  `None` when the target is not strictly positive.
pub fn percent_to_target(current: Price, target: Price) -> Option<f64> {
    if !target.is_positive() {
        return None;
    }
    Some((current.raw() as f64 * 100.0 / target.raw() as f64) - 100.0)
}

/// Which price-based signals are currently active for one position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SignalFlags {
    /// Current price at or below the drop-buy target.
    pub drop_buy: bool,
    /// Current price at or above a swing lot's take-profit target.
    pub swing_take_profit: bool,
    /// Current price at or above a hold lot's take-profit target.
    pub hold_take_profit: bool,
}

/// `true` when the dip has reached the (commission-adjusted) drop target.
pub fn drop_buy_active(current: Price, target: Price) -> bool {
    current <= target
}

/// `true` when the price has reached a take-profit target.
pub fn take_profit_active(current: Price, target: Price) -> bool {
    current >= target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(x: f64) -> Percent {
        Percent::from_f64(x).unwrap()
    }

    fn px(x: f64) -> Price {
        Price::from_f64(x).unwrap()
    }

    #[test]
    fn drop_target_without_commission() {
        // $100, PDP 5% -> $95
        assert_eq!(drop_buy_target(px(100.0), pct(5.0), Percent::ZERO), px(95.0));
    }

    #[test]
    fn drop_target_commission_compensates_downward() {
        // $95 nominal / 1.01 = $94.0594
        let t = drop_buy_target(px(100.0), pct(5.0), pct(1.0));
        assert_eq!(t, Price::new(940_594));
        // paying 1% commission on the adjusted price recovers ~the nominal
        let recovered = t.scale_up_pct(pct(1.0));
        assert!((recovered.raw() - px(95.0).raw()).abs() <= 1);
    }

    #[test]
    fn drop_target_skips_degenerate_commission() {
        let t = drop_buy_target(px(100.0), pct(5.0), pct(100.0));
        assert_eq!(t, px(95.0));
        let t = drop_buy_target(px(100.0), pct(5.0), pct(150.0));
        assert_eq!(t, px(95.0));
    }

    #[test]
    fn take_profit_reference_example() {
        // commission 1%, STP 10%, buy $100 -> 110 / 0.99 = $111.1111
        let t = take_profit_target(px(100.0), pct(10.0), pct(1.0));
        assert_eq!(t, Price::new(1_111_111));
    }

    #[test]
    fn take_profit_without_commission_is_nominal() {
        assert_eq!(
            take_profit_target(px(100.0), pct(10.0), Percent::ZERO),
            px(110.0)
        );
    }

    #[test]
    fn drop_target_monotonic_in_pdp() {
        let buy = px(250.0);
        let fee = pct(0.5);
        let mut last = drop_buy_target(buy, pct(0.0), fee);
        for pdp_units in 1..=40 {
            let t = drop_buy_target(buy, Percent::from_units(pdp_units), fee);
            assert!(t < last, "PDP {pdp_units}% must lower the drop target");
            last = t;
        }
    }

    #[test]
    fn take_profit_monotonic_in_tp() {
        let buy = px(250.0);
        let fee = pct(0.5);
        let mut last = take_profit_target(buy, pct(0.0), fee);
        for tp_units in 1..=40 {
            let t = take_profit_target(buy, Percent::from_units(tp_units), fee);
            assert!(t > last, "STP {tp_units}% must raise the take-profit target");
            last = t;
        }
    }

    #[test]
    fn percent_to_target_signs() {
        // 120 vs target 110: +9.0909..%
        let up = percent_to_target(px(120.0), px(110.0)).unwrap();
        assert!((up - 9.0909).abs() < 1e-3);
        // 95 vs target 100: -5%
        let down = percent_to_target(px(95.0), px(100.0)).unwrap();
        assert!((down + 5.0).abs() < 1e-9);
        assert_eq!(percent_to_target(px(95.0), Price::ZERO), None);
    }

    #[test]
    fn hold_take_profit_activation_example() {
        // Hold buy $100, HTP 10%, no commission -> target $110; $120 active
        let target = take_profit_target(px(100.0), pct(10.0), Percent::ZERO);
        assert_eq!(target, px(110.0));
        assert!(take_profit_active(px(120.0), target));
        assert!(!take_profit_active(px(109.9999), target));
    }

    #[test]
    fn drop_buy_activation_is_at_or_below() {
        let target = px(95.0);
        assert!(drop_buy_active(px(95.0), target));
        assert!(drop_buy_active(px(94.0), target));
        assert!(!drop_buy_active(px(95.0001), target));
    }
}
