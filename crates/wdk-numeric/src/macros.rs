//! Shared impl block for the fixed-point newtypes.
//!
//! Each type wraps a raw `i64` at its own scale.  There is intentionally
//! no `From<i64>` implementation — callers must be deliberate about when a
//! raw integer represents a scaled value ([`new`] / [`raw`] are the only
//! doors in and out).  Serde round-trips the raw scaled integer, so
//! persisted records stay exact.

macro_rules! fixed_newtype {
    ($(#[$meta:meta])* $name:ident, scale = $scale:expr, decimals = $dec:expr) => {
        $(#[$meta])*
        #[derive(
            Copy,
            Clone,
            Debug,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Zero value.
            pub const ZERO: $name = $name(0);

            /// Raw units per whole unit.
            pub const SCALE: i64 = $scale;

            /// Construct from a raw scaled `i64`.
            #[inline]
            pub const fn new(raw: i64) -> Self {
                $name(raw)
            }

            /// Extract the underlying raw `i64`.
            #[inline]
            pub const fn raw(self) -> i64 {
                self.0
            }

            /// Construct from a whole number of units (`3` -> `3.0`).
            #[inline]
            pub const fn from_units(units: i64) -> Self {
                $name(units * $scale)
            }

            /// Boundary conversion from a decimal float.
            ///
            /// Rounds half away from zero at this type's resolution;
            /// `None` for non-finite or out-of-range input.  This is the
            /// single place float rounding enters the system.
            pub fn from_f64(x: f64) -> Option<Self> {
                crate::arith::f64_to_raw(x, $scale).map($name)
            }

            /// Boundary conversion to a decimal float (display/export only).
            #[inline]
            pub fn to_f64(self) -> f64 {
                self.0 as f64 / $scale as f64
            }

            #[inline]
            pub const fn is_zero(self) -> bool {
                self.0 == 0
            }

            #[inline]
            pub const fn is_negative(self) -> bool {
                self.0 < 0
            }

            #[inline]
            pub const fn is_positive(self) -> bool {
                self.0 > 0
            }

            /// Saturating addition — clamps at the `i64` range.
            #[inline]
            pub fn saturating_add(self, rhs: Self) -> Self {
                $name(self.0.saturating_add(rhs.0))
            }

            /// Saturating subtraction — clamps at the `i64` range.
            #[inline]
            pub fn saturating_sub(self, rhs: Self) -> Self {
                $name(self.0.saturating_sub(rhs.0))
            }

            /// Clamp negative values to zero.
            #[inline]
            pub fn clamp_min_zero(self) -> Self {
                if self.0 < 0 {
                    $name(0)
                } else {
                    self
                }
            }
        }

        impl std::ops::Add for $name {
            type Output = $name;
            #[inline]
            fn add(self, rhs: $name) -> $name {
                $name(self.0 + rhs.0)
            }
        }

        impl std::ops::Sub for $name {
            type Output = $name;
            #[inline]
            fn sub(self, rhs: $name) -> $name {
                $name(self.0 - rhs.0)
            }
        }

        impl std::ops::Neg for $name {
            type Output = $name;
            #[inline]
            fn neg(self) -> $name {
                $name(-self.0)
            }
        }

        impl std::ops::AddAssign for $name {
            #[inline]
            fn add_assign(&mut self, rhs: $name) {
                self.0 += rhs.0;
            }
        }

        impl std::ops::SubAssign for $name {
            #[inline]
            fn sub_assign(&mut self, rhs: $name) {
                self.0 -= rhs.0;
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let units = self.0 / $scale;
                let frac = (self.0 % $scale).abs();
                // When |value| < 1 unit and negative, `units` truncates to 0,
                // losing the sign.  Emit "-0" explicitly in that case.
                if self.0 < 0 && units == 0 {
                    write!(f, "-{units}.{frac:0width$}", width = $dec)
                } else {
                    write!(f, "{units}.{frac:0width$}", width = $dec)
                }
            }
        }
    };
}
