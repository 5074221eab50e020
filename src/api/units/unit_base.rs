// Shared storage and arithmetic for the unit types.
// Traits can't carry const constructors, so this is a macro instead.
macro_rules! unit_base {
    ($ty:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
        pub struct $ty(i64);

        #[allow(dead_code)]
        impl $ty {
            pub const fn zero() -> Self {
                Self(0)
            }

            pub const fn plus_infinity() -> Self {
                Self(i64::MAX)
            }

            pub const fn minus_infinity() -> Self {
                Self(i64::MIN)
            }

            pub const fn is_zero(&self) -> bool {
                self.0 == 0
            }

            pub const fn is_finite(&self) -> bool {
                !self.is_infinite()
            }

            pub const fn is_infinite(&self) -> bool {
                self.0 == i64::MAX || self.0 == i64::MIN
            }

            pub const fn is_plus_infinity(&self) -> bool {
                self.0 == i64::MAX
            }

            pub const fn is_minus_infinity(&self) -> bool {
                self.0 == i64::MIN
            }

            // One-sided units (rates, sizes) saturate at zero instead of going negative.
            const fn from_value(value: i64) -> Self {
                if Self::ONE_SIDED && value < 0 {
                    Self(0)
                } else {
                    Self(value)
                }
            }

            fn from_value_float(value: f64) -> Self {
                if value.is_nan() {
                    Self::zero()
                } else if value == f64::INFINITY {
                    Self::plus_infinity()
                } else if value == f64::NEG_INFINITY {
                    if Self::ONE_SIDED {
                        Self::zero()
                    } else {
                        Self::minus_infinity()
                    }
                } else {
                    Self::from_value(value as i64)
                }
            }

            const fn from_fraction(denominator: i64, value: i64) -> Self {
                Self::from_value(value.saturating_mul(denominator))
            }

            fn from_fraction_float(denominator: f64, value: f64) -> Self {
                Self::from_value_float(value * denominator)
            }

            const fn to_value(&self) -> i64 {
                self.0
            }

            fn to_value_float(&self) -> f64 {
                if self.is_plus_infinity() {
                    f64::INFINITY
                } else if self.is_minus_infinity() {
                    f64::NEG_INFINITY
                } else {
                    self.0 as f64
                }
            }

            // Rounds half away from zero.
            const fn to_fraction(&self, denominator: i64) -> i64 {
                let v = self.0;
                let mut result = v / denominator;
                let remainder = v % denominator;
                if remainder.abs() * 2 >= denominator {
                    if v < 0 {
                        result -= 1;
                    } else {
                        result += 1;
                    }
                }
                result
            }

            fn to_fraction_float(&self, denominator: f64) -> f64 {
                self.to_value_float() / denominator
            }

            const fn to_fraction_or(&self, denominator: i64, fallback_value: i64) -> i64 {
                if self.is_finite() {
                    self.to_fraction(denominator)
                } else {
                    fallback_value
                }
            }
        }
    };
}

// Adds the arithmetic that only makes sense for differences and magnitudes,
// i.e. everything except absolute points in time.
macro_rules! relative_unit {
    ($ty:ident) => {
        crate::api::units::unit_base!($ty);

        impl $ty {
            pub fn clamped(&self, min_value: Self, max_value: Self) -> Self {
                Self(self.0.max(min_value.0).min(max_value.0))
            }
        }

        impl ::std::ops::Add for $ty {
            type Output = Self;

            fn add(self, rhs: Self) -> Self::Output {
                if self.is_plus_infinity() || rhs.is_plus_infinity() {
                    return Self::plus_infinity();
                } else if self.is_minus_infinity() || rhs.is_minus_infinity() {
                    return Self::minus_infinity();
                }
                Self::from_value(self.0.saturating_add(rhs.0))
            }
        }

        impl ::std::ops::Sub for $ty {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self::Output {
                if self.is_plus_infinity() || rhs.is_minus_infinity() {
                    return Self::plus_infinity();
                } else if self.is_minus_infinity() || rhs.is_plus_infinity() {
                    return Self::from_value(i64::MIN);
                }
                Self::from_value(self.0.saturating_sub(rhs.0))
            }
        }

        impl ::std::ops::AddAssign for $ty {
            fn add_assign(&mut self, rhs: Self) {
                *self = *self + rhs;
            }
        }

        impl ::std::ops::SubAssign for $ty {
            fn sub_assign(&mut self, rhs: Self) {
                *self = *self - rhs;
            }
        }

        impl ::std::ops::Div for $ty {
            type Output = f64;

            fn div(self, rhs: Self) -> Self::Output {
                self.to_value_float() / rhs.to_value_float()
            }
        }

        impl ::std::ops::Div<i64> for $ty {
            type Output = Self;

            fn div(self, rhs: i64) -> Self::Output {
                if rhs == 0 {
                    return Self::plus_infinity();
                }
                Self::from_value(self.0 / rhs)
            }
        }

        impl ::std::ops::Mul<f64> for $ty {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self::Output {
                Self::from_value_float((self.to_value_float() * rhs).round())
            }
        }

        impl ::std::ops::Mul<i64> for $ty {
            type Output = Self;

            fn mul(self, rhs: i64) -> Self::Output {
                Self::from_value(self.0.saturating_mul(rhs))
            }
        }

        impl ::std::ops::Mul<i32> for $ty {
            type Output = Self;

            fn mul(self, rhs: i32) -> Self::Output {
                self * i64::from(rhs)
            }
        }

        impl ::std::ops::Mul<$ty> for f64 {
            type Output = $ty;

            fn mul(self, rhs: $ty) -> Self::Output {
                rhs * self
            }
        }

        impl ::std::ops::Mul<$ty> for i64 {
            type Output = $ty;

            fn mul(self, rhs: $ty) -> Self::Output {
                rhs * self
            }
        }

        impl ::std::ops::Mul<$ty> for i32 {
            type Output = $ty;

            fn mul(self, rhs: $ty) -> Self::Output {
                rhs * self
            }
        }

        impl ::std::iter::Sum for $ty {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::zero(), |acc, v| acc + v)
            }
        }

        impl<'a> ::std::iter::Sum<&'a $ty> for $ty {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                iter.fold(Self::zero(), |acc, v| acc + *v)
            }
        }
    };
}

pub(crate) use relative_unit;
pub(crate) use unit_base;
