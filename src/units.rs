//! This module defines various unit types and their conversions.
//!
//! Parameters read from the model file carry these types so that cost and energy arithmetic
//! outside the LP is checked by the compiler. Coefficients handed to the solver are plain `f64`s
//! obtained with [`value`](Money::value).
use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};

macro_rules! base_unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            PartialOrd,
            derive_more::Add,
            derive_more::Sub,
            derive_more::Display,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::ops::AddAssign for $name {
            fn add_assign(&mut self, rhs: $name) {
                self.0 += rhs.0;
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = $name>>(iter: I) -> $name {
                $name(iter.map(|x| x.0).sum())
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

macro_rules! unit_struct {
    ($name:ident) => {
        base_unit_struct!($name);

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

// Dimensionless quantities (efficiencies, rates, fractions)
base_unit_struct!(Dimensionless);

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

impl Dimensionless {
    /// Raise to an integer power
    pub fn powi(self, rhs: i32) -> Self {
        Dimensionless(self.0.powi(rhs))
    }

    /// Raise to a real power
    pub fn powf(self, rhs: f64) -> Self {
        Dimensionless(self.0.powf(rhs))
    }
}

// Base quantities
unit_struct!(Money);
unit_struct!(Energy);
unit_struct!(Power);
unit_struct!(Hours);
unit_struct!(Fuel);

// Derived quantities
unit_struct!(MoneyPerEnergy);
unit_struct!(MoneyPerPower);
unit_struct!(MoneyPerFuel);
unit_struct!(EnergyPerFuel);

// Division rules
impl_div!(Energy, Hours, Power);
impl_div!(Energy, EnergyPerFuel, Fuel);
impl_div!(Money, Energy, MoneyPerEnergy);
impl_div!(Money, Power, MoneyPerPower);
impl_div!(Money, Money, Dimensionless);

// Multiplication rules
impl_mul!(Power, Hours, Energy);
impl_mul!(MoneyPerPower, Power, Money);
impl_mul!(MoneyPerEnergy, Energy, Money);
impl_mul!(MoneyPerFuel, Fuel, Money);
