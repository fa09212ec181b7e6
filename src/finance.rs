//! General functions related to finance.
//!
//! Costs in the sizing model are expressed as present values. Recurring yearly amounts are
//! discounted year by year with [`discount_factor`] rather than through an annuity factor, so that
//! project years need not be contiguous.
use crate::index::{Sets, Year};
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy};
use std::iter::Sum;
use std::ops::Mul;

/// The factor by which an amount arising in `project_year` is multiplied to obtain its present
/// value: `1 / (1 + rate)^project_year`.
pub fn discount_factor(discount_rate: Dimensionless, project_year: f64) -> Dimensionless {
    Dimensionless(1.0) / (Dimensionless(1.0) + discount_rate).powf(project_year)
}

/// Calculates the capital recovery factor (CRF) for a given lifetime and interest rate.
///
/// For a loan this is the fraction of the principal repaid every year, i.e.
/// `r / (1 - (1 + r)^-n)`. A zero rate degenerates to straight-line repayment.
pub fn capital_recovery_factor(lifetime: u32, interest_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if interest_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let factor = (Dimensionless(1.0) + interest_rate).powi(lifetime as i32);
    (interest_rate * factor) / (factor - Dimensionless(1.0))
}

/// Sum of the present values of `amount(year)` over every year of the project.
///
/// `project_year` maps each year index onto the time (in years) used for discounting. The amount
/// may be any quantity, e.g. money spent or energy served.
pub fn present_value_over_years<T, F, P>(
    sets: &Sets,
    discount_rate: Dimensionless,
    project_year: P,
    mut amount: F,
) -> T
where
    T: Mul<Dimensionless, Output = T> + Sum,
    F: FnMut(Year) -> T,
    P: Fn(Year) -> f64,
{
    sets.iter_years()
        .map(|year| amount(year) * discount_factor(discount_rate, project_year(year)))
        .sum()
}

/// Levelised cost of energy: net present cost divided by discounted energy served.
///
/// Returns `None` if no energy is served, in which case the cost is undefined.
pub fn levelised_cost_of_energy(
    net_present_cost: Money,
    discounted_energy_served: Energy,
) -> Option<MoneyPerEnergy> {
    (discounted_energy_served > Energy(0.0))
        .then(|| net_present_cost / discounted_energy_served)
}
