//! Electric resistance heaters, one per class, charging the storage tanks.
use crate::index::{Class, Period, Scenario};
use crate::model::parameters::ResistanceParameters;
use crate::optimisation::expression::{Constraint, LinearExpr};
use crate::optimisation::schema::{Component, ModelContext, ResistanceVariables};

type Resistance<'a> = Component<'a, ResistanceParameters, ResistanceVariables>;

/// Electricity drawn by a heater in a period cannot exceed its nominal power
pub fn maximum_thermal_energy(
    resistance: Resistance,
    (i, c, t): (Scenario, Class, Period),
) -> Constraint {
    LinearExpr::from(resistance.vars.thermal_energy[(i, c, t)])
        .leq(resistance.vars.nominal_power[c])
}

/// Electricity drawn by the heaters of every class, as seen by the electric balance
pub fn total_electrical_demand(
    ctx: &ModelContext,
    resistance: Resistance,
    (i, t): (Scenario, Period),
) -> Constraint {
    let drawn: LinearExpr = ctx
        .model
        .sets
        .iter_classes()
        .map(|c| resistance.vars.thermal_energy[(i, c, t)])
        .sum();

    LinearExpr::from(resistance.vars.total_demand[(i, t)]).equals(drawn)
}

/// Investment in heaters across all classes
pub fn financial_cost(ctx: &ModelContext, resistance: Resistance) -> Constraint {
    let unit_cost = resistance.params.investment_cost.value();
    let investment: LinearExpr = ctx
        .model
        .sets
        .iter_classes()
        .map(|c| resistance.vars.nominal_power[c] * unit_cost)
        .sum();

    LinearExpr::from(resistance.vars.financial_cost).equals(investment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{column_values, multi_energy_model};
    use crate::model::Model;
    use crate::optimisation::schema::Variables;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_total_electrical_demand(multi_energy_model: Model) {
        let vars = Variables::declare(&multi_energy_model);
        let ctx = ModelContext::new(&multi_energy_model, &vars);
        let heater = ctx.resistance().unwrap();
        let (i, t) = (Scenario::new(1), Period::new(2));

        let values = column_values(
            &vars,
            &[
                (heater.vars.thermal_energy[(i, Class::new(1), t)], 1.5),
                (heater.vars.thermal_energy[(i, Class::new(2), t)], 2.5),
                (heater.vars.total_demand[(i, t)], 4.0),
            ],
        );
        assert_approx_eq!(
            f64,
            total_electrical_demand(&ctx, heater, (i, t)).violation(&values),
            0.0
        );
        assert_approx_eq!(
            f64,
            maximum_thermal_energy(heater, (i, Class::new(2), t)).violation(&values),
            2.5
        );
    }
}
