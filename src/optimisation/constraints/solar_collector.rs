//! Solar thermal collectors.
use crate::index::{Class, Period, Scenario};
use crate::model::parameters::SolarCollectorParameters;
use crate::optimisation::expression::{Constraint, LinearExpr};
use crate::optimisation::schema::{Component, ModelContext, SolarCollectorVariables};

type SolarCollector<'a> = Component<'a, SolarCollectorParameters, SolarCollectorVariables>;

/// Heat collected for a class is the yield of one collector times the collectors installed
pub fn energy_generation(
    ctx: &ModelContext,
    collector: SolarCollector,
    (i, c, t): (Scenario, Class, Period),
) -> Constraint {
    let unit_yield = ctx
        .model
        .sc_production
        .as_ref()
        .map_or(0.0, |production| production[(i, c, t)].value());

    LinearExpr::from(collector.vars.production[(i, c, t)])
        .equals(unit_yield * collector.vars.units[c])
}

/// Investment in collectors across all classes
pub fn financial_cost(ctx: &ModelContext, collector: SolarCollector) -> Constraint {
    let params = collector.params;
    let unit_cost = params.investment_cost.value() * params.nominal_capacity.value();
    let investment: LinearExpr = ctx
        .model
        .sets
        .iter_classes()
        .map(|c| collector.vars.units[c] * unit_cost)
        .sum();

    LinearExpr::from(collector.vars.financial_cost).equals(investment)
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
    fn test_energy_generation(multi_energy_model: Model) {
        let vars = Variables::declare(&multi_energy_model);
        let ctx = ModelContext::new(&multi_energy_model, &vars);
        let collector = ctx.solar_collector().unwrap();
        let key = (Scenario::new(1), Class::new(2), Period::new(2));
        let unit_yield = multi_energy_model.sc_production.as_ref().unwrap()[key].value();

        let values = column_values(
            &vars,
            &[
                (collector.vars.units[Class::new(2)], 3.0),
                (collector.vars.production[key], 3.0 * unit_yield),
            ],
        );
        assert_approx_eq!(
            f64,
            energy_generation(&ctx, collector, key).violation(&values),
            0.0,
            epsilon = 1e-9
        );
    }

    #[rstest]
    fn test_financial_cost(multi_energy_model: Model) {
        let vars = Variables::declare(&multi_energy_model);
        let ctx = ModelContext::new(&multi_energy_model, &vars);
        let collector = ctx.solar_collector().unwrap();
        let params = collector.params;
        let unit_cost = params.investment_cost.value() * params.nominal_capacity.value();

        let values = column_values(
            &vars,
            &[
                (collector.vars.units[Class::new(1)], 1.0),
                (collector.vars.units[Class::new(2)], 2.0),
                (collector.vars.financial_cost, 3.0 * unit_cost),
            ],
        );
        assert_approx_eq!(
            f64,
            financial_cost(&ctx, collector).violation(&values),
            0.0,
            epsilon = 1e-9
        );
    }
}
