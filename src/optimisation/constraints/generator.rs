//! Diesel generator output, fuel use and fuel cost.
use crate::index::{Period, Scenario};
use crate::model::parameters::GeneratorParameters;
use crate::optimisation::expression::{Constraint, LinearExpr};
use crate::optimisation::schema::{Component, GeneratorVariables, ModelContext};

type Generator<'a> = Component<'a, GeneratorParameters, GeneratorVariables>;

/// Output in a period cannot exceed the nominal capacity
pub fn maximum_energy(generator: Generator, key: (Scenario, Period)) -> Constraint {
    LinearExpr::from(generator.vars.production[key]).leq(generator.vars.nominal_capacity)
}

/// Fuel burnt to produce the output of a period
pub fn fuel_consumption(
    ctx: &ModelContext,
    generator: Generator,
    key: (Scenario, Period),
) -> Constraint {
    let params = generator.params;
    let fuel_per_energy =
        ctx.delta_time() / (params.efficiency.value() * params.lower_heating_value.value());

    LinearExpr::from(generator.vars.fuel_consumption[key])
        .equals(fuel_per_energy * generator.vars.production[key])
}

/// Discounted cost of the fuel burnt in a scenario, summed year by year over the project
pub fn fuel_cost(ctx: &ModelContext, generator: Generator, i: Scenario) -> Constraint {
    let price = generator.params.fuel_cost.value();
    // Every project year repeats the modelled periods
    let cost = ctx.present_value(|_| {
        ctx.model
            .sets
            .iter_periods()
            .map(|t| generator.vars.fuel_consumption[(i, t)] * price)
            .sum()
    });

    LinearExpr::from(generator.vars.fuel_cost[i]).equals(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{column_values, electric_model};
    use crate::index::{Year, YearMap};
    use crate::model::Model;
    use itertools::Itertools;
    use crate::optimisation::schema::Variables;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_maximum_energy(electric_model: Model) {
        let vars = Variables::declare(&electric_model);
        let ctx = ModelContext::new(&electric_model, &vars);
        let generator = ctx.generator().unwrap();
        let key = (Scenario::new(1), Period::new(2));
        let constraint = maximum_energy(generator, key);

        let values = column_values(
            &vars,
            &[
                (generator.vars.nominal_capacity, 10.0),
                (generator.vars.production[key], 12.0),
            ],
        );
        assert_approx_eq!(f64, constraint.violation(&values), 2.0);
    }

    #[rstest]
    fn test_fuel_consumption(electric_model: Model) {
        let vars = Variables::declare(&electric_model);
        let ctx = ModelContext::new(&electric_model, &vars);
        let generator = ctx.generator().unwrap();
        let key = (Scenario::new(1), Period::new(1));
        let constraint = fuel_consumption(&ctx, generator, key);

        // 30% efficiency and a heating value of 10 kWh/l
        let values = column_values(
            &vars,
            &[
                (generator.vars.production[key], 30.0),
                (generator.vars.fuel_consumption[key], 10.0),
            ],
        );
        assert_approx_eq!(f64, constraint.violation(&values), 0.0, epsilon = 1e-9);
    }

    #[rstest]
    fn test_fuel_cost(electric_model: Model) {
        let vars = Variables::declare(&electric_model);
        let ctx = ModelContext::new(&electric_model, &vars);
        let generator = ctx.generator().unwrap();
        let scenario = Scenario::new(1);
        let constraint = fuel_cost(&ctx, generator, scenario);

        // 10 l per year at 1.2/l, over two years discounted at 10%
        let expected = 12.0 * (1.0 / 1.1 + 1.0 / 1.21);
        let values = column_values(
            &vars,
            &[
                (generator.vars.fuel_consumption[(scenario, Period::new(1))], 4.0),
                (generator.vars.fuel_consumption[(scenario, Period::new(2))], 6.0),
                (generator.vars.fuel_cost[scenario], expected),
            ],
        );
        assert_approx_eq!(f64, constraint.violation(&values), 0.0, epsilon = 1e-9);
    }

    #[rstest]
    fn test_fuel_cost_discounts_each_year(mut electric_model: Model) {
        // Years taking place 2 and 5 years into the project
        electric_model.project_years =
            YearMap::from_fn(&electric_model.sets, |y: Year| [2.0, 5.0][y.zero_based()]);
        let vars = Variables::declare(&electric_model);
        let ctx = ModelContext::new(&electric_model, &vars);
        let generator = ctx.generator().unwrap();
        let scenario = Scenario::new(1);
        let constraint = fuel_cost(&ctx, generator, scenario);

        // One term per period and year, plus the cost itself
        let fuel = generator.vars.fuel_consumption[(scenario, Period::new(1))];
        let coefficients = constraint
            .expression()
            .terms()
            .iter()
            .filter(|(var, _)| *var == fuel)
            .map(|(_, coeff)| -coeff)
            .collect_vec();
        assert_eq!(constraint.expression().terms().len(), 5);
        assert_approx_eq!(f64, coefficients[0], 1.2 / 1.1_f64.powi(2), epsilon = 1e-12);
        assert_approx_eq!(f64, coefficients[1], 1.2 / 1.1_f64.powi(5), epsilon = 1e-12);
    }
}
