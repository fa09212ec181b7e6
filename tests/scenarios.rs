//! End-to-end sizing of small systems whose optimum is known in closed form.
use float_cmp::assert_approx_eq;
use mes_sizing::index::{Class, Period, Scenario};
use mes_sizing::model::{Model, ModelData, ModelParameters};
use mes_sizing::optimisation::{ModelError, Solution, build_instance};

/// Electricity demand of a single scenario, with no thermal classes or renewables
struct ElectricDemand(Vec<f64>);

impl ModelData for ElectricDemand {
    fn electric_energy_demand(&self, _scenario: Scenario, period: Period) -> Option<f64> {
        self.0.get(period.zero_based()).copied()
    }

    fn thermal_energy_demand(&self, _: Scenario, _: Class, _: Period) -> Option<f64> {
        None
    }

    fn res_energy_production(&self, _: Scenario, _: Period) -> Option<f64> {
        None
    }

    fn sc_energy_production(&self, _: Scenario, _: Class, _: Period) -> Option<f64> {
        None
    }
}

fn build_model(model_toml: &str, demand: &[f64]) -> Model {
    let parameters: ModelParameters = toml::from_str(model_toml).unwrap();
    Model::new(parameters, &ElectricDemand(demand.to_vec())).unwrap()
}

/// Sum of a per-period variable over the single scenario
fn total<F>(solution: &Solution, periods: u32, var: F) -> f64
where
    F: Fn(Period) -> mes_sizing::optimisation::expression::VarId,
{
    (1..=periods)
        .map(|t| solution.value(var(Period::new(t))))
        .sum()
}

/// Generator-only system serving a constant demand
#[test]
fn test_generator_only() {
    let model = build_model(
        r#"
        [project]
        scenarios = 1
        periods = 1
        years = 1
        scenario_weights = [1.0]
        discount_rate = 0.1

        [generator]
        efficiency = 0.25
        lower_heating_value = 10.0
        fuel_cost = 2.0
        investment_cost = 1000.0
        om_cost = 0.0
        "#,
        &[100.0],
    );
    let instance = build_instance(&model).unwrap();
    let solution = instance.solve(&model.parameters.solver).unwrap();
    let vars = solution.variables();
    let generator = vars.generator.as_ref().unwrap();
    let i = Scenario::new(1);

    assert_approx_eq!(
        f64,
        solution.value(generator.nominal_capacity),
        100.0,
        epsilon = 1e-6
    );
    // 100 kWh at 2.5 kWh per litre, bought at 2 per litre and discounted over one year
    let fuel_cost = 40.0 * 2.0 / 1.1;
    assert_approx_eq!(
        f64,
        solution.value(generator.fuel_cost[i]),
        fuel_cost,
        epsilon = 1e-6
    );
    assert_approx_eq!(
        f64,
        solution.objective_value().value(),
        100_000.0 + fuel_cost,
        epsilon = 1e-4
    );
    assert!(solution.value(vars.balance.lost_load[(i, Period::new(1))]) < 1e-9);
}

/// A battery discharging 80 kWh in the second period must hold 80 / 0.9 of usable energy
#[test]
fn test_battery_round_trip() {
    let model = build_model(
        r#"
        [project]
        scenarios = 1
        periods = 2
        years = 1
        scenario_weights = [1.0]
        discount_rate = 0.1

        [battery]
        charge_efficiency = 0.9
        discharge_efficiency = 0.9
        depth_of_discharge = 0.0
        max_charge_time = 1.0
        max_discharge_time = 1.0
        replacement_time = 10.0
        investment_cost = 100.0
        om_cost = 0.0
        "#,
        &[0.0, 80.0],
    );
    let instance = build_instance(&model).unwrap();
    let solution = instance.solve(&model.parameters.solver).unwrap();
    let battery = solution.variables().battery.as_ref().unwrap();
    let i = Scenario::new(1);

    assert_approx_eq!(
        f64,
        solution.value(battery.nominal_capacity),
        80.0 / 0.9,
        epsilon = 1e-6
    );
    assert_approx_eq!(
        f64,
        solution.value(battery.flow_out[(i, Period::new(2))]),
        80.0,
        epsilon = 1e-6
    );
    assert!(solution.value(battery.state_of_charge[(i, Period::new(2))]) < 1e-6);
}

/// When unserved energy is cheap, exactly the tolerated share of demand goes unserved
#[test]
fn test_lost_load_at_tolerance() {
    let model = build_model(
        r#"
        [project]
        scenarios = 1
        periods = 2
        years = 1
        scenario_weights = [1.0]
        discount_rate = 0.1
        lost_load_tolerance = 0.05
        value_of_lost_load = 0.01

        [generator]
        efficiency = 0.25
        lower_heating_value = 10.0
        fuel_cost = 2.0
        investment_cost = 1000.0
        om_cost = 0.0
        "#,
        &[100.0, 100.0],
    );
    let instance = build_instance(&model).unwrap();
    let solution = instance.solve(&model.parameters.solver).unwrap();
    let lost_load = &solution.variables().balance.lost_load;
    let i = Scenario::new(1);

    assert_approx_eq!(
        f64,
        total(&solution, 2, |t| lost_load[(i, t)]),
        10.0,
        epsilon = 1e-6
    );
    assert!(solution.max_violation() < 1e-6);
}

/// With no capacity allowed and no lost load permitted, demand cannot be met
#[test]
fn test_infeasible_without_capacity() {
    let model = build_model(
        r#"
        [project]
        scenarios = 1
        periods = 1
        years = 1
        scenario_weights = [1.0]
        discount_rate = 0.1

        [generator]
        efficiency = 0.25
        lower_heating_value = 10.0
        fuel_cost = 2.0
        investment_cost = 1000.0
        om_cost = 0.0
        max_capacity = 0.0
        "#,
        &[100.0],
    );
    let instance = build_instance(&model).unwrap();
    assert!(matches!(
        instance.solve(&model.parameters.solver),
        Err(ModelError::Infeasible)
    ));
}
