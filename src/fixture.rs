//! Fixtures for tests

use crate::index::{Class, Period, Scenario, Sets};
use crate::model::parameters::{
    BatteryParameters, BoilerParameters, GeneratorParameters, ProjectParameters, ResParameters,
    ResistanceParameters, SolarCollectorParameters, TankParameters,
};
use crate::model::{Model, ModelData, ModelParameters, SolverSettings};
use crate::optimisation::expression::VarId;
use crate::optimisation::schema::Variables;
use crate::units::{
    Dimensionless, EnergyPerFuel, Hours, MoneyPerEnergy, MoneyPerFuel, MoneyPerPower, Power,
};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Time series held in nested vectors, indexed from zero
#[derive(Debug, Default)]
pub struct VecModelData {
    /// Indexed by scenario, then period
    pub electric_demand: Vec<Vec<f64>>,
    /// Indexed by scenario, then period
    pub res_production: Vec<Vec<f64>>,
    /// Indexed by scenario, class, then period
    pub thermal_demand: Vec<Vec<Vec<f64>>>,
    /// Indexed by scenario, class, then period
    pub sc_production: Vec<Vec<Vec<f64>>>,
}

impl VecModelData {
    /// Data for a system without thermal classes
    pub fn electric(electric_demand: &[Vec<f64>], res_production: &[Vec<f64>]) -> Self {
        Self {
            electric_demand: electric_demand.to_vec(),
            res_production: res_production.to_vec(),
            ..Default::default()
        }
    }

    /// Fill every series from a closure of the one-based indices
    pub fn from_fn<E, T>(sets: &Sets, electric: E, thermal: T) -> Self
    where
        E: Fn(u32, u32) -> (f64, f64),
        T: Fn(u32, u32, u32) -> (f64, f64),
    {
        let electric: Vec<Vec<_>> = sets
            .iter_scenarios()
            .map(|i| sets.iter_periods().map(|t| electric(i.get(), t.get())).collect())
            .collect();
        let thermal: Vec<Vec<Vec<_>>> = sets
            .iter_scenarios()
            .map(|i| {
                sets.iter_classes()
                    .map(|c| {
                        sets.iter_periods()
                            .map(|t| thermal(i.get(), c.get(), t.get()))
                            .collect()
                    })
                    .collect()
            })
            .collect();

        let (electric_demand, res_production) = unzip_rows(&electric);
        let (thermal_demand, sc_production) = thermal.iter().map(|rows| unzip_rows(rows)).unzip();
        Self {
            electric_demand,
            res_production,
            thermal_demand,
            sc_production,
        }
    }
}

/// Split rows of pairs into two sets of rows
fn unzip_rows(rows: &[Vec<(f64, f64)>]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    rows.iter().map(|row| row.iter().copied().unzip()).unzip()
}

fn lookup2(values: &[Vec<f64>], i: Scenario, t: Period) -> Option<f64> {
    values.get(i.zero_based())?.get(t.zero_based()).copied()
}

fn lookup3(values: &[Vec<Vec<f64>>], i: Scenario, c: Class, t: Period) -> Option<f64> {
    values
        .get(i.zero_based())?
        .get(c.zero_based())?
        .get(t.zero_based())
        .copied()
}

impl ModelData for VecModelData {
    fn electric_energy_demand(&self, scenario: Scenario, period: Period) -> Option<f64> {
        lookup2(&self.electric_demand, scenario, period)
    }

    fn thermal_energy_demand(
        &self,
        scenario: Scenario,
        class: Class,
        period: Period,
    ) -> Option<f64> {
        lookup3(&self.thermal_demand, scenario, class, period)
    }

    fn res_energy_production(&self, scenario: Scenario, period: Period) -> Option<f64> {
        lookup2(&self.res_production, scenario, period)
    }

    fn sc_energy_production(&self, scenario: Scenario, class: Class, period: Period) -> Option<f64> {
        lookup3(&self.sc_production, scenario, class, period)
    }
}

/// Column values which are zero except for the given variables
pub fn column_values(vars: &Variables, assignments: &[(VarId, f64)]) -> Vec<f64> {
    let mut values = vec![0.0; vars.registry.len()];
    for &(var, value) in assignments {
        values[var.index()] = value;
    }
    values
}

fn project(scenarios: u32, periods: u32, classes: u32) -> ProjectParameters {
    let weight = Dimensionless(1.0 / f64::from(scenarios));
    ProjectParameters {
        scenarios,
        periods,
        years: 2,
        classes,
        delta_time: Hours(1.0),
        scenario_weights: vec![weight; scenarios as usize],
        project_years: None,
        discount_rate: Dimensionless(0.1),
        interest_rate_loan: Dimensionless(0.0),
        percentage_funded: Dimensionless(0.0),
        lost_load_tolerance: Dimensionless(0.0),
        value_of_lost_load: MoneyPerEnergy(1000.0),
    }
}

/// One scenario of two periods, with renewables, a battery and a diesel generator
#[fixture]
pub fn electric_parameters() -> ModelParameters {
    ModelParameters {
        project: project(1, 2, 0),
        solver: SolverSettings::default(),
        res: Some(ResParameters {
            nominal_capacity: Power(1.0),
            inverter_efficiency: Dimensionless(0.9),
            investment_cost: MoneyPerPower(1000.0),
            om_cost: Dimensionless(0.01),
            max_units: None,
        }),
        battery: Some(BatteryParameters {
            charge_efficiency: Dimensionless(0.9),
            discharge_efficiency: Dimensionless(0.9),
            depth_of_discharge: Dimensionless(0.2),
            max_charge_time: Hours(5.0),
            max_discharge_time: Hours(5.0),
            replacement_time: 10.0,
            investment_cost: MoneyPerEnergy(500.0),
            om_cost: Dimensionless(0.02),
            max_capacity: None,
        }),
        generator: Some(GeneratorParameters {
            efficiency: Dimensionless(0.3),
            lower_heating_value: EnergyPerFuel(10.0),
            fuel_cost: MoneyPerFuel(1.2),
            investment_cost: MoneyPerPower(800.0),
            om_cost: Dimensionless(0.05),
            max_capacity: None,
        }),
        solar_collector: None,
        tank: None,
        boiler: None,
        resistance: None,
    }
}

/// Two equally likely scenarios of three periods and two thermal classes, with every technology
#[fixture]
pub fn multi_energy_parameters(electric_parameters: ModelParameters) -> ModelParameters {
    ModelParameters {
        project: project(2, 3, 2),
        solar_collector: Some(SolarCollectorParameters {
            nominal_capacity: Power(1.0),
            investment_cost: MoneyPerPower(300.0),
            om_cost: Dimensionless(0.01),
            max_units: None,
        }),
        tank: Some(TankParameters {
            efficiency: Dimensionless(0.9),
            depth_of_discharge: Dimensionless(0.1),
            max_discharge_time: Some(Hours(4.0)),
            investment_cost: MoneyPerEnergy(20.0),
            om_cost: Dimensionless(0.01),
            max_capacity: None,
        }),
        boiler: Some(BoilerParameters {
            efficiency: Dimensionless(0.9),
            lower_heating_value: EnergyPerFuel(10.0),
            fuel_cost: MoneyPerFuel(0.5),
            investment_cost: MoneyPerPower(100.0),
            om_cost: Dimensionless(0.02),
            max_capacity: None,
        }),
        resistance: Some(ResistanceParameters {
            efficiency: Dimensionless(0.95),
            investment_cost: MoneyPerPower(50.0),
            om_cost: Dimensionless(0.01),
            max_capacity: None,
        }),
        ..electric_parameters
    }
}

/// Demand of 10 and 20 kWh, with renewables only yielding in the first period
#[fixture]
pub fn electric_model(electric_parameters: ModelParameters) -> Model {
    let data = VecModelData::electric(&[vec![10.0, 20.0]], &[vec![0.5, 0.0]]);
    Model::new(electric_parameters, &data).unwrap()
}

#[fixture]
pub fn multi_energy_model(multi_energy_parameters: ModelParameters) -> Model {
    let sets = multi_energy_parameters.sets();
    let data = VecModelData::from_fn(
        &sets,
        |i, t| (f64::from(10 * i + t), if t == 2 { 0.6 } else { 0.1 }),
        |i, c, t| (f64::from(i + c + t), 0.2 * f64::from(t)),
    );
    Model::new(multi_energy_parameters, &data).unwrap()
}
