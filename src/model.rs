//! The model: parameters plus the time series bound to the index sets.
use crate::index::{
    Class, DenseKey, DenseMap, Period, Scenario, ScenarioClassPeriodMap, ScenarioMap,
    ScenarioPeriodMap, Sets, YearMap,
};
use crate::units::{Dimensionless, Energy};
use std::error::Error;
use std::fmt;

pub mod parameters;
pub use parameters::{ModelParameters, SolverMethod, SolverSettings};
pub mod technology;

/// A source of time-series data for a model.
///
/// There is one initialiser per indexed parameter. Each returns `None` when it has no value for
/// the given index, which is reported as a [`SchemaError`] when the model is built.
pub trait ModelData {
    /// Electricity demand in the period
    fn electric_energy_demand(&self, scenario: Scenario, period: Period) -> Option<f64>;

    /// Heat demand of a class in the period
    fn thermal_energy_demand(&self, scenario: Scenario, class: Class, period: Period)
    -> Option<f64>;

    /// Energy yielded in the period by one renewable unit
    fn res_energy_production(&self, scenario: Scenario, period: Period) -> Option<f64>;

    /// Heat yielded in the period by one solar collector of the class
    fn sc_energy_production(&self, scenario: Scenario, class: Class, period: Period)
    -> Option<f64>;
}

/// Indicates that a parameter does not fit the index sets it is declared over
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    /// The offending parameter
    pub parameter: &'static str,
    /// The shape or range the parameter must have
    pub expected: String,
    /// What was found instead
    pub found: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid data for `{}`: expected {}, found {}",
            self.parameter, self.expected, self.found
        )
    }
}

impl Error for SchemaError {}

/// Model definition
#[derive(Debug, PartialEq)]
pub struct Model {
    /// The contents of the model file
    pub parameters: ModelParameters,
    /// Sizes of the index sets
    pub sets: Sets,
    /// Probability of each scenario
    pub scenario_weights: ScenarioMap<Dimensionless>,
    /// Time used to discount each project year
    pub project_years: YearMap<f64>,
    /// Electricity demand
    pub electric_demand: ScenarioPeriodMap<Energy>,
    /// Heat demand (empty when there are no classes)
    pub thermal_demand: ScenarioClassPeriodMap<Energy>,
    /// Yield of one renewable unit, if renewables are part of the system
    pub res_production: Option<ScenarioPeriodMap<Energy>>,
    /// Yield of one solar collector, if collectors are part of the system
    pub sc_production: Option<ScenarioClassPeriodMap<Energy>>,
}

/// Bind one indexed parameter, failing on the first index without a value
fn bind<K, F>(
    sets: &Sets,
    parameter: &'static str,
    shape: &str,
    mut initialiser: F,
) -> Result<DenseMap<K, Energy>, SchemaError>
where
    K: DenseKey + fmt::Debug,
    F: FnMut(K) -> Option<f64>,
{
    DenseMap::try_from_fn(sets, |key: K| {
        initialiser(key).map(Energy).ok_or_else(|| SchemaError {
            parameter,
            expected: format!("a value for every {shape}"),
            found: format!("no value for {key:?}"),
        })
    })
}

/// Check that every value of an indexed parameter is finite and non-negative
fn check_non_negative<K, T>(
    parameter: &'static str,
    map: &DenseMap<K, T>,
    value: impl Fn(&T) -> f64,
) -> Result<(), SchemaError>
where
    K: DenseKey + fmt::Debug,
{
    for (key, item) in map.iter() {
        let value = value(item);
        if !(value.is_finite() && value >= 0.0) {
            return Err(SchemaError {
                parameter,
                expected: "finite, non-negative values".to_string(),
                found: format!("{value} at {key:?}"),
            });
        }
    }

    Ok(())
}

impl Model {
    /// Create a model by binding every time series the parameters require.
    ///
    /// # Arguments
    ///
    /// * `parameters` - The contents of the model file
    /// * `data` - Source of the time-series parameters
    pub fn new(parameters: ModelParameters, data: &dyn ModelData) -> Result<Model, SchemaError> {
        let sets = parameters.sets();
        let project = &parameters.project;

        let weights = &project.scenario_weights;
        if weights.len() != sets.scenarios as usize {
            return Err(SchemaError {
                parameter: "scenario_weights",
                expected: format!("{} values (one per scenario)", sets.scenarios),
                found: format!("{} values", weights.len()),
            });
        }
        let scenario_weights = ScenarioMap::from_fn(&sets, |i: Scenario| weights[i.zero_based()]);

        let project_years = match &project.project_years {
            Some(years) if years.len() != sets.years as usize => {
                return Err(SchemaError {
                    parameter: "project_years",
                    expected: format!("{} values (one per year)", sets.years),
                    found: format!("{} values", years.len()),
                });
            }
            Some(years) => YearMap::from_fn(&sets, |y| years[y.zero_based()]),
            None => YearMap::from_fn(&sets, |y| y.get() as f64),
        };

        let electric_demand = bind(
            &sets,
            "Electric_Energy_Demand",
            "(scenario, period)",
            |(i, t): (Scenario, Period)| data.electric_energy_demand(i, t),
        )?;
        let thermal_demand = bind(
            &sets,
            "Thermal_Energy_Demand",
            "(scenario, class, period)",
            |(i, c, t): (Scenario, Class, Period)| {
                data.thermal_energy_demand(i, c, t)
            },
        )?;
        let res_production = parameters
            .res
            .as_ref()
            .map(|_| {
                bind(
                    &sets,
                    "RES_Energy_Production",
                    "(scenario, period)",
                    |(i, t): (Scenario, Period)| data.res_energy_production(i, t),
                )
            })
            .transpose()?;
        let sc_production = parameters
            .solar_collector
            .as_ref()
            .map(|_| {
                bind(
                    &sets,
                    "SC_Energy_Production",
                    "(scenario, class, period)",
                    |(i, c, t): (Scenario, Class, Period)| {
                        data.sc_energy_production(i, c, t)
                    },
                )
            })
            .transpose()?;

        Ok(Model {
            parameters,
            sets,
            scenario_weights,
            project_years,
            electric_demand,
            thermal_demand,
            res_production,
            sc_production,
        })
    }

    /// Check the parameters and bound data before an instance is built.
    ///
    /// Scalar parameters must lie in their domains (see [`ModelParameters::check_schema`]), time
    /// series must be finite and non-negative and scenario weights must form a probability
    /// distribution.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.parameters.check_schema()?;
        check_non_negative("Scenario_Weight", &self.scenario_weights, |w| w.value())?;
        let total: f64 = self.scenario_weights.values().map(|w| w.value()).sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(SchemaError {
                parameter: "Scenario_Weight",
                expected: "weights summing to 1".to_string(),
                found: format!("a sum of {total}"),
            });
        }

        check_non_negative("Project_Years", &self.project_years, |y| *y)?;
        check_non_negative("Electric_Energy_Demand", &self.electric_demand, |e| {
            e.value()
        })?;
        check_non_negative("Thermal_Energy_Demand", &self.thermal_demand, |e| {
            e.value()
        })?;
        if let Some(production) = &self.res_production {
            check_non_negative("RES_Energy_Production", production, |e| e.value())?;
        }
        if let Some(production) = &self.sc_production {
            check_non_negative("SC_Energy_Production", production, |e| e.value())?;
        }

        Ok(())
    }

    /// Length of a period in hours
    pub fn delta_time(&self) -> f64 {
        self.parameters.project.delta_time.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{VecModelData, electric_parameters};
    use rstest::rstest;

    #[rstest]
    fn test_model_new(electric_parameters: ModelParameters) {
        let data = VecModelData::electric(&[vec![10.0, 20.0]], &[vec![0.5, 0.0]]);
        let model = Model::new(electric_parameters, &data).unwrap();
        assert_eq!(
            model.electric_demand[(Scenario::new(1), Period::new(2))],
            Energy(20.0)
        );
        assert!(model.thermal_demand.is_empty());
        assert!(model.sc_production.is_none());
        assert_eq!(model.project_years.values().copied().collect::<Vec<_>>(), [1.0, 2.0]);
        assert!(model.validate().is_ok());
    }

    #[rstest]
    fn test_model_new_missing_value(electric_parameters: ModelParameters) {
        let data = VecModelData::electric(&[vec![10.0]], &[vec![0.5, 0.0]]);
        let err = Model::new(electric_parameters, &data).unwrap_err();
        assert_eq!(err.parameter, "Electric_Energy_Demand");
        assert_eq!(
            err.to_string(),
            "Invalid data for `Electric_Energy_Demand`: expected a value for every \
            (scenario, period), found no value for (Scenario(1), Period(2))"
        );
    }

    #[rstest]
    fn test_validate_negative_demand(electric_parameters: ModelParameters) {
        let data = VecModelData::electric(&[vec![10.0, -1.0]], &[vec![0.5, 0.0]]);
        let model = Model::new(electric_parameters, &data).unwrap();
        let err = model.validate().unwrap_err();
        assert_eq!(err.parameter, "Electric_Energy_Demand");
        assert_eq!(err.found, "-1 at (Scenario(1), Period(2))");
    }

    #[rstest]
    fn test_validate_weights(mut electric_parameters: ModelParameters) {
        electric_parameters.project.scenario_weights = vec![Dimensionless(0.4)];
        let data = VecModelData::electric(&[vec![10.0, 1.0]], &[vec![0.5, 0.0]]);
        let model = Model::new(electric_parameters, &data).unwrap();
        assert_eq!(
            model.validate().unwrap_err().to_string(),
            "Invalid data for `Scenario_Weight`: expected weights summing to 1, found a sum of 0.4"
        );
    }

    #[rstest]
    fn test_validate_checks_parameters(mut electric_parameters: ModelParameters) {
        electric_parameters.project.discount_rate = Dimensionless(-0.1);
        let data = VecModelData::electric(&[vec![10.0, 1.0]], &[vec![0.5, 0.0]]);
        let model = Model::new(electric_parameters, &data).unwrap();
        assert_eq!(model.validate().unwrap_err().parameter, "discount_rate");
    }
}
