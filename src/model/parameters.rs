//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
//!
//! The file has a mandatory `[project]` section, an optional `[solver]` section and one optional
//! section per technology. A technology is part of the system exactly when its section is present.
use crate::index::Sets;
use crate::input::{deserialise_proportion, deserialise_proportion_nonzero, input_err_msg, read_toml};
use crate::model::SchemaError;
use crate::model::technology::Technology;
use crate::units::{
    Dimensionless, Energy, EnergyPerFuel, Hours, MoneyPerEnergy, MoneyPerFuel, MoneyPerPower,
    Power,
};
use anyhow::{Context, Result, ensure};
use float_cmp::approx_eq;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_delta_time, Hours, 1.0);
define_unit_param_default!(default_value_of_lost_load, MoneyPerEnergy, 1e3);
define_param_default!(default_presolve, bool, true);
define_param_default!(default_crossover, bool, true);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelParameters {
    /// Index set sizes and financial parameters
    pub project: ProjectParameters,
    /// Options passed to the LP solver
    #[serde(default)]
    pub solver: SolverSettings,
    /// Renewable (PV) units
    pub res: Option<ResParameters>,
    /// Electrical battery bank
    pub battery: Option<BatteryParameters>,
    /// Diesel generator
    pub generator: Option<GeneratorParameters>,
    /// Solar thermal collectors, one field per class
    pub solar_collector: Option<SolarCollectorParameters>,
    /// Thermal storage tank, one per class
    pub tank: Option<TankParameters>,
    /// Natural-gas boiler, one per class
    pub boiler: Option<BoilerParameters>,
    /// Electric resistance heater feeding the tank, one per class
    pub resistance: Option<ResistanceParameters>,
}

/// The `[project]` section of the model file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectParameters {
    /// Number of scenarios
    pub scenarios: u32,
    /// Number of periods in a year
    pub periods: u32,
    /// Number of project years
    pub years: u32,
    /// Number of thermal classes. Zero for a purely electric system.
    #[serde(default)]
    pub classes: u32,
    /// Length of a period
    #[serde(default = "default_delta_time")]
    pub delta_time: Hours,
    /// Probability of each scenario. Must sum to one.
    pub scenario_weights: Vec<Dimensionless>,
    /// The time used to discount each project year. Defaults to `1, 2, ..., years`.
    pub project_years: Option<Vec<f64>>,
    /// Rate used to discount future costs
    pub discount_rate: Dimensionless,
    /// Interest rate of the loan financing part of the investment
    #[serde(default)]
    pub interest_rate_loan: Dimensionless,
    /// Share of the initial investment financed by the loan
    #[serde(default, deserialize_with = "deserialise_proportion")]
    pub percentage_funded: Dimensionless,
    /// Maximum share of demand that may go unserved
    #[serde(default, deserialize_with = "deserialise_proportion")]
    pub lost_load_tolerance: Dimensionless,
    /// Cost of unserved energy
    #[serde(default = "default_value_of_lost_load")]
    pub value_of_lost_load: MoneyPerEnergy,
}

/// Renewable energy source (PV) parameters
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResParameters {
    /// Rated power of a single unit
    pub nominal_capacity: Power,
    /// Efficiency of the inverter connecting the units to the bus
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub inverter_efficiency: Dimensionless,
    /// Investment cost per unit of rated power
    pub investment_cost: MoneyPerPower,
    /// Yearly O&M cost as a fraction of the investment
    #[serde(deserialize_with = "deserialise_proportion")]
    pub om_cost: Dimensionless,
    /// Maximum number of units that may be installed
    pub max_units: Option<f64>,
}

/// Battery bank parameters
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatteryParameters {
    /// Fraction of the energy drawn from the bus that ends up stored
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub charge_efficiency: Dimensionless,
    /// Fraction of the stored energy removed that reaches the bus
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub discharge_efficiency: Dimensionless,
    /// Minimum state of charge as a fraction of capacity
    #[serde(deserialize_with = "deserialise_proportion")]
    pub depth_of_discharge: Dimensionless,
    /// Time to charge fully at maximum power
    pub max_charge_time: Hours,
    /// Time to discharge fully at maximum power
    pub max_discharge_time: Hours,
    /// Project year in which the bank is replaced
    pub replacement_time: f64,
    /// Investment cost per unit of capacity
    pub investment_cost: MoneyPerEnergy,
    /// Yearly O&M cost as a fraction of the investment
    #[serde(deserialize_with = "deserialise_proportion")]
    pub om_cost: Dimensionless,
    /// Maximum capacity that may be installed
    pub max_capacity: Option<Energy>,
}

/// Diesel generator parameters
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneratorParameters {
    /// Conversion efficiency from fuel to electricity
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub efficiency: Dimensionless,
    /// Lower heating value of diesel
    pub lower_heating_value: EnergyPerFuel,
    /// Cost of diesel
    pub fuel_cost: MoneyPerFuel,
    /// Investment cost per unit of rated power
    pub investment_cost: MoneyPerPower,
    /// Yearly O&M cost as a fraction of the investment
    #[serde(deserialize_with = "deserialise_proportion")]
    pub om_cost: Dimensionless,
    /// Maximum rated power that may be installed
    pub max_capacity: Option<Power>,
}

/// Solar thermal collector parameters
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SolarCollectorParameters {
    /// Rated thermal power of a single unit
    pub nominal_capacity: Power,
    /// Investment cost per unit of rated power
    pub investment_cost: MoneyPerPower,
    /// Yearly O&M cost as a fraction of the investment
    #[serde(deserialize_with = "deserialise_proportion")]
    pub om_cost: Dimensionless,
    /// Maximum number of units per class
    pub max_units: Option<f64>,
}

/// Thermal storage tank parameters
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TankParameters {
    /// Fraction of the stored heat retained from one period to the next
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub efficiency: Dimensionless,
    /// Minimum state of charge as a fraction of capacity
    #[serde(deserialize_with = "deserialise_proportion")]
    pub depth_of_discharge: Dimensionless,
    /// Time to discharge fully at maximum power. No power limit applies if absent.
    pub max_discharge_time: Option<Hours>,
    /// Investment cost per unit of capacity
    pub investment_cost: MoneyPerEnergy,
    /// Yearly O&M cost as a fraction of the investment
    #[serde(deserialize_with = "deserialise_proportion")]
    pub om_cost: Dimensionless,
    /// Maximum capacity per class
    pub max_capacity: Option<Energy>,
}

/// Natural-gas boiler parameters
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BoilerParameters {
    /// Conversion efficiency from gas to heat
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub efficiency: Dimensionless,
    /// Lower heating value of natural gas
    pub lower_heating_value: EnergyPerFuel,
    /// Cost of natural gas
    pub fuel_cost: MoneyPerFuel,
    /// Investment cost per unit of rated power
    pub investment_cost: MoneyPerPower,
    /// Yearly O&M cost as a fraction of the investment
    #[serde(deserialize_with = "deserialise_proportion")]
    pub om_cost: Dimensionless,
    /// Maximum rated power per class
    pub max_capacity: Option<Power>,
}

/// Electric resistance heater parameters
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResistanceParameters {
    /// Conversion efficiency from electricity to heat
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub efficiency: Dimensionless,
    /// Investment cost per unit of rated power
    pub investment_cost: MoneyPerPower,
    /// Yearly O&M cost as a fraction of the investment
    #[serde(deserialize_with = "deserialise_proportion")]
    pub om_cost: Dimensionless,
    /// Maximum rated power per class
    pub max_capacity: Option<Power>,
}

/// The `[solver]` section of the model file
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SolverSettings {
    /// The LP algorithm
    #[serde(default)]
    pub method: SolverMethod,
    /// Wall-clock limit for the solve, in seconds
    pub time_limit: Option<f64>,
    /// Maximum number of solver iterations
    pub iteration_limit: Option<u32>,
    /// Tolerance on dual feasibility and on the interior-point optimality gap
    pub optimality_tolerance: Option<f64>,
    /// Tolerance on primal feasibility
    pub feasibility_tolerance: Option<f64>,
    /// Whether to presolve the problem
    #[serde(default = "default_presolve")]
    pub presolve: bool,
    /// Whether to run crossover after an interior-point solve
    #[serde(default = "default_crossover")]
    pub crossover: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            method: SolverMethod::default(),
            time_limit: None,
            iteration_limit: None,
            optimality_tolerance: None,
            feasibility_tolerance: None,
            presolve: default_presolve(),
            crossover: default_crossover(),
        }
    }
}

/// The LP algorithm used by the solver
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Default)]
pub enum SolverMethod {
    /// Let the solver decide
    #[default]
    #[string = "choose"]
    Choose,
    /// Dual or primal simplex
    #[string = "simplex"]
    Simplex,
    /// Interior point (barrier)
    #[string = "ipm"]
    InteriorPoint,
}

impl SolverMethod {
    /// The value of the solver's `solver` option for this method
    pub fn option_value(self) -> &'static str {
        match self {
            SolverMethod::Choose => "choose",
            SolverMethod::Simplex => "simplex",
            SolverMethod::InteriorPoint => "ipm",
        }
    }
}

/// Build the error for a parameter outside its domain
fn out_of_range(parameter: &'static str, expected: &str, found: String) -> SchemaError {
    SchemaError {
        parameter,
        expected: expected.to_string(),
        found,
    }
}

/// Check that the index set sizes are valid
fn check_set_sizes(project: &ProjectParameters) -> Result<(), SchemaError> {
    for (parameter, size) in [
        ("scenarios", project.scenarios),
        ("periods", project.periods),
        ("years", project.years),
    ] {
        if size == 0 {
            return Err(out_of_range(parameter, "at least 1", size.to_string()));
        }
    }

    Ok(())
}

/// Check that the `scenario_weights` parameter is valid
fn check_scenario_weights(weights: &[Dimensionless], scenarios: u32) -> Result<()> {
    ensure!(
        weights.len() == scenarios as usize,
        "`scenario_weights` must have one value per scenario (expected {scenarios}, found {})",
        weights.len()
    );
    ensure!(
        weights
            .iter()
            .all(|weight| weight.is_finite() && *weight >= Dimensionless(0.0)),
        "`scenario_weights` must be finite and non-negative"
    );

    let sum: f64 = weights.iter().map(|weight| weight.value()).sum();
    ensure!(
        approx_eq!(f64, sum, 1.0, epsilon = 1e-6),
        "`scenario_weights` must sum to one (sum is {sum})"
    );

    Ok(())
}

/// Check that the `project_years` parameter, if given, is valid
fn check_project_years(project_years: Option<&[f64]>, years: u32) -> Result<()> {
    let Some(project_years) = project_years else {
        return Ok(());
    };

    ensure!(
        project_years.len() == years as usize,
        "`project_years` must have one value per year (expected {years}, found {})",
        project_years.len()
    );
    ensure!(
        project_years
            .iter()
            .all(|year| year.is_finite() && *year >= 0.0),
        "`project_years` must be finite and non-negative"
    );

    Ok(())
}

/// Check that a rate is finite and non-negative
fn check_rate(name: &'static str, value: Dimensionless) -> Result<(), SchemaError> {
    check_non_negative(name, value.value())
}

/// Check that a value is finite and strictly positive
fn check_positive(name: &'static str, value: f64) -> Result<(), SchemaError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(out_of_range(
            name,
            "a finite number greater than zero",
            value.to_string(),
        ))
    }
}

/// Check that a value is finite and non-negative
fn check_non_negative(name: &'static str, value: f64) -> Result<(), SchemaError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(
            name,
            "a finite number greater than or equal to zero",
            value.to_string(),
        ))
    }
}

/// Check that a depth of discharge leaves some usable capacity
fn check_depth_of_discharge(name: &'static str, value: Dimensionless) -> Result<(), SchemaError> {
    if value < Dimensionless(1.0) {
        Ok(())
    } else {
        Err(out_of_range(
            name,
            "a value less than one",
            value.value().to_string(),
        ))
    }
}

/// Check that an optional capacity limit is finite and non-negative
fn check_max_capacity(name: &'static str, value: Option<f64>) -> Result<(), SchemaError> {
    value.map_or(Ok(()), |value| check_non_negative(name, value))
}

/// Check that the `[solver]` section is valid
fn check_solver_settings(solver: &SolverSettings) -> Result<(), SchemaError> {
    if let Some(time_limit) = solver.time_limit {
        check_positive("solver.time_limit", time_limit)?;
    }
    let bad_iteration_limit = solver
        .iteration_limit
        .filter(|limit| *limit == 0 || i32::try_from(*limit).is_err());
    if let Some(iteration_limit) = bad_iteration_limit {
        return Err(out_of_range(
            "solver.iteration_limit",
            &format!("a value between 1 and {}", i32::MAX),
            iteration_limit.to_string(),
        ));
    }
    if let Some(tolerance) = solver.optimality_tolerance {
        check_positive("solver.optimality_tolerance", tolerance)?;
    }
    if let Some(tolerance) = solver.feasibility_tolerance {
        check_positive("solver.feasibility_tolerance", tolerance)?;
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// The index sets described by the `[project]` section
    pub fn sets(&self) -> Sets {
        Sets::new(
            self.project.scenarios,
            self.project.periods,
            self.project.years,
            self.project.classes,
        )
    }

    /// Whether the given technology is part of the system
    pub fn has_technology(&self, technology: Technology) -> bool {
        match technology {
            Technology::Res => self.res.is_some(),
            Technology::Battery => self.battery.is_some(),
            Technology::Generator => self.generator.is_some(),
            Technology::SolarCollector => self.solar_collector.is_some(),
            Technology::Tank => self.tank.is_some(),
            Technology::Boiler => self.boiler.is_some(),
            Technology::Resistance => self.resistance.is_some(),
        }
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        let project = &self.project;
        check_scenario_weights(&project.scenario_weights, project.scenarios)?;
        check_project_years(project.project_years.as_deref(), project.years)?;
        self.check_schema()?;

        Ok(())
    }

    /// Check that every scalar parameter lies in its domain and that the technologies present
    /// can work together.
    ///
    /// This is also run when an instance is built, so models assembled in code are held to the
    /// same rules as model files.
    pub fn check_schema(&self) -> Result<(), SchemaError> {
        let project = &self.project;
        check_set_sizes(project)?;
        check_positive("delta_time", project.delta_time.value())?;
        check_rate("discount_rate", project.discount_rate)?;
        check_rate("interest_rate_loan", project.interest_rate_loan)?;
        check_non_negative("value_of_lost_load", project.value_of_lost_load.value())?;

        // proportions already validated with deserialise_proportion
        check_solver_settings(&self.solver)?;
        self.check_technologies()
    }

    /// Check technology-specific values and the dependencies between technologies
    fn check_technologies(&self) -> Result<(), SchemaError> {
        for technology in Technology::iter_enabled(self) {
            if technology.is_thermal() && self.project.classes == 0 {
                return Err(out_of_range(
                    technology.into(),
                    "at least one thermal class",
                    "classes = 0".to_string(),
                ));
            }
            let missing = technology
                .delivers_into()
                .filter(|required| !self.has_technology(*required));
            if let Some(required) = missing {
                return Err(out_of_range(
                    technology.into(),
                    &format!("a [{required}] section to deliver heat into"),
                    format!("no [{required}] section"),
                ));
            }
        }

        if let Some(res) = &self.res {
            check_positive("res.nominal_capacity", res.nominal_capacity.value())?;
            check_non_negative("res.investment_cost", res.investment_cost.value())?;
            check_max_capacity("res.max_units", res.max_units)?;
        }
        if let Some(battery) = &self.battery {
            check_depth_of_discharge("battery.depth_of_discharge", battery.depth_of_discharge)?;
            check_positive("battery.max_charge_time", battery.max_charge_time.value())?;
            check_positive("battery.max_discharge_time", battery.max_discharge_time.value())?;
            check_non_negative("battery.replacement_time", battery.replacement_time)?;
            check_non_negative("battery.investment_cost", battery.investment_cost.value())?;
            check_max_capacity("battery.max_capacity", battery.max_capacity.map(Energy::value))?;
        }
        if let Some(generator) = &self.generator {
            check_positive(
                "generator.lower_heating_value",
                generator.lower_heating_value.value(),
            )?;
            check_non_negative("generator.fuel_cost", generator.fuel_cost.value())?;
            check_non_negative("generator.investment_cost", generator.investment_cost.value())?;
            check_max_capacity(
                "generator.max_capacity",
                generator.max_capacity.map(Power::value),
            )?;
        }
        if let Some(collector) = &self.solar_collector {
            check_positive(
                "solar_collector.nominal_capacity",
                collector.nominal_capacity.value(),
            )?;
            check_non_negative(
                "solar_collector.investment_cost",
                collector.investment_cost.value(),
            )?;
            check_max_capacity("solar_collector.max_units", collector.max_units)?;
        }
        if let Some(tank) = &self.tank {
            check_depth_of_discharge("tank.depth_of_discharge", tank.depth_of_discharge)?;
            if let Some(max_discharge_time) = tank.max_discharge_time {
                check_positive("tank.max_discharge_time", max_discharge_time.value())?;
            }
            check_non_negative("tank.investment_cost", tank.investment_cost.value())?;
            check_max_capacity("tank.max_capacity", tank.max_capacity.map(Energy::value))?;
        }
        if let Some(boiler) = &self.boiler {
            check_positive("boiler.lower_heating_value", boiler.lower_heating_value.value())?;
            check_non_negative("boiler.fuel_cost", boiler.fuel_cost.value())?;
            check_non_negative("boiler.investment_cost", boiler.investment_cost.value())?;
            check_max_capacity("boiler.max_capacity", boiler.max_capacity.map(Power::value))?;
        }
        if let Some(resistance) = &self.resistance {
            check_non_negative("resistance.investment_cost", resistance.investment_cost.value())?;
            check_max_capacity(
                "resistance.max_capacity",
                resistance.max_capacity.map(Power::value),
            )?;
        }

        Ok(())
    }
}
