//! The module responsible for writing output data to disk.
use crate::finance::{levelised_cost_of_energy, present_value_over_years};
use crate::index::{Class, Period, Scenario, Sets};
use crate::model::Model;
use crate::model::technology::Technology;
use crate::optimisation::Solution;
use crate::optimisation::expression::VarId;
use crate::units::Energy;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "mes_sizing_results";

/// The output file name for technology sizes
const CAPACITIES_FILE_NAME: &str = "capacities.csv";

/// The output file name for per-scenario costs
const SCENARIO_COSTS_FILE_NAME: &str = "scenario_costs.csv";

/// The output file name for scenario-independent costs
const SYSTEM_COSTS_FILE_NAME: &str = "system_costs.csv";

/// The output file name for the electric dispatch
const ELECTRIC_DISPATCH_FILE_NAME: &str = "electric_dispatch.csv";

/// The output file name for the thermal dispatch
const THERMAL_DISPATCH_FILE_NAME: &str = "thermal_dispatch.csv";

/// The output file name for the constraint violation report
const CONSTRAINTS_FILE_NAME: &str = "debug_constraints.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model specified at `model_dir`.
///
/// A non-empty existing directory is only replaced if `allow_overwrite` is set.
///
/// # Returns
///
/// Whether an existing directory was overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the capacities CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CapacityRow {
    technology: String,
    class: Option<u32>,
    /// Number of units, for technologies sized in units
    units: Option<f64>,
    /// Power or energy capacity
    capacity: f64,
}

impl CapacityRow {
    fn new(technology: Technology, class: Option<Class>, units: Option<f64>, capacity: f64) -> Self {
        Self {
            technology: technology.to_string(),
            class: class.map(Class::get),
            units,
            capacity,
        }
    }
}

/// Represents a row in the scenario costs CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ScenarioCostRow {
    scenario: u32,
    weight: f64,
    net_present_cost: f64,
    diesel_cost: Option<f64>,
    natural_gas_cost: Option<f64>,
    lost_load_cost_electric: f64,
    lost_load_cost_thermal: Option<f64>,
}

/// Represents a row in the system costs CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SystemCostRow {
    item: String,
    value: f64,
}

/// Represents a row in the electric dispatch CSV file.
///
/// Columns for technologies absent from the model are left empty.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ElectricDispatchRow {
    scenario: u32,
    period: u32,
    demand: f64,
    res_production: Option<f64>,
    generator_production: Option<f64>,
    battery_flow_in: Option<f64>,
    battery_flow_out: Option<f64>,
    battery_state_of_charge: Option<f64>,
    resistance_demand: Option<f64>,
    curtailment: f64,
    lost_load: f64,
}

/// Represents a row in the thermal dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ThermalDispatchRow {
    scenario: u32,
    class: u32,
    period: u32,
    demand: f64,
    sc_production: Option<f64>,
    boiler_production: Option<f64>,
    resistance_consumption: Option<f64>,
    tank_flow_out: Option<f64>,
    tank_state_of_charge: Option<f64>,
    curtailment: f64,
    lost_load: f64,
}

/// Represents a row in the constraint violation report
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ConstraintGroupRow {
    group: String,
    rows: usize,
    max_violation: f64,
}

/// Expected energy served per year, discounted over the project.
///
/// This is the denominator of the levelised cost of energy.
fn discounted_energy_served(solution: &Solution) -> Energy {
    let model = solution.model();
    let vars = solution.variables();
    let sets = &model.sets;

    let served_in_scenario = |i: Scenario| {
        let electric: f64 = sets
            .iter_periods()
            .map(|t| {
                model.electric_demand[(i, t)].value() - solution.value(vars.balance.lost_load[(i, t)])
            })
            .sum();
        let thermal: f64 = vars.thermal.as_ref().map_or(0.0, |thermal| {
            sets.iter_class_periods()
                .map(|(c, t)| {
                    let key = (i, c, t);
                    model.thermal_demand[key].value() - solution.value(thermal.lost_load[key])
                })
                .sum()
        });
        Energy(electric + thermal)
    };
    let yearly: Energy = sets
        .iter_scenarios()
        .map(|i| model.scenario_weights[i] * served_in_scenario(i))
        .sum();

    present_value_over_years(
        sets,
        model.parameters.project.discount_rate,
        |year| model.project_years[year],
        |_| yearly,
    )
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    constraints_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        Ok(Self {
            constraints_writer: csv::Writer::from_path(output_path.join(CONSTRAINTS_FILE_NAME))?,
        })
    }

    /// Write the size and largest violation of every constraint group
    fn write_constraint_report(&mut self, solution: &Solution) -> Result<()> {
        for (group, rows, max_violation) in solution.group_violations() {
            self.constraints_writer.serialize(ConstraintGroupRow {
                group: group.to_string(),
                rows,
                max_violation,
            })?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.constraints_writer.flush()?;

        Ok(())
    }
}

/// An object for writing the results of a solved model to file
pub struct DataWriter {
    capacities_writer: csv::Writer<File>,
    scenario_costs_writer: csv::Writer<File>,
    system_costs_writer: csv::Writer<File>,
    electric_dispatch_writer: csv::Writer<File>,
    thermal_dispatch_writer: Option<csv::Writer<File>>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `sets` - Index sets of the model. The thermal dispatch is only written if there are
    ///   thermal classes.
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, sets: &Sets, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let thermal_dispatch_writer = if sets.classes > 0 {
            Some(new_writer(THERMAL_DISPATCH_FILE_NAME)?)
        } else {
            None
        };
        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            capacities_writer: new_writer(CAPACITIES_FILE_NAME)?,
            scenario_costs_writer: new_writer(SCENARIO_COSTS_FILE_NAME)?,
            system_costs_writer: new_writer(SYSTEM_COSTS_FILE_NAME)?,
            electric_dispatch_writer: new_writer(ELECTRIC_DISPATCH_FILE_NAME)?,
            thermal_dispatch_writer,
            debug_writer,
        })
    }

    /// Write every result of a solved model
    pub fn write_solution(&mut self, solution: &Solution) -> Result<()> {
        self.write_capacities(solution)?;
        self.write_scenario_costs(solution)?;
        self.write_system_costs(solution)?;
        self.write_electric_dispatch(solution)?;
        self.write_thermal_dispatch(solution)?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_constraint_report(solution)?;
        }

        Ok(())
    }

    /// Write the optimal size of every technology
    fn write_capacities(&mut self, solution: &Solution) -> Result<()> {
        let model = solution.model();
        let vars = solution.variables();
        let params = &model.parameters;
        let value = |var: VarId| solution.value(var);
        let mut rows = Vec::new();

        if let (Some(res), Some(res_vars)) = (&params.res, &vars.res) {
            let units = value(res_vars.units);
            rows.push(CapacityRow::new(
                Technology::Res,
                None,
                Some(units),
                units * res.nominal_capacity.value(),
            ));
        }
        if let Some(battery) = &vars.battery {
            rows.push(CapacityRow::new(
                Technology::Battery,
                None,
                None,
                value(battery.nominal_capacity),
            ));
        }
        if let Some(generator) = &vars.generator {
            rows.push(CapacityRow::new(
                Technology::Generator,
                None,
                None,
                value(generator.nominal_capacity),
            ));
        }
        for c in model.sets.iter_classes() {
            if let (Some(collector), Some(sc_vars)) = (&params.solar_collector, &vars.solar_collector)
            {
                let units = value(sc_vars.units[c]);
                rows.push(CapacityRow::new(
                    Technology::SolarCollector,
                    Some(c),
                    Some(units),
                    units * collector.nominal_capacity.value(),
                ));
            }
            if let Some(tank) = &vars.tank {
                rows.push(CapacityRow::new(
                    Technology::Tank,
                    Some(c),
                    None,
                    value(tank.nominal_capacity[c]),
                ));
            }
            if let Some(boiler) = &vars.boiler {
                rows.push(CapacityRow::new(
                    Technology::Boiler,
                    Some(c),
                    None,
                    value(boiler.nominal_capacity[c]),
                ));
            }
            if let Some(resistance) = &vars.resistance {
                rows.push(CapacityRow::new(
                    Technology::Resistance,
                    Some(c),
                    None,
                    value(resistance.nominal_power[c]),
                ));
            }
        }

        for row in rows {
            self.capacities_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the net present cost of each scenario and its scenario-dependent terms
    fn write_scenario_costs(&mut self, solution: &Solution) -> Result<()> {
        let model = solution.model();
        let vars = solution.variables();
        for i in model.sets.iter_scenarios() {
            let row = ScenarioCostRow {
                scenario: i.get(),
                weight: model.scenario_weights[i].value(),
                net_present_cost: solution.value(vars.costs.scenario_net_present_cost[i]),
                diesel_cost: vars.generator.as_ref().map(|g| solution.value(g.fuel_cost[i])),
                natural_gas_cost: vars.boiler.as_ref().map(|b| solution.value(b.fuel_cost[i])),
                lost_load_cost_electric: solution.value(vars.costs.lost_load_cost[i]),
                lost_load_cost_thermal: vars
                    .thermal
                    .as_ref()
                    .map(|thermal| solution.value(thermal.lost_load_cost[i])),
            };
            self.scenario_costs_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the scenario-independent cost terms, the objective and the levelised cost of energy
    fn write_system_costs(&mut self, solution: &Solution) -> Result<()> {
        let vars = solution.variables();
        let costs = &vars.costs;
        let mut items = vec![
            ("initial_investment_cost", costs.initial_investment),
            ("operation_maintenance_cost", costs.operation_maintenance),
            ("loan_financial_cost", costs.loan_financial),
            ("total_financial_cost", costs.total_financial),
        ];
        items.extend(
            vars.battery
                .as_ref()
                .map(|b| ("battery_replacement_cost", b.replacement_cost)),
        );
        items.extend(
            vars.solar_collector
                .as_ref()
                .map(|sc| ("sc_financial_cost", sc.financial_cost)),
        );
        items.extend(
            vars.tank
                .as_ref()
                .map(|tank| ("tank_financial_cost", tank.financial_cost)),
        );
        items.extend(
            vars.boiler
                .as_ref()
                .map(|boiler| ("boiler_financial_cost", boiler.financial_cost)),
        );
        items.extend(
            vars.resistance
                .as_ref()
                .map(|resistance| ("resistance_financial_cost", resistance.financial_cost)),
        );

        let mut rows: Vec<_> = items
            .into_iter()
            .map(|(item, var)| SystemCostRow {
                item: item.to_string(),
                value: solution.value(var),
            })
            .collect();
        let objective = solution.objective_value();
        rows.push(SystemCostRow {
            item: "expected_net_present_cost".to_string(),
            value: objective.value(),
        });
        if let Some(lcoe) = levelised_cost_of_energy(objective, discounted_energy_served(solution))
        {
            rows.push(SystemCostRow {
                item: "levelised_cost_of_energy".to_string(),
                value: lcoe.value(),
            });
        }

        for row in rows {
            self.system_costs_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the electric balance terms of every period
    fn write_electric_dispatch(&mut self, solution: &Solution) -> Result<()> {
        let model = solution.model();
        let vars = solution.variables();
        for (i, t) in model.sets.iter_scenario_periods() {
            let key = (i, t);
            let row = ElectricDispatchRow {
                scenario: i.get(),
                period: t.get(),
                demand: model.electric_demand[key].value(),
                res_production: vars.res.as_ref().map(|r| solution.value(r.production[key])),
                generator_production: vars
                    .generator
                    .as_ref()
                    .map(|g| solution.value(g.production[key])),
                battery_flow_in: vars.battery.as_ref().map(|b| solution.value(b.flow_in[key])),
                battery_flow_out: vars.battery.as_ref().map(|b| solution.value(b.flow_out[key])),
                battery_state_of_charge: vars
                    .battery
                    .as_ref()
                    .map(|b| solution.value(b.state_of_charge[key])),
                resistance_demand: vars
                    .resistance
                    .as_ref()
                    .map(|r| solution.value(r.total_demand[key])),
                curtailment: solution.value(vars.balance.curtailment[key]),
                lost_load: solution.value(vars.balance.lost_load[key]),
            };
            self.electric_dispatch_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the thermal balance terms of every class and period
    fn write_thermal_dispatch(&mut self, solution: &Solution) -> Result<()> {
        let (Some(wtr), Some(thermal)) = (
            &mut self.thermal_dispatch_writer,
            &solution.variables().thermal,
        ) else {
            return Ok(());
        };

        let model = solution.model();
        let vars = solution.variables();
        for key in model.sets.iter_scenario_class_periods() {
            let (i, c, t): (Scenario, Class, Period) = key;
            let row = ThermalDispatchRow {
                scenario: i.get(),
                class: c.get(),
                period: t.get(),
                demand: model.thermal_demand[key].value(),
                sc_production: vars
                    .solar_collector
                    .as_ref()
                    .map(|sc| solution.value(sc.production[key])),
                boiler_production: vars
                    .boiler
                    .as_ref()
                    .map(|b| solution.value(b.production[key])),
                resistance_consumption: vars
                    .resistance
                    .as_ref()
                    .map(|r| solution.value(r.thermal_energy[key])),
                tank_flow_out: vars.tank.as_ref().map(|tank| solution.value(tank.flow_out[key])),
                tank_state_of_charge: vars
                    .tank
                    .as_ref()
                    .map(|tank| solution.value(tank.state_of_charge[key])),
                curtailment: solution.value(thermal.curtailment[key]),
                lost_load: solution.value(thermal.lost_load[key]),
            };
            wtr.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.capacities_writer.flush()?;
        self.scenario_costs_writer.flush()?;
        self.system_costs_writer.flush()?;
        self.electric_dispatch_writer.flush()?;
        if let Some(wtr) = &mut self.thermal_dispatch_writer {
            wtr.flush()?;
        }
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

/// Write the results of a solved model to the output folder
pub fn write_results(output_path: &Path, solution: &Solution, save_debug_info: bool) -> Result<()> {
    let model: &Model = solution.model();
    let mut writer = DataWriter::create(output_path, &model.sets, save_debug_info)?;
    writer.write_solution(solution)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{electric_model, multi_energy_model};
    use crate::model::SolverSettings;
    use crate::optimisation::build_instance;
    use itertools::Itertools;
    use rstest::rstest;
    use tempfile::tempdir;

    fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
        csv::Reader::from_path(path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[test]
    fn test_create_output_directory_new() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("a").join("b");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path();

        // Empty folder is reused
        assert!(!create_output_directory(output_dir, false).unwrap());

        // Non-empty folder needs permission to overwrite
        fs::write(output_dir.join("file.txt"), "contents").unwrap();
        assert!(create_output_directory(output_dir, false).is_err());
        assert!(create_output_directory(output_dir, true).unwrap());
        assert!(!output_dir.join("file.txt").exists());
    }

    #[rstest]
    fn test_write_results_electric(electric_model: Model) {
        let instance = build_instance(&electric_model).unwrap();
        let solution = instance.solve(&SolverSettings::default()).unwrap();
        let dir = tempdir().unwrap();
        write_results(dir.path(), &solution, true).unwrap();

        let capacities: Vec<CapacityRow> = read_rows(&dir.path().join(CAPACITIES_FILE_NAME));
        assert_eq!(
            capacities.iter().map(|row| row.technology.as_str()).collect_vec(),
            ["res", "battery", "generator"]
        );
        assert!(capacities.iter().all(|row| row.class.is_none()));

        let dispatch: Vec<ElectricDispatchRow> =
            read_rows(&dir.path().join(ELECTRIC_DISPATCH_FILE_NAME));
        assert_eq!(dispatch.len(), 2);
        float_cmp::assert_approx_eq!(f64, dispatch[1].demand, 20.0);
        assert!(dispatch[0].resistance_demand.is_none());
        assert!(!dir.path().join(THERMAL_DISPATCH_FILE_NAME).exists());

        let costs: Vec<SystemCostRow> = read_rows(&dir.path().join(SYSTEM_COSTS_FILE_NAME));
        let objective = costs
            .iter()
            .find(|row| row.item == "expected_net_present_cost")
            .unwrap();
        float_cmp::assert_approx_eq!(
            f64,
            objective.value,
            solution.objective_value().value(),
            epsilon = 1e-9
        );
        assert!(costs.iter().any(|row| row.item == "levelised_cost_of_energy"));

        let report: Vec<ConstraintGroupRow> = read_rows(&dir.path().join(CONSTRAINTS_FILE_NAME));
        assert!(report.iter().all(|row| row.max_violation < 1e-6));
        assert_eq!(
            report.iter().map(|row| row.rows).sum::<usize>(),
            instance.constraints().len()
        );
    }

    #[rstest]
    fn test_write_results_multi_energy(multi_energy_model: Model) {
        let instance = build_instance(&multi_energy_model).unwrap();
        let solution = instance.solve(&SolverSettings::default()).unwrap();
        let dir = tempdir().unwrap();
        write_results(dir.path(), &solution, false).unwrap();

        let sets = multi_energy_model.sets;
        let dispatch: Vec<ThermalDispatchRow> =
            read_rows(&dir.path().join(THERMAL_DISPATCH_FILE_NAME));
        assert_eq!(
            dispatch.len(),
            (sets.scenarios * sets.classes * sets.periods) as usize
        );
        assert!(dispatch.iter().all(|row| row.tank_state_of_charge.is_some()));

        let costs: Vec<ScenarioCostRow> = read_rows(&dir.path().join(SCENARIO_COSTS_FILE_NAME));
        assert_eq!(costs.len(), sets.scenarios as usize);
        assert!(costs.iter().all(|row| row.natural_gas_cost.is_some()));
        assert!(!dir.path().join(CONSTRAINTS_FILE_NAME).exists());
    }
}
