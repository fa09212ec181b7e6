//! Code for reading the time-series tables of a model.
//!
//! Tables are in long format, with one row per index tuple. Only the tables required by the
//! enabled technologies are read.
use super::{input_err_msg, read_csv};
use crate::index::{Class, Period, Scenario, Sets};
use crate::model::{ModelData, ModelParameters};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const ELECTRIC_DEMAND_FILE_NAME: &str = "electric_demand.csv";
const THERMAL_DEMAND_FILE_NAME: &str = "thermal_demand.csv";
const RES_PRODUCTION_FILE_NAME: &str = "res_production.csv";
const SC_PRODUCTION_FILE_NAME: &str = "sc_production.csv";

/// A row of a table indexed by scenario and period
#[derive(Debug, Deserialize, PartialEq)]
struct ScenarioPeriodValue {
    scenario: u32,
    period: u32,
    value: f64,
}

/// A row of a table indexed by scenario, thermal class and period
#[derive(Debug, Deserialize, PartialEq)]
struct ScenarioClassPeriodValue {
    scenario: u32,
    class: u32,
    period: u32,
    value: f64,
}

type ScenarioPeriodTable = HashMap<(u32, u32), f64>;
type ScenarioClassPeriodTable = HashMap<(u32, u32, u32), f64>;

/// The time series read from a model directory
#[derive(Debug, Default, PartialEq)]
pub struct TimeSeriesData {
    electric_demand: ScenarioPeriodTable,
    thermal_demand: ScenarioClassPeriodTable,
    res_production: ScenarioPeriodTable,
    sc_production: ScenarioClassPeriodTable,
}

impl ModelData for TimeSeriesData {
    fn electric_energy_demand(&self, scenario: Scenario, period: Period) -> Option<f64> {
        self.electric_demand
            .get(&(scenario.get(), period.get()))
            .copied()
    }

    fn thermal_energy_demand(&self, scenario: Scenario, class: Class, period: Period) -> Option<f64> {
        self.thermal_demand
            .get(&(scenario.get(), class.get(), period.get()))
            .copied()
    }

    fn res_energy_production(&self, scenario: Scenario, period: Period) -> Option<f64> {
        self.res_production
            .get(&(scenario.get(), period.get()))
            .copied()
    }

    fn sc_energy_production(&self, scenario: Scenario, class: Class, period: Period) -> Option<f64> {
        self.sc_production
            .get(&(scenario.get(), class.get(), period.get()))
            .copied()
    }
}

/// Read the time-series tables required by the given parameters.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `parameters` - The contents of the model file
pub fn read_time_series(model_dir: &Path, parameters: &ModelParameters) -> Result<TimeSeriesData> {
    let sets = parameters.sets();
    let mut data = TimeSeriesData {
        electric_demand: read_scenario_period_file(
            &model_dir.join(ELECTRIC_DEMAND_FILE_NAME),
            &sets,
        )?,
        ..Default::default()
    };

    if sets.classes > 0 {
        data.thermal_demand =
            read_scenario_class_period_file(&model_dir.join(THERMAL_DEMAND_FILE_NAME), &sets)?;
    }
    if parameters.res.is_some() {
        data.res_production =
            read_scenario_period_file(&model_dir.join(RES_PRODUCTION_FILE_NAME), &sets)?;
    }
    if parameters.solar_collector.is_some() {
        data.sc_production =
            read_scenario_class_period_file(&model_dir.join(SC_PRODUCTION_FILE_NAME), &sets)?;
    }

    Ok(data)
}

fn read_scenario_period_file(file_path: &Path, sets: &Sets) -> Result<ScenarioPeriodTable> {
    let iter = read_csv(file_path)?;
    read_scenario_period_from_iter(iter, sets).with_context(|| input_err_msg(file_path))
}

fn read_scenario_class_period_file(
    file_path: &Path,
    sets: &Sets,
) -> Result<ScenarioClassPeriodTable> {
    let iter = read_csv(file_path)?;
    read_scenario_class_period_from_iter(iter, sets).with_context(|| input_err_msg(file_path))
}

/// Check that an index lies within `1..=count`
fn check_index(name: &str, value: u32, count: u32) -> Result<()> {
    ensure!(
        (1..=count).contains(&value),
        "Invalid {name} {value}: must be between 1 and {count}"
    );

    Ok(())
}

fn read_scenario_period_from_iter<I>(iter: I, sets: &Sets) -> Result<ScenarioPeriodTable>
where
    I: Iterator<Item = ScenarioPeriodValue>,
{
    let mut table = ScenarioPeriodTable::new();
    for row in iter {
        check_index("scenario", row.scenario, sets.scenarios)?;
        check_index("period", row.period, sets.periods)?;
        ensure!(
            row.value.is_finite(),
            "Invalid value {} for scenario {}, period {}",
            row.value,
            row.scenario,
            row.period
        );
        ensure!(
            table.insert((row.scenario, row.period), row.value).is_none(),
            "Duplicate entry for scenario {}, period {}",
            row.scenario,
            row.period
        );
    }

    Ok(table)
}

fn read_scenario_class_period_from_iter<I>(
    iter: I,
    sets: &Sets,
) -> Result<ScenarioClassPeriodTable>
where
    I: Iterator<Item = ScenarioClassPeriodValue>,
{
    let mut table = ScenarioClassPeriodTable::new();
    for row in iter {
        check_index("scenario", row.scenario, sets.scenarios)?;
        check_index("class", row.class, sets.classes)?;
        check_index("period", row.period, sets.periods)?;
        ensure!(
            row.value.is_finite(),
            "Invalid value {} for scenario {}, class {}, period {}",
            row.value,
            row.scenario,
            row.class,
            row.period
        );
        ensure!(
            table
                .insert((row.scenario, row.class, row.period), row.value)
                .is_none(),
            "Duplicate entry for scenario {}, class {}, period {}",
            row.scenario,
            row.class,
            row.period
        );
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn row(scenario: u32, period: u32, value: f64) -> ScenarioPeriodValue {
        ScenarioPeriodValue {
            scenario,
            period,
            value,
        }
    }

    #[test]
    fn test_read_scenario_period_from_iter() {
        let sets = Sets::new(2, 2, 1, 0);
        let table = read_scenario_period_from_iter(
            [row(1, 1, 5.0), row(1, 2, 6.0), row(2, 1, 7.0)].into_iter(),
            &sets,
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_approx_eq!(f64, table[&(2, 1)], 7.0);
    }

    #[rstest]
    #[case(row(3, 1, 1.0), "Invalid scenario 3: must be between 1 and 2")]
    #[case(row(1, 0, 1.0), "Invalid period 0: must be between 1 and 2")]
    #[case(row(1, 1, f64::NAN), "Invalid value NaN for scenario 1, period 1")]
    fn test_read_scenario_period_from_iter_bad_row(
        #[case] bad: ScenarioPeriodValue,
        #[case] msg: &str,
    ) {
        let sets = Sets::new(2, 2, 1, 0);
        assert_error!(
            read_scenario_period_from_iter([bad].into_iter(), &sets),
            msg
        );
    }

    #[test]
    fn test_read_scenario_period_from_iter_duplicate() {
        let sets = Sets::new(1, 2, 1, 0);
        assert_error!(
            read_scenario_period_from_iter([row(1, 1, 1.0), row(1, 1, 2.0)].into_iter(), &sets),
            "Duplicate entry for scenario 1, period 1"
        );
    }

    #[test]
    fn test_read_scenario_class_period_from_iter() {
        let sets = Sets::new(1, 1, 1, 2);
        let rows = [
            ScenarioClassPeriodValue {
                scenario: 1,
                class: 2,
                period: 1,
                value: 3.5,
            },
            ScenarioClassPeriodValue {
                scenario: 1,
                class: 3,
                period: 1,
                value: 1.0,
            },
        ];
        assert_error!(
            read_scenario_class_period_from_iter(rows.into_iter(), &sets),
            "Invalid class 3: must be between 1 and 2"
        );
    }

    #[test]
    fn test_read_scenario_period_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(ELECTRIC_DEMAND_FILE_NAME);
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "scenario,period,value\n1,1,10.0\n1,2,12.5").unwrap();
        }
        let table = read_scenario_period_file(&file_path, &Sets::new(1, 2, 1, 0)).unwrap();
        assert_approx_eq!(f64, table[&(1, 2)], 12.5);
    }
}
