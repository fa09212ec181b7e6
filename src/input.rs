//! Common routines for handling input data.
use crate::model::{Model, ModelParameters};
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod time_series;
use time_series::read_time_series;

/// Read a series of type `T`s from a CSV file.
///
/// Whitespace around fields is trimmed. An empty file (header only) is treated as an error.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<impl Iterator<Item = T> + use<T>> {
    let vec: Vec<T> = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;
    ensure!(
        !vec.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(vec.into_iter())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a [`Dimensionless`] value, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(Dimensionless(value))
}

/// Read a [`Dimensionless`] value, checking that it is between 0 and 1 and not zero
pub fn deserialise_proportion_nonzero<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialise_proportion(deserialiser)?;
    if value == Dimensionless(0.0) {
        Err(serde::de::Error::custom("Value cannot be zero"))?;
    }

    Ok(value)
}

/// Read a model from the specified directory.
///
/// The parameter file is read first. Its technology sections determine which time-series tables
/// are required.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The loaded model, with every time series bound, or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let data = read_time_series(model_dir, &parameters)?;
    let model = Model::new(parameters, &data)
        .with_context(|| format!("Invalid model in {}", model_dir.display()))?;

    Ok(model)
}
