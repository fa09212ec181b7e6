//! Code for writing metadata to file
use crate::model::Model;
use crate::model::technology::{SystemKind, Technology};
use anyhow::{Context, Result};
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get information about program version from git
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    model: ModelMetadata,
    program: ProgramMetadata<'a>,
    platform: PlatformMetadata,
}

/// Information about the model run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the model which was run
    model_path: &'a Path,
    /// The date and time on which the run started
    datetime: String,
}

impl<'a> RunMetadata<'a> {
    fn new(model_path: &'a Path) -> Self {
        let dt = Local::now();
        Self {
            model_path,
            datetime: dt.to_rfc2822(),
        }
    }
}

/// The shape of the system which was sized
#[derive(Serialize)]
struct ModelMetadata {
    /// Broad classification of the technology mix
    system: String,
    /// Technologies present in the model file
    technologies: Vec<String>,
    scenarios: u32,
    periods: u32,
    years: u32,
    classes: u32,
}

impl ModelMetadata {
    fn new(model: &Model) -> Self {
        let sets = model.sets;
        Self {
            system: SystemKind::classify(&model.parameters).to_string(),
            technologies: Technology::iter_enabled(&model.parameters)
                .map(|technology| technology.to_string())
                .collect(),
            scenarios: sets.scenarios,
            periods: sets.periods,
            years: sets.years,
            classes: sets.classes,
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// The target architecture for the build (e.g. x86_64-unknown-linux-gnu)
    target: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
    /// The version of rustc used to compile the program
    rustc_version: &'a str,
    /// When the program was built
    build_time_utc: &'a str,
    /// The git commit hash of the build (if known)
    git_commit_hash: String,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// Information about the platform the optimiser is running on.
///
/// The fields correspond to different data available from the [`PlatformInfo`] struct.
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    fn new() -> Result<Self> {
        let info = PlatformInfo::new()
            .ok()
            .context("Unable to determine platform info")?;
        Ok(Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        })
    }
}

/// Write metadata to the specified output path in TOML format
pub fn write_metadata(output_path: &Path, model_path: &Path, model: &Model) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(model_path),
        model: ModelMetadata::new(model),
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::new()?,
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::multi_energy_model;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_write_metadata(multi_energy_model: Model) {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), Path::new("some_model"), &multi_energy_model).unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let table: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(table["run"]["model_path"].as_str(), Some("some_model"));
        assert_eq!(
            table["model"]["system"].as_str(),
            Some("multi-energy system")
        );
        assert_eq!(table["model"]["classes"].as_integer(), Some(2));
        assert_eq!(table["program"]["name"].as_str(), Some("mes-sizing"));
    }
}
