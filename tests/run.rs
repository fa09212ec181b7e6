//! Integration tests for the `run` command.
use mes_sizing::cli::{RunOpts, handle_run_command};
use mes_sizing::settings::Settings;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/multi_energy")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("MES_SIZING_LOG_LEVEL", "off") };

    {
        // Save results to non-existent directory to check that directory creation works
        let tempdir = tempdir().unwrap();
        let output_dir = tempdir.path().join("results");
        let opts = RunOpts {
            output_dir: Some(output_dir.clone()),
            overwrite: false,
            debug_model: true,
        };
        handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();

        for file_name in [
            "capacities.csv",
            "scenario_costs.csv",
            "system_costs.csv",
            "electric_dispatch.csv",
            "thermal_dispatch.csv",
            "debug_constraints.csv",
            "metadata.toml",
            "mes_sizing_info.log",
        ] {
            assert!(output_dir.join(file_name).is_file(), "Missing {file_name}");
        }
    }

    // Second time will fail because the logging is already initialised
    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        ..Default::default()
    };
    assert_eq!(
        handle_run_command(&get_model_dir(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
