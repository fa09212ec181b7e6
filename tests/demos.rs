//! Check that every bundled demo model loads and solves to a consistent optimum.
use mes_sizing::input::load_model;
use mes_sizing::model::{SolverMethod, SolverSettings};
use mes_sizing::optimisation::{ModelError, build_instance};
use mes_sizing::units::Money;
use rstest::rstest;
use std::path::Path;

#[rstest]
#[case("conventional_microgrid")]
#[case("multi_energy")]
#[case("traditional")]
fn test_demo_solves(#[case] name: &str) {
    let model = load_model(Path::new("demos").join(name)).unwrap();
    let instance = build_instance(&model).unwrap();
    let solution = instance.solve(&model.parameters.solver).unwrap();

    assert!(solution.objective_value() > Money(0.0));
    for (group, _, violation) in solution.group_violations() {
        assert!(violation < 1e-5, "Group {group} violated by {violation}");
    }
}

/// A solve cut short by the iteration limit is reported as not converged
#[test]
fn test_iteration_limit() {
    let model = load_model(Path::new("demos").join("multi_energy")).unwrap();
    let instance = build_instance(&model).unwrap();
    let settings = SolverSettings {
        method: SolverMethod::Simplex,
        presolve: false,
        iteration_limit: Some(1),
        ..SolverSettings::default()
    };

    assert!(matches!(
        instance.solve(&settings),
        Err(ModelError::NonConvergence(_))
    ));
}
