//! Assembly and solution of the sizing problem.
//!
//! The model is turned into an [`Instance`]: its decision variables, every registered constraint
//! group and the objective. The instance is then handed to HiGHS as a linear programme.
use crate::model::{Model, SchemaError, SolverSettings};
use crate::units::Money;
use highs::{HighsModelStatus, HighsStatus, RowProblem as Problem, Sense};
use log::{LevelFilter, debug, info, warn};
use std::error::Error;
use std::fmt;
use std::ops::Bound;

pub mod constraints;
pub mod expression;
pub mod schema;
use constraints::{ConstraintSet, build_constraints};
use expression::{LinearExpr, VarId};
use schema::{ModelContext, VariableDefinition, Variables};

/// Defines the possible errors that can occur when building or solving an instance
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The data do not fit the index sets
    Schema(SchemaError),
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// No sizing can meet demand within the permitted lost load
    Infeasible,
    /// The objective can be decreased without limit
    Unbounded,
    /// The solver could not tell an infeasible model from an unbounded one, even without presolve
    UnboundedOrInfeasible,
    /// The solver stopped without proving optimality (e.g. a time or iteration limit was hit)
    NonConvergence(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Schema(err) => write!(f, "{err}"),
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::Infeasible => write!(
                f,
                "The model is infeasible: demand cannot be met within the lost load tolerance"
            ),
            ModelError::Unbounded => write!(f, "The model is unbounded"),
            ModelError::UnboundedOrInfeasible => {
                write!(f, "The model is either unbounded or infeasible")
            }
            ModelError::NonConvergence(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelError::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchemaError> for ModelError {
    fn from(err: SchemaError) -> Self {
        ModelError::Schema(err)
    }
}

/// A model turned into a linear programme, ready to be solved
pub struct Instance<'a> {
    model: &'a Model,
    variables: Variables,
    constraints: ConstraintSet,
    objective: LinearExpr,
}

/// Validate the model and build its linear programme
pub fn build_instance(model: &Model) -> Result<Instance<'_>, ModelError> {
    model.validate()?;

    let variables = Variables::declare(model);
    let ctx = ModelContext::new(model, &variables);
    let constraints = build_constraints(&ctx);
    let objective = constraints::costs::objective(&ctx);
    debug!(
        "Built instance with {} variables and {} constraints",
        variables.registry.len(),
        constraints.len()
    );

    Ok(Instance {
        model,
        variables,
        constraints,
        objective,
    })
}

impl<'a> Instance<'a> {
    /// The model the instance was built from
    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// The decision variables
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// The registered constraint groups
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// The expected net present cost, as a function of the decision variables
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Convert the instance into a HiGHS problem
    fn to_problem(&self) -> Problem {
        let mut problem = Problem::default();
        let mut cost = vec![0.0; self.variables.registry.len()];
        for (var, coeff) in self.objective.merged_terms() {
            cost[var.index()] = coeff;
        }

        let columns: Vec<_> = self
            .variables
            .registry
            .iter()
            .zip(cost)
            .map(|(def, cost)| problem.add_column(cost, to_range(def.domain.bounds())))
            .collect();

        for constraint in self.constraints.constraints() {
            let terms = constraint
                .expression()
                .merged_terms()
                .into_iter()
                .map(|(var, coeff)| (columns[var.index()], coeff));
            problem.add_row(to_range(constraint.row_bounds()), terms);
        }

        problem
    }

    /// Create a HiGHS model with the given settings applied
    fn to_highs(&self, settings: &SolverSettings, presolve: bool) -> highs::Model {
        let mut model = self.to_problem().optimise(Sense::Minimise);
        apply_settings(&mut model, settings, presolve);
        model
    }

    /// Solve the instance.
    ///
    /// If HiGHS cannot tell an unbounded problem from an infeasible one, the problem is solved
    /// again without presolve to get a definite answer.
    pub fn solve(&self, settings: &SolverSettings) -> Result<Solution<'_>, ModelError> {
        info!("Solving with the {} method...", settings.method.option_value());
        let mut solved = self
            .to_highs(settings, settings.presolve)
            .try_solve()
            .map_err(ModelError::Incoherent)?;

        if settings.presolve
            && matches!(solved.status(), HighsModelStatus::UnboundedOrInfeasible)
        {
            debug!("HiGHS reported unbounded or infeasible; solving again without presolve");
            solved = self
                .to_highs(settings, false)
                .try_solve()
                .map_err(ModelError::Incoherent)?;
        }

        if matches!(solved.status(), HighsModelStatus::UnboundedOrInfeasible) {
            warn!("HiGHS could not tell whether the model is unbounded or infeasible");
        }
        check_status(solved.status())?;
        let objective_value = Money(solved.objective_value());
        info!("Optimal solution found with objective value {objective_value}");

        Ok(Solution {
            instance: self,
            columns: solved.get_solution().columns().to_vec(),
            objective_value,
        })
    }
}

/// Convert optional bounds into a range HiGHS accepts
fn to_range((lower, upper): (Option<f64>, Option<f64>)) -> (Bound<f64>, Bound<f64>) {
    let to_bound = |value: Option<f64>| value.map_or(Bound::Unbounded, Bound::Included);
    (to_bound(lower), to_bound(upper))
}

/// Map a HiGHS model status onto the outcome of a solve
fn check_status(status: HighsModelStatus) -> Result<(), ModelError> {
    match status {
        HighsModelStatus::Optimal => Ok(()),
        HighsModelStatus::Infeasible => Err(ModelError::Infeasible),
        HighsModelStatus::Unbounded => Err(ModelError::Unbounded),
        HighsModelStatus::UnboundedOrInfeasible => Err(ModelError::UnboundedOrInfeasible),
        status => Err(ModelError::NonConvergence(status)),
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// Pass the user's solver settings on to HiGHS
fn apply_settings(model: &mut highs::Model, settings: &SolverSettings, presolve: bool) {
    model.set_option("solver", settings.method.option_value());
    model.set_option("presolve", on_off(presolve));
    model.set_option("run_crossover", on_off(settings.crossover));
    if let Some(time_limit) = settings.time_limit {
        model.set_option("time_limit", time_limit);
    }
    if let Some(limit) = settings.iteration_limit {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        model.set_option("simplex_iteration_limit", limit);
        model.set_option("ipm_iteration_limit", limit);
    }
    if let Some(tolerance) = settings.optimality_tolerance {
        model.set_option("ipm_optimality_tolerance", tolerance);
        model.set_option("dual_feasibility_tolerance", tolerance);
    }
    if let Some(tolerance) = settings.feasibility_tolerance {
        model.set_option("primal_feasibility_tolerance", tolerance);
    }

    // HiGHS writes straight to stdout, so only let it through when debugging
    let verbose = log::max_level() >= LevelFilter::Debug;
    model.set_option("output_flag", verbose);
    model.set_option("log_to_console", verbose);
}

/// The optimal sizing and operation of the system
pub struct Solution<'a> {
    instance: &'a Instance<'a>,
    columns: Vec<f64>,
    objective_value: Money,
}

impl<'a> Solution<'a> {
    /// The expected net present cost of the system
    pub fn objective_value(&self) -> Money {
        self.objective_value
    }

    /// The optimal value of a variable
    pub fn value(&self, var: VarId) -> f64 {
        self.columns[var.index()]
    }

    /// The value of every column, in column order
    pub fn values(&self) -> &[f64] {
        &self.columns
    }

    /// The solved model
    pub fn model(&self) -> &'a Model {
        self.instance.model
    }

    /// The decision variables, for looking up values through their typed groups
    pub fn variables(&self) -> &'a Variables {
        &self.instance.variables
    }

    /// Iterate over every variable alongside its value
    pub fn iter(&self) -> impl Iterator<Item = (&'a VariableDefinition, f64)> + '_ {
        self.instance
            .variables
            .registry
            .iter()
            .zip(self.columns.iter().copied())
    }

    /// The largest violation of any constraint at the solution
    pub fn max_violation(&self) -> f64 {
        self.group_violations()
            .map(|(_, _, violation)| violation)
            .fold(0.0, f64::max)
    }

    /// The number of rows and largest violation of each constraint group, in registration order
    pub fn group_violations(&self) -> impl Iterator<Item = (&'static str, usize, f64)> + '_ {
        self.instance
            .constraints
            .iter_groups()
            .map(|(name, constraints)| {
                let violation = constraints
                    .iter()
                    .map(|constraint| constraint.violation(&self.columns))
                    .fold(0.0, f64::max);
                (name, constraints.len(), violation)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{electric_model, multi_energy_model};
    use crate::units::Dimensionless;
    use rstest::rstest;

    #[test]
    fn test_to_range() {
        assert_eq!(
            to_range((Some(0.0), None)),
            (Bound::Included(0.0), Bound::Unbounded)
        );
        assert_eq!(
            to_range((Some(1.0), Some(1.0))),
            (Bound::Included(1.0), Bound::Included(1.0))
        );
    }

    #[rstest]
    #[case(HighsModelStatus::Infeasible, "The model is infeasible: demand cannot be met within the lost load tolerance")]
    #[case(HighsModelStatus::Unbounded, "The model is unbounded")]
    #[case(
        HighsModelStatus::UnboundedOrInfeasible,
        "The model is either unbounded or infeasible"
    )]
    #[case(
        HighsModelStatus::ReachedTimeLimit,
        "Could not find optimal result: ReachedTimeLimit"
    )]
    fn test_check_status(#[case] status: HighsModelStatus, #[case] msg: &str) {
        assert_eq!(check_status(status).unwrap_err().to_string(), msg);
    }

    #[test]
    fn test_check_status_optimal() {
        assert!(check_status(HighsModelStatus::Optimal).is_ok());
    }

    #[rstest]
    fn test_build_instance_invalid_weights(mut electric_model: Model) {
        electric_model.scenario_weights = crate::index::ScenarioMap::from_fn(
            &electric_model.sets,
            |_: crate::index::Scenario| Dimensionless(0.5),
        );
        assert!(matches!(
            build_instance(&electric_model),
            Err(ModelError::Schema(_))
        ));
    }

    #[rstest]
    fn test_build_instance_negative_cost(mut electric_model: Model) {
        electric_model
            .parameters
            .generator
            .as_mut()
            .unwrap()
            .investment_cost = crate::units::MoneyPerPower(-1.0);
        let Err(ModelError::Schema(err)) = build_instance(&electric_model) else {
            panic!("Expected a schema error");
        };
        assert_eq!(err.parameter, "generator.investment_cost");
    }

    #[rstest]
    fn test_objective_covers_all_scenarios(multi_energy_model: Model) {
        let instance = build_instance(&multi_energy_model).unwrap();
        let npc = &instance.variables().costs.scenario_net_present_cost;
        let terms = instance.objective().merged_terms();
        assert_eq!(terms.len(), multi_energy_model.sets.scenarios as usize);
        assert!(terms.iter().all(|(var, _)| npc.values().any(|v| v == var)));
    }

    #[rstest]
    fn test_solve_electric(electric_model: Model) {
        let instance = build_instance(&electric_model).unwrap();
        let solution = instance.solve(&SolverSettings::default()).unwrap();
        assert!(solution.objective_value() > Money(0.0));
        assert!(solution.max_violation() < 1e-6);

        // No demand is lost when lost load is not permitted
        let lost_load = &solution.variables().balance.lost_load;
        assert!(lost_load.values().all(|var| solution.value(*var) < 1e-6));
    }
}
