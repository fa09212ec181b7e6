//! Renewable generation.
use crate::index::{Period, Scenario};
use crate::model::parameters::ResParameters;
use crate::optimisation::expression::{Constraint, LinearExpr};
use crate::optimisation::schema::{Component, ModelContext, ResVariables};

type Res<'a> = Component<'a, ResParameters, ResVariables>;

/// Output in a period is the yield of one unit, after the inverter, times the number of units
pub fn energy_generation(ctx: &ModelContext, res: Res, key: (Scenario, Period)) -> Constraint {
    let unit_yield = ctx
        .model
        .res_production
        .as_ref()
        .map_or(0.0, |production| production[key].value());
    let per_unit = unit_yield * res.params.inverter_efficiency.value();

    LinearExpr::from(res.vars.production[key]).equals(per_unit * res.vars.units)
}
