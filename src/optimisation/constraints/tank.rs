//! Thermal storage tanks, one per class.
//!
//! A tank is charged by the solar collectors and resistance heaters of its class and discharges
//! into the heat demand of that class.
use crate::index::{Class, ClassMap, Period, Scenario};
use crate::model::parameters::TankParameters;
use crate::optimisation::expression::{Constraint, LinearExpr, VarId};
use crate::optimisation::schema::{Component, ModelContext, TankVariables};
use crate::units::Hours;

type Tank<'a> = Component<'a, TankParameters, TankVariables>;

/// Heat stored at the end of a period.
///
/// Stored heat decays by the tank efficiency from one period to the next. The first period starts
/// from a full tank with no decay applied.
pub fn state_of_charge(
    ctx: &ModelContext,
    tank: Tank,
    (i, c, t): (Scenario, Class, Period),
) -> Constraint {
    let vars = tank.vars;
    let dt = ctx.delta_time();
    let key = (i, c, t);

    let mut stored = match t.previous() {
        Some(previous) => vars.state_of_charge[(i, c, previous)] * tank.params.efficiency.value(),
        None => LinearExpr::from(vars.nominal_capacity[c]),
    };
    if let Some(collector) = &ctx.vars.solar_collector {
        stored += collector.production[key] * dt;
    }
    if let Some(heater) = ctx.resistance() {
        stored += heater.vars.thermal_energy[key] * (heater.params.efficiency.value() * dt);
    }
    stored -= vars.flow_out[key] * dt;

    LinearExpr::from(vars.state_of_charge[key]).equals(stored)
}

/// Stored heat cannot exceed the tank's capacity
pub fn maximum_charge(tank: Tank, (i, c, t): (Scenario, Class, Period)) -> Constraint {
    LinearExpr::from(tank.vars.state_of_charge[(i, c, t)]).leq(tank.vars.nominal_capacity[c])
}

/// Stored heat cannot fall below the depth of discharge
pub fn minimum_charge(tank: Tank, (i, c, t): (Scenario, Class, Period)) -> Constraint {
    LinearExpr::from(tank.vars.state_of_charge[(i, c, t)])
        .geq(tank.vars.nominal_capacity[c] * tank.params.depth_of_discharge.value())
}

/// Discharging power at which the tank of a class empties in the rated time
pub fn max_power_discharge(
    tank: Tank,
    max_discharge_time: Hours,
    max_power: &ClassMap<VarId>,
    c: Class,
) -> Constraint {
    LinearExpr::from(max_power[c])
        .equals(tank.vars.nominal_capacity[c] / max_discharge_time.value())
}

/// Heat drawn in a period cannot exceed the maximum discharge power
pub fn max_energy_outflow(
    tank: Tank,
    max_power: &ClassMap<VarId>,
    (i, c, t): (Scenario, Class, Period),
) -> Constraint {
    LinearExpr::from(tank.vars.flow_out[(i, c, t)]).leq(max_power[c])
}

/// Investment in tanks across all classes
pub fn financial_cost(ctx: &ModelContext, tank: Tank) -> Constraint {
    let unit_cost = tank.params.investment_cost.value();
    let investment: LinearExpr = ctx
        .model
        .sets
        .iter_classes()
        .map(|c| tank.vars.nominal_capacity[c] * unit_cost)
        .sum();

    LinearExpr::from(tank.vars.financial_cost).equals(investment)
}
