//! Energy balances and limits on unserved demand.
use crate::index::{Class, Period, Scenario};
use crate::optimisation::expression::{Constraint, LinearExpr};
use crate::optimisation::schema::{ModelContext, ThermalBalanceVariables};

/// Electricity demand is met in every period.
///
/// Supply is renewable and generator output plus battery discharge and lost load. Battery charge,
/// curtailment and the electricity drawn by resistance heaters are subtracted.
pub fn electric_energy_balance(ctx: &ModelContext, key: (Scenario, Period)) -> Constraint {
    let balance = &ctx.vars.balance;
    let mut supply = balance.lost_load[key] - balance.curtailment[key];
    if let Some(res) = &ctx.vars.res {
        supply += res.production[key];
    }
    if let Some(generator) = &ctx.vars.generator {
        supply += generator.production[key];
    }
    if let Some(battery) = &ctx.vars.battery {
        supply += battery.flow_out[key];
        supply -= battery.flow_in[key];
    }
    if let Some(resistance) = &ctx.vars.resistance {
        supply -= resistance.total_demand[key];
    }

    supply.equals(ctx.model.electric_demand[key].value())
}

/// Heat demand of each class is met in every period by boiler output and tank discharge
pub fn thermal_energy_balance(
    ctx: &ModelContext,
    thermal: &ThermalBalanceVariables,
    key: (Scenario, Class, Period),
) -> Constraint {
    let mut supply = thermal.lost_load[key] - thermal.curtailment[key];
    if let Some(boiler) = &ctx.vars.boiler {
        supply += boiler.production[key];
    }
    if let Some(tank) = &ctx.vars.tank {
        supply += tank.flow_out[key];
    }

    supply.equals(ctx.model.thermal_demand[key].value())
}

/// Lost electric load over the horizon is at most a fraction of total demand
pub fn maximum_lost_load_ee(ctx: &ModelContext, i: Scenario) -> Constraint {
    let sets = &ctx.model.sets;
    let lost: LinearExpr = sets
        .iter_periods()
        .map(|t| ctx.vars.balance.lost_load[(i, t)])
        .sum();
    let demand: f64 = sets
        .iter_periods()
        .map(|t| ctx.model.electric_demand[(i, t)].value())
        .sum();

    lost.leq(lost_load_tolerance(ctx) * demand)
}

/// As [`maximum_lost_load_ee`], for the heat demand of one class
pub fn maximum_lost_load_th(
    ctx: &ModelContext,
    thermal: &ThermalBalanceVariables,
    (i, c): (Scenario, Class),
) -> Constraint {
    let sets = &ctx.model.sets;
    let lost: LinearExpr = sets
        .iter_periods()
        .map(|t| thermal.lost_load[(i, c, t)])
        .sum();
    let demand: f64 = sets
        .iter_periods()
        .map(|t| ctx.model.thermal_demand[(i, c, t)].value())
        .sum();

    lost.leq(lost_load_tolerance(ctx) * demand)
}

fn lost_load_tolerance(ctx: &ModelContext) -> f64 {
    ctx.model.parameters.project.lost_load_tolerance.value()
}
