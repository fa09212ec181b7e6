//! Cost roll-ups and the objective.
//!
//! Recurring yearly costs are discounted year by year over the project years. One-off costs are
//! either paid up front or financed by a loan, according to the funded fraction.
use crate::finance::capital_recovery_factor;
use crate::index::Scenario;
use crate::optimisation::expression::{Constraint, LinearExpr};
use crate::optimisation::schema::{ModelContext, ThermalBalanceVariables};

/// Capital cost of all installed capacity, before financing
pub fn capital_cost(ctx: &ModelContext) -> LinearExpr {
    let mut capex = LinearExpr::default();
    if let Some(res) = ctx.res() {
        let unit_cost = res.params.investment_cost.value() * res.params.nominal_capacity.value();
        capex += res.vars.units * unit_cost;
    }
    if let Some(battery) = ctx.battery() {
        capex += battery.vars.nominal_capacity * battery.params.investment_cost.value();
    }
    if let Some(generator) = ctx.generator() {
        capex += generator.vars.nominal_capacity * generator.params.investment_cost.value();
    }
    if let Some(collector) = &ctx.vars.solar_collector {
        capex += collector.financial_cost;
    }
    if let Some(tank) = &ctx.vars.tank {
        capex += tank.financial_cost;
    }
    if let Some(boiler) = &ctx.vars.boiler {
        capex += boiler.financial_cost;
    }
    if let Some(resistance) = &ctx.vars.resistance {
        capex += resistance.financial_cost;
    }

    capex
}

/// Yearly operation and maintenance cost, a fixed fraction of each technology's capital cost
fn yearly_om_cost(ctx: &ModelContext) -> LinearExpr {
    let mut om = LinearExpr::default();
    if let Some(res) = ctx.res() {
        let p = res.params;
        om += res.vars.units
            * (p.investment_cost.value() * p.nominal_capacity.value() * p.om_cost.value());
    }
    if let Some(battery) = ctx.battery() {
        let p = battery.params;
        om += battery.vars.nominal_capacity * (p.investment_cost.value() * p.om_cost.value());
    }
    if let Some(generator) = ctx.generator() {
        let p = generator.params;
        om += generator.vars.nominal_capacity * (p.investment_cost.value() * p.om_cost.value());
    }
    if let Some(collector) = ctx.solar_collector() {
        om += collector.vars.financial_cost * collector.params.om_cost.value();
    }
    if let Some(tank) = ctx.tank() {
        om += tank.vars.financial_cost * tank.params.om_cost.value();
    }
    if let Some(boiler) = ctx.boiler() {
        om += boiler.vars.financial_cost * boiler.params.om_cost.value();
    }
    if let Some(resistance) = ctx.resistance() {
        om += resistance.vars.financial_cost * resistance.params.om_cost.value();
    }

    om
}

fn percentage_funded(ctx: &ModelContext) -> f64 {
    ctx.model.parameters.project.percentage_funded.value()
}

/// The share of the capital cost not covered by the loan
pub fn initial_investment_cost(ctx: &ModelContext) -> Constraint {
    LinearExpr::from(ctx.vars.costs.initial_investment)
        .equals(capital_cost(ctx) * (1.0 - percentage_funded(ctx)))
}

/// Present value of operation and maintenance over the project
pub fn operation_maintenance_cost(ctx: &ModelContext) -> Constraint {
    LinearExpr::from(ctx.vars.costs.operation_maintenance)
        .equals(ctx.present_value(|_| yearly_om_cost(ctx)))
}

/// Yearly repayment of the funded share of the capital cost, spread over the project
pub fn loan_financial_cost(ctx: &ModelContext) -> Constraint {
    let project = &ctx.model.parameters.project;
    let crf = capital_recovery_factor(ctx.model.sets.years, project.interest_rate_loan);

    LinearExpr::from(ctx.vars.costs.loan_financial)
        .equals(capital_cost(ctx) * (percentage_funded(ctx) * crf.value()))
}

/// Present value of the loan repayments
pub fn total_financial_cost(ctx: &ModelContext) -> Constraint {
    let costs = &ctx.vars.costs;
    LinearExpr::from(costs.total_financial)
        .equals(ctx.present_value(|_| costs.loan_financial.into()))
}

/// Present value of the electricity demand left unserved in a scenario
pub fn scenario_lost_load_cost_ee(ctx: &ModelContext, i: Scenario) -> Constraint {
    let price = lost_load_price(ctx);
    let cost = ctx.present_value(|_| {
        ctx.model
            .sets
            .iter_periods()
            .map(|t| ctx.vars.balance.lost_load[(i, t)] * price)
            .sum()
    });

    LinearExpr::from(ctx.vars.costs.lost_load_cost[i]).equals(cost)
}

/// Present value of the heat demand left unserved in a scenario, across every class
pub fn scenario_lost_load_cost_th(
    ctx: &ModelContext,
    thermal: &ThermalBalanceVariables,
    i: Scenario,
) -> Constraint {
    let sets = &ctx.model.sets;
    let price = lost_load_price(ctx);
    let cost = ctx.present_value(|_| {
        sets.iter_class_periods()
            .map(|(c, t)| thermal.lost_load[(i, c, t)] * price)
            .sum()
    });

    LinearExpr::from(thermal.lost_load_cost[i]).equals(cost)
}

/// Cost of a unit of unserved power over one period
fn lost_load_price(ctx: &ModelContext) -> f64 {
    ctx.model.parameters.project.value_of_lost_load.value() * ctx.delta_time()
}

/// Net present cost of a scenario: the investment shared by all scenarios plus that scenario's
/// operating costs
pub fn scenario_net_present_cost(ctx: &ModelContext, i: Scenario) -> Constraint {
    let costs = &ctx.vars.costs;
    let mut total = costs.initial_investment
        + costs.operation_maintenance
        + costs.total_financial
        + costs.lost_load_cost[i];
    if let Some(battery) = &ctx.vars.battery {
        total += battery.replacement_cost;
    }
    if let Some(thermal) = &ctx.vars.thermal {
        total += thermal.lost_load_cost[i];
    }
    if let Some(generator) = &ctx.vars.generator {
        total += generator.fuel_cost[i];
    }
    if let Some(boiler) = &ctx.vars.boiler {
        total += boiler.fuel_cost[i];
    }

    LinearExpr::from(costs.scenario_net_present_cost[i]).equals(total)
}

/// The expected net present cost over all scenarios
pub fn objective(ctx: &ModelContext) -> LinearExpr {
    ctx.model
        .scenario_weights
        .iter()
        .map(|(i, weight)| ctx.vars.costs.scenario_net_present_cost[i] * weight.value())
        .sum()
}
