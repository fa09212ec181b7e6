//! Gas boilers, one per class.
use crate::index::{Class, Period, Scenario};
use crate::model::parameters::BoilerParameters;
use crate::optimisation::expression::{Constraint, LinearExpr};
use crate::optimisation::schema::{BoilerVariables, Component, ModelContext};

type Boiler<'a> = Component<'a, BoilerParameters, BoilerVariables>;

/// Heat produced in a period cannot exceed the boiler's rated power
pub fn maximum_energy(boiler: Boiler, (i, c, t): (Scenario, Class, Period)) -> Constraint {
    LinearExpr::from(boiler.vars.production[(i, c, t)]).leq(boiler.vars.nominal_capacity[c])
}

/// Gas burnt to produce the heat of a period
pub fn fuel_consumption(
    ctx: &ModelContext,
    boiler: Boiler,
    key: (Scenario, Class, Period),
) -> Constraint {
    let params = boiler.params;
    let fuel_per_energy =
        ctx.delta_time() / (params.efficiency.value() * params.lower_heating_value.value());

    LinearExpr::from(boiler.vars.fuel_consumption[key])
        .equals(boiler.vars.production[key] * fuel_per_energy)
}

/// Investment in boilers across all classes
pub fn financial_cost(ctx: &ModelContext, boiler: Boiler) -> Constraint {
    let unit_cost = boiler.params.investment_cost.value();
    let investment: LinearExpr = ctx
        .model
        .sets
        .iter_classes()
        .map(|c| boiler.vars.nominal_capacity[c] * unit_cost)
        .sum();

    LinearExpr::from(boiler.vars.financial_cost).equals(investment)
}

/// Discounted cost of the gas burnt in a scenario, over every class and project year
pub fn fuel_cost(ctx: &ModelContext, boiler: Boiler, i: Scenario) -> Constraint {
    let sets = &ctx.model.sets;
    let price = boiler.params.fuel_cost.value();
    let cost = ctx.present_value(|_| {
        sets.iter_class_periods()
            .map(|(c, t)| boiler.vars.fuel_consumption[(i, c, t)] * price)
            .sum()
    });

    LinearExpr::from(boiler.vars.fuel_cost[i]).equals(cost)
}
