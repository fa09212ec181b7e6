//! Battery bank state of charge, power limits and replacement.
use crate::finance::discount_factor;
use crate::index::{Period, Scenario};
use crate::model::parameters::BatteryParameters;
use crate::optimisation::expression::{Constraint, LinearExpr};
use crate::optimisation::schema::{BatteryVariables, Component, ModelContext};

type Battery<'a> = Component<'a, BatteryParameters, BatteryVariables>;

/// Energy stored at the end of a period.
///
/// The bank starts every scenario fully charged, so the first period is anchored to the nominal
/// capacity.
pub fn state_of_charge(ctx: &ModelContext, battery: Battery, (i, t): (Scenario, Period)) -> Constraint {
    let params = battery.params;
    let vars = battery.vars;
    let dt = ctx.delta_time();
    let previous = match t.previous() {
        Some(previous) => LinearExpr::from(vars.state_of_charge[(i, previous)]),
        None => LinearExpr::from(vars.nominal_capacity),
    };
    let change = vars.flow_in[(i, t)] * (dt * params.charge_efficiency.value())
        - vars.flow_out[(i, t)] * (dt / params.discharge_efficiency.value());

    LinearExpr::from(vars.state_of_charge[(i, t)]).equals(previous + change)
}

/// The state of charge cannot exceed the nominal capacity
pub fn maximum_charge(battery: Battery, key: (Scenario, Period)) -> Constraint {
    LinearExpr::from(battery.vars.state_of_charge[key]).leq(battery.vars.nominal_capacity)
}

/// The state of charge cannot fall below the depth of discharge
pub fn minimum_charge(battery: Battery, key: (Scenario, Period)) -> Constraint {
    LinearExpr::from(battery.vars.state_of_charge[key])
        .geq(battery.vars.nominal_capacity * battery.params.depth_of_discharge.value())
}

/// Charging power at which the bank fills up in the rated time
pub fn max_power_charge(battery: Battery) -> Constraint {
    LinearExpr::from(battery.vars.max_charge_power)
        .equals(battery.vars.nominal_capacity / battery.params.max_charge_time.value())
}

/// Discharging power at which the bank empties in the rated time
pub fn max_power_discharge(battery: Battery) -> Constraint {
    LinearExpr::from(battery.vars.max_discharge_power)
        .equals(battery.vars.nominal_capacity / battery.params.max_discharge_time.value())
}

/// Energy charged in a period cannot exceed the maximum charge power
pub fn max_energy_inflow(battery: Battery, key: (Scenario, Period)) -> Constraint {
    LinearExpr::from(battery.vars.flow_in[key]).leq(battery.vars.max_charge_power)
}

/// Energy discharged in a period cannot exceed the maximum discharge power
pub fn max_energy_outflow(battery: Battery, key: (Scenario, Period)) -> Constraint {
    LinearExpr::from(battery.vars.flow_out[key]).leq(battery.vars.max_discharge_power)
}

/// Present cost of replacing the bank once, at the end of its life
pub fn replacement_cost(ctx: &ModelContext, battery: Battery) -> Constraint {
    let params = battery.params;
    let factor = discount_factor(ctx.model.parameters.project.discount_rate, params.replacement_time);
    let cost = params.investment_cost.value() * factor.value();

    LinearExpr::from(battery.vars.replacement_cost).equals(battery.vars.nominal_capacity * cost)
}
