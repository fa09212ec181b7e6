//! The constraint library.
//!
//! Every rule is a pure function of the model context and an index tuple. Rules are registered
//! in named groups, each against the index domain it ranges over. Groups for technologies absent
//! from the model are not registered.
use super::expression::Constraint;
use super::schema::ModelContext;
use indexmap::IndexMap;
use std::ops::Range;

pub mod balance;
pub mod battery;
pub mod boiler;
pub mod costs;
pub mod generator;
pub mod res;
pub mod resistance;
pub mod solar_collector;
pub mod tank;

/// Constraints, stored in named groups
#[derive(Debug, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
    groups: IndexMap<&'static str, Range<usize>>,
}

impl ConstraintSet {
    /// Evaluate `rule` over every key of `domain` and store the result as a group
    pub fn add_group<K, I, F>(&mut self, name: &'static str, domain: I, rule: F)
    where
        I: IntoIterator<Item = K>,
        F: FnMut(K) -> Constraint,
    {
        let start = self.constraints.len();
        self.constraints.extend(domain.into_iter().map(rule));
        let existing = self
            .groups
            .insert(name, start..self.constraints.len())
            .is_some();
        assert!(!existing, "Duplicate constraint group: {name}");
    }

    /// Store a group consisting of a single constraint
    pub fn add(&mut self, name: &'static str, constraint: Constraint) {
        self.add_group(name, [constraint], |constraint| constraint);
    }

    /// All constraints, in row order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The constraints of a group, if it was registered
    pub fn group(&self, name: &str) -> Option<&[Constraint]> {
        self.groups
            .get(name)
            .map(|range| &self.constraints[range.clone()])
    }

    /// Iterate over groups in registration order
    pub fn iter_groups(&self) -> impl Iterator<Item = (&'static str, &[Constraint])> {
        self.groups
            .iter()
            .map(|(name, range)| (*name, &self.constraints[range.clone()]))
    }

    /// Total number of constraints
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether there are no constraints
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// Register every constraint group for the technologies present in the model
pub fn build_constraints(ctx: &ModelContext) -> ConstraintSet {
    let sets = &ctx.model.sets;
    let mut set = ConstraintSet::default();

    set.add_group(
        "scenario_net_present_cost",
        sets.iter_scenarios(),
        |i| costs::scenario_net_present_cost(ctx, i),
    );

    if let Some(pv) = ctx.res() {
        set.add_group(
            "res_energy_generation",
            sets.iter_scenario_periods(),
            |key| res::energy_generation(ctx, pv, key),
        );
    }

    if let Some(collector) = ctx.solar_collector() {
        set.add_group(
            "solar_thermal_energy_generation",
            sets.iter_scenario_class_periods(),
            |key| solar_collector::energy_generation(ctx, collector, key),
        );
        set.add("sc_financial_cost", solar_collector::financial_cost(ctx, collector));
    }

    if let Some(bank) = ctx.battery() {
        set.add_group(
            "battery_state_of_charge",
            sets.iter_scenario_periods(),
            |key| battery::state_of_charge(ctx, bank, key),
        );
        set.add_group(
            "battery_maximum_charge",
            sets.iter_scenario_periods(),
            |key| battery::maximum_charge(bank, key),
        );
        set.add_group(
            "battery_minimum_charge",
            sets.iter_scenario_periods(),
            |key| battery::minimum_charge(bank, key),
        );
        set.add("battery_max_power_charge", battery::max_power_charge(bank));
        set.add("battery_max_power_discharge", battery::max_power_discharge(bank));
        set.add_group(
            "battery_max_energy_inflow",
            sets.iter_scenario_periods(),
            |key| battery::max_energy_inflow(bank, key),
        );
        set.add_group(
            "battery_max_energy_outflow",
            sets.iter_scenario_periods(),
            |key| battery::max_energy_outflow(bank, key),
        );
        set.add("battery_replacement_cost", battery::replacement_cost(ctx, bank));
    }

    if let Some(storage) = ctx.tank() {
        set.add_group(
            "tank_state_of_charge",
            sets.iter_scenario_class_periods(),
            |key| tank::state_of_charge(ctx, storage, key),
        );
        set.add_group(
            "tank_maximum_charge",
            sets.iter_scenario_class_periods(),
            |key| tank::maximum_charge(storage, key),
        );
        set.add_group(
            "tank_minimum_charge",
            sets.iter_scenario_class_periods(),
            |key| tank::minimum_charge(storage, key),
        );
        if let Some((max_discharge_time, max_power)) = storage
            .params
            .max_discharge_time
            .zip(storage.vars.max_discharge_power.as_ref())
        {
            set.add_group("tank_max_power_discharge", sets.iter_classes(), |c| {
                tank::max_power_discharge(storage, max_discharge_time, max_power, c)
            });
            set.add_group(
                "tank_max_energy_outflow",
                sets.iter_scenario_class_periods(),
                |key| tank::max_energy_outflow(storage, max_power, key),
            );
        }
        set.add("tank_financial_cost", tank::financial_cost(ctx, storage));
    }

    if let Some(heater) = ctx.resistance() {
        set.add_group(
            "resistance_maximum_thermal_energy",
            sets.iter_scenario_class_periods(),
            |key| resistance::maximum_thermal_energy(heater, key),
        );
        set.add_group(
            "total_electrical_resistance_demand",
            sets.iter_scenario_periods(),
            |key| resistance::total_electrical_demand(ctx, heater, key),
        );
        set.add("resistance_financial_cost", resistance::financial_cost(ctx, heater));
    }

    if let Some(unit) = ctx.boiler() {
        set.add_group(
            "boiler_maximum_energy",
            sets.iter_scenario_class_periods(),
            |key| boiler::maximum_energy(unit, key),
        );
        set.add_group(
            "ng_consumption",
            sets.iter_scenario_class_periods(),
            |key| boiler::fuel_consumption(ctx, unit, key),
        );
        set.add("boiler_financial_cost", boiler::financial_cost(ctx, unit));
        set.add_group("total_ng_cost", sets.iter_scenarios(), |i| {
            boiler::fuel_cost(ctx, unit, i)
        });
    }

    if let Some(unit) = ctx.generator() {
        set.add_group(
            "generator_maximum_energy",
            sets.iter_scenario_periods(),
            |key| generator::maximum_energy(unit, key),
        );
        set.add_group(
            "diesel_consumption",
            sets.iter_scenario_periods(),
            |key| generator::fuel_consumption(ctx, unit, key),
        );
        set.add_group("total_diesel_cost", sets.iter_scenarios(), |i| {
            generator::fuel_cost(ctx, unit, i)
        });
    }

    set.add_group(
        "electric_energy_balance",
        sets.iter_scenario_periods(),
        |key| balance::electric_energy_balance(ctx, key),
    );
    set.add_group("maximum_lost_load_ee", sets.iter_scenarios(), |i| {
        balance::maximum_lost_load_ee(ctx, i)
    });
    set.add_group("scenario_lost_load_cost_ee", sets.iter_scenarios(), |i| {
        costs::scenario_lost_load_cost_ee(ctx, i)
    });

    if let Some(thermal) = &ctx.vars.thermal {
        set.add_group(
            "thermal_energy_balance",
            sets.iter_scenario_class_periods(),
            |key| balance::thermal_energy_balance(ctx, thermal, key),
        );
        set.add_group(
            "maximum_lost_load_th",
            sets.iter_scenario_classes(),
            |key| balance::maximum_lost_load_th(ctx, thermal, key),
        );
        set.add_group("scenario_lost_load_cost_th", sets.iter_scenarios(), |i| {
            costs::scenario_lost_load_cost_th(ctx, thermal, i)
        });
    }

    set.add("initial_investment_cost", costs::initial_investment_cost(ctx));
    set.add("operation_maintenance_cost", costs::operation_maintenance_cost(ctx));
    set.add("loan_financial_cost", costs::loan_financial_cost(ctx));
    set.add("total_financial_cost", costs::total_financial_cost(ctx));

    set
}
