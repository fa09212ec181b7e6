//! The decision variables of the sizing problem.
//!
//! Variables are declared in typed groups, one per technology, and only for the technologies
//! present in the model. Constraint rules refer to variables through these groups rather than by
//! name.
use super::expression::{LinearExpr, VarId};
use crate::finance::present_value_over_years;
use crate::index::{
    Class, ClassMap, DenseKey, DenseMap, Period, Scenario, ScenarioClassPeriodMap, ScenarioMap,
    ScenarioPeriodMap, Sets, Year,
};
use crate::model::Model;
use crate::model::parameters::{
    BatteryParameters, BoilerParameters, GeneratorParameters, ResParameters,
    ResistanceParameters, SolarCollectorParameters, TankParameters,
};
use std::fmt;

/// The set of values a variable may take
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    /// `x >= 0`
    NonNegative,
    /// Any real value
    Free,
    /// `0 <= x <= max`
    UpperBounded(f64),
}

impl Domain {
    /// Non-negative, with an optional upper limit
    pub fn bounded_by(max: Option<f64>) -> Self {
        max.map_or(Domain::NonNegative, Domain::UpperBounded)
    }

    /// Lower and upper bounds, where `None` means unbounded
    pub fn bounds(self) -> (Option<f64>, Option<f64>) {
        match self {
            Domain::NonNegative => (Some(0.0), None),
            Domain::Free => (None, None),
            Domain::UpperBounded(max) => (Some(0.0), Some(max)),
        }
    }
}

/// The indices a variable is declared over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableIndex {
    /// A single, system-wide variable
    Scalar,
    /// One variable per thermal class
    Class(Class),
    /// One variable per scenario
    Scenario(Scenario),
    /// One variable per scenario and period
    ScenarioPeriod(Scenario, Period),
    /// One variable per scenario, thermal class and period
    ScenarioClassPeriod(Scenario, Class, Period),
}

impl VariableIndex {
    /// The scenario component, if any
    pub fn scenario(self) -> Option<Scenario> {
        match self {
            VariableIndex::Scenario(i)
            | VariableIndex::ScenarioPeriod(i, _)
            | VariableIndex::ScenarioClassPeriod(i, _, _) => Some(i),
            _ => None,
        }
    }

    /// The class component, if any
    pub fn class(self) -> Option<Class> {
        match self {
            VariableIndex::Class(c) | VariableIndex::ScenarioClassPeriod(_, c, _) => Some(c),
            _ => None,
        }
    }

    /// The period component, if any
    pub fn period(self) -> Option<Period> {
        match self {
            VariableIndex::ScenarioPeriod(_, t) | VariableIndex::ScenarioClassPeriod(_, _, t) => {
                Some(t)
            }
            _ => None,
        }
    }
}

impl fmt::Display for VariableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableIndex::Scalar => Ok(()),
            VariableIndex::Class(c) => write!(f, "[{c}]"),
            VariableIndex::Scenario(i) => write!(f, "[{i}]"),
            VariableIndex::ScenarioPeriod(i, t) => write!(f, "[{i},{t}]"),
            VariableIndex::ScenarioClassPeriod(i, c, t) => write!(f, "[{i},{c},{t}]"),
        }
    }
}

impl From<Class> for VariableIndex {
    fn from(c: Class) -> Self {
        VariableIndex::Class(c)
    }
}

impl From<Scenario> for VariableIndex {
    fn from(i: Scenario) -> Self {
        VariableIndex::Scenario(i)
    }
}

impl From<(Scenario, Period)> for VariableIndex {
    fn from((i, t): (Scenario, Period)) -> Self {
        VariableIndex::ScenarioPeriod(i, t)
    }
}

impl From<(Scenario, Class, Period)> for VariableIndex {
    fn from((i, c, t): (Scenario, Class, Period)) -> Self {
        VariableIndex::ScenarioClassPeriod(i, c, t)
    }
}

/// A declared decision variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    /// Name of the variable group
    pub name: &'static str,
    /// Position within the group
    pub index: VariableIndex,
    /// Permitted values
    pub domain: Domain,
}

impl fmt::Display for VariableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.index)
    }
}

/// All decision variables of a problem, in column order
#[derive(Debug, Default)]
pub struct VariableRegistry(Vec<VariableDefinition>);

impl VariableRegistry {
    /// Declare a single variable
    pub fn add(&mut self, name: &'static str, index: VariableIndex, domain: Domain) -> VarId {
        let var = VarId::new(self.0.len());
        self.0.push(VariableDefinition {
            name,
            index,
            domain,
        });
        var
    }

    /// Declare a system-wide variable
    pub fn add_scalar(&mut self, name: &'static str, domain: Domain) -> VarId {
        self.add(name, VariableIndex::Scalar, domain)
    }

    /// Declare one variable per key of a dense domain
    pub fn add_map<K>(
        &mut self,
        sets: &Sets,
        name: &'static str,
        domain: Domain,
    ) -> DenseMap<K, VarId>
    where
        K: DenseKey + Into<VariableIndex>,
    {
        DenseMap::from_fn(sets, |key: K| self.add(name, key.into(), domain))
    }

    /// The definition of a variable
    pub fn definition(&self, var: VarId) -> &VariableDefinition {
        &self.0[var.index()]
    }

    /// Iterate over all definitions in column order
    pub fn iter(&self) -> impl Iterator<Item = &VariableDefinition> {
        self.0.iter()
    }

    /// Number of declared variables
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no variables have been declared
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Electric balance slack variables
#[derive(Debug)]
pub struct BalanceVariables {
    /// `Lost_Load_EE[i,t]`
    pub lost_load: ScenarioPeriodMap<VarId>,
    /// `Electric_Energy_Curtailment[i,t]`
    pub curtailment: ScenarioPeriodMap<VarId>,
}

/// Thermal balance slack variables
#[derive(Debug)]
pub struct ThermalBalanceVariables {
    /// `Lost_Load_Th[i,c,t]`
    pub lost_load: ScenarioClassPeriodMap<VarId>,
    /// `Thermal_Energy_Curtailment[i,c,t]`
    pub curtailment: ScenarioClassPeriodMap<VarId>,
    /// `Scenario_Lost_Load_Cost_Th[i]`
    pub lost_load_cost: ScenarioMap<VarId>,
}

/// Renewable unit variables
#[derive(Debug)]
pub struct ResVariables {
    /// `RES_Units`
    pub units: VarId,
    /// `Total_RES_Energy_Production[i,t]`
    pub production: ScenarioPeriodMap<VarId>,
}

/// Battery bank variables
#[derive(Debug)]
pub struct BatteryVariables {
    /// `Battery_Nominal_Capacity`
    pub nominal_capacity: VarId,
    /// `Maximum_Battery_Charge_Power`
    pub max_charge_power: VarId,
    /// `Maximum_Battery_Discharge_Power`
    pub max_discharge_power: VarId,
    /// `Battery_Replacement_Cost`
    pub replacement_cost: VarId,
    /// `Battery_State_of_Charge[i,t]`
    pub state_of_charge: ScenarioPeriodMap<VarId>,
    /// `Energy_Battery_Flow_In[i,t]`
    pub flow_in: ScenarioPeriodMap<VarId>,
    /// `Energy_Battery_Flow_Out[i,t]`
    pub flow_out: ScenarioPeriodMap<VarId>,
}

/// Diesel generator variables
#[derive(Debug)]
pub struct GeneratorVariables {
    /// `Generator_Nominal_Capacity`
    pub nominal_capacity: VarId,
    /// `Total_Generator_Energy_Production[i,t]`
    pub production: ScenarioPeriodMap<VarId>,
    /// `Diesel_Consumption[i,t]`
    pub fuel_consumption: ScenarioPeriodMap<VarId>,
    /// `Total_Diesel_Cost[i]`
    pub fuel_cost: ScenarioMap<VarId>,
}

/// Solar collector variables
#[derive(Debug)]
pub struct SolarCollectorVariables {
    /// `SC_Units[c]`
    pub units: ClassMap<VarId>,
    /// `Total_SC_Energy_Production[i,c,t]`
    pub production: ScenarioClassPeriodMap<VarId>,
    /// `SC_Financial_Cost`
    pub financial_cost: VarId,
}

/// Thermal storage tank variables
#[derive(Debug)]
pub struct TankVariables {
    /// `Tank_Nominal_Capacity[c]`
    pub nominal_capacity: ClassMap<VarId>,
    /// `Tank_State_of_Charge[i,c,t]`
    pub state_of_charge: ScenarioClassPeriodMap<VarId>,
    /// `Energy_Tank_Flow_Out[i,c,t]`
    pub flow_out: ScenarioClassPeriodMap<VarId>,
    /// `Maximum_Tank_Discharge_Power[c]`, only declared when a maximum discharge time is given
    pub max_discharge_power: Option<ClassMap<VarId>>,
    /// `Tank_Financial_Cost`
    pub financial_cost: VarId,
}

/// Boiler variables
#[derive(Debug)]
pub struct BoilerVariables {
    /// `Boiler_Nominal_Capacity[c]`
    pub nominal_capacity: ClassMap<VarId>,
    /// `Total_Boiler_Energy_Production[i,c,t]`
    pub production: ScenarioClassPeriodMap<VarId>,
    /// `NG_Consumption[i,c,t]`
    pub fuel_consumption: ScenarioClassPeriodMap<VarId>,
    /// `Boiler_Financial_Cost`
    pub financial_cost: VarId,
    /// `Total_NG_Cost[i]`
    pub fuel_cost: ScenarioMap<VarId>,
}

/// Resistance heater variables
#[derive(Debug)]
pub struct ResistanceVariables {
    /// `Resistance_Nominal_Power[c]`
    pub nominal_power: ClassMap<VarId>,
    /// `Resistance_Thermal_Energy[i,c,t]`, the electricity drawn by the heater
    pub thermal_energy: ScenarioClassPeriodMap<VarId>,
    /// `Total_Electrical_Resistance_Demand[i,t]`
    pub total_demand: ScenarioPeriodMap<VarId>,
    /// `Resistance_Financial_Cost`
    pub financial_cost: VarId,
}

/// Cost roll-up variables
#[derive(Debug)]
pub struct CostVariables {
    /// `Scenario_Net_Present_Cost[i]`
    pub scenario_net_present_cost: ScenarioMap<VarId>,
    /// `Scenario_Lost_Load_Cost_EE[i]`
    pub lost_load_cost: ScenarioMap<VarId>,
    /// `Initial_Investment_Cost`
    pub initial_investment: VarId,
    /// `Operation_Maintenance_Cost`
    pub operation_maintenance: VarId,
    /// `Loan_Financial_Cost`
    pub loan_financial: VarId,
    /// `Total_Financial_Cost`
    pub total_financial: VarId,
}

/// Every decision variable of a problem, grouped by technology
#[derive(Debug)]
pub struct Variables {
    /// Column definitions
    pub registry: VariableRegistry,
    /// Electric balance slacks
    pub balance: BalanceVariables,
    /// Thermal balance slacks, if there are thermal classes
    pub thermal: Option<ThermalBalanceVariables>,
    /// Cost roll-ups
    pub costs: CostVariables,
    /// Technology groups, present only for technologies in the model
    pub res: Option<ResVariables>,
    /// Battery bank
    pub battery: Option<BatteryVariables>,
    /// Diesel generator
    pub generator: Option<GeneratorVariables>,
    /// Solar thermal collectors
    pub solar_collector: Option<SolarCollectorVariables>,
    /// Thermal storage tanks
    pub tank: Option<TankVariables>,
    /// Gas boilers
    pub boiler: Option<BoilerVariables>,
    /// Resistance heaters
    pub resistance: Option<ResistanceVariables>,
}

impl Variables {
    /// Declare the variables of every technology present in the model
    pub fn declare(model: &Model) -> Self {
        use Domain::{Free, NonNegative};

        let sets = &model.sets;
        let params = &model.parameters;
        let mut registry = VariableRegistry::default();
        let r = &mut registry;

        let balance = BalanceVariables {
            lost_load: r.add_map(sets, "lost_load_ee", NonNegative),
            curtailment: r.add_map(sets, "electric_energy_curtailment", NonNegative),
        };
        let thermal = (sets.classes > 0).then(|| ThermalBalanceVariables {
            lost_load: r.add_map(sets, "lost_load_th", NonNegative),
            curtailment: r.add_map(sets, "thermal_energy_curtailment", NonNegative),
            lost_load_cost: r.add_map(sets, "scenario_lost_load_cost_th", NonNegative),
        });
        let costs = CostVariables {
            scenario_net_present_cost: r.add_map(sets, "scenario_net_present_cost", NonNegative),
            lost_load_cost: r.add_map(sets, "scenario_lost_load_cost_ee", NonNegative),
            initial_investment: r.add_scalar("initial_investment_cost", NonNegative),
            operation_maintenance: r.add_scalar("operation_maintenance_cost", NonNegative),
            loan_financial: r.add_scalar("loan_financial_cost", NonNegative),
            total_financial: r.add_scalar("total_financial_cost", NonNegative),
        };

        let res = params.res.as_ref().map(|res| ResVariables {
            units: r.add_scalar("res_units", Domain::bounded_by(res.max_units)),
            production: r.add_map(sets, "total_res_energy_production", NonNegative),
        });
        let battery = params.battery.as_ref().map(|battery| BatteryVariables {
            nominal_capacity: r.add_scalar(
                "battery_nominal_capacity",
                Domain::bounded_by(battery.max_capacity.map(|c| c.value())),
            ),
            max_charge_power: r.add_scalar("maximum_battery_charge_power", Free),
            max_discharge_power: r.add_scalar("maximum_battery_discharge_power", Free),
            replacement_cost: r.add_scalar("battery_replacement_cost", NonNegative),
            state_of_charge: r.add_map(sets, "battery_state_of_charge", NonNegative),
            flow_in: r.add_map(sets, "energy_battery_flow_in", NonNegative),
            flow_out: r.add_map(sets, "energy_battery_flow_out", NonNegative),
        });
        let generator = params.generator.as_ref().map(|generator| GeneratorVariables {
            nominal_capacity: r.add_scalar(
                "generator_nominal_capacity",
                Domain::bounded_by(generator.max_capacity.map(|c| c.value())),
            ),
            production: r.add_map(sets, "total_generator_energy_production", NonNegative),
            fuel_consumption: r.add_map(sets, "diesel_consumption", NonNegative),
            fuel_cost: r.add_map(sets, "total_diesel_cost", NonNegative),
        });
        let solar_collector = params
            .solar_collector
            .as_ref()
            .map(|collector| SolarCollectorVariables {
                units: r.add_map(sets, "sc_units", Domain::bounded_by(collector.max_units)),
                production: r.add_map(sets, "total_sc_energy_production", NonNegative),
                financial_cost: r.add_scalar("sc_financial_cost", NonNegative),
            });
        let tank = params.tank.as_ref().map(|tank| TankVariables {
            nominal_capacity: r.add_map(
                sets,
                "tank_nominal_capacity",
                Domain::bounded_by(tank.max_capacity.map(|c| c.value())),
            ),
            state_of_charge: r.add_map(sets, "tank_state_of_charge", NonNegative),
            flow_out: r.add_map(sets, "energy_tank_flow_out", NonNegative),
            max_discharge_power: tank
                .max_discharge_time
                .map(|_| r.add_map(sets, "maximum_tank_discharge_power", Free)),
            financial_cost: r.add_scalar("tank_financial_cost", NonNegative),
        });
        let boiler = params.boiler.as_ref().map(|boiler| BoilerVariables {
            nominal_capacity: r.add_map(
                sets,
                "boiler_nominal_capacity",
                Domain::bounded_by(boiler.max_capacity.map(|c| c.value())),
            ),
            production: r.add_map(sets, "total_boiler_energy_production", NonNegative),
            fuel_consumption: r.add_map(sets, "ng_consumption", NonNegative),
            financial_cost: r.add_scalar("boiler_financial_cost", NonNegative),
            fuel_cost: r.add_map(sets, "total_ng_cost", NonNegative),
        });
        let resistance = params.resistance.as_ref().map(|resistance| ResistanceVariables {
            nominal_power: r.add_map(
                sets,
                "resistance_nominal_power",
                Domain::bounded_by(resistance.max_capacity.map(|c| c.value())),
            ),
            thermal_energy: r.add_map(sets, "resistance_thermal_energy", NonNegative),
            total_demand: r.add_map(sets, "total_electrical_resistance_demand", NonNegative),
            financial_cost: r.add_scalar("resistance_financial_cost", NonNegative),
        });

        Self {
            registry,
            balance,
            thermal,
            costs,
            res,
            battery,
            generator,
            solar_collector,
            tank,
            boiler,
            resistance,
        }
    }
}

/// The parameters and variables of one technology
#[derive(Debug)]
pub struct Component<'a, P, V> {
    /// Parameters from the model file
    pub params: &'a P,
    /// Declared variables
    pub vars: &'a V,
}

// Derived Clone/Copy would require `P: Copy` and `V: Copy`
impl<P, V> Clone for Component<'_, P, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, V> Copy for Component<'_, P, V> {}

/// Pair up optional parameters and optional variables
fn component<'a, P, V>(params: Option<&'a P>, vars: Option<&'a V>) -> Option<Component<'a, P, V>> {
    Some(Component {
        params: params?,
        vars: vars?,
    })
}

/// The immutable context every constraint rule is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct ModelContext<'a> {
    /// The model being optimised
    pub model: &'a Model,
    /// Its decision variables
    pub vars: &'a Variables,
}

impl<'a> ModelContext<'a> {
    /// Create a new context
    pub fn new(model: &'a Model, vars: &'a Variables) -> Self {
        Self { model, vars }
    }

    /// Length of a period in hours
    pub fn delta_time(&self) -> f64 {
        self.model.delta_time()
    }

    /// Present value of a yearly amount, discounting the amount of each project year separately
    pub fn present_value<F>(&self, yearly: F) -> LinearExpr
    where
        F: FnMut(Year) -> LinearExpr,
    {
        present_value_over_years(
            &self.model.sets,
            self.model.parameters.project.discount_rate,
            |year| self.model.project_years[year],
            yearly,
        )
    }

    /// The renewable units, if present
    pub fn res(&self) -> Option<Component<'a, ResParameters, ResVariables>> {
        component(self.model.parameters.res.as_ref(), self.vars.res.as_ref())
    }

    /// The battery bank, if present
    pub fn battery(&self) -> Option<Component<'a, BatteryParameters, BatteryVariables>> {
        component(
            self.model.parameters.battery.as_ref(),
            self.vars.battery.as_ref(),
        )
    }

    /// The diesel generator, if present
    pub fn generator(&self) -> Option<Component<'a, GeneratorParameters, GeneratorVariables>> {
        component(
            self.model.parameters.generator.as_ref(),
            self.vars.generator.as_ref(),
        )
    }

    /// The solar collectors, if present
    pub fn solar_collector(
        &self,
    ) -> Option<Component<'a, SolarCollectorParameters, SolarCollectorVariables>> {
        component(
            self.model.parameters.solar_collector.as_ref(),
            self.vars.solar_collector.as_ref(),
        )
    }

    /// The storage tanks, if present
    pub fn tank(&self) -> Option<Component<'a, TankParameters, TankVariables>> {
        component(self.model.parameters.tank.as_ref(), self.vars.tank.as_ref())
    }

    /// The boilers, if present
    pub fn boiler(&self) -> Option<Component<'a, BoilerParameters, BoilerVariables>> {
        component(
            self.model.parameters.boiler.as_ref(),
            self.vars.boiler.as_ref(),
        )
    }

    /// The resistance heaters, if present
    pub fn resistance(&self) -> Option<Component<'a, ResistanceParameters, ResistanceVariables>> {
        component(
            self.model.parameters.resistance.as_ref(),
            self.vars.resistance.as_ref(),
        )
    }
}
