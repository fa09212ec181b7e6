//! The technologies which may make up a micro-energy system.
use super::ModelParameters;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

/// A technology which can be sized by the optimisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Technology {
    /// Renewable (PV) units
    Res,
    /// Battery bank
    Battery,
    /// Diesel generator
    Generator,
    /// Solar thermal collectors
    SolarCollector,
    /// Thermal storage tank
    Tank,
    /// Natural-gas boiler
    Boiler,
    /// Electric resistance heater
    Resistance,
}

impl Technology {
    /// Iterate over the technologies present in the model file, in declaration order
    pub fn iter_enabled(parameters: &ModelParameters) -> impl Iterator<Item = Technology> + '_ {
        Technology::iter().filter(|technology| parameters.has_technology(*technology))
    }

    /// Whether the technology has one installation per thermal class
    pub fn is_thermal(self) -> bool {
        matches!(
            self,
            Technology::SolarCollector
                | Technology::Tank
                | Technology::Boiler
                | Technology::Resistance
        )
    }

    /// The technology this one delivers its output into, if it cannot supply demand directly
    pub fn delivers_into(self) -> Option<Technology> {
        match self {
            Technology::SolarCollector | Technology::Resistance => Some(Technology::Tank),
            _ => None,
        }
    }
}

/// A broad classification of a system by its technology mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SystemKind {
    /// Generator and boiler only, with no renewables or storage
    #[strum(to_string = "traditional energy system")]
    Traditional,
    /// Electric-only system with renewables or storage
    #[strum(to_string = "conventional micro-grid")]
    ConventionalMicroGrid,
    /// Electric micro-grid plus conventional heat supply
    #[strum(to_string = "multi-good micro-grid")]
    MultiGoodMicroGrid,
    /// Electric and thermal parts coupled through storage or power-to-heat
    #[strum(to_string = "multi-energy system")]
    MultiEnergySystem,
}

impl SystemKind {
    /// Classify the system described by a model file
    pub fn classify(parameters: &ModelParameters) -> SystemKind {
        let has = |technology| parameters.has_technology(technology);
        let renewables_or_storage = has(Technology::Res) || has(Technology::Battery);
        let coupled = has(Technology::Tank) || has(Technology::SolarCollector);

        if !renewables_or_storage && !coupled {
            SystemKind::Traditional
        } else if coupled {
            SystemKind::MultiEnergySystem
        } else if parameters.project.classes > 0 {
            SystemKind::MultiGoodMicroGrid
        } else {
            SystemKind::ConventionalMicroGrid
        }
    }
}
