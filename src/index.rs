//! Index sets of the sizing model and dense containers keyed by them.
//!
//! All indices are 1-based. Containers are laid out scenario-major, so that the values for one
//! scenario are contiguous.
use itertools::iproduct;
use std::marker::PhantomData;
use std::ops::Index;

macro_rules! define_index_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
        pub struct $name(u32);

        impl $name {
            /// Create an index from its 1-based value
            pub fn new(value: u32) -> Self {
                debug_assert!(value >= 1, "Indices are 1-based");
                $name(value)
            }

            /// The 1-based value of the index
            pub fn get(self) -> u32 {
                self.0
            }

            /// Zero-based position of the index
            pub fn zero_based(self) -> usize {
                self.0 as usize - 1
            }

            /// Zero-based position within a set of `count` members, if the index is in range
            fn position(self, count: u32) -> Option<usize> {
                (self.0 >= 1 && self.0 <= count).then(|| self.zero_based())
            }
        }
    };
}

define_index_type!(Scenario, "A realisation of the uncertain inputs, with its own weight");
define_index_type!(Period, "A fixed-length dispatch interval, repeated every project year");
define_index_type!(Year, "A project year");
define_index_type!(Class, "A thermal end-use segment with its own equipment");

impl Period {
    /// Whether this is the first period of the horizon
    pub fn is_first(self) -> bool {
        self.0 == 1
    }

    /// The preceding period, or `None` for the first one
    pub fn previous(self) -> Option<Period> {
        (!self.is_first()).then(|| Period(self.0 - 1))
    }
}

/// The sizes of the index sets of one model instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sets {
    /// Number of scenarios
    pub scenarios: u32,
    /// Number of periods per year
    pub periods: u32,
    /// Number of project years
    pub years: u32,
    /// Number of thermal classes (zero when there is no thermal part)
    pub classes: u32,
}

impl Sets {
    /// Create a new set of indices
    pub fn new(scenarios: u32, periods: u32, years: u32, classes: u32) -> Self {
        Self {
            scenarios,
            periods,
            years,
            classes,
        }
    }

    /// Iterate over scenarios
    pub fn iter_scenarios(&self) -> impl Iterator<Item = Scenario> {
        (1..=self.scenarios).map(Scenario)
    }

    /// Iterate over periods
    pub fn iter_periods(&self) -> impl Iterator<Item = Period> {
        (1..=self.periods).map(Period)
    }

    /// Iterate over years
    pub fn iter_years(&self) -> impl Iterator<Item = Year> {
        (1..=self.years).map(Year)
    }

    /// Iterate over thermal classes
    pub fn iter_classes(&self) -> impl Iterator<Item = Class> {
        (1..=self.classes).map(Class)
    }

    /// Iterate over every `(scenario, period)` pair
    pub fn iter_scenario_periods(&self) -> impl Iterator<Item = (Scenario, Period)> {
        iproduct!(1..=self.scenarios, 1..=self.periods).map(|(i, t)| (Scenario(i), Period(t)))
    }

    /// Iterate over every `(scenario, class)` pair
    pub fn iter_scenario_classes(&self) -> impl Iterator<Item = (Scenario, Class)> {
        iproduct!(1..=self.scenarios, 1..=self.classes).map(|(i, c)| (Scenario(i), Class(c)))
    }

    /// Iterate over every `(class, period)` pair of one scenario
    pub fn iter_class_periods(&self) -> impl Iterator<Item = (Class, Period)> {
        iproduct!(1..=self.classes, 1..=self.periods).map(|(c, t)| (Class(c), Period(t)))
    }

    /// Iterate over every `(scenario, class, period)` triple
    pub fn iter_scenario_class_periods(&self) -> impl Iterator<Item = (Scenario, Class, Period)> {
        iproduct!(1..=self.scenarios, 1..=self.classes, 1..=self.periods)
            .map(|(i, c, t)| (Scenario(i), Class(c), Period(t)))
    }
}

/// A key which addresses a dense, fixed-size container
pub trait DenseKey: Copy {
    /// Number of distinct keys
    fn len(sets: &Sets) -> usize;

    /// Position of the key in the container, or `None` if it is out of range
    fn offset(self, sets: &Sets) -> Option<usize>;

    /// All keys, in offset order
    fn keys(sets: &Sets) -> impl Iterator<Item = Self>;
}

macro_rules! impl_dense_key_single {
    ($name:ident, $count:ident, $iter:ident) => {
        impl DenseKey for $name {
            fn len(sets: &Sets) -> usize {
                sets.$count as usize
            }

            fn offset(self, sets: &Sets) -> Option<usize> {
                self.position(sets.$count)
            }

            fn keys(sets: &Sets) -> impl Iterator<Item = Self> {
                sets.$iter()
            }
        }
    };
}

impl_dense_key_single!(Scenario, scenarios, iter_scenarios);
impl_dense_key_single!(Period, periods, iter_periods);
impl_dense_key_single!(Year, years, iter_years);
impl_dense_key_single!(Class, classes, iter_classes);

impl DenseKey for (Scenario, Period) {
    fn len(sets: &Sets) -> usize {
        sets.scenarios as usize * sets.periods as usize
    }

    fn offset(self, sets: &Sets) -> Option<usize> {
        let i = self.0.position(sets.scenarios)?;
        let t = self.1.position(sets.periods)?;
        Some(i * sets.periods as usize + t)
    }

    fn keys(sets: &Sets) -> impl Iterator<Item = Self> {
        sets.iter_scenario_periods()
    }
}

impl DenseKey for (Scenario, Class) {
    fn len(sets: &Sets) -> usize {
        sets.scenarios as usize * sets.classes as usize
    }

    fn offset(self, sets: &Sets) -> Option<usize> {
        let i = self.0.position(sets.scenarios)?;
        let c = self.1.position(sets.classes)?;
        Some(i * sets.classes as usize + c)
    }

    fn keys(sets: &Sets) -> impl Iterator<Item = Self> {
        sets.iter_scenario_classes()
    }
}

impl DenseKey for (Scenario, Class, Period) {
    fn len(sets: &Sets) -> usize {
        sets.scenarios as usize * sets.classes as usize * sets.periods as usize
    }

    fn offset(self, sets: &Sets) -> Option<usize> {
        let i = self.0.position(sets.scenarios)?;
        let c = self.1.position(sets.classes)?;
        let t = self.2.position(sets.periods)?;
        Some((i * sets.classes as usize + c) * sets.periods as usize + t)
    }

    fn keys(sets: &Sets) -> impl Iterator<Item = Self> {
        sets.iter_scenario_class_periods()
    }
}

/// A value for every key of a dense index domain
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMap<K: DenseKey, T> {
    sets: Sets,
    values: Vec<T>,
    key: PhantomData<K>,
}

/// A value per scenario
pub type ScenarioMap<T> = DenseMap<Scenario, T>;
/// A value per thermal class
pub type ClassMap<T> = DenseMap<Class, T>;
/// A value per project year
pub type YearMap<T> = DenseMap<Year, T>;
/// A value per `(scenario, period)`
pub type ScenarioPeriodMap<T> = DenseMap<(Scenario, Period), T>;
/// A value per `(scenario, class, period)`
pub type ScenarioClassPeriodMap<T> = DenseMap<(Scenario, Class, Period), T>;

impl<K: DenseKey, T> DenseMap<K, T> {
    /// Build the container by evaluating `f` for every key
    pub fn from_fn<F>(sets: &Sets, f: F) -> Self
    where
        F: FnMut(K) -> T,
    {
        Self {
            sets: *sets,
            values: K::keys(sets).map(f).collect(),
            key: PhantomData,
        }
    }

    /// Build the container by evaluating a fallible `f` for every key, stopping at the first error
    pub fn try_from_fn<F, E>(sets: &Sets, f: F) -> Result<Self, E>
    where
        F: FnMut(K) -> Result<T, E>,
    {
        Ok(Self {
            sets: *sets,
            values: K::keys(sets).map(f).collect::<Result<_, _>>()?,
            key: PhantomData,
        })
    }

    /// Get the value for `key`, if it is in range
    pub fn get(&self, key: K) -> Option<&T> {
        key.offset(&self.sets).and_then(|offset| self.values.get(offset))
    }

    /// Iterate over keys and values
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        K::keys(&self.sets).zip(self.values.iter())
    }

    /// Iterate over values in key order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Number of values stored
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the domain is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: DenseKey + std::fmt::Debug, T> Index<K> for DenseMap<K, T> {
    type Output = T;

    fn index(&self, key: K) -> &T {
        self.get(key)
            .unwrap_or_else(|| panic!("Index {key:?} out of range for {:?}", self.sets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_period_previous() {
        assert_eq!(Period::new(1).previous(), None);
        assert_eq!(Period::new(3).previous(), Some(Period::new(2)));
        assert!(Period::new(1).is_first());
    }

    #[test]
    fn test_offsets_match_key_order() {
        let sets = Sets::new(2, 3, 1, 2);
        for (expected, key) in <(Scenario, Class, Period)>::keys(&sets).enumerate() {
            assert_eq!(key.offset(&sets), Some(expected));
        }
        for (expected, key) in <(Scenario, Period)>::keys(&sets).enumerate() {
            assert_eq!(key.offset(&sets), Some(expected));
        }
        assert_eq!(<(Scenario, Class, Period)>::len(&sets), 12);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(3, 1)]
    #[case(1, 5)]
    fn test_offset_out_of_range(#[case] scenario: u32, #[case] period: u32) {
        let sets = Sets::new(2, 4, 1, 0);
        assert_eq!((Scenario(scenario), Period(period)).offset(&sets), None);
    }

    #[test]
    fn test_dense_map() {
        let sets = Sets::new(2, 2, 1, 0);
        let map = ScenarioPeriodMap::from_fn(&sets, |(i, t)| i.get() * 10 + t.get());
        assert_eq!(map[(Scenario::new(2), Period::new(1))], 21);
        assert_eq!(map.get((Scenario::new(3), Period::new(1))), None);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), [11, 12, 21, 22]);
    }

    #[test]
    fn test_dense_map_try_from_fn() {
        let sets = Sets::new(3, 1, 1, 0);
        let result: Result<ScenarioMap<u32>, u32> = DenseMap::try_from_fn(&sets, |i: Scenario| {
            if i.get() == 2 {
                Err(i.get())
            } else {
                Ok(i.get())
            }
        });
        assert_eq!(result, Err(2));
    }

    #[test]
    fn test_iter_class_periods() {
        let sets = Sets::new(3, 2, 1, 2);
        assert_eq!(
            sets.iter_class_periods().collect::<Vec<_>>(),
            [
                (Class(1), Period(1)),
                (Class(1), Period(2)),
                (Class(2), Period(1)),
                (Class(2), Period(2)),
            ]
        );
    }

    #[test]
    fn test_no_classes() {
        let sets = Sets::new(2, 4, 1, 0);
        assert_eq!(sets.iter_scenario_class_periods().count(), 0);
        assert_eq!(sets.iter_class_periods().count(), 0);
        assert!(ClassMap::from_fn(&sets, |_| 0.0).is_empty());
    }
}
