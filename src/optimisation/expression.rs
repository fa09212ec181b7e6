//! Linear expressions over decision variables and the relations built from them.
use crate::units::Dimensionless;
use indexmap::IndexMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A decision variable of the optimisation.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    /// Refer to the column at `index`
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// The column index of the variable
    pub fn index(self) -> usize {
        self.0
    }
}

/// An affine combination of decision variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    /// The terms of the expression. A variable may appear more than once.
    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// The constant part of the expression
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// The terms with repeated variables combined and zero coefficients removed
    pub fn merged_terms(&self) -> Vec<(VarId, f64)> {
        let mut merged: IndexMap<VarId, f64> = IndexMap::with_capacity(self.terms.len());
        for &(var, coeff) in &self.terms {
            *merged.entry(var).or_default() += coeff;
        }
        merged.into_iter().filter(|(_, coeff)| *coeff != 0.0).collect()
    }

    /// Evaluate the expression for the given column values
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(var, coeff)| coeff * values[var.index()])
                .sum::<f64>()
    }

    /// `self == rhs`
    pub fn equals(self, rhs: impl Into<LinearExpr>) -> Constraint {
        Constraint::new(self - rhs.into(), Relation::Equal)
    }

    /// `self <= rhs`
    pub fn leq(self, rhs: impl Into<LinearExpr>) -> Constraint {
        Constraint::new(self - rhs.into(), Relation::LessOrEqual)
    }

    /// `self >= rhs`
    pub fn geq(self, rhs: impl Into<LinearExpr>) -> Constraint {
        Constraint::new(self - rhs.into(), Relation::GreaterOrEqual)
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        Self {
            terms: vec![(var, 1.0)],
            constant: 0.0,
        }
    }
}

impl From<f64> for LinearExpr {
    fn from(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }
}

impl<T: Into<LinearExpr>> AddAssign<T> for LinearExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinearExpr>> SubAssign<T> for LinearExpr {
    fn sub_assign(&mut self, rhs: T) {
        *self += -rhs.into();
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        self += rhs;
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        self -= rhs;
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1.0
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: f64) -> LinearExpr {
        for (_, coeff) in &mut self.terms {
            *coeff *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Mul<Dimensionless> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: Dimensionless) -> LinearExpr {
        self * rhs.value()
    }
}

impl Mul<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: LinearExpr) -> LinearExpr {
        rhs * self
    }
}

impl Div<f64> for LinearExpr {
    type Output = LinearExpr;

    fn div(self, rhs: f64) -> LinearExpr {
        self * rhs.recip()
    }
}

impl<T: Into<LinearExpr>> Add<T> for VarId {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for VarId {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Mul<f64> for VarId {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        LinearExpr {
            terms: vec![(self, rhs)],
            constant: 0.0,
        }
    }
}

impl Mul<VarId> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: VarId) -> LinearExpr {
        rhs * self
    }
}

impl Div<f64> for VarId {
    type Output = LinearExpr;

    fn div(self, rhs: f64) -> LinearExpr {
        self * rhs.recip()
    }
}

impl<T: Into<LinearExpr>> Sum<T> for LinearExpr {
    fn sum<I: Iterator<Item = T>>(iter: I) -> LinearExpr {
        iter.fold(LinearExpr::default(), |acc, item| acc + item)
    }
}

/// The kind of relation between the two sides of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `lhs == rhs`
    Equal,
    /// `lhs <= rhs`
    LessOrEqual,
    /// `lhs >= rhs`
    GreaterOrEqual,
}

/// A linear relation, stored as `expression (relation) 0`
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    expression: LinearExpr,
    relation: Relation,
}

impl Constraint {
    fn new(expression: LinearExpr, relation: Relation) -> Self {
        Self {
            expression,
            relation,
        }
    }

    /// The relation of the constraint
    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// The expression `lhs - rhs`
    pub fn expression(&self) -> &LinearExpr {
        &self.expression
    }

    /// Bounds on the variable terms once the constant is moved to the right-hand side
    pub fn row_bounds(&self) -> (Option<f64>, Option<f64>) {
        let rhs = -self.expression.constant;
        match self.relation {
            Relation::Equal => (Some(rhs), Some(rhs)),
            Relation::LessOrEqual => (None, Some(rhs)),
            Relation::GreaterOrEqual => (Some(rhs), None),
        }
    }

    /// By how much the given column values violate the constraint (zero if satisfied)
    pub fn violation(&self, values: &[f64]) -> f64 {
        let residual = self.expression.evaluate(values);
        match self.relation {
            Relation::Equal => residual.abs(),
            Relation::LessOrEqual => residual.max(0.0),
            Relation::GreaterOrEqual => (-residual).max(0.0),
        }
    }
}
