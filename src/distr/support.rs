use nalgebra::*;
use std::fmt::Debug;
use crate::error::DistrError;

/// Tolerance for the unit-sum condition of the probability simplex.
pub const SIMPLEX_TOL : f64 = 1E-6;

/// Membership predicate over the values a distribution assigns non-zero density to.
pub trait Support
where
    Self : Debug + Send + Sync
{

    /// Checks every row of y, returning one boolean per row.
    fn check(&self, y : DMatrixSlice<'_, f64>) -> Result<Vec<bool>, DistrError>;

    /// True iff every row of y lies in the support.
    fn contains(&self, y : DMatrixSlice<'_, f64>) -> Result<bool, DistrError> {
        Ok(self.check(y)?.iter().all(|inside| *inside))
    }

}

/// Supports of the elementary families.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {

    /// Any value that is not a NaN.
    Real,

    /// Strictly positive values.
    Positive,

    /// Non-negative rows summing to one.
    Simplex

}

impl Support for Constraint {

    fn check(&self, y : DMatrixSlice<'_, f64>) -> Result<Vec<bool>, DistrError> {
        let inside = y.row_iter().map(|row| {
            match self {
                Constraint::Real => row.iter().all(|v| !v.is_nan()),
                Constraint::Positive => row.iter().all(|v| *v > 0.0),
                Constraint::Simplex => {
                    row.iter().all(|v| *v >= 0.0) && (row.sum() - 1.0).abs() < SIMPLEX_TOL
                }
            }
        }).collect();
        Ok(inside)
    }

}
