use nalgebra::*;
use rand::RngCore;
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::any::Any;
use std::f64::consts::PI;
use super::*;
use crate::error::DistrError;

/// Univariate normal, with one location and one scale (standard deviation)
/// per batch element. Draws are scalars, so values carry a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normal {

    loc : DVector<f64>,

    scale : DVector<f64>

}

impl Normal {

    pub fn new(loc : DVector<f64>, scale : DVector<f64>) -> Result<Self, DistrError> {
        if loc.nrows() == 0 {
            return Err(DistrError::InvalidParameter("Normal requires a non-empty batch".to_string()));
        }
        if loc.nrows() != scale.nrows() {
            return Err(DistrError::ShapeMismatch { op : "Normal::new", expected : loc.nrows(), found : scale.nrows() });
        }
        if let Some(s) = scale.iter().find(|s| !(**s > 0.0 && s.is_finite()) ) {
            return Err(DistrError::InvalidParameter(format!("Normal scale must be positive (found {})", s)));
        }
        Ok(Self { loc, scale })
    }

    /// Single-element batch with the informed location and scale.
    pub fn scalar(loc : f64, scale : f64) -> Result<Self, DistrError> {
        Self::new(DVector::from_element(1, loc), DVector::from_element(1, scale))
    }

    pub fn standard() -> Self {
        Self { loc : DVector::zeros(1), scale : DVector::from_element(1, 1.) }
    }

    /// Repeats a single-element batch over batch elements.
    pub fn expand(&self, batch : usize) -> Result<Self, DistrError> {
        let expand = |v : &DVector<f64>| {
            expand_rows(&DMatrix::from_column_slice(v.nrows(), 1, v.as_slice()), batch)
                .map(|m| m.column(0).clone_owned() )
        };
        Self::new(expand(&self.loc)?, expand(&self.scale)?)
    }

    pub fn loc(&self) -> &DVector<f64> {
        &self.loc
    }

    pub fn scale(&self) -> &DVector<f64> {
        &self.scale
    }

    /// Closed-form KL(self || other), one entry per batch element.
    pub fn kl(&self, other : &Normal) -> Result<DVector<f64>, DistrError> {
        let batch = validate_pair(self, other)?;
        Ok(DVector::from_fn(batch, |j, _| {
            let var_ratio = (self.scale[j] / other.scale[j]).powi(2);
            let t1 = ((self.loc[j] - other.loc[j]) / other.scale[j]).powi(2);
            0.5 * (var_ratio + t1 - 1. - var_ratio.ln())
        }))
    }

    fn draw(&self, n : usize, rng : &mut dyn RngCore) -> DMatrix<f64> {
        let batch = self.loc.nrows();
        DMatrix::from_fn(n * batch, 1, |r, _| {
            let z : f64 = rng.sample(rand_distr::StandardNormal);
            self.loc[r % batch] + self.scale[r % batch] * z
        })
    }

}

// based on stats::dnorm.ipp
pub(crate) fn normal_log_prob(x : f64, mu : f64, stddev : f64) -> f64 {
    std_normal_log_prob((x - mu) / stddev, stddev)
}

// based on stats::dnorm.ipp
pub(crate) fn std_normal_log_prob(z : f64, stddev : f64) -> f64 {
    -0.5 * (2.0*PI).ln() - stddev.ln() - z.powf(2.0) / 2.0
}

impl Distribution for Normal {

    fn batch_shape(&self) -> usize {
        self.loc.nrows()
    }

    fn event_shape(&self) -> Option<usize> {
        None
    }

    fn has_rsample(&self) -> bool {
        true
    }

    fn support(&self) -> Box<dyn Support> {
        Box::new(Constraint::Real)
    }

    fn sample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        Ok(self.draw(n, rng))
    }

    // loc + scale * z is already a transformation of standard normal noise.
    fn rsample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        Ok(self.draw(n, rng))
    }

    fn log_prob(&self, y : DMatrixSlice<'_, f64>) -> Result<DVector<f64>, DistrError> {
        validate_value(self, &y, "Normal::log_prob")?;
        let batch = self.batch_shape();
        Ok(DVector::from_fn(y.nrows(), |r, _| {
            normal_log_prob(y[(r, 0)], self.loc[r % batch], self.scale[r % batch])
        }))
    }

    fn entropy(&self) -> Result<DVector<f64>, DistrError> {
        Ok(self.scale.map(|s| 0.5 + 0.5 * (2. * PI).ln() + s.ln() ))
    }

    fn mean(&self) -> Result<DMatrix<f64>, DistrError> {
        Ok(DMatrix::from_column_slice(self.loc.nrows(), 1, self.loc.as_slice()))
    }

    fn variance(&self) -> Result<DMatrix<f64>, DistrError> {
        let var = self.scale.map(|s| s.powi(2) );
        Ok(DMatrix::from_column_slice(var.nrows(), 1, var.as_slice()))
    }

    fn family(&self) -> &'static str {
        "Normal"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

}
