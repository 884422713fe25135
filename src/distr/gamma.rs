use nalgebra::*;
use rand::RngCore;
use rand_distr::Distribution as _;
use serde::{Serialize, Deserialize};
use statrs::function::gamma::{digamma, ln_gamma};
use std::any::Any;
use super::*;
use crate::error::DistrError;

/// Gamma is a distribution for scale parameters, parametrized here by a shape alpha
/// and a rate beta per batch element. For alpha=1 it reduces to the exponential
/// distribution with rate beta; for alpha >> 1 it approaches a gaussian centered
/// at alpha / beta with dispersion alpha / beta^2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gamma {

    shape : DVector<f64>,

    rate : DVector<f64>

}

impl Gamma {

    pub fn new(shape : DVector<f64>, rate : DVector<f64>) -> Result<Self, DistrError> {
        if shape.nrows() == 0 {
            return Err(DistrError::InvalidParameter("Gamma requires a non-empty batch".to_string()));
        }
        if shape.nrows() != rate.nrows() {
            return Err(DistrError::ShapeMismatch { op : "Gamma::new", expected : shape.nrows(), found : rate.nrows() });
        }
        let valid = |v : &f64| *v > 0.0 && v.is_finite();
        if !shape.iter().all(valid) || !rate.iter().all(valid) {
            return Err(DistrError::InvalidParameter("Gamma shape and rate must be positive".to_string()));
        }
        Ok(Self { shape, rate })
    }

    pub fn scalar(shape : f64, rate : f64) -> Result<Self, DistrError> {
        Self::new(DVector::from_element(1, shape), DVector::from_element(1, rate))
    }

    /// Repeats a single-element batch over batch elements.
    pub fn expand(&self, batch : usize) -> Result<Self, DistrError> {
        let expand = |v : &DVector<f64>| {
            expand_rows(&DMatrix::from_column_slice(v.nrows(), 1, v.as_slice()), batch)
                .map(|m| m.column(0).clone_owned() )
        };
        Self::new(expand(&self.shape)?, expand(&self.rate)?)
    }

    pub fn shape(&self) -> &DVector<f64> {
        &self.shape
    }

    pub fn rate(&self) -> &DVector<f64> {
        &self.rate
    }

    /// Closed-form KL(self || other), one entry per batch element.
    pub fn kl(&self, other : &Gamma) -> Result<DVector<f64>, DistrError> {
        let batch = validate_pair(self, other)?;
        Ok(DVector::from_fn(batch, |j, _| {
            let (ap, bp) = (self.shape[j], self.rate[j]);
            let (aq, bq) = (other.shape[j], other.rate[j]);
            aq * (bp / bq).ln() + ln_gamma(aq) - ln_gamma(ap) +
                (ap - aq) * digamma(ap) + (bq - bp) * ap / bp
        }))
    }

}

impl Distribution for Gamma {

    fn batch_shape(&self) -> usize {
        self.shape.nrows()
    }

    fn event_shape(&self) -> Option<usize> {
        None
    }

    fn has_rsample(&self) -> bool {
        true
    }

    fn support(&self) -> Box<dyn Support> {
        Box::new(Constraint::Positive)
    }

    fn sample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        let batch = self.batch_shape();
        let mut samplers = Vec::with_capacity(batch);
        for (a, b) in self.shape.iter().zip(self.rate.iter()) {
            let sampler = rand_distr::Gamma::new(*a, 1. / *b)
                .map_err(|e| DistrError::InvalidParameter(format!("{:?}", e)) )?;
            samplers.push(sampler);
        }
        Ok(DMatrix::from_fn(n * batch, 1, |r, _| samplers[r % batch].sample(&mut *rng) ))
    }

    fn rsample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        self.sample(n, rng)
    }

    fn log_prob(&self, y : DMatrixSlice<'_, f64>) -> Result<DVector<f64>, DistrError> {
        validate_value(self, &y, "Gamma::log_prob")?;
        let batch = self.batch_shape();
        Ok(DVector::from_fn(y.nrows(), |r, _| {
            let (a, b, x) = (self.shape[r % batch], self.rate[r % batch], y[(r, 0)]);
            if x > 0.0 {
                a * b.ln() - ln_gamma(a) + (a - 1.) * x.ln() - b * x
            } else {
                std::f64::NEG_INFINITY
            }
        }))
    }

    fn entropy(&self) -> Result<DVector<f64>, DistrError> {
        Ok(DVector::from_fn(self.batch_shape(), |j, _| {
            let (a, b) = (self.shape[j], self.rate[j]);
            a - b.ln() + ln_gamma(a) + (1. - a) * digamma(a)
        }))
    }

    fn mean(&self) -> Result<DMatrix<f64>, DistrError> {
        Ok(DMatrix::from_fn(self.batch_shape(), 1, |j, _| self.shape[j] / self.rate[j] ))
    }

    fn variance(&self) -> Result<DMatrix<f64>, DistrError> {
        Ok(DMatrix::from_fn(self.batch_shape(), 1, |j, _| self.shape[j] / self.rate[j].powi(2) ))
    }

    fn family(&self) -> &'static str {
        "Gamma"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

}
