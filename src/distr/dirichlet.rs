use nalgebra::*;
use rand::RngCore;
use rand_distr::Distribution as _;
use serde::{Serialize, Deserialize};
use statrs::function::gamma::{digamma, ln_gamma};
use std::any::Any;
use super::*;
use crate::error::DistrError;

/// Distribution over the probability simplex, with one concentration row
/// α (1xk) per batch element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dirichlet {

    /// Batch x k matrix of concentrations.
    alpha : DMatrix<f64>

}

impl Dirichlet {

    /// Single-element batch with concentration alpha.
    pub fn new(alpha : DVector<f64>) -> Result<Self, DistrError> {
        Self::new_batch(DMatrix::from_row_slice(1, alpha.nrows(), alpha.as_slice()))
    }

    pub fn new_batch(alpha : DMatrix<f64>) -> Result<Self, DistrError> {
        if alpha.nrows() == 0 || alpha.ncols() == 0 {
            return Err(DistrError::InvalidParameter("Dirichlet requires a non-empty concentration".to_string()));
        }
        if !alpha.iter().all(|a| *a > 0.0 && a.is_finite() ) {
            return Err(DistrError::InvalidParameter("Dirichlet concentrations must be positive".to_string()));
        }
        Ok(Self { alpha })
    }

    /// Repeats a single-element batch over batch elements.
    pub fn expand(&self, batch : usize) -> Result<Self, DistrError> {
        Self::new_batch(expand_rows(&self.alpha, batch)?)
    }

    pub fn alpha(&self) -> &DMatrix<f64> {
        &self.alpha
    }

    /// Closed-form KL(self || other), one entry per batch element.
    pub fn kl(&self, other : &Dirichlet) -> Result<DVector<f64>, DistrError> {
        let batch = validate_pair(self, other)?;
        Ok(DVector::from_fn(batch, |j, _| {
            let (ap, aq) = (self.alpha.row(j), other.alpha.row(j));
            let (sp, sq) = (ap.sum(), aq.sum());
            let dg_sp = digamma(sp);
            let mut kl = ln_gamma(sp) - ln_gamma(sq);
            for (a, b) in ap.iter().zip(aq.iter()) {
                kl += ln_gamma(*b) - ln_gamma(*a) + (a - b) * (digamma(*a) - dg_sp);
            }
            kl
        }))
    }

    /// Log of the multivariate beta function B(α) for batch element j.
    fn log_beta(&self, j : usize) -> f64 {
        let row = self.alpha.row(j);
        row.iter().fold(0.0, |s, a| s + ln_gamma(*a) ) - ln_gamma(row.sum())
    }

}

// c * ln(x), zero whenever c == 0 (including x == 0).
fn xlogy(c : f64, x : f64) -> f64 {
    if c == 0.0 {
        0.0
    } else {
        c * x.ln()
    }
}

impl Distribution for Dirichlet {

    fn batch_shape(&self) -> usize {
        self.alpha.nrows()
    }

    fn event_shape(&self) -> Option<usize> {
        Some(self.alpha.ncols())
    }

    fn has_rsample(&self) -> bool {
        true
    }

    fn support(&self) -> Box<dyn Support> {
        Box::new(Constraint::Simplex)
    }

    // Normalized independent Gamma(α_i, 1) draws.
    fn sample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        let (batch, k) = self.alpha.shape();
        let mut samplers = Vec::with_capacity(batch * k);
        for a in self.alpha.iter() {
            let sampler = rand_distr::Gamma::new(*a, 1.)
                .map_err(|e| DistrError::InvalidParameter(format!("{:?}", e)) )?;
            samplers.push(sampler);
        }

        // alpha is column-major, so element (j, i) lives at i * batch + j.
        let mut samples = DMatrix::from_fn(n * batch, k, |r, i| {
            samplers[i * batch + r % batch].sample(&mut *rng)
        });
        for mut row in samples.row_iter_mut() {
            let total = row.sum();
            row.unscale_mut(total);
        }
        Ok(samples)
    }

    fn rsample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        self.sample(n, rng)
    }

    fn log_prob(&self, y : DMatrixSlice<'_, f64>) -> Result<DVector<f64>, DistrError> {
        validate_value(self, &y, "Dirichlet::log_prob")?;
        let batch = self.batch_shape();
        Ok(DVector::from_fn(y.nrows(), |r, _| {
            let j = r % batch;
            let kernel = y.row(r).iter().zip(self.alpha.row(j).iter())
                .fold(0.0, |s, (x, a)| s + xlogy(a - 1., *x) );
            kernel - self.log_beta(j)
        }))
    }

    fn entropy(&self) -> Result<DVector<f64>, DistrError> {
        let k = self.alpha.ncols() as f64;
        Ok(DVector::from_fn(self.batch_shape(), |j, _| {
            let row = self.alpha.row(j);
            let a0 = row.sum();
            let spread = row.iter().fold(0.0, |s, a| s + (a - 1.) * digamma(*a) );
            self.log_beta(j) + (a0 - k) * digamma(a0) - spread
        }))
    }

    fn mean(&self) -> Result<DMatrix<f64>, DistrError> {
        let mut m = self.alpha.clone();
        for mut row in m.row_iter_mut() {
            let a0 = row.sum();
            row.unscale_mut(a0);
        }
        Ok(m)
    }

    /// Marginal variance of each coordinate, α_i (α_0 - α_i) / (α_0^2 (α_0 + 1)).
    fn variance(&self) -> Result<DMatrix<f64>, DistrError> {
        let mut v = self.alpha.clone();
        for mut row in v.row_iter_mut() {
            let a0 = row.sum();
            for a in row.iter_mut() {
                *a = *a * (a0 - *a) / (a0.powi(2) * (a0 + 1.));
            }
        }
        Ok(v)
    }

    fn family(&self) -> &'static str {
        "Dirichlet"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

}
