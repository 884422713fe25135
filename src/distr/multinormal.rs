use nalgebra::*;
use rand::RngCore;
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::any::Any;
use std::f64::consts::PI;
use super::*;
use crate::error::DistrError;

/// Multivariate normal parametrized by one mean row μ (1xp) per batch element
/// and a covariance Σ (pxp) shared by the whole batch. The lower Cholesky factor
/// of Σ is computed once at construction and drives sampling (μ + L z),
/// log-probability and the closed-form divergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiNormal {

    /// Batch x p matrix of means.
    mu : DMatrix<f64>,

    sigma : DMatrix<f64>,

    /// Lower-triangular factor L with L L^T = sigma.
    sigma_lower : DMatrix<f64>,

    /// log |sigma|
    log_det : f64

}

impl MultiNormal {

    /// Single-element batch centered at mu.
    pub fn new(mu : DVector<f64>, sigma : DMatrix<f64>) -> Result<Self, DistrError> {
        Self::new_batch(DMatrix::from_row_slice(1, mu.nrows(), mu.as_slice()), sigma)
    }

    /// One mean per row of mu, all sharing the same covariance.
    pub fn new_batch(mu : DMatrix<f64>, sigma : DMatrix<f64>) -> Result<Self, DistrError> {
        if mu.nrows() == 0 || mu.ncols() == 0 {
            return Err(DistrError::InvalidParameter("MultiNormal requires a non-empty mean".to_string()));
        }
        if sigma.nrows() != sigma.ncols() {
            return Err(DistrError::InvalidParameter("MultiNormal covariance must be square".to_string()));
        }
        if sigma.nrows() != mu.ncols() {
            return Err(DistrError::ShapeMismatch { op : "MultiNormal::new", expected : mu.ncols(), found : sigma.nrows() });
        }
        let sigma_lower = Cholesky::new(sigma.clone())
            .ok_or_else(|| DistrError::InvalidParameter("MultiNormal covariance must be positive-definite".to_string()) )?
            .unpack();
        let log_det = 2. * sigma_lower.diagonal().iter().fold(0.0, |s, d| s + d.ln() );
        Ok(Self { mu, sigma, sigma_lower, log_det })
    }

    /// Standard multivariate normal N(0, I) of dimension p.
    pub fn standard(p : usize) -> Result<Self, DistrError> {
        Self::new(DVector::zeros(p), DMatrix::identity(p, p))
    }

    /// Repeats a single-element batch over batch elements.
    pub fn expand(&self, batch : usize) -> Result<Self, DistrError> {
        let mu = expand_rows(&self.mu, batch)?;
        Ok(Self { mu, ..self.clone() })
    }

    pub fn mu(&self) -> &DMatrix<f64> {
        &self.mu
    }

    pub fn sigma(&self) -> &DMatrix<f64> {
        &self.sigma
    }

    /// Closed-form KL(self || other), one entry per batch element:
    /// 0.5 [ tr(Σq^-1 Σp) + (μq - μp)^T Σq^-1 (μq - μp) - p + log|Σq| - log|Σp| ]
    pub fn kl(&self, other : &MultiNormal) -> Result<DVector<f64>, DistrError> {
        let batch = validate_pair(self, other)?;
        let p = self.mu.ncols() as f64;

        // ||Lq^-1 Lp||_F^2 = tr(Σq^-1 Σp)
        let trace = other.sigma_lower.solve_lower_triangular(&self.sigma_lower)
            .ok_or_else(|| DistrError::InvalidParameter("Singular covariance factor".to_string()) )?
            .norm_squared();
        let mut kl = DVector::zeros(batch);
        for j in 0..batch {
            let diff = (other.mu.row(j) - self.mu.row(j)).transpose();
            let maha = other.mahalanobis(&diff)?;
            kl[j] = 0.5 * (trace + maha - p + other.log_det - self.log_det);
        }
        Ok(kl)
    }

    /// x^T Σ^-1 x, evaluated through the Cholesky factor.
    fn mahalanobis(&self, xc : &DVector<f64>) -> Result<f64, DistrError> {
        self.sigma_lower.solve_lower_triangular(xc)
            .map(|z| z.norm_squared() )
            .ok_or_else(|| DistrError::InvalidParameter("Singular covariance factor".to_string()) )
    }

    fn draw(&self, n : usize, rng : &mut dyn RngCore) -> DMatrix<f64> {
        let (batch, p) = self.mu.shape();
        let mut samples = DMatrix::zeros(n * batch, p);
        for r in 0..(n * batch) {
            let z = DVector::from_fn(p, |_, _| rng.sample::<f64, _>(rand_distr::StandardNormal) );
            let x = &self.sigma_lower * z + self.mu.row(r % batch).transpose();
            samples.row_mut(r).copy_from(&x.transpose());
        }
        samples
    }

}

impl Distribution for MultiNormal {

    fn batch_shape(&self) -> usize {
        self.mu.nrows()
    }

    fn event_shape(&self) -> Option<usize> {
        Some(self.mu.ncols())
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

    fn rsample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        Ok(self.draw(n, rng))
    }

    fn log_prob(&self, y : DMatrixSlice<'_, f64>) -> Result<DVector<f64>, DistrError> {
        validate_value(self, &y, "MultiNormal::log_prob")?;
        let batch = self.batch_shape();
        let partition = -0.5 * self.mu.ncols() as f64 * (2.0*PI).ln() - 0.5 * self.log_det;
        let mut lp = DVector::zeros(y.nrows());
        for (r, row) in y.row_iter().enumerate() {
            let xc = (row - self.mu.row(r % batch)).transpose();
            lp[r] = partition - 0.5 * self.mahalanobis(&xc)?;
        }
        Ok(lp)
    }

    fn entropy(&self) -> Result<DVector<f64>, DistrError> {
        let p = self.mu.ncols() as f64;
        let h = 0.5 * p * (1. + (2. * PI).ln()) + 0.5 * self.log_det;
        Ok(DVector::from_element(self.batch_shape(), h))
    }

    fn mean(&self) -> Result<DMatrix<f64>, DistrError> {
        Ok(self.mu.clone())
    }

    /// Diagonal of the covariance, repeated for every batch element.
    fn variance(&self) -> Result<DMatrix<f64>, DistrError> {
        let diag = self.sigma.diagonal();
        Ok(DMatrix::from_fn(self.batch_shape(), diag.nrows(), |_, k| diag[k] ))
    }

    fn family(&self) -> &'static str {
        "MultiNormal"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

}
