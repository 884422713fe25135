use nalgebra::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use crate::distr::*;
use crate::error::DistrError;

/// Settings of the Monte Carlo estimator used for pairs of distributions
/// without a registered closed-form rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceConfig {

    /// Number of draws from p per batch element.
    pub samples : usize,

    /// Seed of the generator used for the draws, so estimates are reproducible.
    pub seed : u64,

    /// When false, unregistered pairs fail with DistrError::NoRule.
    pub fallback : bool

}

impl Default for DivergenceConfig {

    fn default() -> Self {
        Self { samples : 1000, seed : 0, fallback : true }
    }

}

type Rule = Box<dyn Fn(&dyn Distribution, &dyn Distribution, &Divergence) -> Result<DVector<f64>, DistrError> + Send + Sync>;

/// Dispatch table for KL(p || q), keyed on the pair of concrete types of p and q.
/// Rules receive the table itself, so composite rules can dispatch their own parts.
pub struct Divergence {

    rules : HashMap<(TypeId, TypeId), Rule>,

    config : DivergenceConfig

}

impl Debug for Divergence {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Divergence")
            .field("rules", &self.rules.len())
            .field("config", &self.config)
            .finish()
    }

}

impl Default for Divergence {

    fn default() -> Self {
        Self::new(Default::default())
    }

}

impl Divergence {

    /// Table with no registered rule; every pair goes to the fallback estimator.
    pub fn empty(config : DivergenceConfig) -> Self {
        Self { rules : HashMap::new(), config }
    }

    /// Table with the closed-form rules of every family in the crate,
    /// plus the factor-wise rule for pairs of Factorised.
    pub fn new(config : DivergenceConfig) -> Self {
        let mut div = Self::empty(config);
        div.register(|p : &Normal, q : &Normal, _ : &Divergence| p.kl(q) )
            .register(|p : &Gamma, q : &Gamma, _ : &Divergence| p.kl(q) )
            .register(|p : &MultiNormal, q : &MultiNormal, _ : &Divergence| p.kl(q) )
            .register(|p : &Dirichlet, q : &Dirichlet, _ : &Divergence| p.kl(q) )
            .register::<Factorised, Factorised, _>(kl_factorised);
        div
    }

    pub fn config(&self) -> &DivergenceConfig {
        &self.config
    }

    /// Installs (or replaces) the rule for the pair (P, Q).
    pub fn register<P, Q, F>(&mut self, rule : F) -> &mut Self
    where
        P : Distribution + 'static,
        Q : Distribution + 'static,
        F : Fn(&P, &Q, &Divergence) -> Result<DVector<f64>, DistrError> + Send + Sync + 'static
    {
        let erased = move |p : &dyn Distribution, q : &dyn Distribution, div : &Divergence| {
            match (p.as_any().downcast_ref::<P>(), q.as_any().downcast_ref::<Q>()) {
                (Some(p), Some(q)) => rule(p, q, div),
                _ => Err(DistrError::NoRule { p : p.family(), q : q.family() })
            }
        };
        self.rules.insert((TypeId::of::<P>(), TypeId::of::<Q>()), Box::new(erased));
        self
    }

    pub fn has_rule(&self, p : &dyn Distribution, q : &dyn Distribution) -> bool {
        self.rules.contains_key(&Self::key(p, q))
    }

    /// KL(p || q), one entry per batch element.
    pub fn kl(&self, p : &dyn Distribution, q : &dyn Distribution) -> Result<DVector<f64>, DistrError> {
        match self.rules.get(&Self::key(p, q)) {
            Some(rule) => {
                tracing::trace!(p = p.family(), q = q.family(), "closed-form divergence");
                rule(p, q, self)
            },
            None if self.config.fallback => self.monte_carlo(p, q),
            None => Err(DistrError::NoRule { p : p.family(), q : q.family() })
        }
    }

    fn key(p : &dyn Distribution, q : &dyn Distribution) -> (TypeId, TypeId) {
        (Any::type_id(p.as_any()), Any::type_id(q.as_any()))
    }

    /// Estimates E_p[log p(x) - log q(x)] from config.samples draws of p.
    fn monte_carlo(&self, p : &dyn Distribution, q : &dyn Distribution) -> Result<DVector<f64>, DistrError> {
        let batch = validate_pair(p, q)?;
        let n = self.config.samples.max(1);
        tracing::debug!(p = p.family(), q = q.family(), samples = n, "no closed-form divergence; using Monte Carlo estimate");
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let x = p.sample(n, &mut rng)?;
        let lp = p.log_prob((&x).into())?;
        let lq = q.log_prob((&x).into())?;
        let mut kl = DVector::zeros(batch);
        for (r, (a, b)) in lp.iter().zip(lq.iter()).enumerate() {
            kl[r % batch] += (a - b) / n as f64;
        }
        Ok(kl)
    }

}

/// KL(p || q) through the default table.
pub fn kl_divergence(p : &dyn Distribution, q : &dyn Distribution) -> Result<DVector<f64>, DistrError> {
    Divergence::default().kl(p, q)
}
