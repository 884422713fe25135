/// Generic trait for batched probability distributions, the closed-form families
/// (Normal, Gamma, MultiNormal, Dirichlet) and the Factorised composite, which
/// splits its event vector into independent blocks, one per factor.
pub mod distr;

/// Dispatch table for the Kullback-Leibler divergence between pairs of distributions,
/// with a seeded Monte Carlo estimate for pairs without a closed form.
pub mod divergence;

/// Factorised models read from and written to JSON.
pub mod model;

mod error;

pub use error::DistrError;
