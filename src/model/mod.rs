use nalgebra::*;
use serde::{Serialize, Deserialize};
use std::fmt::{self, Display};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use crate::distr::*;
use crate::divergence::{Divergence, DivergenceConfig};
use crate::error::DistrError;

#[derive(Debug, Error)]
pub enum ModelError {

    #[error("Could not read or write model: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid model definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Distr(#[from] DistrError)

}

/// Definition of a single factor, tagged by its family name in JSON:
///
/// ```json
/// { "family" : "dirichlet", "alpha" : [1.0, 1.0, 1.0, 1.0] }
/// ```
///
/// Parameters describe a single distribution, which is repeated over
/// the batch of the enclosing model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum FactorSpec {

    Normal { loc : f64, scale : f64 },

    Gamma { shape : f64, rate : f64 },

    /// sigma is informed row by row.
    MultiNormal { mu : Vec<f64>, sigma : Vec<Vec<f64>> },

    Dirichlet { alpha : Vec<f64> }

}

impl FactorSpec {

    /// Instantiates the factor, expanded over batch elements.
    pub fn build(&self, batch : usize) -> Result<Arc<dyn Distribution>, DistrError> {
        let factor : Arc<dyn Distribution> = match self {
            FactorSpec::Normal { loc, scale } => {
                Arc::new(Normal::scalar(*loc, *scale)?.expand(batch)?)
            },
            FactorSpec::Gamma { shape, rate } => {
                Arc::new(Gamma::scalar(*shape, *rate)?.expand(batch)?)
            },
            FactorSpec::MultiNormal { mu, sigma } => {
                let p = mu.len();
                if let Some(row) = sigma.iter().find(|row| row.len() != p ) {
                    return Err(DistrError::ShapeMismatch { op : "FactorSpec::build", expected : p, found : row.len() });
                }
                let flat : Vec<f64> = sigma.iter().flat_map(|row| row.iter().cloned() ).collect();
                let sigma = DMatrix::from_row_slice(sigma.len(), p, &flat[..]);
                Arc::new(MultiNormal::new(DVector::from_column_slice(&mu[..]), sigma)?.expand(batch)?)
            },
            FactorSpec::Dirichlet { alpha } => {
                Arc::new(Dirichlet::new(DVector::from_column_slice(&alpha[..]))?.expand(batch)?)
            }
        };
        Ok(factor)
    }

}

/// Factorised model read from the outside world (e.g. JSON file): a batch size,
/// the ordered list of factors and the settings of the divergence estimator.
///
/// ```json
/// {
///     "batch" : 5,
///     "factors" : [
///         { "family" : "multinormal", "mu" : [0, 0], "sigma" : [[1, 0], [0, 1]] },
///         { "family" : "dirichlet", "alpha" : [1, 1, 1] }
///     ],
///     "divergence" : { "samples" : 1000, "seed" : 0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {

    pub batch : usize,

    pub factors : Vec<FactorSpec>,

    #[serde(default)]
    pub divergence : DivergenceConfig

}

impl Model {

    pub fn new(batch : usize, factors : Vec<FactorSpec>) -> Self {
        Self { batch, factors, divergence : Default::default() }
    }

    /// Builds the factorised distribution described by this model, with factors in
    /// the order they were declared.
    pub fn build(&self) -> Result<Factorised, DistrError> {
        if self.batch == 0 {
            return Err(DistrError::InvalidParameter("Model batch must be positive".to_string()));
        }
        let factors = self.factors.iter()
            .map(|f| f.build(self.batch) )
            .collect::<Result<Vec<_>, _>>()?;
        Factorised::new(factors)
    }

    /// Divergence table configured by this model.
    pub fn divergence(&self) -> Divergence {
        Divergence::new(self.divergence)
    }

    pub fn load_from_path<P>(path : P) -> Result<Self, ModelError>
    where
        P : AsRef<Path>
    {
        let f = File::open(path)?;
        Self::load(f)
    }

    pub fn load<R>(mut reader : R) -> Result<Self, ModelError>
    where
        R : Read
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        content.parse()
    }

    pub fn save_to_path<P>(&self, path : P) -> Result<(), ModelError>
    where
        P : AsRef<Path>
    {
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        self.save(file)
    }

    pub fn save<W>(&self, mut writer : W) -> Result<(), ModelError>
    where
        W : Write
    {
        let content = serde_json::to_string_pretty(&self)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

}

impl FromStr for Model {

    type Err = ModelError;

    fn from_str(s : &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }

}

impl Display for Model {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = serde_json::to_string(&self).map_err(|_| fmt::Error )?;
        write!(f, "{}", content)
    }

}
