use nalgebra::*;
use std::any::Any;
use std::fmt::Debug;
use rand::RngCore;
use crate::error::DistrError;

pub mod support;

pub use support::*;

pub mod normal;

pub use normal::*;

pub mod gamma;

pub use gamma::*;

pub mod multinormal;

pub use multinormal::*;

pub mod dirichlet;

pub use dirichlet::*;

mod factorised;

pub use factorised::*;

/// Capability set shared by every distribution of the crate, and the only
/// thing a Factorised knows about its factors.
///
/// Values are matrices with draws arranged over rows and event dimensions over
/// columns. A value holding n draws of a distribution with batch shape b has
/// n*b rows: row s*b + j is draw s of batch element j. Scalar-valued distributions
/// (event_shape() == None) read and write a single column; vector-valued
/// distributions read and write event_shape() columns.
///
/// Results indexed by row (log_prob) are returned as vectors with one entry per row;
/// results indexed by batch element (entropy, divergences) as vectors of length
/// batch_shape(); mean and variance as batch_shape() x event_width() matrices.
pub trait Distribution
where
    Self : Debug + Send + Sync
{

    /// Number of independent, identically-structured distribution instances.
    fn batch_shape(&self) -> usize;

    /// Width of a single draw; None for scalar-valued distributions.
    fn event_shape(&self) -> Option<usize>;

    /// Number of columns a single draw occupies.
    fn event_width(&self) -> usize {
        self.event_shape().unwrap_or(1)
    }

    /// Whether samples can be written as a deterministic function of
    /// independent noise.
    fn has_rsample(&self) -> bool {
        false
    }

    fn support(&self) -> Box<dyn Support>;

    /// Draws n samples for every batch element, returning a matrix
    /// with n * batch_shape() rows.
    fn sample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError>;

    /// Reparameterised version of sample(.). Families that cannot express their
    /// draws as a transformation of independent noise do not implement it.
    fn rsample(&self, _n : usize, _rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        Err(DistrError::Unsupported { family : self.family(), op : "rsample" })
    }

    fn log_prob(&self, y : DMatrixSlice<'_, f64>) -> Result<DVector<f64>, DistrError>;

    fn entropy(&self) -> Result<DVector<f64>, DistrError> {
        Err(DistrError::Unsupported { family : self.family(), op : "entropy" })
    }

    fn mean(&self) -> Result<DMatrix<f64>, DistrError>;

    fn variance(&self) -> Result<DMatrix<f64>, DistrError>;

    /// Name of the distribution family, used in error messages.
    fn family(&self) -> &'static str;

    /// Type-erased view of self, against which the divergence table
    /// recovers the concrete type of both arguments.
    fn as_any(&self) -> &dyn Any;

}

/// Verifies y has the event width of d and a whole number of draws for its batch,
/// returning the number of draws.
pub(crate) fn validate_value<D>(d : &D, y : &DMatrixSlice<'_, f64>, op : &'static str) -> Result<usize, DistrError>
where
    D : Distribution + ?Sized
{
    let width = d.event_width();
    if y.ncols() != width {
        return Err(DistrError::ShapeMismatch { op, expected : width, found : y.ncols() });
    }
    let batch = d.batch_shape();
    if batch == 0 {
        return Err(DistrError::ShapeMismatch { op, expected : 1, found : 0 });
    }
    if y.nrows() % batch != 0 {
        return Err(DistrError::ShapeMismatch { op, expected : batch, found : y.nrows() % batch });
    }
    Ok(y.nrows() / batch)
}

/// Verifies both sides of a divergence carry the same batch shape.
pub(crate) fn validate_pair<P, Q>(p : &P, q : &Q) -> Result<usize, DistrError>
where
    P : Distribution + ?Sized,
    Q : Distribution + ?Sized
{
    if p.batch_shape() != q.batch_shape() {
        return Err(DistrError::ShapeMismatch {
            op : "kl_divergence",
            expected : p.batch_shape(),
            found : q.batch_shape()
        });
    }
    if p.event_width() != q.event_width() {
        return Err(DistrError::ShapeMismatch {
            op : "kl_divergence",
            expected : p.event_width(),
            found : q.event_width()
        });
    }
    Ok(p.batch_shape())
}

/// Repeats a single-row parameter matrix over batch rows; a parameter matrix that
/// already has batch rows is returned unchanged.
pub(crate) fn expand_rows(param : &DMatrix<f64>, batch : usize) -> Result<DMatrix<f64>, DistrError> {
    match param.nrows() {
        n if n == batch => Ok(param.clone()),
        1 if batch > 0 => Ok(DMatrix::from_fn(batch, param.ncols(), |_, j| param[(0, j)])),
        n => Err(DistrError::ShapeMismatch { op : "expand", expected : batch, found : n })
    }
}

/// Concatenates blocks with the same number of rows side by side, in order.
pub(crate) fn hstack(blocks : &[DMatrix<f64>], op : &'static str) -> Result<DMatrix<f64>, DistrError> {
    let nrows = blocks.first().map(|b| b.nrows()).unwrap_or(0);
    let ncols = blocks.iter().map(|b| b.ncols()).sum();
    let mut out = DMatrix::zeros(nrows, ncols);
    let mut offset = 0;
    for b in blocks.iter() {
        if b.nrows() != nrows {
            return Err(DistrError::ShapeMismatch { op, expected : nrows, found : b.nrows() });
        }
        out.columns_mut(offset, b.ncols()).copy_from(b);
        offset += b.ncols();
    }
    Ok(out)
}

/// Adds equally-sized per-factor results elementwise.
pub(crate) fn sum_vectors<I>(parts : I, op : &'static str) -> Result<DVector<f64>, DistrError>
where
    I : IntoIterator<Item=Result<DVector<f64>, DistrError>>
{
    let mut total : Option<DVector<f64>> = None;
    for part in parts {
        let part = part?;
        total = match total {
            None => Some(part),
            Some(t) if t.nrows() == part.nrows() => Some(t + part),
            Some(t) => return Err(DistrError::ShapeMismatch { op, expected : t.nrows(), found : part.nrows() })
        };
    }
    total.ok_or(DistrError::NoFactors)
}
