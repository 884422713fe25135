use nalgebra::*;
use rand::RngCore;
use std::any::Any;
use std::fmt::{self, Display};
use std::sync::Arc;
use super::*;
use crate::divergence::Divergence;
use crate::error::DistrError;

/// Successive (offset, width) column ranges for a sequence of widths: every block
/// starts where the previous one ended, so each factor consumes a prefix of the
/// columns left over by the factors before it.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {

    widths : std::slice::Iter<'a, usize>,

    offset : usize

}

impl<'a> Blocks<'a> {

    pub fn new(widths : &'a [usize]) -> Self {
        Self { widths : widths.iter(), offset : 0 }
    }

}

impl<'a> Iterator for Blocks<'a> {

    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        let width = *self.widths.next()?;
        let offset = self.offset;
        self.offset += width;
        Some((offset, width))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.widths.size_hint()
    }

}

impl<'a> ExactSizeIterator for Blocks<'a> { }

/// Lazy sequence of column blocks of a value, one per factor, in factor order.
/// Built fresh by every call to Factorised::partition(.), so iterating it
/// never affects later partitions of the same value.
#[derive(Debug, Clone)]
pub struct Partition<'a> {

    value : &'a DMatrix<f64>,

    blocks : Blocks<'a>

}

impl<'a> Iterator for Partition<'a> {

    type Item = DMatrixSlice<'a, f64>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.value;
        self.blocks.next().map(|(offset, width)| value.columns(offset, width) )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.blocks.size_hint()
    }

}

impl<'a> ExactSizeIterator for Partition<'a> { }

fn validate_width(expected : usize, found : usize, op : &'static str) -> Result<(), DistrError> {
    if expected != found {
        Err(DistrError::ShapeMismatch { op, expected, found })
    } else {
        Ok(())
    }
}

/// Support of a factorised distribution: a value is inside iff each of
/// its column blocks lies in the support of the corresponding factor.
#[derive(Debug)]
pub struct FactorisedSupport {

    supports : Vec<Box<dyn Support>>,

    widths : Vec<usize>

}

impl FactorisedSupport {

    pub fn new(supports : Vec<Box<dyn Support>>, widths : Vec<usize>) -> Self {
        assert!(supports.len() == widths.len());
        Self { supports, widths }
    }

}

impl Support for FactorisedSupport {

    fn check(&self, y : DMatrixSlice<'_, f64>) -> Result<Vec<bool>, DistrError> {
        validate_width(self.widths.iter().sum(), y.ncols(), "FactorisedSupport::check")?;
        let mut inside = vec![true; y.nrows()];
        for (support, (offset, width)) in self.supports.iter().zip(Blocks::new(&self.widths)) {
            let part = support.check(y.columns(offset, width))?;
            for (acc, p) in inside.iter_mut().zip(part) {
                *acc = *acc && p;
            }
        }
        Ok(inside)
    }

    fn contains(&self, y : DMatrixSlice<'_, f64>) -> Result<bool, DistrError> {
        validate_width(self.widths.iter().sum(), y.ncols(), "FactorisedSupport::contains")?;
        for (support, (offset, width)) in self.supports.iter().zip(Blocks::new(&self.widths)) {
            if !support.contains(y.columns(offset, width))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

}

/// Distribution whose event vector is split into contiguous blocks, each block
/// distributed independently according to its own factor:
/// p(y) = p_1(y_1) p_2(y_2) ... p_k(y_k).
///
/// The order of the factors defines the left-to-right layout of the event
/// columns, and is fixed at construction together with the width of each
/// block (the factor's event shape, or one column for scalar-valued factors).
/// Factors are shared, never copied: a Factorised built from Arc handles observes
/// the same factor instances as the caller.
#[derive(Debug, Clone)]
pub struct Factorised {

    factors : Vec<Arc<dyn Distribution>>,

    widths : Vec<usize>,

    batch : usize,

    width : usize

}

impl Factorised {

    /// Builds the composite, failing if the factor list is empty or if any
    /// factor disagrees with the batch shape of the first one.
    pub fn new(factors : Vec<Arc<dyn Distribution>>) -> Result<Self, DistrError> {
        let batch = factors.first().ok_or(DistrError::NoFactors)?.batch_shape();
        for (index, f) in factors.iter().enumerate() {
            if f.batch_shape() != batch {
                return Err(DistrError::BatchMismatch { index, expected : batch, found : f.batch_shape() });
            }
        }
        let widths : Vec<usize> = factors.iter().map(|f| f.event_width() ).collect();
        let width : usize = widths.iter().sum();
        tracing::debug!(n_factors = factors.len(), batch, width, widths = ?widths, "built factorised distribution");
        Ok(Self { factors, widths, batch, width })
    }

    pub fn factors(&self) -> &[Arc<dyn Distribution>] {
        &self.factors[..]
    }

    /// Number of event columns taken by each factor, in factor order.
    pub fn widths(&self) -> &[usize] {
        &self.widths[..]
    }

    /// Composite over the factors at the informed indices, in the informed order.
    /// Indices may be repeated or omitted.
    pub fn marginal(&self, indices : &[usize]) -> Result<Factorised, DistrError> {
        let mut factors = Vec::with_capacity(indices.len());
        for ix in indices.iter() {
            let f = self.factors.get(*ix)
                .ok_or(DistrError::IndexOutOfRange { index : *ix, len : self.factors.len() })?;
            factors.push(f.clone());
        }
        Factorised::new(factors)
    }

    /// Splits the columns of value into one block per factor.
    pub fn partition<'a>(&'a self, value : &'a DMatrix<f64>) -> Result<Partition<'a>, DistrError> {
        validate_width(self.width, value.ncols(), "Factorised::partition")?;
        Ok(Partition { value, blocks : Blocks::new(&self.widths) })
    }

    fn concat<F>(&self, op : &'static str, f : F) -> Result<DMatrix<f64>, DistrError>
    where
        F : Fn(&dyn Distribution) -> Result<DMatrix<f64>, DistrError>
    {
        let blocks = self.factors.iter()
            .map(|factor| f(factor.as_ref()) )
            .collect::<Result<Vec<_>, _>>()?;
        hstack(&blocks[..], op)
    }

}

impl Display for Factorised {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        let names : Vec<String> = self.factors.iter()
            .map(|factor| format!("{}[{}]", factor.family(), factor.event_width()) )
            .collect();
        write!(f, "Factorised({}; batch={}, event={})", names.join(" x "), self.batch, self.width)
    }

}

impl Distribution for Factorised {

    fn batch_shape(&self) -> usize {
        self.batch
    }

    fn event_shape(&self) -> Option<usize> {
        Some(self.width)
    }

    fn has_rsample(&self) -> bool {
        self.factors.iter().any(|f| f.has_rsample() )
    }

    fn support(&self) -> Box<dyn Support> {
        let supports = self.factors.iter().map(|f| f.support() ).collect();
        Box::new(FactorisedSupport::new(supports, self.widths.clone()))
    }

    fn sample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        let blocks = self.factors.iter()
            .map(|f| f.sample(n, &mut *rng) )
            .collect::<Result<Vec<_>, _>>()?;
        hstack(&blocks[..], "Factorised::sample")
    }

    fn rsample(&self, n : usize, rng : &mut dyn RngCore) -> Result<DMatrix<f64>, DistrError> {
        let blocks = self.factors.iter()
            .map(|f| f.rsample(n, &mut *rng) )
            .collect::<Result<Vec<_>, _>>()?;
        hstack(&blocks[..], "Factorised::rsample")
    }

    fn log_prob(&self, y : DMatrixSlice<'_, f64>) -> Result<DVector<f64>, DistrError> {
        validate_width(self.width, y.ncols(), "Factorised::log_prob")?;
        let parts = self.factors.iter().zip(Blocks::new(&self.widths))
            .map(|(f, (offset, width))| f.log_prob(y.columns(offset, width)) );
        sum_vectors(parts, "Factorised::log_prob")
    }

    fn entropy(&self) -> Result<DVector<f64>, DistrError> {
        sum_vectors(self.factors.iter().map(|f| f.entropy() ), "Factorised::entropy")
    }

    fn mean(&self) -> Result<DMatrix<f64>, DistrError> {
        self.concat("Factorised::mean", |f| f.mean() )
    }

    /// Elementwise sum of the variance of every factor. Only defined when all
    /// factors report variances of the same shape.
    fn variance(&self) -> Result<DMatrix<f64>, DistrError> {
        let mut total : Option<DMatrix<f64>> = None;
        for f in self.factors.iter() {
            let v = f.variance()?;
            total = match total {
                None => Some(v),
                Some(t) if t.shape() == v.shape() => Some(t + v),
                Some(t) => return Err(DistrError::ShapeMismatch {
                    op : "Factorised::variance",
                    expected : t.ncols(),
                    found : v.ncols()
                })
            };
        }
        total.ok_or(DistrError::NoFactors)
    }

    fn family(&self) -> &'static str {
        "Factorised"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

}

/// KL(p || q) between two composites is the sum of the divergences between
/// factors at the same index, each dispatched through div.
pub fn kl_factorised(p : &Factorised, q : &Factorised, div : &Divergence) -> Result<DVector<f64>, DistrError> {
    if p.factors.len() != q.factors.len() {
        return Err(DistrError::FactorCountMismatch { p : p.factors.len(), q : q.factors.len() });
    }
    let pairs = p.factors.iter().zip(q.factors.iter())
        .map(|(pf, qf)| div.kl(pf.as_ref(), qf.as_ref()) );
    sum_vectors(pairs, "kl_factorised")
}
