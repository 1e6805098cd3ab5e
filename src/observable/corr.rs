//! Correlators of observables along euclidean time

use super::Obs;
use crate::dense::DenseArray;
use crate::{Error, Result};
use serde::Serialize;

/// Correlator: one observable, or one square matrix of observables, per time slice
#[derive(Debug, Clone, PartialEq)]
pub struct Corr {
    content: DenseArray<Obs>,
}

/// Central values and errors per time slice, ready for plotting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plottable {
    /// Time slice indices, starting at 0
    pub x: Vec<usize>,
    /// Central value per time slice
    pub y: Vec<f64>,
    /// Error per time slice
    pub err: Vec<f64>,
}

impl Corr {
    /// Wrap a `[T]` or `[T, N, N]` array of observables
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] for any other shape
    pub fn new(content: DenseArray<Obs>) -> Result<Self> {
        match content.shape() {
            [_] => Ok(Self { content }),
            [_, n, m] if n == m => Ok(Self { content }),
            shape => Err(Error::ShapeMismatch(format!(
                "correlator content must be [T] or [T, N, N], got {shape:?}"
            ))),
        }
    }

    /// Number of time slices
    #[must_use]
    pub fn t(&self) -> usize {
        self.content.shape()[0]
    }

    /// Matrix size (1 for scalar correlators)
    #[must_use]
    pub fn n(&self) -> usize {
        self.content.shape().get(1).copied().unwrap_or(1)
    }

    /// Whether each time slice holds a matrix
    #[must_use]
    pub fn is_matrix(&self) -> bool {
        self.content.ndim() == 3
    }

    /// Underlying observables, indexed `[t]` or `[t, i, j]`
    #[must_use]
    pub fn content(&self) -> &DenseArray<Obs> {
        &self.content
    }

    /// Scalar correlator of matrix entry `(i, j)`
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] for scalar correlators or out-of-range
    /// entries
    pub fn item(&self, i: usize, j: usize) -> Result<Self> {
        if !self.is_matrix() {
            return Err(Error::ShapeMismatch(
                "item() is only defined for matrix correlators".into(),
            ));
        }
        let n = self.n();
        if i >= n || j >= n {
            return Err(Error::ShapeMismatch(format!(
                "entry ({i}, {j}) out of range for {n}x{n} correlator"
            )));
        }
        let entries = (0..self.t())
            .filter_map(|t| self.content.get(&[t, i, j]).cloned())
            .collect();
        Self::new(DenseArray::from_shape_vec(vec![self.t()], entries)?)
    }

    /// Central values and errors per time slice
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] for matrix correlators; project with
    /// [`item`](Self::item) first
    pub fn plottable(&self) -> Result<Plottable> {
        if self.is_matrix() {
            return Err(Error::ShapeMismatch(
                "plottable() needs a scalar correlator; use item(i, j) first".into(),
            ));
        }
        let observables = self.content.data();
        Ok(Plottable {
            x: (0..observables.len()).collect(),
            y: observables.iter().map(Obs::value).collect(),
            err: observables.iter().map(Obs::error).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(offset: f64) -> Obs {
        Obs::new(&[offset, offset + 1.0, offset + 2.0, offset + 3.0, offset + 4.0], "ens").unwrap()
    }

    fn matrix_corr() -> Corr {
        let content = (0..8).map(|k| obs(f64::from(k))).collect();
        Corr::new(DenseArray::from_shape_vec(vec![2, 2, 2], content).unwrap()).unwrap()
    }

    #[test]
    fn test_rejects_non_square_content() {
        let content = (0..6).map(|k| obs(f64::from(k))).collect();
        let array = DenseArray::from_shape_vec(vec![1, 2, 3], content).unwrap();
        assert!(Corr::new(array).is_err());
    }

    #[test]
    fn test_item_projects_matrix_entry() {
        let corr = matrix_corr();
        assert!(corr.is_matrix());
        assert_eq!(corr.n(), 2);
        let entry = corr.item(1, 0).unwrap();
        assert!(!entry.is_matrix());
        let plot = entry.plottable().unwrap();
        assert_eq!(plot.x, vec![0, 1]);
        assert_eq!(plot.y, vec![2.0 + 2.0, 6.0 + 2.0]);
    }

    #[test]
    fn test_plottable_requires_scalar_correlator() {
        assert!(matrix_corr().plottable().is_err());
    }

    #[test]
    fn test_item_out_of_range() {
        assert!(matrix_corr().item(2, 0).is_err());
    }
}
