//! Turning dense sample arrays into arrays of observables

use super::Obs;
use crate::dense::DenseArray;
use crate::{Error, Result};

/// Build one leaf per structural position of `array`
///
/// The leading axis of `array` is the sampling axis. For a 1-D array the
/// whole buffer is handed to `leaf`. Otherwise axis 1 is rotated to the
/// front, each slice along it is processed recursively and the results are
/// stacked, so the output has the shape of `array` without its first axis.
///
/// # Errors
/// Returns [`Error::ShapeMismatch`] for zero-dimensional input, or any error
/// raised by `leaf`
pub fn build_leaves<T, U, F>(array: &DenseArray<T>, leaf: &mut F) -> Result<DenseArray<U>>
where
    T: Clone,
    U: Clone,
    F: FnMut(&[T]) -> Result<U>,
{
    match array.ndim() {
        0 => Err(Error::ShapeMismatch(
            "a sampling axis is required to build observables".into(),
        )),
        1 => Ok(DenseArray::scalar(leaf(array.data())?)),
        _ => {
            let rotated = array.move_axis(1, 0)?;
            let parts = (0..rotated.shape()[0])
                .map(|k| build_leaves(&rotated.index_axis(0, k)?, leaf))
                .collect::<Result<Vec<_>>>()?;
            DenseArray::stack(parts)
        }
    }
}

/// Observables for every structural position of a sample array
///
/// # Errors
/// Returns [`Error::TooFewSamples`](crate::Error::TooFewSamples) if the
/// sampling axis is shorter than [`MIN_SAMPLES`](super::MIN_SAMPLES)
pub fn to_obs_array(array: &DenseArray<f64>, ensemble_name: &str) -> Result<DenseArray<Obs>> {
    build_leaves(array, &mut |samples: &[f64]| Obs::new(samples, ensemble_name))
}

/// Outer product of two observable vectors
///
/// # Errors
/// Returns [`Error::ShapeMismatch`] unless both inputs are 1-D
pub fn outer(a: &DenseArray<Obs>, b: &DenseArray<Obs>) -> Result<DenseArray<Obs>> {
    if a.ndim() != 1 || b.ndim() != 1 {
        return Err(Error::ShapeMismatch(format!(
            "outer product needs vectors, got {:?} and {:?}",
            a.shape(),
            b.shape()
        )));
    }
    let mut data = Vec::with_capacity(a.len() * b.len());
    for x in a.data() {
        for y in b.data() {
            data.push(x.checked_mul(y)?);
        }
    }
    DenseArray::from_shape_vec(vec![a.len(), b.len()], data)
}

/// Subtract `subtrahend` from every trailing block of `minuend`
///
/// `subtrahend` must match the trailing axes of `minuend`; it is broadcast
/// over the leading ones.
///
/// # Errors
/// Returns [`Error::ShapeMismatch`] if the trailing shapes differ
pub fn subtract_trailing(
    minuend: &DenseArray<Obs>,
    subtrahend: &DenseArray<Obs>,
) -> Result<DenseArray<Obs>> {
    let trailing = minuend
        .ndim()
        .checked_sub(subtrahend.ndim())
        .map(|lead| &minuend.shape()[lead..]);
    if trailing != Some(subtrahend.shape()) {
        return Err(Error::ShapeMismatch(format!(
            "cannot broadcast {:?} against {:?}",
            subtrahend.shape(),
            minuend.shape()
        )));
    }

    let block = subtrahend.data();
    let data = minuend
        .data()
        .iter()
        .zip(block.iter().cycle())
        .map(|(m, s)| m.checked_sub(s))
        .collect::<Result<Vec<_>>>()?;
    DenseArray::from_shape_vec(minuend.shape().to_vec(), data)
}
