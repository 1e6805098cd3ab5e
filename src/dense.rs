//! Dense row-major n-dimensional arrays
//!
//! [`DenseArray`] is a contiguous buffer plus a shape. It is generic over the
//! element type so that the same axis operations serve both the raw `f64`
//! measurements and the nested observables built from them.

use crate::{Error, Result};

/// Contiguous row-major n-dimensional array
#[derive(Debug, Clone, PartialEq)]
pub struct DenseArray<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

/// Number of elements an array of `shape` holds, `None` on overflow
#[must_use]
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1_usize, |count, &extent| count.checked_mul(extent))
}

impl<T> DenseArray<T> {
    /// Wrap a buffer with the given shape
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the buffer length is not the
    /// product of the extents
    pub fn from_shape_vec(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        if element_count(&shape) != Some(data.len()) {
            return Err(Error::ShapeMismatch(format!(
                "cannot reshape {} elements into {shape:?}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Zero-dimensional array holding a single element
    #[must_use]
    pub fn scalar(value: T) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// Extents per axis
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements in row-major order
    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The single element of a zero-dimensional array
    #[must_use]
    pub fn into_scalar(self) -> Option<T> {
        if self.shape.is_empty() {
            self.data.into_iter().next()
        } else {
            None
        }
    }

    /// Element at a full multi-index
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return None;
        }
        let offset: usize = index
            .iter()
            .zip(self.strides())
            .map(|(i, stride)| i * stride)
            .sum();
        self.data.get(offset)
    }

    /// Apply `f` to every element, keeping the shape
    #[must_use]
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> DenseArray<U> {
        DenseArray {
            shape: self.shape.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Row-major strides in elements
    #[must_use]
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.shape.len()];
        for axis in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.shape[axis + 1];
        }
        strides
    }

    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis >= self.shape.len() {
            return Err(Error::ShapeMismatch(format!(
                "axis {axis} out of bounds for array of dimension {}",
                self.shape.len()
            )));
        }
        Ok(())
    }
}

impl<T: Clone> DenseArray<T> {
    /// Reorder axes so that new axis `k` is old axis `axes[k]`
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if `axes` is not a permutation of the
    /// array's axes
    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        let ndim = self.shape.len();
        let mut seen = vec![false; ndim];
        for &axis in axes {
            self.check_axis(axis)?;
            if std::mem::replace(&mut seen[axis], true) {
                return Err(Error::ShapeMismatch(format!("axis {axis} repeated in {axes:?}")));
            }
        }
        if axes.len() != ndim {
            return Err(Error::ShapeMismatch(format!(
                "{axes:?} is not a permutation of {ndim} axes"
            )));
        }

        let old_strides = self.strides();
        let shape: Vec<usize> = axes.iter().map(|&a| self.shape[a]).collect();
        let mut data = Vec::with_capacity(self.data.len());
        let mut index = vec![0usize; ndim];
        for _ in 0..self.data.len() {
            let offset: usize = index
                .iter()
                .zip(axes)
                .map(|(&i, &a)| i * old_strides[a])
                .sum();
            data.push(self.data[offset].clone());

            for k in (0..ndim).rev() {
                index[k] += 1;
                if index[k] < shape[k] {
                    break;
                }
                index[k] = 0;
            }
        }
        Ok(Self { shape, data })
    }

    /// Move axis `source` to position `destination`, keeping the others in order
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if either axis is out of bounds
    pub fn move_axis(&self, source: usize, destination: usize) -> Result<Self> {
        self.check_axis(source)?;
        self.check_axis(destination)?;
        let mut axes: Vec<usize> = (0..self.ndim()).filter(|&a| a != source).collect();
        axes.insert(destination, source);
        self.permute(&axes)
    }

    /// Sub-array at `index` along `axis`, with that axis removed
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the axis or index is out of bounds
    pub fn index_axis(&self, axis: usize, index: usize) -> Result<Self> {
        self.check_axis(axis)?;
        let extent = self.shape[axis];
        if index >= extent {
            return Err(Error::ShapeMismatch(format!(
                "index {index} out of bounds for axis {axis} with size {extent}"
            )));
        }
        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();

        let mut data = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let start = (o * extent + index) * inner;
            data.extend_from_slice(&self.data[start..start + inner]);
        }
        let mut shape = self.shape.clone();
        shape.remove(axis);
        Ok(Self { shape, data })
    }

    /// Stack equally shaped arrays along a new leading axis
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if `parts` is empty or shapes differ
    pub fn stack(parts: Vec<Self>) -> Result<Self> {
        let inner = parts
            .first()
            .map(|p| p.shape.clone())
            .ok_or_else(|| Error::ShapeMismatch("cannot stack an empty list of arrays".into()))?;

        let mut shape = Vec::with_capacity(inner.len() + 1);
        shape.push(parts.len());
        shape.extend_from_slice(&inner);

        let mut data = Vec::with_capacity(parts.len() * parts[0].len());
        for part in parts {
            if part.shape != inner {
                return Err(Error::ShapeMismatch(format!(
                    "cannot stack {:?} onto {inner:?}",
                    part.shape
                )));
            }
            data.extend(part.data);
        }
        Ok(Self { shape, data })
    }
}

impl DenseArray<f64> {
    /// Arithmetic mean over the leading (sampling) axis
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] for zero-dimensional or empty arrays
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_axis0(&self) -> Result<Self> {
        let samples = *self
            .shape
            .first()
            .ok_or_else(|| Error::ShapeMismatch("no axis to average over".into()))?;
        if samples == 0 {
            return Err(Error::ShapeMismatch("mean over an empty axis".into()));
        }
        let inner = self.data.len() / samples;
        let mut sums = vec![0.0; inner];
        for row in self.data.chunks_exact(inner.max(1)) {
            for (sum, value) in sums.iter_mut().zip(row) {
                *sum += value;
            }
        }
        let n = samples as f64;
        Self::from_shape_vec(
            self.shape[1..].to_vec(),
            sums.into_iter().map(|s| s / n).collect(),
        )
    }
}
