//! Dense N-dimensional matrix of `f64` values with per-dimension labels.

use crate::error::{CodecError, Result};

/// A dense row-major matrix of `f64` values.
///
/// Each dimension carries one optional label per index. A matrix with no
/// dimensions holds no values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    sizes: Vec<usize>,
    labels: Vec<Vec<String>>,
    values: Vec<f64>,
}

impl Matrix {
    /// Create a zero-filled matrix with the given dimension sizes.
    pub fn new(sizes: &[usize]) -> Self {
        let count = element_count(sizes);
        Self {
            sizes: sizes.to_vec(),
            labels: sizes.iter().map(|&n| vec![String::new(); n]).collect(),
            values: vec![0.0; count],
        }
    }

    /// Create a 2-D matrix of `rows x columns`.
    pub fn with_shape(rows: usize, columns: usize) -> Self {
        Self::new(&[rows, columns])
    }

    /// Create a matrix from dimension sizes and values.
    pub fn from_values(sizes: &[usize], values: Vec<f64>) -> Result<Self> {
        let expected = element_count(sizes);
        if values.len() != expected {
            return Err(CodecError::SizeMismatch {
                expected,
                found: values.len(),
            }
            .into());
        }
        Ok(Self {
            sizes: sizes.to_vec(),
            labels: sizes.iter().map(|&n| vec![String::new(); n]).collect(),
            values,
        })
    }

    /// Number of dimensions.
    pub fn dimension_count(&self) -> usize {
        self.sizes.len()
    }

    /// All dimension sizes.
    pub fn dimension_sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Size of one dimension, zero when out of range.
    pub fn dimension_size(&self, dimension: usize) -> usize {
        self.sizes.get(dimension).copied().unwrap_or(0)
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the matrix holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Label of one entry of a dimension.
    pub fn label(&self, dimension: usize, index: usize) -> Option<&str> {
        self.labels.get(dimension)?.get(index).map(String::as_str)
    }

    /// All labels of one dimension.
    pub fn labels(&self, dimension: usize) -> &[String] {
        self.labels.get(dimension).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Set the label of one entry. Returns false when out of range.
    pub fn set_label(&mut self, dimension: usize, index: usize, label: impl Into<String>) -> bool {
        match self.labels.get_mut(dimension).and_then(|l| l.get_mut(index)) {
            Some(slot) => {
                *slot = label.into();
                true
            }
            None => false,
        }
    }

    /// Builder-style label assignment for a whole dimension.
    #[must_use]
    pub fn with_labels<S: Into<String>>(mut self, dimension: usize, labels: impl IntoIterator<Item = S>) -> Self {
        for (index, label) in labels.into_iter().enumerate() {
            self.set_label(dimension, index, label);
        }
        self
    }

    /// Values in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable values in row-major order.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Replace all values. Fails if the count does not match the layout.
    pub fn set_values(&mut self, values: Vec<f64>) -> Result<()> {
        if values.len() != self.values.len() {
            return Err(CodecError::SizeMismatch {
                expected: self.values.len(),
                found: values.len(),
            }
            .into());
        }
        self.values = values;
        Ok(())
    }

    /// A zero-filled matrix with the same dimensions and no labels.
    pub fn layout_only(&self) -> Self {
        Self::new(&self.sizes)
    }

    /// Check whether both matrices have the same dimension sizes.
    pub fn same_layout(&self, other: &Matrix) -> bool {
        self.sizes == other.sizes
    }
}

fn element_count(sizes: &[usize]) -> usize {
    if sizes.is_empty() {
        0
    } else {
        sizes.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_matrix() {
        let m = Matrix::with_shape(2, 4);
        assert_eq!(m.dimension_count(), 2);
        assert_eq!(m.len(), 8);
        assert_eq!(m.dimension_size(1), 4);
        assert_eq!(m.dimension_size(5), 0);
        assert!(m.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_dimensions() {
        let m = Matrix::new(&[]);
        assert!(m.is_empty());
        assert_eq!(m.dimension_count(), 0);
    }

    #[test]
    fn test_labels() {
        let m = Matrix::with_shape(2, 3).with_labels(0, ["Cz", "Pz"]);
        assert_eq!(m.label(0, 1), Some("Pz"));
        assert_eq!(m.label(1, 0), Some(""));
        assert_eq!(m.label(2, 0), None);
        assert_eq!(m.labels(0).len(), 2);
    }

    #[test]
    fn test_from_values_size_check() {
        assert!(Matrix::from_values(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).is_ok());
        assert!(Matrix::from_values(&[2, 2], vec![1.0]).is_err());
    }

    #[test]
    fn test_layout_only_drops_labels() {
        let m = Matrix::from_values(&[1, 2], vec![5.0, 6.0])
            .unwrap()
            .with_labels(0, ["C3"]);
        let layout = m.layout_only();
        assert!(layout.same_layout(&m));
        assert_eq!(layout.values(), &[0.0, 0.0]);
        assert_eq!(layout.label(0, 0), Some(""));
    }
}
