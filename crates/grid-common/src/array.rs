//! Minimal n-dimensional array used to carry decoded variable data.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Row-major n-dimensional array of `f64` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdArray {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl NdArray {
    /// Create an array, checking that `values.len()` matches the product of `shape`.
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> GridResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(GridError::ShapeMismatch {
                context: "array values".to_string(),
                expected: shape,
                actual: vec![values.len()],
            });
        }
        Ok(Self { shape, values })
    }

    /// Caller guarantees `values.len()` equals the product of `shape`.
    pub(crate) fn from_raw(shape: Vec<usize>, values: Vec<f64>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), values.len());
        Self { shape, values }
    }

    /// 1-D array from a vector.
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    /// 0-D array holding one value.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            values: vec![value],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove every axis of length 1.
    ///
    /// Idempotent: squeezing an already squeezed array returns it unchanged.
    pub fn squeeze(&self) -> Self {
        Self {
            shape: self.shape.iter().copied().filter(|&n| n != 1).collect(),
            values: self.values.clone(),
        }
    }

    /// Value at `(row, col)` of a 2-D array.
    pub fn get2(&self, row: usize, col: usize) -> Option<f64> {
        if self.shape.len() != 2 || row >= self.shape[0] || col >= self.shape[1] {
            return None;
        }
        self.values.get(row * self.shape[1] + col).copied()
    }

    /// Apply a function to every element, keeping the shape.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self {
            shape: self.shape.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Minimum and maximum over non-NaN values, `None` if all values are NaN.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Single value of a 0-D (or all-singleton) array.
    pub fn as_scalar(&self) -> Option<f64> {
        if self.values.len() == 1 {
            self.values.first().copied()
        } else {
            None
        }
    }
}
