use std::collections::BTreeMap;

use ndarray::{Array1, ArrayD};
use num_complex::Complex64;

use super::model::ParamValue;
use crate::error::{Result, StorageError};

/// Wave function amplitudes in a labelled basis, optionally with the
/// corresponding energy.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveFunction {
    /// Basis labels, e.g. positions or charge numbers.
    pub basis_labels: Array1<f64>,
    pub amplitudes: Array1<Complex64>,
    pub energy: Option<f64>,
}

impl WaveFunction {
    pub fn new(
        basis_labels: Array1<f64>,
        amplitudes: Array1<Complex64>,
        energy: Option<f64>,
    ) -> Result<Self> {
        if basis_labels.len() != amplitudes.len() {
            return Err(StorageError::ShapeMismatch {
                what: "wave function amplitudes".to_string(),
                expected: vec![basis_labels.len()],
                actual: vec![amplitudes.len()],
            });
        }
        Ok(WaveFunction {
            basis_labels,
            amplitudes,
            energy,
        })
    }
}

// ---------------------------------------------------------------------------
// Grids
// ---------------------------------------------------------------------------

/// Rectangular grid: per axis a `[min, max]` range sampled at `pt_count`
/// evenly spaced points (endpoints included).
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    min_vals: Vec<f64>,
    max_vals: Vec<f64>,
    pt_counts: Vec<usize>,
}

impl GridSpec {
    pub fn new(min_vals: Vec<f64>, max_vals: Vec<f64>, pt_counts: Vec<usize>) -> Result<Self> {
        let dims = min_vals.len();
        if max_vals.len() != dims || pt_counts.len() != dims {
            return Err(StorageError::ShapeMismatch {
                what: "grid axes".to_string(),
                expected: vec![dims, dims],
                actual: vec![max_vals.len(), pt_counts.len()],
            });
        }
        Ok(GridSpec {
            min_vals,
            max_vals,
            pt_counts,
        })
    }

    pub fn min_vals(&self) -> &[f64] {
        &self.min_vals
    }

    pub fn max_vals(&self) -> &[f64] {
        &self.max_vals
    }

    pub fn pt_counts(&self) -> &[usize] {
        &self.pt_counts
    }

    pub fn ndim(&self) -> usize {
        self.pt_counts.len()
    }

    /// Sample points along one axis, or `None` for an axis past `ndim`.
    pub fn axis_points(&self, axis: usize) -> Option<Array1<f64>> {
        let n = *self.pt_counts.get(axis)?;
        Some(Array1::linspace(self.min_vals[axis], self.max_vals[axis], n))
    }

    /// Grid description as a nested system parameter. Keys carry the axis
    /// index so a flattened grid does not collide with itself.
    pub fn metadata(&self) -> ParamValue {
        let mut map = BTreeMap::new();
        for axis in 0..self.ndim() {
            map.insert(
                format!("min_val_{axis}"),
                ParamValue::Float(self.min_vals[axis]),
            );
            map.insert(
                format!("max_val_{axis}"),
                ParamValue::Float(self.max_vals[axis]),
            );
            map.insert(
                format!("pt_count_{axis}"),
                ParamValue::Integer(self.pt_counts[axis] as i64),
            );
        }
        ParamValue::Map(map)
    }
}

/// Wave function sampled on a [`GridSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct WaveFunctionOnGrid {
    pub gridspec: GridSpec,
    pub amplitudes: ArrayD<Complex64>,
    pub energy: Option<f64>,
}

impl WaveFunctionOnGrid {
    pub fn new(gridspec: GridSpec, amplitudes: ArrayD<Complex64>, energy: Option<f64>) -> Result<Self> {
        if amplitudes.shape() != gridspec.pt_counts() {
            return Err(StorageError::ShapeMismatch {
                what: "grid amplitudes".to_string(),
                expected: gridspec.pt_counts.clone(),
                actual: amplitudes.shape().to_vec(),
            });
        }
        Ok(WaveFunctionOnGrid {
            gridspec,
            amplitudes,
            energy,
        })
    }
}
