use ndarray::{Array, ArrayD, Axis, Dimension, IxDyn};
use num_complex::Complex64;

use crate::error::{Result, StorageError};

// ---------------------------------------------------------------------------
// DataArray – dense, persisted form of a data field
// ---------------------------------------------------------------------------

/// A data field in the form handed to writers and returned by readers.
#[derive(Debug, Clone, PartialEq)]
pub enum DataArray {
    Real(ArrayD<f64>),
    Complex(ArrayD<Complex64>),
    /// Per-sweep-point arrays whose shapes differ and cannot be stacked.
    Objects(Vec<ArrayD<Complex64>>),
}

impl DataArray {
    /// Element type tag as stored in files.
    pub fn dtype(&self) -> &'static str {
        match self {
            DataArray::Real(_) => "float64",
            DataArray::Complex(_) => "complex128",
            DataArray::Objects(_) => "object",
        }
    }

    /// Array shape; an object sequence reports its length only.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            DataArray::Real(a) => a.shape().to_vec(),
            DataArray::Complex(a) => a.shape().to_vec(),
            DataArray::Objects(items) => vec![items.len()],
        }
    }
}

// ---------------------------------------------------------------------------
// FieldValue – a data field as held in memory
// ---------------------------------------------------------------------------

/// In-memory value of a data field.
///
/// Anything array-convertible: a bare scalar, a real or complex array, or a
/// sequence of per-sweep-point state arrays (eigenvector sets, for example).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(f64),
    Real(ArrayD<f64>),
    Complex(ArrayD<Complex64>),
    Sequence(Vec<ArrayD<Complex64>>),
}

impl FieldValue {
    /// Stack equal-length rows into a 2-D real array (one row per sweep point).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(StorageError::ShapeMismatch {
                what: "row".to_string(),
                expected: vec![cols],
                actual: vec![bad.len()],
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let arr = ArrayD::from_shape_vec(IxDyn(&[rows.len(), cols]), flat)?;
        Ok(FieldValue::Real(arr))
    }

    /// Borrow the value as a real array, if it is one.
    pub fn as_real(&self) -> Option<&ArrayD<f64>> {
        match self {
            FieldValue::Real(a) => Some(a),
            _ => None,
        }
    }

    /// Convert into the dense form written to files.
    ///
    /// Scalars become zero-dimensional arrays. A sequence is stacked along a
    /// new leading axis when every item has the same shape; otherwise it is
    /// kept as an object sequence.
    pub fn to_data_array(&self) -> Result<DataArray> {
        let array = match self {
            FieldValue::Scalar(x) => DataArray::Real(ArrayD::from_elem(IxDyn(&[]), *x)),
            FieldValue::Real(a) => DataArray::Real(a.clone()),
            FieldValue::Complex(a) => DataArray::Complex(a.clone()),
            FieldValue::Sequence(items) => match items.first() {
                None => DataArray::Complex(ArrayD::zeros(IxDyn(&[0]))),
                Some(first) if items.iter().all(|a| a.shape() == first.shape()) => {
                    let views: Vec<_> = items.iter().map(|a| a.view()).collect();
                    DataArray::Complex(ndarray::stack(Axis(0), &views)?)
                }
                Some(_) => DataArray::Objects(items.clone()),
            },
        };
        Ok(array)
    }
}

impl From<DataArray> for FieldValue {
    fn from(array: DataArray) -> Self {
        match array {
            DataArray::Real(a) => FieldValue::Real(a),
            DataArray::Complex(a) => FieldValue::Complex(a),
            DataArray::Objects(items) => FieldValue::Sequence(items),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Scalar(x)
    }
}

impl<D: Dimension> From<Array<f64, D>> for FieldValue {
    fn from(a: Array<f64, D>) -> Self {
        FieldValue::Real(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<Complex64, D>> for FieldValue {
    fn from(a: Array<Complex64, D>) -> Self {
        FieldValue::Complex(a.into_dyn())
    }
}

impl From<Vec<ArrayD<Complex64>>> for FieldValue {
    fn from(items: Vec<ArrayD<Complex64>>) -> Self {
        FieldValue::Sequence(items)
    }
}
