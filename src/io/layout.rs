//! Flat, row-major storage of [`DataArray`]s.
//!
//! Every format stores an array as one or more *parts*: a shape plus
//! row-major real (and, for complex data, imaginary) values. Dense arrays are
//! a single part without an index; object sequences are one indexed part
//! per item.

use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;

use crate::data::array::DataArray;
use crate::error::{Result, StorageError};

/// One stored piece of an array.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArrayPart {
    /// Item index inside an object sequence; `None` for dense arrays.
    pub part: Option<usize>,
    pub shape: Vec<usize>,
    pub re: Vec<f64>,
    /// Present for complex data only.
    pub im: Option<Vec<f64>>,
}

impl ArrayPart {
    pub fn dtype(&self) -> &'static str {
        if self.im.is_some() {
            "complex128"
        } else {
            "float64"
        }
    }
}

pub(crate) fn real_from_flat(shape: &[usize], data: Vec<f64>) -> Result<ArrayD<f64>> {
    check_len(shape, data.len())?;
    Ok(ArrayD::from_shape_vec(IxDyn(shape), data)?)
}

pub(crate) fn complex_from_flat(
    shape: &[usize],
    re: Vec<f64>,
    im: Vec<f64>,
) -> Result<ArrayD<Complex64>> {
    check_len(shape, re.len())?;
    check_len(shape, im.len())?;
    let data = re
        .into_iter()
        .zip(im)
        .map(|(r, i)| Complex64::new(r, i))
        .collect();
    Ok(ArrayD::from_shape_vec(IxDyn(shape), data)?)
}

pub(crate) fn split_complex(a: &ArrayD<Complex64>) -> (Vec<f64>, Vec<f64>) {
    a.iter().map(|z| (z.re, z.im)).unzip()
}

fn check_len(shape: &[usize], len: usize) -> Result<()> {
    let expected = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| StorageError::Malformed(format!("shape {shape:?} is too large")))?;
    if len != expected {
        return Err(StorageError::ShapeMismatch {
            what: "flat array data".to_string(),
            expected: vec![expected],
            actual: vec![len],
        });
    }
    Ok(())
}

/// Break an array into stored parts.
pub(crate) fn to_parts(array: &DataArray) -> Vec<ArrayPart> {
    match array {
        DataArray::Real(a) => vec![ArrayPart {
            part: None,
            shape: a.shape().to_vec(),
            re: a.iter().copied().collect(),
            im: None,
        }],
        DataArray::Complex(a) => {
            let (re, im) = split_complex(a);
            vec![ArrayPart {
                part: None,
                shape: a.shape().to_vec(),
                re,
                im: Some(im),
            }]
        }
        DataArray::Objects(items) => items
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let (re, im) = split_complex(a);
                ArrayPart {
                    part: Some(i),
                    shape: a.shape().to_vec(),
                    re,
                    im: Some(im),
                }
            })
            .collect(),
    }
}

/// Reassemble an array from its stored parts, in order.
pub(crate) fn from_parts(name: &str, mut parts: Vec<ArrayPart>) -> Result<DataArray> {
    let malformed = |why: &str| StorageError::Malformed(format!("dataset '{name}': {why}"));

    if parts.len() == 1 && parts[0].part.is_none() {
        let ArrayPart { shape, re, im, .. } = parts.remove(0);
        return match im {
            None => Ok(DataArray::Real(real_from_flat(&shape, re)?)),
            Some(im) => Ok(DataArray::Complex(complex_from_flat(&shape, re, im)?)),
        };
    }
    if parts.is_empty() {
        return Err(malformed("no data"));
    }

    let mut items = Vec::with_capacity(parts.len());
    for (expected, p) in parts.into_iter().enumerate() {
        if p.part != Some(expected) {
            return Err(malformed("object items out of order"));
        }
        let im = p.im.unwrap_or_else(|| vec![0.0; p.re.len()]);
        items.push(complex_from_flat(&p.shape, p.re, im)?);
    }
    Ok(DataArray::Objects(items))
}
