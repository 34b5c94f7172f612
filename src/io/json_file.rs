use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::layout::{complex_from_flat, real_from_flat, split_complex};
use super::{DataReader, DataWriter};
use crate::data::array::DataArray;
use crate::data::model::Metadata;
use crate::data::store::FileContents;
use crate::error::{Result, StorageError};

// ---------------------------------------------------------------------------
// Document schema
// ---------------------------------------------------------------------------

/// Whole-file layout:
///
/// ```json
/// {
///   "metadata": { "param_name": "flux", "param_vals": [0.0, 0.5], "EJ": 20.0 },
///   "datasets": [
///     { "name": "energy_table",
///       "array": { "dtype": "float64", "shape": [2, 3], "data": [ ... ] } }
///   ]
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
struct SweepDocument {
    metadata: Metadata,
    datasets: Vec<NamedArray>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NamedArray {
    name: String,
    array: StoredArray,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "dtype", rename_all = "lowercase")]
enum StoredArray {
    Float64 {
        shape: Vec<usize>,
        #[serde(with = "float_list")]
        data: Vec<f64>,
    },
    Complex128 {
        shape: Vec<usize>,
        #[serde(with = "float_list")]
        re: Vec<f64>,
        #[serde(with = "float_list")]
        im: Vec<f64>,
    },
    Object {
        items: Vec<StoredArray>,
    },
}

/// JSON numbers cannot hold NaN or infinities; those are written as the
/// strings `"NaN"`, `"inf"` and `"-inf"`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum JsonFloat {
    Number(f64),
    Tagged(String),
}

impl From<f64> for JsonFloat {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            JsonFloat::Number(v)
        } else {
            JsonFloat::Tagged(format!("{v:?}"))
        }
    }
}

impl TryFrom<JsonFloat> for f64 {
    type Error = String;

    fn try_from(value: JsonFloat) -> std::result::Result<Self, String> {
        match value {
            JsonFloat::Number(v) => Ok(v),
            JsonFloat::Tagged(s) => match s.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(format!("'{other}' is not a number")),
            },
        }
    }
}

mod float_list {
    use super::*;
    use serde::de::Error;

    pub fn serialize<S: Serializer>(values: &[f64], s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_seq(values.iter().map(|&v| JsonFloat::from(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<f64>, D::Error> {
        Vec::<JsonFloat>::deserialize(d)?
            .into_iter()
            .map(f64::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(D::Error::custom)
    }
}

impl From<&DataArray> for StoredArray {
    fn from(array: &DataArray) -> Self {
        match array {
            DataArray::Real(a) => StoredArray::Float64 {
                shape: a.shape().to_vec(),
                data: a.iter().copied().collect(),
            },
            DataArray::Complex(a) => {
                let (re, im) = split_complex(a);
                StoredArray::Complex128 {
                    shape: a.shape().to_vec(),
                    re,
                    im,
                }
            }
            DataArray::Objects(items) => StoredArray::Object {
                items: items
                    .iter()
                    .map(|a| StoredArray::from(&DataArray::Complex(a.clone())))
                    .collect(),
            },
        }
    }
}

impl StoredArray {
    fn into_array(self) -> Result<DataArray> {
        match self {
            StoredArray::Float64 { shape, data } => Ok(DataArray::Real(real_from_flat(&shape, data)?)),
            StoredArray::Complex128 { shape, re, im } => {
                Ok(DataArray::Complex(complex_from_flat(&shape, re, im)?))
            }
            StoredArray::Object { items } => {
                let items = items
                    .into_iter()
                    .map(|item| match item.into_array()? {
                        DataArray::Complex(a) => Ok(a),
                        DataArray::Real(a) => Ok(a.mapv(Complex64::from)),
                        DataArray::Objects(_) => Err(StorageError::Malformed(
                            "object arrays cannot nest".to_string(),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(DataArray::Objects(items))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Writer / reader
// ---------------------------------------------------------------------------

/// Collects one object and writes it as a single JSON document on `finish`.
#[derive(Debug)]
pub struct JsonWriter {
    path: PathBuf,
    metadata: Option<Metadata>,
    datasets: Vec<NamedArray>,
}

impl JsonWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonWriter {
            path: path.into(),
            metadata: None,
            datasets: Vec::new(),
        }
    }
}

impl DataWriter for JsonWriter {
    fn create_meta(&mut self, metadata: &Metadata) -> Result<()> {
        self.metadata = Some(metadata.clone());
        Ok(())
    }

    fn add_dataset(&mut self, name: &str, array: &DataArray) -> Result<()> {
        self.datasets.push(NamedArray {
            name: name.to_string(),
            array: StoredArray::from(array),
        });
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let metadata = self
            .metadata
            .ok_or_else(|| StorageError::Malformed("no metadata record was created".to_string()))?;
        let doc = SweepDocument {
            metadata,
            datasets: self.datasets,
        };
        let file = std::fs::File::create(&self.path)?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &doc)?;
        out.flush()?;
        debug!("json document written to {}", self.path.display());
        Ok(())
    }
}

/// Reads documents written by [`JsonWriter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReader;

impl DataReader for JsonReader {
    fn read(&self, path: &Path) -> Result<FileContents> {
        let text = std::fs::read_to_string(path)?;
        let doc: SweepDocument = serde_json::from_str(&text)?;

        let mut names = Vec::with_capacity(doc.datasets.len());
        let mut datasets = Vec::with_capacity(doc.datasets.len());
        for entry in doc.datasets {
            datasets.push(entry.array.into_array()?);
            names.push(entry.name);
        }
        Ok(FileContents {
            metadata: doc.metadata,
            names,
            datasets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dtype_tags() {
        let stored = StoredArray::from(&DataArray::Real(array![1.0, 2.0].into_dyn()));
        let text = serde_json::to_string(&stored).unwrap();
        assert_eq!(text, r#"{"dtype":"float64","shape":[2],"data":[1.0,2.0]}"#);
    }

    #[test]
    fn test_non_finite_data_is_tagged() {
        let stored = StoredArray::from(&DataArray::Real(
            array![1.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY].into_dyn(),
        ));
        let text = serde_json::to_string(&stored).unwrap();
        assert_eq!(
            text,
            r#"{"dtype":"float64","shape":[4],"data":[1.5,"NaN","inf","-inf"]}"#
        );

        let back: StoredArray = serde_json::from_str(&text).unwrap();
        match back.into_array().unwrap() {
            DataArray::Real(a) => {
                let v = a.as_slice().unwrap();
                assert_eq!(v[0], 1.5);
                assert!(v[1].is_nan());
                assert_eq!(v[2], f64::INFINITY);
                assert_eq!(v[3], f64::NEG_INFINITY);
            }
            other => panic!("expected real array, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_float_tag_rejected() {
        let text = r#"{"dtype":"float64","shape":[1],"data":["big"]}"#;
        assert!(serde_json::from_str::<StoredArray>(text).is_err());
    }

    #[test]
    fn test_object_items_accept_real_arrays() {
        let text = r#"{"dtype":"object","items":[
            {"dtype":"float64","shape":[1],"data":[3.0]},
            {"dtype":"complex128","shape":[2],"re":[1.0,2.0],"im":[0.0,-1.0]}
        ]}"#;
        let stored: StoredArray = serde_json::from_str(text).unwrap();
        match stored.into_array().unwrap() {
            DataArray::Objects(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].as_slice().unwrap()[0].re, 3.0);
                assert_eq!(items[1].as_slice().unwrap()[1].im, -1.0);
            }
            other => panic!("expected object array, got {other:?}"),
        }
    }

    #[test]
    fn test_finish_without_metadata_fails() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonWriter::new(dir.path().join("x.json"));
        assert!(matches!(writer.finish(), Err(StorageError::Malformed(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonReader.read(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
