use std::path::{Path, PathBuf};

use log::debug;

use super::layout::{self, ArrayPart};
use super::{DataReader, DataWriter};
use crate::data::array::DataArray;
use crate::data::model::{Metadata, MetadataValue};
use crate::data::store::FileContents;
use crate::error::{Result, StorageError};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------
//
// `<path>` (index file), header `entry,key,kind,value`:
//   meta,EJ,float,20.0
//   meta,param_vals,array,0.0;0.5;1.0
//   dataset,energy_table,float64,sweep_energy_table.csv
//
// `<stem>_<name>.csv` (one per dataset), header `part,dtype,shape,re,im`:
//   ,float64,3;2,0.0;1.0;...,
// Object sequences use one row per item with `part` = item index.

const INDEX_HEADER: [&str; 4] = ["entry", "key", "kind", "value"];
const DATASET_HEADER: [&str; 5] = ["part", "dtype", "shape", "re", "im"];

/// Sibling file holding dataset `name` of the sweep written to `path`.
pub fn dataset_path(path: &Path, name: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sweep");
    path.with_file_name(format!("{stem}_{name}.csv"))
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn join_usize(values: &[usize]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn parse_semicolon_floats(s: &str, what: &str) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim().parse::<f64>().map_err(|_| {
                StorageError::Malformed(format!("{what}[{j}]: '{tok}' is not a number"))
            })
        })
        .collect()
}

fn parse_semicolon_usize(s: &str, what: &str) -> Result<Vec<usize>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .map(|tok| {
            tok.trim().parse::<usize>().map_err(|_| {
                StorageError::Malformed(format!("{what}: '{tok}' is not a dimension"))
            })
        })
        .collect()
}

fn encode_metadata(value: &MetadataValue) -> String {
    match value {
        MetadataValue::Null => String::new(),
        MetadataValue::Bool(b) => b.to_string(),
        MetadataValue::Integer(i) => i.to_string(),
        MetadataValue::Float(v) => format!("{v:?}"),
        MetadataValue::String(s) => s.clone(),
        MetadataValue::Array(v) => join_floats(v),
    }
}

fn decode_metadata(key: &str, kind: &str, value: &str) -> Result<MetadataValue> {
    let bad = || StorageError::Malformed(format!("metadata '{key}': cannot read '{value}' as {kind}"));
    let decoded = match kind {
        "null" => MetadataValue::Null,
        "bool" => MetadataValue::Bool(value.parse().map_err(|_| bad())?),
        "int" => MetadataValue::Integer(value.parse().map_err(|_| bad())?),
        "float" => MetadataValue::Float(value.parse().map_err(|_| bad())?),
        "str" => MetadataValue::String(value.to_string()),
        "array" => MetadataValue::Array(parse_semicolon_floats(value, key)?),
        other => {
            return Err(StorageError::Malformed(format!(
                "metadata '{key}': unknown kind '{other}'"
            )))
        }
    };
    Ok(decoded)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Writes an index file plus one CSV per dataset, all on `finish`.
#[derive(Debug)]
pub struct CsvWriter {
    path: PathBuf,
    metadata: Option<Metadata>,
    datasets: Vec<(String, Vec<ArrayPart>)>,
}

impl CsvWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvWriter {
            path: path.into(),
            metadata: None,
            datasets: Vec::new(),
        }
    }
}

impl DataWriter for CsvWriter {
    fn create_meta(&mut self, metadata: &Metadata) -> Result<()> {
        self.metadata = Some(metadata.clone());
        Ok(())
    }

    fn add_dataset(&mut self, name: &str, array: &DataArray) -> Result<()> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(StorageError::InvalidField {
                name: name.to_string(),
                reason: "cannot be used as part of a file name".to_string(),
            });
        }
        self.datasets
            .push((name.to_string(), layout::to_parts(array)));
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let metadata = self
            .metadata
            .ok_or_else(|| StorageError::Malformed("no metadata record was created".to_string()))?;

        let mut index = csv::Writer::from_path(&self.path)?;
        index.write_record(INDEX_HEADER)?;
        for (key, value) in &metadata {
            index.write_record([
                "meta",
                key.as_str(),
                value.kind(),
                encode_metadata(value).as_str(),
            ])?;
        }

        for (name, parts) in &self.datasets {
            let file = dataset_path(&self.path, name);
            let mut out = csv::Writer::from_path(&file)?;
            out.write_record(DATASET_HEADER)?;
            for p in parts {
                out.write_record([
                    p.part.map(|i| i.to_string()).unwrap_or_default(),
                    p.dtype().to_string(),
                    join_usize(&p.shape),
                    join_floats(&p.re),
                    p.im.as_deref().map(join_floats).unwrap_or_default(),
                ])?;
            }
            out.flush()?;
            debug!("csv dataset '{name}' written to {}", file.display());

            let file_name = file
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or_default()
                .to_string();
            let dtype = parts.first().map_or("float64", |p| p.dtype());
            index.write_record(["dataset", name.as_str(), dtype, file_name.as_str()])?;
        }
        index.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reads files written by [`CsvWriter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReader;

fn column(headers: &csv::StringRecord, name: &str, file: &Path) -> Result<usize> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        StorageError::Malformed(format!("{}: missing '{name}' column", file.display()))
    })
}

fn read_dataset(file: &Path, name: &str) -> Result<DataArray> {
    let mut reader = csv::Reader::from_path(file)?;
    let headers = reader.headers()?.clone();
    let [part_idx, dtype_idx, shape_idx, re_idx, im_idx] =
        DATASET_HEADER.map(|h| column(&headers, h, file));
    let (part_idx, dtype_idx, shape_idx, re_idx, im_idx) =
        (part_idx?, dtype_idx?, shape_idx?, re_idx?, im_idx?);

    let mut parts = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let what = format!("{name} row {row_no}");
        let field = |i: usize| record.get(i).unwrap_or("");

        let part = match field(part_idx).trim() {
            "" => None,
            s => Some(s.parse::<usize>().map_err(|_| {
                StorageError::Malformed(format!("{what}: bad part index '{s}'"))
            })?),
        };
        let im = match field(dtype_idx) {
            "float64" => None,
            "complex128" => Some(parse_semicolon_floats(field(im_idx), &what)?),
            other => {
                return Err(StorageError::Malformed(format!(
                    "{what}: unknown dtype '{other}'"
                )))
            }
        };
        parts.push(ArrayPart {
            part,
            shape: parse_semicolon_usize(field(shape_idx), &what)?,
            re: parse_semicolon_floats(field(re_idx), &what)?,
            im,
        });
    }
    layout::from_parts(name, parts)
}

impl DataReader for CsvReader {
    fn read(&self, path: &Path) -> Result<FileContents> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let [entry_idx, key_idx, kind_idx, value_idx] =
            INDEX_HEADER.map(|h| column(&headers, h, path));
        let (entry_idx, key_idx, kind_idx, value_idx) = (entry_idx?, key_idx?, kind_idx?, value_idx?);

        let mut contents = FileContents::default();
        for result in reader.records() {
            let record = result?;
            let field = |i: usize| record.get(i).unwrap_or("");
            let key = field(key_idx);
            match field(entry_idx) {
                "meta" => {
                    let value = decode_metadata(key, field(kind_idx), field(value_idx))?;
                    contents.metadata.insert(key.to_string(), value);
                }
                "dataset" => {
                    let file = path.with_file_name(field(value_idx));
                    contents.datasets.push(read_dataset(&file, key)?);
                    contents.names.push(key.to_string());
                }
                other => {
                    return Err(StorageError::Malformed(format!(
                        "{}: unknown entry type '{other}'",
                        path.display()
                    )))
                }
            }
        }
        Ok(contents)
    }
}
