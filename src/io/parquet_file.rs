use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Array, Float64Builder, Int64Array, Int64Builder, ListArray,
    ListBuilder, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::layout::{self, ArrayPart};
use super::{DataReader, DataWriter};
use crate::data::array::DataArray;
use crate::data::model::Metadata;
use crate::data::store::FileContents;
use crate::error::{Result, StorageError};

/// Arrow schema metadata key under which the metadata record is stored as JSON.
pub const METADATA_KEY: &str = "spectral_store.metadata";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------
//
// One row per dataset (one per item for object sequences):
// - `name`:  Utf8
// - `part`:  Int64, null for dense arrays
// - `dtype`: Utf8, `float64` | `complex128`
// - `shape`: List<Int64>
// - `re`:    List<Float64>, row-major
// - `im`:    List<Float64>, null for real data

fn list_of(item: DataType) -> DataType {
    DataType::List(Arc::new(Field::new("item", item, true)))
}

fn schema(metadata_json: String) -> Schema {
    Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("part", DataType::Int64, true),
        Field::new("dtype", DataType::Utf8, false),
        Field::new("shape", list_of(DataType::Int64), false),
        Field::new("re", list_of(DataType::Float64), false),
        Field::new("im", list_of(DataType::Float64), true),
    ])
    .with_metadata(HashMap::from([(METADATA_KEY.to_string(), metadata_json)]))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Collects one object and writes a single-batch Parquet file on `finish`.
#[derive(Debug)]
pub struct ParquetWriter {
    path: PathBuf,
    metadata: Option<Metadata>,
    rows: Vec<(String, ArrayPart)>,
}

impl ParquetWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ParquetWriter {
            path: path.into(),
            metadata: None,
            rows: Vec::new(),
        }
    }
}

impl DataWriter for ParquetWriter {
    fn create_meta(&mut self, metadata: &Metadata) -> Result<()> {
        self.metadata = Some(metadata.clone());
        Ok(())
    }

    fn add_dataset(&mut self, name: &str, array: &DataArray) -> Result<()> {
        self.rows.extend(
            layout::to_parts(array)
                .into_iter()
                .map(|p| (name.to_string(), p)),
        );
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let metadata = self
            .metadata
            .ok_or_else(|| StorageError::Malformed("no metadata record was created".to_string()))?;
        let schema = Arc::new(schema(serde_json::to_string(&metadata)?));

        let mut name_builder = StringBuilder::new();
        let mut part_builder = Int64Builder::new();
        let mut dtype_builder = StringBuilder::new();
        let mut shape_builder = ListBuilder::new(Int64Builder::new());
        let mut re_builder = ListBuilder::new(Float64Builder::new());
        let mut im_builder = ListBuilder::new(Float64Builder::new());

        for (name, p) in &self.rows {
            name_builder.append_value(name);
            part_builder.append_option(p.part.map(|i| i as i64));
            dtype_builder.append_value(p.dtype());

            for &d in &p.shape {
                shape_builder.values().append_value(d as i64);
            }
            shape_builder.append(true);

            re_builder.values().append_slice(&p.re);
            re_builder.append(true);

            match &p.im {
                Some(im) => {
                    im_builder.values().append_slice(im);
                    im_builder.append(true);
                }
                None => im_builder.append(false),
            }
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(name_builder.finish()),
            Arc::new(part_builder.finish()),
            Arc::new(dtype_builder.finish()),
            Arc::new(shape_builder.finish()),
            Arc::new(re_builder.finish()),
            Arc::new(im_builder.finish()),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns)?;

        let file = std::fs::File::create(&self.path)?;
        let mut writer = ArrowWriter::try_new(file, schema, None)?;
        writer.write(&batch)?;
        writer.close()?;
        debug!(
            "parquet file written to {} ({} rows)",
            self.path.display(),
            batch.num_rows()
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reads files written by [`ParquetWriter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ParquetReader;

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| StorageError::Malformed(format!("column '{name}' missing or mistyped")))
}

/// Extract a `Vec<f64>` from a list column at the given row.
fn f64_list(col: &ListArray, row: usize) -> Result<Vec<f64>> {
    let values = col.value(row);
    let arr = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| StorageError::Malformed("list items are not Float64".to_string()))?;
    Ok(arr.values().to_vec())
}

fn shape_list(col: &ListArray, row: usize) -> Result<Vec<usize>> {
    let values = col.value(row);
    let arr = values
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| StorageError::Malformed("shape items are not Int64".to_string()))?;
    arr.values()
        .iter()
        .map(|&d| {
            usize::try_from(d)
                .map_err(|_| StorageError::Malformed(format!("negative dimension {d}")))
        })
        .collect()
}

impl DataReader for ParquetReader {
    fn read(&self, path: &Path) -> Result<FileContents> {
        let file = std::fs::File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let metadata_json = builder
            .schema()
            .metadata()
            .get(METADATA_KEY)
            .cloned()
            .ok_or_else(|| {
                StorageError::Malformed(format!("schema metadata lacks '{METADATA_KEY}'"))
            })?;
        let metadata: Metadata = serde_json::from_str(&metadata_json)?;
        let reader = builder.build()?;

        // Rows of one dataset are contiguous; group them in file order.
        let mut grouped: Vec<(String, Vec<ArrayPart>)> = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;
            let names = column::<StringArray>(&batch, "name")?;
            let parts = column::<Int64Array>(&batch, "part")?;
            let dtypes = column::<StringArray>(&batch, "dtype")?;
            let shapes = column::<ListArray>(&batch, "shape")?;
            let res = column::<ListArray>(&batch, "re")?;
            let ims = column::<ListArray>(&batch, "im")?;

            for row in 0..batch.num_rows() {
                let part = if parts.is_null(row) {
                    None
                } else {
                    let i = parts.value(row);
                    Some(usize::try_from(i).map_err(|_| {
                        StorageError::Malformed(format!("row {row}: negative part index {i}"))
                    })?)
                };
                let im = match dtypes.value(row) {
                    "float64" => None,
                    "complex128" if !ims.is_null(row) => Some(f64_list(ims, row)?),
                    other => {
                        return Err(StorageError::Malformed(format!(
                            "row {row}: unusable dtype '{other}'"
                        )))
                    }
                };
                let piece = ArrayPart {
                    part,
                    shape: shape_list(shapes, row)?,
                    re: f64_list(res, row)?,
                    im,
                };

                let name = names.value(row);
                if grouped.last().map_or(true, |(last, _)| last != name) {
                    grouped.push((name.to_string(), Vec::new()));
                }
                if let Some((_, pieces)) = grouped.last_mut() {
                    pieces.push(piece);
                }
            }
        }

        let mut contents = FileContents {
            metadata,
            ..FileContents::default()
        };
        for (name, pieces) in grouped {
            contents.datasets.push(layout::from_parts(&name, pieces)?);
            contents.names.push(name);
        }
        Ok(contents)
    }
}
