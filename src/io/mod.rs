//! File boundary: abstract writer/reader capabilities, the format selector,
//! and the write/read protocol shared by every persistent type.
//!
//! Each call opens, writes (or reads) and closes its file(s); no handle
//! outlives a call.

pub mod csv_files;
pub mod json_file;
mod layout;
pub mod parquet_file;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};

use crate::data::array::DataArray;
use crate::data::model::Metadata;
use crate::data::store::{DataStore, FileContents};
use crate::error::{Result, StorageError};

pub use csv_files::{CsvReader, CsvWriter};
pub use json_file::{JsonReader, JsonWriter};
pub use parquet_file::{ParquetReader, ParquetWriter};

// ---------------------------------------------------------------------------
// Format selector
// ---------------------------------------------------------------------------

/// Concrete file format, chosen per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Csv,
    Parquet,
}

impl FileFormat {
    /// Pick a format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        ext.parse()
    }
}

impl FromStr for FileFormat {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(FileFormat::Json),
            "csv" => Ok(FileFormat::Csv),
            "parquet" | "pq" => Ok(FileFormat::Parquet),
            other => Err(StorageError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileFormat::Json => "json",
            FileFormat::Csv => "csv",
            FileFormat::Parquet => "parquet",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Writer / reader capabilities
// ---------------------------------------------------------------------------

/// Sink for one object: a single metadata record plus named datasets.
pub trait DataWriter {
    fn create_meta(&mut self, metadata: &Metadata) -> Result<()>;

    /// Add one dataset; names are distinct within one object.
    fn add_dataset(&mut self, name: &str, array: &DataArray) -> Result<()>;

    /// Persist everything collected so far and release the file.
    fn finish(self) -> Result<()>
    where
        Self: Sized;
}

/// Source for one object.
pub trait DataReader {
    fn read(&self, path: &Path) -> Result<FileContents>;
}

/// Hand a store to a writer: the metadata record first, then every present
/// data field in declaration order. Returns the number of datasets written.
pub fn serialize<W: DataWriter + ?Sized>(store: &DataStore, writer: &mut W) -> Result<usize> {
    writer.create_meta(&store.metadata_dict()?)?;
    let data = store.data_dict()?;
    for (name, array) in &data {
        debug!("dataset '{name}': {} {:?}", array.dtype(), array.shape());
        writer.add_dataset(name, array)?;
    }
    Ok(data.len())
}

fn write_with<W: DataWriter>(store: &DataStore, mut writer: W) -> Result<usize> {
    let count = serialize(store, &mut writer)?;
    writer.finish()?;
    Ok(count)
}

/// Write a store to `path` in the given format.
pub fn write_store(store: &DataStore, path: &Path, format: FileFormat) -> Result<()> {
    let count = match format {
        FileFormat::Json => write_with(store, JsonWriter::new(path))?,
        FileFormat::Csv => write_with(store, CsvWriter::new(path))?,
        FileFormat::Parquet => write_with(store, ParquetWriter::new(path))?,
    };
    info!("wrote {count} datasets to {} ({format})", path.display());
    Ok(())
}

/// Read the raw metadata/dataset triple from `path`.
pub fn read_contents(path: &Path, format: FileFormat) -> Result<FileContents> {
    let contents = match format {
        FileFormat::Json => JsonReader.read(path)?,
        FileFormat::Csv => CsvReader.read(path)?,
        FileFormat::Parquet => ParquetReader.read(path)?,
    };
    info!(
        "read {} datasets from {} ({format})",
        contents.names.len(),
        path.display()
    );
    Ok(contents)
}

// ---------------------------------------------------------------------------
// Persistent – the write / populate / construct protocol
// ---------------------------------------------------------------------------

/// Types that can be written to and rebuilt from sweep files.
pub trait Persistent: Sized {
    fn data_store(&self) -> &DataStore;

    /// Overwrite `self` from file contents; all-or-nothing.
    fn set_from_parts(&mut self, contents: FileContents) -> Result<()>;

    /// Build a new value from file contents alone.
    fn from_parts(contents: FileContents) -> Result<Self>;

    fn filewrite(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        write_store(self.data_store(), path.as_ref(), format)
    }

    fn set_from_fileread(&mut self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let contents = read_contents(path.as_ref(), format)?;
        self.set_from_parts(contents)
    }

    fn create_from_file(path: impl AsRef<Path>, format: FileFormat) -> Result<Self> {
        let contents = read_contents(path.as_ref(), format)?;
        Self::from_parts(contents)
    }
}

impl Persistent for DataStore {
    fn data_store(&self) -> &DataStore {
        self
    }

    fn set_from_parts(&mut self, contents: FileContents) -> Result<()> {
        DataStore::set_from_parts(self, contents)
    }

    fn from_parts(contents: FileContents) -> Result<Self> {
        DataStore::from_parts(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::array::FieldValue;
    use crate::data::model::SystemParams;

    /// Records calls instead of touching the filesystem.
    #[derive(Default)]
    struct RecordingWriter {
        calls: Vec<String>,
    }

    impl DataWriter for RecordingWriter {
        fn create_meta(&mut self, metadata: &Metadata) -> Result<()> {
            self.calls.push(format!("meta:{}", metadata.len()));
            Ok(())
        }

        fn add_dataset(&mut self, name: &str, _array: &DataArray) -> Result<()> {
            self.calls.push(format!("data:{name}"));
            Ok(())
        }

        fn finish(self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_serialize_order() {
        let store = DataStore::new(
            "flux",
            vec![0.0],
            SystemParams::new(),
            [
                ("zeta", Some(FieldValue::Scalar(1.0))),
                ("absent", None),
                ("alpha", Some(FieldValue::Scalar(2.0))),
            ],
        )
        .unwrap();
        let mut writer = RecordingWriter::default();
        let count = serialize(&store, &mut writer).unwrap();
        assert_eq!(count, 2);
        assert_eq!(writer.calls, vec!["meta:2", "data:zeta", "data:alpha"]);
    }

    #[test]
    fn test_format_selection() {
        assert_eq!(FileFormat::from_path(Path::new("a/b.JSON")).unwrap(), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("b.pq")).unwrap(), FileFormat::Parquet);
        assert_eq!("csv".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert!(matches!(
            FileFormat::from_path(Path::new("b.h5")),
            Err(StorageError::UnsupportedFormat(_))
        ));
    }
}
