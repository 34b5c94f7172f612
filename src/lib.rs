//! Storage for eigenspectrum data from parameter sweeps.
//!
//! A [`DataStore`] holds the swept parameter, the system parameters the sweep
//! ran under, and any number of named data fields. [`SpectrumData`] fixes the
//! field set to energies, eigenstates and matrix elements. Both round-trip
//! through JSON, CSV or Parquet files via the [`Persistent`] trait:
//!
//! ```no_run
//! use ndarray::array;
//! use spectral_store::{FileFormat, Persistent, SpectrumData, SystemParams};
//!
//! # fn main() -> spectral_store::Result<()> {
//! let spectrum = SpectrumData::new(
//!     "flux",
//!     vec![0.0, 0.5],
//!     array![[0.0, 1.2], [0.1, 1.0]],
//!     SystemParams::new(),
//!     None,
//!     None,
//! )?;
//! spectrum.filewrite("sweep.json", FileFormat::Json)?;
//! let back = SpectrumData::create_from_file("sweep.json", FileFormat::Json)?;
//! assert_eq!(back, spectrum);
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod io;

pub use data::array::{DataArray, FieldValue};
pub use data::model::{Metadata, MetadataValue, ParamValue, SystemParams};
pub use data::select::{Curve, LevelSelection};
pub use data::spectrum::SpectrumData;
pub use data::store::{DataStore, FileContents};
pub use data::wavefunction::{GridSpec, WaveFunction, WaveFunctionOnGrid};
pub use error::{Result, StorageError};
pub use io::{DataReader, DataWriter, FileFormat, Persistent};
