//! Data layer: sweep containers and the metadata codec.
//!
//! Architecture:
//! ```text
//!   system_params ──► metadata ──► flat Metadata ──┐
//!                                                  ├──► io writer
//!   DataStore ─────► FieldValue ──► DataArray ─────┘
//!        ▲
//!        │ composition
//!   SpectrumData ──► select ──► Curve (plotting side)
//! ```

pub mod array;
pub mod metadata;
pub mod model;
pub mod select;
pub mod spectrum;
pub mod store;
pub mod wavefunction;
