use ndarray::{Array2, ArrayView2, Axis, Ix2};

use super::array::FieldValue;
use super::model::SystemParams;
use super::select::{energy_curves, Curve, LevelSelection};
use super::store::{DataStore, FileContents};
use crate::error::{Result, StorageError};
use crate::io::Persistent;

pub const ENERGY_TABLE: &str = "energy_table";
pub const STATE_TABLE: &str = "state_table";
pub const MATRIXELEM_TABLE: &str = "matrixelem_table";

const FIELD_NAMES: [&str; 3] = [ENERGY_TABLE, STATE_TABLE, MATRIXELEM_TABLE];

// ---------------------------------------------------------------------------
// SpectrumData – energies, eigenstates and matrix elements across a sweep
// ---------------------------------------------------------------------------

/// Eigenspectrum of a system as a function of one swept parameter.
///
/// A fixed-schema view over a [`DataStore`]: `energy_table` (always present,
/// sweep index × level index), and optional `state_table` and
/// `matrixelem_table`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumData {
    store: DataStore,
}

impl SpectrumData {
    pub fn new(
        param_name: impl Into<String>,
        param_vals: Vec<f64>,
        energy_table: Array2<f64>,
        system_params: SystemParams,
        state_table: Option<FieldValue>,
        matrixelem_table: Option<FieldValue>,
    ) -> Result<Self> {
        let store = DataStore::new(
            param_name,
            param_vals,
            system_params,
            [
                (ENERGY_TABLE, Some(FieldValue::from(energy_table))),
                (STATE_TABLE, state_table),
                (MATRIXELEM_TABLE, matrixelem_table),
            ],
        )?;
        Ok(SpectrumData { store })
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn into_store(self) -> DataStore {
        self.store
    }

    pub fn param_name(&self) -> &str {
        &self.store.param_name
    }

    pub fn param_vals(&self) -> &[f64] {
        &self.store.param_vals
    }

    pub fn system_params(&self) -> &SystemParams {
        &self.store.system_params
    }

    pub fn param_count(&self) -> usize {
        self.store.param_count()
    }

    /// Energies, one row per sweep point.
    pub fn energy_table(&self) -> ArrayView2<'_, f64> {
        energy_view(&self.store)
            .expect("energy_table is checked to be a 2-D real array on every write to the store")
    }

    pub fn state_table(&self) -> Option<&FieldValue> {
        self.store.field(STATE_TABLE)
    }

    pub fn matrixelem_table(&self) -> Option<&FieldValue> {
        self.store.field(MATRIXELEM_TABLE)
    }

    /// Shift every row so that its lowest level (column 0) is zero.
    pub fn subtract_ground(&mut self) {
        if let Some(FieldValue::Real(table)) = self.store.field_mut(ENERGY_TABLE) {
            for mut row in table.axis_iter_mut(Axis(0)) {
                if let Some(&ground) = row.first() {
                    row.mapv_inplace(|e| e - ground);
                }
            }
        }
    }

    /// Energy curves for the plotting side; ground subtraction, if asked
    /// for, is applied to a copy.
    pub fn eigenvalue_curves(
        &self,
        selection: &LevelSelection,
        subtract_ground: bool,
        labels: Option<&[String]>,
    ) -> Vec<Curve> {
        let energies = self.energy_table();
        if !subtract_ground {
            return energy_curves(self.param_vals(), energies, selection, labels);
        }
        let mut shifted = energies.to_owned();
        for mut row in shifted.rows_mut() {
            if let Some(&ground) = row.first() {
                row.mapv_inplace(|e| e - ground);
            }
        }
        energy_curves(self.param_vals(), shifted.view(), selection, labels)
    }
}

fn energy_view(store: &DataStore) -> Option<ArrayView2<'_, f64>> {
    store
        .field(ENERGY_TABLE)
        .and_then(FieldValue::as_real)
        .and_then(|a| a.view().into_dimensionality::<Ix2>().ok())
}

/// Check that a store fits the spectrum schema.
fn validate(store: &DataStore) -> Result<()> {
    if let Some(name) = store.data_names().find(|n| !FIELD_NAMES.contains(n)) {
        return Err(StorageError::UnexpectedField {
            name: name.to_string(),
        });
    }
    match store.field(ENERGY_TABLE) {
        None => Err(StorageError::MissingField {
            name: ENERGY_TABLE.to_string(),
        }),
        Some(_) if energy_view(store).is_none() => Err(StorageError::InvalidField {
            name: ENERGY_TABLE.to_string(),
            reason: "expected a 2-D real array".to_string(),
        }),
        Some(_) => Ok(()),
    }
}

impl TryFrom<DataStore> for SpectrumData {
    type Error = StorageError;

    /// Optional tables missing from `store` are declared absent.
    fn try_from(mut store: DataStore) -> Result<Self> {
        validate(&store)?;
        store.declare_in_order(&FIELD_NAMES);
        Ok(SpectrumData { store })
    }
}

impl Persistent for SpectrumData {
    fn data_store(&self) -> &DataStore {
        &self.store
    }

    fn set_from_parts(&mut self, contents: FileContents) -> Result<()> {
        let mut staged = self.store.clone();
        staged.set_from_parts(contents)?;
        validate(&staged)?;
        self.store = staged;
        Ok(())
    }

    fn from_parts(contents: FileContents) -> Result<Self> {
        DataStore::from_parts(contents).and_then(SpectrumData::try_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::array::DataArray;
    use crate::data::metadata::{PARAM_NAME, PARAM_VALS};
    use crate::data::model::{Metadata, MetadataValue};
    use ndarray::array;

    fn spectrum() -> SpectrumData {
        SpectrumData::new(
            "ng",
            vec![0.0, 0.5],
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            SystemParams::new(),
            None,
            None,
        )
        .unwrap()
    }

    fn contents(names: &[&str], datasets: Vec<DataArray>) -> FileContents {
        let mut metadata = Metadata::new();
        metadata.insert(PARAM_NAME.into(), MetadataValue::String("ng".into()));
        metadata.insert(PARAM_VALS.into(), MetadataValue::Array(vec![0.0, 1.0]));
        FileContents {
            metadata,
            names: names.iter().map(|s| s.to_string()).collect(),
            datasets,
        }
    }

    #[test]
    fn test_subtract_ground() {
        let mut spec = spectrum();
        spec.subtract_ground();
        assert_eq!(spec.energy_table(), array![[0.0, 1.0, 2.0], [0.0, 1.0, 2.0]]);
        spec.subtract_ground();
        assert_eq!(spec.energy_table(), array![[0.0, 1.0, 2.0], [0.0, 1.0, 2.0]]);
        assert!(spec.energy_table().column(0).iter().all(|&e| e == 0.0));
    }

    #[test]
    fn test_subtract_ground_without_levels() {
        let mut spec = SpectrumData::new(
            "ng",
            vec![0.0],
            Array2::zeros((1, 0)),
            SystemParams::new(),
            None,
            None,
        )
        .unwrap();
        spec.subtract_ground();
        assert_eq!(spec.energy_table().shape(), &[1, 0]);
    }

    #[test]
    fn test_optional_tables_are_declared() {
        let spec = spectrum();
        let names: Vec<&str> = spec.store().data_names().collect();
        assert_eq!(names, FIELD_NAMES.to_vec());
        assert!(spec.state_table().is_none());
        assert!(spec.matrixelem_table().is_none());
    }

    #[test]
    fn test_from_parts_requires_energy_table() {
        let err = SpectrumData::from_parts(contents(&[], vec![])).unwrap_err();
        assert!(matches!(err, StorageError::MissingField { name } if name == ENERGY_TABLE));
    }

    #[test]
    fn test_from_parts_declares_missing_tables_absent() {
        let matrix = DataArray::Real(array![[[1.0]], [[2.0]]].into_dyn());
        let energies = DataArray::Real(array![[0.0], [1.0]].into_dyn());
        let spec =
            SpectrumData::from_parts(contents(&[MATRIXELEM_TABLE, ENERGY_TABLE], vec![matrix, energies]))
                .unwrap();
        let names: Vec<&str> = spec.store().data_names().collect();
        assert_eq!(names, FIELD_NAMES.to_vec());
        assert!(spec.state_table().is_none());
        assert!(spec.matrixelem_table().is_some());
        assert_eq!(spec.energy_table(), array![[0.0], [1.0]]);
    }

    #[test]
    fn test_from_parts_rejects_unknown_field() {
        let energies = DataArray::Real(array![[0.0], [1.0]].into_dyn());
        let extra = DataArray::Real(array![1.0].into_dyn());
        let err = SpectrumData::from_parts(contents(&[ENERGY_TABLE, "chi"], vec![energies, extra]))
            .unwrap_err();
        assert!(matches!(err, StorageError::UnexpectedField { name } if name == "chi"));
    }

    #[test]
    fn test_from_parts_rejects_1d_energies() {
        let energies = DataArray::Real(array![0.0, 1.0].into_dyn());
        let err = SpectrumData::from_parts(contents(&[ENERGY_TABLE], vec![energies])).unwrap_err();
        assert!(matches!(err, StorageError::InvalidField { .. }));
    }

    #[test]
    fn test_populate_rejects_bad_energies_and_keeps_state() {
        let mut spec = spectrum();
        let before = spec.clone();
        let energies = DataArray::Complex(ndarray::ArrayD::zeros(ndarray::IxDyn(&[2, 2])));
        let err = spec
            .set_from_parts(contents(&[ENERGY_TABLE], vec![energies]))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidField { .. }));
        assert_eq!(spec, before);
    }

    #[test]
    fn test_eigenvalue_curves_subtract_on_copy() {
        let spec = spectrum();
        let curves = spec.eigenvalue_curves(&LevelSelection::First(2), true, None);
        assert_eq!(curves[1].points, vec![[0.0, 1.0], [0.5, 1.0]]);
        assert_eq!(spec.energy_table()[[1, 1]], 5.0);
    }
}
