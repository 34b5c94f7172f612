use indexmap::IndexMap;
use log::debug;

use super::array::{DataArray, FieldValue};
use super::metadata::{self, PARAM_NAME, PARAM_VALS};
use super::model::{Metadata, SystemParams};
use crate::error::{Result, StorageError};

/// Names that can never be used for a data field.
const RESERVED_NAMES: [&str; 4] = [PARAM_NAME, PARAM_VALS, "system_params", "data_names"];

// ---------------------------------------------------------------------------
// FileContents – what a reader hands back
// ---------------------------------------------------------------------------

/// Raw result of reading a file: the metadata record plus datasets, where
/// `names[i]` labels `datasets[i]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileContents {
    pub metadata: Metadata,
    pub names: Vec<String>,
    pub datasets: Vec<DataArray>,
}

impl FileContents {
    /// Pair names with datasets, rejecting inconsistent or reserved entries.
    fn into_pairs(self) -> Result<(Metadata, Vec<(String, DataArray)>)> {
        if self.names.len() != self.datasets.len() {
            return Err(StorageError::Malformed(format!(
                "{} dataset names but {} datasets",
                self.names.len(),
                self.datasets.len()
            )));
        }
        for (i, name) in self.names.iter().enumerate() {
            if RESERVED_NAMES.contains(&name.as_str()) {
                return Err(StorageError::Malformed(format!(
                    "dataset uses reserved name '{name}'"
                )));
            }
            if self.names[..i].contains(name) {
                return Err(StorageError::Malformed(format!(
                    "dataset '{name}' appears more than once"
                )));
            }
        }
        let pairs = self.names.into_iter().zip(self.datasets).collect();
        Ok((self.metadata, pairs))
    }
}

// ---------------------------------------------------------------------------
// DataStore – sweep parameters plus an open set of named data fields
// ---------------------------------------------------------------------------

/// Data from a parameter sweep: the swept parameter, the fixed system
/// parameters, and any number of named data fields.
///
/// The data field names (`data_names`) are fixed when the store is built.
/// A field may be declared without a value (`None`); such a field keeps its
/// name but is skipped when writing.
#[derive(Debug, Clone, PartialEq)]
pub struct DataStore {
    pub param_name: String,
    pub param_vals: Vec<f64>,
    pub system_params: SystemParams,
    fields: IndexMap<String, Option<FieldValue>>,
    /// Values bound by [`DataStore::set_from_parts`] under names that were
    /// never declared. Readable, never written.
    undeclared: IndexMap<String, FieldValue>,
}

impl DataStore {
    /// Build a store; every `(name, value)` in `fields` becomes a data field.
    pub fn new<I, S>(
        param_name: impl Into<String>,
        param_vals: Vec<f64>,
        system_params: SystemParams,
        fields: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Option<FieldValue>)>,
        S: Into<String>,
    {
        let mut map = IndexMap::new();
        for (name, value) in fields {
            let name = name.into();
            if RESERVED_NAMES.contains(&name.as_str()) {
                return Err(StorageError::InvalidField {
                    name,
                    reason: "name is reserved for sweep metadata".to_string(),
                });
            }
            if map.contains_key(&name) {
                return Err(StorageError::InvalidField {
                    name,
                    reason: "declared more than once".to_string(),
                });
            }
            map.insert(name, value);
        }
        Ok(DataStore {
            param_name: param_name.into(),
            param_vals,
            system_params,
            fields: map,
            undeclared: IndexMap::new(),
        })
    }

    /// Number of sweep points.
    pub fn param_count(&self) -> usize {
        self.param_vals.len()
    }

    /// Data field names, in declaration order.
    pub fn data_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_data_name(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Names bound from a file that were not declared data fields.
    pub fn undeclared_names(&self) -> impl Iterator<Item = &str> {
        self.undeclared.keys().map(String::as_str)
    }

    /// Look up a field value. Declared fields take precedence; absent
    /// fields yield `None`.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        match self.fields.get(name) {
            Some(value) => value.as_ref(),
            None => self.undeclared.get(name),
        }
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(name).and_then(Option::as_mut)
    }

    /// Put `names` first, in that order, declaring any that are missing as
    /// absent. Other data fields follow in their current order.
    pub(crate) fn declare_in_order(&mut self, names: &[&str]) {
        let mut ordered = IndexMap::with_capacity(self.fields.len() + names.len());
        for &name in names {
            let value = self.fields.shift_remove(name).flatten();
            ordered.insert(name.to_string(), value);
        }
        ordered.extend(self.fields.drain(..));
        self.fields = ordered;
    }

    /// Flat metadata record: sweep keys merged with normalized system params.
    pub fn metadata_dict(&self) -> Result<Metadata> {
        metadata::build_metadata(&self.param_name, &self.param_vals, &self.system_params)
    }

    /// Dense arrays for every declared field that holds a value, in
    /// declaration order.
    pub fn data_dict(&self) -> Result<Vec<(String, DataArray)>> {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
            .map(|(name, value)| value.to_data_array().map(|array| (name.clone(), array)))
            .collect()
    }

    /// Overwrite this store from file contents, in place.
    ///
    /// `data_names` is left as it is: datasets under a declared name replace
    /// that field, declared names missing from the file keep their value, and
    /// datasets under any other name are kept as undeclared values. Nothing
    /// is modified unless the whole of `contents` is valid.
    pub fn set_from_parts(&mut self, contents: FileContents) -> Result<()> {
        let (meta, pairs) = contents.into_pairs()?;
        let (param_name, param_vals, system_params) = metadata::split_metadata(meta)?;

        self.param_name = param_name;
        self.param_vals = param_vals;
        self.system_params = system_params;
        for (name, data) in pairs {
            let value = FieldValue::from(data);
            match self.fields.get_mut(&name) {
                Some(slot) => *slot = Some(value),
                None => {
                    debug!("binding undeclared field '{name}'");
                    self.undeclared.insert(name, value);
                }
            }
        }
        Ok(())
    }

    /// Build a new store purely from file contents; `data_names` is the
    /// file's dataset name list.
    pub fn from_parts(contents: FileContents) -> Result<Self> {
        let (meta, pairs) = contents.into_pairs()?;
        let (param_name, param_vals, system_params) = metadata::split_metadata(meta)?;
        let fields = pairs
            .into_iter()
            .map(|(name, data)| (name, Some(FieldValue::from(data))));
        DataStore::new(param_name, param_vals, system_params, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{MetadataValue, ParamValue};
    use ndarray::array;

    fn sample_store() -> DataStore {
        let mut sp = SystemParams::new();
        sp.insert("EJ".into(), ParamValue::Float(15.0));
        DataStore::new(
            "flux",
            vec![0.0, 0.1, 0.2],
            sp,
            [
                ("a", Some(FieldValue::from(array![1.0, 2.0, 3.0]))),
                ("b", Some(FieldValue::Scalar(7.0))),
                ("c", None),
            ],
        )
        .unwrap()
    }

    fn contents(names: &[&str], datasets: Vec<DataArray>) -> FileContents {
        let mut metadata = Metadata::new();
        metadata.insert(PARAM_NAME.into(), MetadataValue::String("ng".into()));
        metadata.insert(PARAM_VALS.into(), MetadataValue::Array(vec![1.0, 2.0]));
        metadata.insert("EC".into(), MetadataValue::Float(0.5));
        FileContents {
            metadata,
            names: names.iter().map(|s| s.to_string()).collect(),
            datasets,
        }
    }

    fn real(values: &[f64]) -> DataArray {
        DataArray::Real(ndarray::Array1::from(values.to_vec()).into_dyn())
    }

    #[test]
    fn test_data_names_are_constructor_fields() {
        let store = sample_store();
        let names: Vec<&str> = store.data_names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(!store.is_data_name(PARAM_NAME));
        assert!(!store.is_data_name(PARAM_VALS));
        assert!(!store.is_data_name("system_params"));
    }

    #[test]
    fn test_reserved_field_name_rejected() {
        let err = DataStore::new(
            "x",
            vec![],
            SystemParams::new(),
            [(PARAM_VALS, Some(FieldValue::Scalar(1.0)))],
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::InvalidField { .. }));
    }

    #[test]
    fn test_duplicate_field_name_rejected() {
        let err = DataStore::new(
            "x",
            vec![0.0],
            SystemParams::new(),
            [
                ("a", Some(FieldValue::Scalar(1.0))),
                ("a", Some(FieldValue::Scalar(2.0))),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::InvalidField { name, .. } if name == "a"));
    }

    #[test]
    fn test_param_count() {
        for n in [0usize, 1, 17] {
            let vals: Vec<f64> = (0..n).map(|i| i as f64).collect();
            let store = DataStore::new(
                "x",
                vals,
                SystemParams::new(),
                Vec::<(String, Option<FieldValue>)>::new(),
            )
            .unwrap();
            assert_eq!(store.param_count(), n);
        }
    }

    #[test]
    fn test_data_dict_skips_absent() {
        let store = sample_store();
        let data = store.data_dict().unwrap();
        let names: Vec<&str> = data.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(data[1].1.shape(), Vec::<usize>::new());
        assert!(store.is_data_name("c"));
        assert!(store.field("c").is_none());
    }

    #[test]
    fn test_from_parts_derives_data_names() {
        let store = DataStore::from_parts(contents(&["x", "y"], vec![real(&[1.0]), real(&[2.0])]))
            .unwrap();
        assert_eq!(store.param_name, "ng");
        assert_eq!(store.param_count(), 2);
        assert_eq!(store.data_names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(store.system_params["EC"], ParamValue::Float(0.5));
    }

    #[test]
    fn test_set_from_parts_keeps_missing_declared_fields() {
        let mut store = DataStore::new(
            "flux",
            vec![0.0],
            SystemParams::new(),
            [
                ("x", Some(FieldValue::Scalar(1.0))),
                ("y", Some(FieldValue::Scalar(2.0))),
            ],
        )
        .unwrap();
        store
            .set_from_parts(contents(&["x", "z"], vec![real(&[10.0]), real(&[30.0])]))
            .unwrap();

        assert_eq!(store.param_name, "ng");
        assert_eq!(store.field("x"), Some(&FieldValue::from(array![10.0])));
        // declared but not in the file: untouched
        assert_eq!(store.field("y"), Some(&FieldValue::Scalar(2.0)));
        // in the file but never declared: readable, not a data name
        assert_eq!(store.field("z"), Some(&FieldValue::from(array![30.0])));
        assert_eq!(store.data_names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(store.undeclared_names().collect::<Vec<_>>(), vec!["z"]);
        let written: Vec<String> = store
            .data_dict()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(written, vec!["x", "y"]);
    }

    #[test]
    fn test_set_from_parts_failure_leaves_store_unmodified() {
        let mut store = sample_store();
        let before = store.clone();
        let mut bad = contents(&["a"], vec![real(&[0.0])]);
        bad.metadata.remove(PARAM_VALS);
        let err = store.set_from_parts(bad).unwrap_err();
        assert!(matches!(err, StorageError::MissingKey { .. }));
        assert_eq!(store, before);
    }

    #[test]
    fn test_mismatched_name_and_dataset_counts() {
        let err = DataStore::from_parts(contents(&["x", "y"], vec![real(&[1.0])])).unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));
    }

    #[test]
    fn test_duplicate_dataset_names() {
        let err = DataStore::from_parts(contents(&["x", "x"], vec![real(&[1.0]), real(&[2.0])]))
            .unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));
    }
}
