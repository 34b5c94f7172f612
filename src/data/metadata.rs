//! Metadata codec: system parameters ⇄ flat metadata record.
//!
//! Normalization policy applied to every `system_params` entry:
//! * keys starting with `_` are private and dropped;
//! * nested maps are flattened into the same namespace, without prefixes;
//! * complex numbers have no metadata form and are stored as strings;
//! * everything else maps onto the [`MetadataValue`] of the same shape.
//!
//! Flattening never overwrites: a key that appears twice (including the
//! reserved `param_name` / `param_vals`) is a [`StorageError::KeyCollision`].
//! NaN and infinities have no portable metadata form and are rejected with
//! [`StorageError::InvalidMetadata`] before anything is written.
//! Dropped and coerced values are reported through `log::warn!`.

use log::warn;

use super::model::{Metadata, MetadataValue, ParamValue, SystemParams};
use crate::error::{Result, StorageError};

/// Metadata key holding the swept parameter's name.
pub const PARAM_NAME: &str = "param_name";
/// Metadata key holding the swept parameter's values.
pub const PARAM_VALS: &str = "param_vals";

/// Build the flat metadata record for a sweep.
pub fn build_metadata(
    param_name: &str,
    param_vals: &[f64],
    system_params: &SystemParams,
) -> Result<Metadata> {
    check_finite(PARAM_VALS, param_vals)?;
    let mut meta = Metadata::new();
    meta.insert(
        PARAM_NAME.to_string(),
        MetadataValue::String(param_name.to_string()),
    );
    meta.insert(
        PARAM_VALS.to_string(),
        MetadataValue::Array(param_vals.to_vec()),
    );
    flatten_into(system_params, &mut meta)?;
    Ok(meta)
}

/// Normalize system parameters on their own, without the sweep keys.
pub fn normalize_params(system_params: &SystemParams) -> Result<Metadata> {
    let mut meta = Metadata::new();
    flatten_into(system_params, &mut meta)?;
    Ok(meta)
}

fn check_finite(key: &str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(bad) => Err(StorageError::InvalidMetadata {
            key: key.to_string(),
            reason: format!("non-finite value {bad} cannot be stored as metadata"),
        }),
        None => Ok(()),
    }
}

fn flatten_into(params: &SystemParams, out: &mut Metadata) -> Result<()> {
    for (key, value) in params {
        if key.starts_with('_') {
            warn!("dropping private system parameter '{key}' from metadata");
            continue;
        }
        let normalized = match value {
            ParamValue::Map(nested) => {
                flatten_into(nested, out)?;
                continue;
            }
            ParamValue::Null => MetadataValue::Null,
            ParamValue::Bool(b) => MetadataValue::Bool(*b),
            ParamValue::Integer(i) => MetadataValue::Integer(*i),
            ParamValue::Float(v) => {
                check_finite(key, &[*v])?;
                MetadataValue::Float(*v)
            }
            ParamValue::String(s) => MetadataValue::String(s.clone()),
            ParamValue::Array(v) => {
                check_finite(key, v)?;
                MetadataValue::Array(v.clone())
            }
            ParamValue::Complex(z) => {
                warn!("system parameter '{key}' is complex; stored as string");
                MetadataValue::String(z.to_string())
            }
        };
        if out.contains_key(key) {
            return Err(StorageError::KeyCollision { key: key.clone() });
        }
        out.insert(key.clone(), normalized);
    }
    Ok(())
}

/// Split a metadata record read from file into
/// `(param_name, param_vals, system_params)`.
///
/// Both sweep keys are required; nothing is defaulted.
pub fn split_metadata(mut meta: Metadata) -> Result<(String, Vec<f64>, SystemParams)> {
    let param_name = match meta.remove(PARAM_NAME) {
        Some(MetadataValue::String(s)) => s,
        Some(other) => {
            return Err(StorageError::InvalidMetadata {
                key: PARAM_NAME.to_string(),
                reason: format!("expected a string, found {}", other.kind()),
            })
        }
        None => {
            return Err(StorageError::MissingKey {
                key: PARAM_NAME.to_string(),
            })
        }
    };
    let param_vals = match meta.remove(PARAM_VALS) {
        Some(MetadataValue::Array(v)) => v,
        Some(other) => {
            return Err(StorageError::InvalidMetadata {
                key: PARAM_VALS.to_string(),
                reason: format!("expected a numeric array, found {}", other.kind()),
            })
        }
        None => {
            return Err(StorageError::MissingKey {
                key: PARAM_VALS.to_string(),
            })
        }
    };
    let system_params = meta
        .into_iter()
        .map(|(k, v)| (k, ParamValue::from(v)))
        .collect();
    Ok((param_name, param_vals, system_params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;
    use std::collections::BTreeMap;

    fn params(entries: &[(&str, ParamValue)]) -> SystemParams {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_build_metadata_merges_sweep_keys() {
        let sp = params(&[("EJ", 20.0.into()), ("ncut", 30i64.into())]);
        let meta = build_metadata("flux", &[0.0, 0.5], &sp).unwrap();
        assert_eq!(meta.len(), 4);
        assert_eq!(meta[PARAM_NAME], MetadataValue::String("flux".into()));
        assert_eq!(meta[PARAM_VALS], MetadataValue::Array(vec![0.0, 0.5]));
        assert_eq!(meta["EJ"], MetadataValue::Float(20.0));
        assert_eq!(meta["ncut"], MetadataValue::Integer(30));
    }

    #[test]
    fn test_nested_map_is_flattened() {
        let grid: BTreeMap<String, ParamValue> =
            params(&[("min_val", (-6.0).into()), ("pt_count", 50i64.into())]);
        let sp = params(&[("EC", 1.0.into()), ("grid", grid.into())]);
        let meta = normalize_params(&sp).unwrap();
        assert_eq!(meta.len(), 3);
        assert_eq!(meta["min_val"], MetadataValue::Float(-6.0));
        assert_eq!(meta["pt_count"], MetadataValue::Integer(50));
        assert!(!meta.contains_key("grid"));
    }

    #[test]
    fn test_collision_fails_loudly() {
        let nested = params(&[("EC", 2.0.into())]);
        let sp = params(&[("EC", 1.0.into()), ("inner", nested.into())]);
        let err = normalize_params(&sp).unwrap_err();
        assert!(matches!(err, StorageError::KeyCollision { key } if key == "EC"));
    }

    #[test]
    fn test_reserved_key_collision() {
        let sp = params(&[(PARAM_VALS, vec![1.0].into())]);
        let err = build_metadata("x", &[0.0], &sp).unwrap_err();
        assert!(matches!(err, StorageError::KeyCollision { .. }));
    }

    #[test]
    fn test_private_dropped_and_complex_coerced() {
        let sp = params(&[
            ("_cache", 1.0.into()),
            ("phase", Complex64::new(1.0, -2.0).into()),
        ]);
        let meta = normalize_params(&sp).unwrap();
        assert!(!meta.contains_key("_cache"));
        assert_eq!(meta["phase"], MetadataValue::String("1-2i".into()));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let err = build_metadata("x", &[0.0, f64::INFINITY], &SystemParams::new()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidMetadata { key, .. } if key == PARAM_VALS));

        let sp = params(&[("EJ", f64::NAN.into())]);
        let err = normalize_params(&sp).unwrap_err();
        assert!(matches!(err, StorageError::InvalidMetadata { key, .. } if key == "EJ"));

        let nested = params(&[("offsets", vec![1.0, f64::NEG_INFINITY].into())]);
        let sp = params(&[("grid", nested.into())]);
        let err = normalize_params(&sp).unwrap_err();
        assert!(matches!(err, StorageError::InvalidMetadata { key, .. } if key == "offsets"));
    }

    #[test]
    fn test_split_roundtrip() {
        let sp = params(&[("EJ", 20.0.into()), ("label", "tmon".into())]);
        let meta = build_metadata("ng", &[0.0, 0.25, 0.5], &sp).unwrap();
        let (name, vals, back) = split_metadata(meta).unwrap();
        assert_eq!(name, "ng");
        assert_eq!(vals, vec![0.0, 0.25, 0.5]);
        assert_eq!(back, sp);
    }

    #[test]
    fn test_split_missing_param_vals() {
        let mut meta = Metadata::new();
        meta.insert(PARAM_NAME.into(), MetadataValue::String("ng".into()));
        let err = split_metadata(meta).unwrap_err();
        assert!(matches!(err, StorageError::MissingKey { key } if key == PARAM_VALS));
    }

    #[test]
    fn test_split_wrong_type() {
        let mut meta = Metadata::new();
        meta.insert(PARAM_NAME.into(), MetadataValue::Integer(3));
        meta.insert(PARAM_VALS.into(), MetadataValue::Array(vec![]));
        let err = split_metadata(meta).unwrap_err();
        assert!(matches!(err, StorageError::InvalidMetadata { .. }));
    }
}
