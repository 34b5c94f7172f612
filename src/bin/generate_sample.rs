use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ndarray::{array, Array2, Array3};
use num_complex::Complex64;
use spectral_store::{FieldValue, FileFormat, ParamValue, Persistent, SpectrumData, SystemParams};

/// Two-level avoided crossing `H = [[d, g], [g, -d]]` with `d = x - 0.5`.
///
/// Returns the sorted energies and the eigenvectors as matrix columns.
fn two_level(x: f64, g: f64) -> ([f64; 2], Array2<Complex64>) {
    let d = x - 0.5;
    let e = (d * d + g * g).sqrt();
    let theta = 0.5 * g.atan2(d);
    let (s, c) = theta.sin_cos();
    let states = array![
        [Complex64::new(-s, 0.0), Complex64::new(c, 0.0)],
        [Complex64::new(c, 0.0), Complex64::new(s, 0.0)],
    ];
    ([-e, e], states)
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let coupling = 0.05;
    let param_vals: Vec<f64> = (0..41).map(|i| i as f64 / 40.0).collect();

    let mut energies = Array2::<f64>::zeros((param_vals.len(), 2));
    let mut states = Vec::with_capacity(param_vals.len());
    let mut sigma_z = Array3::<f64>::zeros((param_vals.len(), 2, 2));
    for (i, &x) in param_vals.iter().enumerate() {
        let (evals, evecs) = two_level(x, coupling);
        energies[[i, 0]] = evals[0];
        energies[[i, 1]] = evals[1];
        // <a|σz|b> for real eigenvectors stored as columns
        for a in 0..2 {
            for b in 0..2 {
                sigma_z[[i, a, b]] = evecs[[0, a]].re * evecs[[0, b]].re
                    - evecs[[1, a]].re * evecs[[1, b]].re;
            }
        }
        states.push(evecs.into_dyn());
    }

    let mut grid = BTreeMap::new();
    grid.insert("basis_dim".to_string(), ParamValue::Integer(2));
    let mut system_params = SystemParams::new();
    system_params.insert("coupling".to_string(), ParamValue::Float(coupling));
    system_params.insert("model".to_string(), ParamValue::from("two-level crossing"));
    system_params.insert("basis".to_string(), ParamValue::Map(grid));

    let spectrum = SpectrumData::new(
        "detuning",
        param_vals,
        energies,
        system_params,
        Some(FieldValue::Sequence(states)),
        Some(FieldValue::from(sigma_z)),
    )?;

    for (format, ext) in [
        (FileFormat::Json, "json"),
        (FileFormat::Csv, "csv"),
        (FileFormat::Parquet, "parquet"),
    ] {
        let path = out_dir.join(format!("sample_sweep.{ext}"));
        spectrum
            .filewrite(&path, format)
            .with_context(|| format!("writing {}", path.display()))?;
        println!(
            "Wrote {} sweep points ({} levels) to {}",
            spectrum.param_count(),
            spectrum.energy_table().ncols(),
            path.display()
        );
    }
    Ok(())
}
