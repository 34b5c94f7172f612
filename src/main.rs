use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use spectral_store::{DataStore, FieldValue, FileFormat, Persistent};

/// One-line description of a data field for the summary table.
fn describe(value: Option<&FieldValue>) -> Result<String> {
    let Some(value) = value else {
        return Ok("<absent>".to_string());
    };
    let array = value.to_data_array().context("converting field")?;
    Ok(format!("{} {:?}", array.dtype(), array.shape()))
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next().map(PathBuf::from) else {
        bail!("usage: spectral-store <file> [json|csv|parquet]");
    };
    let format = match args.next() {
        Some(name) => name
            .parse::<FileFormat>()
            .with_context(|| format!("unknown format '{name}'"))?,
        None => FileFormat::from_path(&path)
            .with_context(|| format!("cannot tell the format of {}", path.display()))?,
    };

    let store = DataStore::create_from_file(&path, format)
        .with_context(|| format!("reading {}", path.display()))?;

    println!(
        "{}: sweep over '{}' ({} points)",
        path.display(),
        store.param_name,
        store.param_count()
    );
    if let (Some(first), Some(last)) = (store.param_vals.first(), store.param_vals.last()) {
        println!("  range: {first} .. {last}");
    }

    println!("system parameters:");
    for (key, value) in &store.system_params {
        println!("  {key} = {value:?}");
    }

    println!("data fields:");
    for name in store.data_names() {
        println!("  {name}: {}", describe(store.field(name))?);
    }
    Ok(())
}
