//! Command-line decoder: sensor schema and binary log in, CSV table out.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use telemeter::{schema::Sensor, table};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Decode binary sensor telemetry logs into CSV tables.
///
/// Each input names a capture by any of its files: for an input `base.*`,
/// the schema is read from `base.ini`, samples from `base.dat`, and the
/// decoded table is written to `base.csv`.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Capture files to decode; the extension is ignored.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Several files of one capture may be passed together; keep the first
    // occurrence of each base name.
    let mut bases: Vec<PathBuf> = Vec::new();
    for input in &args.inputs {
        let base = input.with_extension("");
        if !bases.contains(&base) {
            bases.push(base);
        }
    }

    let mut failed = 0;
    for base in &bases {
        info!("processing {}", base.display());
        if let Err(error) = process(base) {
            error!("{}: {error:#}", base.display());
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} captures failed", bases.len());
    }
    Ok(())
}

/// Decode one capture end to end.
fn process(base: &Path) -> anyhow::Result<()> {
    let sensor = Sensor::from_ini_path(base.with_extension("ini"))?;
    info!("{sensor}");

    let data = base.with_extension("dat");
    let data = File::open(&data).with_context(|| format!("failed to open {}", data.display()))?;

    let table = base.with_extension("csv");
    let table =
        File::create(&table).with_context(|| format!("failed to create {}", table.display()))?;

    table::write_records(&sensor, sensor.records(BufReader::new(data)), table)?;

    Ok(())
}
