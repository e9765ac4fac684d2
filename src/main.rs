//! Casefile: add local files and directories to a case snapshot.
//!
//! Thin binary entry point. All logic lives in the `casefile-core` crate.
//!
//! Usage: `casefile [--config ingest.json] <case.json> <path>...`
//!
//! The case snapshot is created if it does not exist yet.

use anyhow::{bail, Context};
use casefile_core::error::IngestError;
use casefile_core::{IngestConfig, IngestEngine, MemoryCaseStore};
use std::path::PathBuf;

struct Args {
    config: Option<PathBuf>,
    case_file: PathBuf,
    paths: Vec<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut config = None;
    let mut positional = Vec::new();
    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let value = args.next().context("--config needs a file argument")?;
            config = Some(PathBuf::from(value));
        } else {
            positional.push(PathBuf::from(arg));
        }
    }
    if positional.len() < 2 {
        bail!("usage: casefile [--config ingest.json] <case.json> <path>...");
    }
    let case_file = positional.remove(0);
    Ok(Args {
        config,
        case_file,
        paths: positional,
    })
}

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => IngestConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => IngestConfig::default(),
    };

    let store = if args.case_file.exists() {
        MemoryCaseStore::load(&args.case_file)
            .with_context(|| format!("loading case {}", args.case_file.display()))?
    } else {
        tracing::info!("Creating new case {}", args.case_file.display());
        MemoryCaseStore::new()
    };

    let engine = IngestEngine::with_sink(store, casefile_core::notify::NullSink, config);
    let outcome = engine.add_local_files_dirs(&args.paths);

    let added: &[_] = match &outcome {
        Ok(added) => added.as_slice(),
        Err(IngestError::PartialCreationFailure { added, .. }) => added.as_slice(),
        Err(_) => &[],
    };
    for object in added {
        println!("{}\t{}", object.id, object.name);
    }

    // Whatever was created stays in the case, so save even after a partial failure.
    let store = engine.close().context("engine was already closed")?;
    if !outcome.as_ref().is_err_and(IngestError::nothing_added) {
        store
            .save(&args.case_file)
            .with_context(|| format!("saving case {}", args.case_file.display()))?;
    }

    outcome.context("adding local files")?;
    Ok(())
}
