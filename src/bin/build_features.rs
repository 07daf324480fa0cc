use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use matchday_features::{FeatureConfig, FeatureSchemaContract, MatchBatch, MatchFeatureAssembler};

#[derive(Serialize)]
struct Output<'a> {
    columns: &'a [String],
    match_ids: &'a [String],
    labels: &'a [Option<u8>],
    rows: &'a [Vec<f64>],
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let input = parse_path_arg("--input")
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/season.json"));
    let out = parse_path_arg("--out");
    let schema_out = parse_path_arg("--schema-out");

    let raw = fs::read_to_string(&input)
        .with_context(|| format!("read match batch {}", input.display()))?;
    let batch: MatchBatch = serde_json::from_str(&raw).context("invalid match batch json")?;

    let cfg = FeatureConfig::from_env().context("invalid feature config")?;
    let assembler = MatchFeatureAssembler::new(cfg)?;
    let table = assembler
        .assemble_batch(&batch)
        .context("feature assembly failed")?;

    let json = serde_json::to_string_pretty(&Output {
        columns: table.columns(),
        match_ids: table.match_ids(),
        labels: table.labels(),
        rows: table.rows(),
    })
    .context("serialize feature table")?;
    match out {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
            eprintln!("Wrote {} rows to {}", table.len(), path.display());
        }
        None => println!("{json}"),
    }

    if let Some(path) = schema_out {
        let schema = FeatureSchemaContract::from_table(&table);
        fs::write(&path, schema.to_json()?)
            .with_context(|| format!("write schema {}", path.display()))?;
        eprintln!("Wrote {} schema columns to {}", schema.columns().len(), path.display());
    }

    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
