use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use matchday_features::model_cache::{LoadedModel, MarketBaseline, ModelCache};
use matchday_features::{
    FeatureConfig, FeatureSchemaContract, InferenceFeatureBuilder, InferenceRequest,
};

// Scores one request with the market baseline; any classifier trained on the
// same schema slots in through `ModelCache`.
fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let [schema_path, request_path] = args.as_slice() else {
        return Err(anyhow!("usage: predict_match <schema.json> <request.json>"));
    };
    let schema_path = PathBuf::from(schema_path);
    let request_path = PathBuf::from(request_path);

    let raw = fs::read_to_string(&request_path)
        .with_context(|| format!("read request {}", request_path.display()))?;
    let request: InferenceRequest = serde_json::from_str(&raw).context("invalid request json")?;

    let cfg = FeatureConfig::from_env().context("invalid feature config")?;
    let builder = InferenceFeatureBuilder::new(cfg)?;
    let features = builder.build(&request).context("request rejected")?;

    let cache = ModelCache::new();
    let model = cache.get_or_load("market", || -> Result<_> {
        let raw = fs::read_to_string(&schema_path)
            .with_context(|| format!("read schema {}", schema_path.display()))?;
        let schema = FeatureSchemaContract::from_json(&raw)?;
        let baseline = MarketBaseline::for_schema(&schema)?;
        Ok(LoadedModel::new("market", baseline, schema))
    })?;

    let aligned = model.schema().align(&features);
    let prob = model.predict(&features)?;

    println!("{} vs {}", request.home_team.trim(), request.away_team.trim());
    for (name, value) in aligned.iter() {
        println!("  {name:<24} {value:>10.4}");
    }
    println!("Home: {:.1}%", prob.home * 100.0);
    println!("Draw: {:.1}%", prob.draw * 100.0);
    println!("Away: {:.1}%", prob.away * 100.0);
    println!("Pick: {}", prob.argmax());

    Ok(())
}
