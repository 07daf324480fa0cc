use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use matchday_features::model_cache::{LoadedModel, MarketBaseline, ModelCache};
use matchday_features::{
    FeatureConfig, FeatureError, FeatureSchemaContract, InferenceFeatureBuilder, InferenceRequest,
    MatchBatch, MatchFeatureAssembler, Outcome,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn load_market(cache: &ModelCache<MarketBaseline>) -> Arc<LoadedModel<MarketBaseline>> {
    cache
        .get_or_load("market", || {
            let schema = FeatureSchemaContract::from_json(&read_fixture("schema.json"))?;
            let model = MarketBaseline::for_schema(&schema)?;
            Ok::<_, FeatureError>(LoadedModel::new("market", model, schema))
        })
        .expect("schema fixture should load")
}

#[test]
fn request_fixture_scores_against_schema_fixture() {
    let raw = read_fixture("request.json");
    let request: InferenceRequest = serde_json::from_str(&raw).expect("fixture should parse");
    let features = InferenceFeatureBuilder::new(FeatureConfig::default())
        .unwrap()
        .build(&request)
        .unwrap();

    let cache = ModelCache::new();
    let model = load_market(&cache);
    let aligned = model.schema().align(&features);
    assert_eq!(aligned.len(), 9);
    assert_eq!(aligned.get("home_form"), Some(0.0));
    assert_eq!(aligned.get("away_form"), Some(1.33));
    assert_eq!(aligned.get("h2h_total_matches"), Some(0.0));
    assert_eq!(aligned.get("fav_flag"), Some(-1.0));
    assert_eq!(model.schema().align(&aligned), aligned);

    let prob = model.predict(&features).unwrap();
    assert!((prob.home + prob.draw + prob.away - 1.0).abs() < 1e-9);
    assert_eq!(prob.argmax(), Outcome::Away);

    let again = load_market(&cache);
    assert!(Arc::ptr_eq(&model, &again));
}

#[test]
fn training_schema_survives_json_round_trip() {
    let batch: MatchBatch = serde_json::from_str(&read_fixture("season.json")).unwrap();
    let table = MatchFeatureAssembler::new(FeatureConfig::default())
        .unwrap()
        .assemble_batch(&batch)
        .unwrap();
    let schema = FeatureSchemaContract::from_table(&table);
    let restored = FeatureSchemaContract::from_json(&schema.to_json().unwrap()).unwrap();
    assert_eq!(restored, schema);

    let aligned = restored.align_table(&table);
    assert_eq!(aligned, table);
    assert_eq!(restored.align_table(&aligned), aligned);
}

#[test]
fn narrower_schema_drops_training_columns() {
    let batch: MatchBatch = serde_json::from_str(&read_fixture("season.json")).unwrap();
    let table = MatchFeatureAssembler::new(FeatureConfig::default())
        .unwrap()
        .assemble_batch(&batch)
        .unwrap();
    let schema = FeatureSchemaContract::from_json(&read_fixture("schema.json")).unwrap();
    let aligned = schema.align_table(&table);
    assert_eq!(aligned.columns(), schema.columns());
    assert_eq!(aligned.labels(), table.labels());
    assert_eq!(aligned.column("odds_ratio"), table.column("odds_ratio"));
    assert!(aligned.column("total_goals").is_none());
}
