use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use matchday_features::{
    FeatureConfig, FeatureSchemaContract, InferenceFeatureBuilder, InferenceRequest, MatchBatch,
    MatchFeatureAssembler, MatchRecord, OddsRecord, assemble_shards,
};

const TEAMS: [&str; 20] = [
    "ARS", "AVL", "BOU", "BRE", "BHA", "CHE", "CRY", "EVE", "FUL", "IPS", "LEI", "LIV", "MCI",
    "MUN", "NEW", "NFO", "SOU", "TOT", "WHU", "WOL",
];

// Double round robin, deterministic scores and prices.
fn season(offset: u32) -> MatchBatch {
    let start = Utc.with_ymd_and_hms(2024, 8, 17, 15, 0, 0).unwrap();
    let mut matches = Vec::new();
    let mut odds = Vec::new();
    let mut n = 0u32;
    for (i, home) in TEAMS.iter().enumerate() {
        for (j, away) in TEAMS.iter().enumerate() {
            if i == j {
                continue;
            }
            let id = format!("s{offset}-{n:04}");
            let seed = n.wrapping_mul(2654435761).wrapping_add(offset);
            matches.push(MatchRecord {
                id: id.clone(),
                date: start + Duration::hours(i64::from(n) * 9),
                home: home.to_string(),
                away: away.to_string(),
                home_goals: Some(seed % 4),
                away_goals: Some((seed / 7) % 3),
                result: None,
            });
            for provider in ["pinnacle", "bet365"] {
                odds.push(OddsRecord {
                    match_id: id.clone(),
                    h: 1.5 + f64::from(seed % 40) / 10.0,
                    d: 3.0 + f64::from(seed % 9) / 10.0,
                    a: 1.6 + f64::from((seed / 3) % 50) / 10.0,
                    provider: provider.to_string(),
                });
            }
            n += 1;
        }
    }
    MatchBatch { matches, odds }
}

fn bench_assemble_season(c: &mut Criterion) {
    let batch = season(0);
    let assembler = MatchFeatureAssembler::new(FeatureConfig::default()).unwrap();
    c.bench_function("assemble_season", |b| {
        b.iter(|| {
            let table = assembler.assemble_batch(black_box(&batch)).unwrap();
            black_box(table.len());
        })
    });
}

fn bench_assemble_shards(c: &mut Criterion) {
    let shards: Vec<MatchBatch> = (0..8).map(season).collect();
    let cfg = FeatureConfig::default();
    c.bench_function("assemble_shards_8", |b| {
        b.iter(|| {
            let tables = assemble_shards(black_box(&shards), &cfg).unwrap();
            black_box(tables.len());
        })
    });
}

fn bench_inference_build(c: &mut Criterion) {
    let cfg = FeatureConfig::default();
    let table = MatchFeatureAssembler::new(cfg.clone())
        .unwrap()
        .assemble_batch(&season(0))
        .unwrap();
    let schema = FeatureSchemaContract::from_table(&table);
    let builder = InferenceFeatureBuilder::new(cfg).unwrap();
    let request = InferenceRequest {
        home_team: "Liverpool".to_string(),
        away_team: "Manchester City".to_string(),
        home_odds: 2.6,
        draw_odds: 3.5,
        away_odds: 2.7,
        team_stats: None,
    };
    c.bench_function("inference_build_align", |b| {
        b.iter(|| {
            let row = builder.build(black_box(&request)).unwrap();
            black_box(schema.to_values(&row));
        })
    });
}

criterion_group!(
    benches,
    bench_assemble_season,
    bench_assemble_shards,
    bench_inference_build
);
criterion_main!(benches);
