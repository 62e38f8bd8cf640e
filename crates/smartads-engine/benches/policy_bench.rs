// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for show eligibility in the smartads-engine crate.

use chrono::{Duration, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use smartads_core::types::{Consent, DecisionPoint};
use smartads_core::value::EngageParams;
use smartads_engine::policy::{AgentSnapshot, PlacementMetrics};
use smartads_engine::{AdMetrics, AdService, ShowPolicy, SimulatedNetworkFactory};

const CONFIG: &str = r#"{
    "parameters": {
        "adShowSession": true,
        "adProviders": [{"adProvider": "ADMOB"}, {"adProvider": "UNITY"}],
        "adRewardedProviders": [{"adProvider": "UNITY"}],
        "adMinimumInterval": 30,
        "adMaxPerSession": 50
    }
}"#;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Pure policy evaluation with every rule in play.
fn bench_policy_evaluate(c: &mut Criterion) {
    let policy = ShowPolicy {
        min_interval_secs: 30,
        max_per_session: Some(50),
    };
    let now = Utc::now();
    let agent = AgentSnapshot {
        shown_count: 3,
        last_show_time: Some(now - Duration::minutes(5)),
        loaded: true,
    };
    let placement = PlacementMetrics {
        session_count: 1,
        daily_count: 4,
        last_shown: Some(now - Duration::minutes(5)),
    };
    let decision_point = DecisionPoint::new("levelEnd").expect("decision point");
    let params = EngageParams::default()
        .with("adShowPoint", true)
        .with("ddnaAdSessionCount", 5_i64)
        .with("ddnaAdDailyCount", 10_i64)
        .with("ddnaAdShowWaitSecs", 60_i64);

    c.bench_function("policy_evaluate", |b| {
        b.iter(|| {
            let verdict = policy.evaluate(
                black_box(&agent),
                black_box(Some(&decision_point)),
                black_box(Some(&params)),
                black_box(&placement),
                black_box(Some(now)),
            );
            black_box(verdict)
        });
    });
}

/// Eligibility through the facade, including the SQLite metrics lookup.
fn bench_service_is_allowed(c: &mut Criterion) {
    let metrics = AdMetrics::open_in_memory().expect("open in-memory metrics");
    let mut service = AdService::new(metrics, Box::new(SimulatedNetworkFactory::default()));
    service.register_for_ads(CONFIG, Consent::default());
    service.drain_events();

    let decision_point = DecisionPoint::new("levelEnd").expect("decision point");
    let params = EngageParams::from_json(r#"{"ddnaAdSessionCount":5,"ddnaAdShowWaitSecs":60}"#)
        .expect("engagement parameters");

    c.bench_function("service_is_interstitial_ad_allowed", |b| {
        b.iter(|| {
            black_box(service.is_interstitial_ad_allowed(
                black_box(Some(&decision_point)),
                black_box(Some(&params)),
                true,
            ))
        });
    });
}

criterion_group!(benches, bench_policy_evaluate, bench_service_is_allowed);
criterion_main!(benches);
