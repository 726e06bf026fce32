use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use musea::algorithms::{affinity, mixer, scorer};
use musea::{InteractionEvent, InteractionKind, InterestMode, Museum};
use std::collections::{BTreeMap, HashMap};

const THEMES: &[&str] = &["Art", "History", "Science", "Local Heritage"];

fn synthetic_events(count: usize) -> Vec<InteractionEvent> {
    let kinds = [
        InteractionKind::CardClick,
        InteractionKind::DetailOpen,
        InteractionKind::Reading,
        InteractionKind::FavoriteAdded,
        InteractionKind::ThumbsUp,
    ];
    (0..count)
        .map(|i| InteractionEvent {
            id: i as i64,
            user_id: format!("user_{}", i % 50),
            museum_id: (i % 500) as i64 + 1,
            kind: kinds[i % kinds.len()],
            duration_secs: if i % kinds.len() == 2 {
                Some((i % 600) as f64)
            } else {
                None
            },
            recorded_at: Utc::now(),
        })
        .collect()
}

fn synthetic_catalog(count: usize) -> Vec<(Museum, Option<f64>)> {
    (0..count)
        .map(|i| {
            let museum = Museum::new(i as i64 + 1, format!("Museum {i}"))
                .with_theme(THEMES[i % THEMES.len()]);
            (museum, Some((i % 120) as f64))
        })
        .collect()
}

fn benchmark_scoring(c: &mut Criterion) {
    c.bench_function("interaction_points", |b| {
        b.iter(|| {
            for duration in 0..600 {
                black_box(scorer::interaction_points(
                    InteractionKind::Reading,
                    Some(duration as f64),
                ));
            }
        });
    });
}

fn benchmark_affinity_fold(c: &mut Criterion) {
    let events = synthetic_events(10_000);
    let themes: HashMap<i64, String> = (1..=500)
        .map(|id| (id, THEMES[(id as usize) % THEMES.len()].to_string()))
        .collect();

    c.bench_function("fold_events_10k", |b| {
        b.iter(|| black_box(affinity::fold_events(&events, &themes)));
    });

    c.bench_function("popularity_by_museum_10k", |b| {
        b.iter(|| black_box(affinity::popularity_by_museum(&events)));
    });
}

fn benchmark_mix(c: &mut Criterion) {
    let catalog = synthetic_catalog(500);
    let preferred = vec!["Art".to_string(), "Science".to_string()];
    let affinity_scores =
        BTreeMap::from([("Art".to_string(), 40i64), ("Science".to_string(), 12i64)]);
    let recent = affinity_scores.clone();
    let popularity: HashMap<i64, i64> = (1..=500).map(|id| (id, id % 37)).collect();

    c.bench_function("mix_500_candidates", |b| {
        b.iter(|| {
            let ctx = mixer::MixContext {
                preferred_themes: &preferred,
                interest_mode: Some(InterestMode::Balanced),
                affinity: &affinity_scores,
                recent_affinity: &recent,
                popularity: &popularity,
                engagement: 120,
                default_exploration: 0.2,
                promote_top_themes: 2,
            };
            black_box(mixer::mix(catalog.clone(), &ctx, 12))
        });
    });
}

criterion_group!(
    benches,
    benchmark_scoring,
    benchmark_affinity_fold,
    benchmark_mix
);
criterion_main!(benches);
