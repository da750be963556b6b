//! NPCZ per-tick decision paths.
//!
//! Everything here runs once per resident per tick, so a roster of a few
//! hundred residents multiplies each figure by that much:
//!   activation_probability_single .... < 2μs
//!   should_react_to_post_single ...... < 2μs
//!   affinity_decay_pass_50 ........... < 100μs
//!   tick_decisions_100_residents ..... < 1ms

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

use npcz_core::config::{AffinitySettings, SchedulerSettings};
use npcz_core::relationship::decay_distant;
use npcz_core::scheduler::activation_probability;
use npcz_core::{AffinityRecord, InteractionManager, PersonaId, PersonaProfile, PersonaState, RelationshipGraph};

const GRAPH: &str = r"
groups:
  - id: cafe
    name: Cafe regulars
    members: [npc001, npc002, npc003, npc004]
    interaction: { reply_probability: 0.25 }
pairs:
  - id: p1
    type: close_friends
    members: [npc001, npc002]
    interaction: { reply_probability: 0.6, tone: playful }
  - id: p2
    type: rivals
    members: [npc003, npc004]
";

fn graph() -> RelationshipGraph {
    serde_yaml::from_str(GRAPH).expect("valid graph")
}

fn profile(n: u32) -> PersonaProfile {
    PersonaProfile::from_yaml(&format!(
        "id: npc{n:03}\nname: Resident {n}\nbehavior: {{ post_frequency: 3, active_hours: [8, 9, 12, 19, 20, 21] }}\n"
    ))
    .expect("valid profile")
}

fn morning() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("utc offset")
        .with_ymd_and_hms(2024, 5, 6, 9, 15, 0)
        .single()
        .expect("valid time")
}

fn now_utc() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 9, 15, 0).single().expect("valid time")
}

/// Benchmark: one activation draw for a resident inside its active hours.
fn bench_activation(c: &mut Criterion) {
    let p = profile(1);
    let state = PersonaState::new(p.id);
    let settings = SchedulerSettings::default();
    let at = morning();
    c.bench_function("activation_probability_single", |b| {
        b.iter(|| black_box(activation_probability(black_box(&p), &state, at, &settings)));
    });
}

/// Benchmark: one reply/reaction decision between close friends.
fn bench_should_react(c: &mut Criterion) {
    let graph = graph();
    let manager = InteractionManager::new(&graph);
    let mut rng = StdRng::seed_from_u64(42);
    c.bench_function("should_react_to_post_single", |b| {
        b.iter(|| {
            black_box(manager.should_react_to_post(
                PersonaId::new(2),
                PersonaId::new(1),
                black_box("Morning walk by the river, the herons are back"),
                0.5,
                0.6,
                &mut rng,
            ))
        });
    });
}

/// Benchmark: decay pass over one record with 50 idle partners.
fn bench_decay_pass(c: &mut Criterion) {
    let graph = graph();
    let settings = AffinitySettings::default();
    let now = now_utc();
    let mut seeded = AffinityRecord::new(PersonaId::new(1));
    for n in 2..52 {
        let other = PersonaId::new(n);
        seeded.set_affinity(other, 0.4);
        seeded.record_interaction(other, now - Duration::days(30));
    }
    c.bench_function("affinity_decay_pass_50", |b| {
        b.iter(|| {
            let mut record = seeded.clone();
            black_box(decay_distant(&mut record, &graph, &settings, now));
        });
    });
}

/// Benchmark: the deterministic decisions of one tick over 100 residents.
fn bench_tick_decisions(c: &mut Criterion) {
    let graph = graph();
    let manager = InteractionManager::new(&graph);
    let scheduler = SchedulerSettings::default();
    let residents: Vec<(PersonaProfile, PersonaState)> = (1..=100)
        .map(|n| {
            let p = profile(n);
            let s = PersonaState::new(p.id);
            (p, s)
        })
        .collect();
    let at = morning();
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("tick_decisions_100_residents", |b| {
        b.iter(|| {
            let mut reacting = 0usize;
            for (p, s) in &residents {
                let activation = activation_probability(p, s, at, &scheduler);
                black_box(activation);
                for (other, _) in residents.iter().take(4) {
                    if manager
                        .should_react_to_post(p.id, other.id, "new bread recipe", 0.3, p.traits.sociability, &mut rng)
                        .is_some()
                    {
                        reacting += 1;
                    }
                }
            }
            black_box(reacting);
        });
    });
}

criterion_group!(
    benches,
    bench_activation,
    bench_should_react,
    bench_decay_pass,
    bench_tick_decisions,
);
criterion_main!(benches);
