//! Integration tests: end-to-end flows over an on-disk roster.
//!
//! These exercise the core the way a tick does: load from the store, decide,
//! mutate, persist, reload.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use npcz_core::config::NpczConfig;
use npcz_core::interaction::{self, InteractionManager};
use npcz_core::memory::{MemorySource, SeriesProgress};
use npcz_core::persistence::Store;
use npcz_core::persona::PersonaProfile;
use npcz_core::queue::{PostPayload, QueueEntry, QueueStatus, ReplyTarget};
use npcz_core::relationship::{self, RelationshipGraph};
use npcz_core::scheduler;
use npcz_core::types::{InteractionKind, Participant, PersonaId};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).single().expect("valid time")
}

fn local(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    now.with_timezone(&FixedOffset::east_opt(0).expect("valid offset"))
}

fn profile_yaml(id: u32, name: &str) -> String {
    format!(
        r"
id: npc{id:03}
name: {name}
personality:
  type: cheerful
interests:
  topics: [rust, coffee]
behavior:
  post_frequency: 3
  post_frequency_variance: 0.0
  active_hours: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23]
  hourly_weight: {{ 9: 1.0 }}
background:
  occupation: barista
traits:
  sociability: 1.0
"
    )
}

const GRAPH_YAML: &str = r"
groups:
  - id: cafe
    name: Cafe regulars
    members: [npc001, npc002, npc003]
    interaction: { reply_probability: 0.25 }
pairs:
  - id: p1
    type: close_friends
    members: [npc001, npc002]
    interaction: { reply_probability: 0.6 }
  - id: p2
    type: awkward
    members: [npc001, npc003]
";

fn roster() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path()).expect("open store");
    for (id, name) in [(1, "Aki"), (2, "Ben"), (3, "Chie")] {
        let profile = PersonaProfile::from_yaml(&profile_yaml(id, name)).expect("valid profile");
        store.save_profile(&profile).expect("save profile");
    }
    let graph: RelationshipGraph = serde_yaml::from_str(GRAPH_YAML).expect("valid graph");
    store.save_graph(&graph).expect("save graph");
    (dir, store)
}

// ---------------------------------------------------------------------------
// Roster lifecycle
// ---------------------------------------------------------------------------

#[test]
fn roster_round_trips_through_store() {
    let (_dir, store) = roster();
    let ids = store.list_residents().expect("list");
    assert_eq!(ids, vec![PersonaId(1), PersonaId(2), PersonaId(3)]);

    let profile = store.load_profile(PersonaId(2)).expect("load");
    assert_eq!(profile.name, "Ben");

    let memory = store.load_memory(&profile);
    assert_eq!(memory.long_term.core.occupation, "barista");

    let graph = store.load_graph().expect("graph");
    assert!(graph.should_avoid(PersonaId(1), PersonaId(3)));
}

#[test]
fn corrupt_state_loads_as_default() {
    let (dir, store) = roster();
    let path = dir.path().join("residents/npc001/state.json");
    std::fs::write(&path, "{not json").expect("write garbage");
    let state = store.load_state(PersonaId(1));
    assert_eq!(state.total_posts, 0);
    assert!((state.energy - 0.5).abs() < f64::EPSILON);
}

// ---------------------------------------------------------------------------
// Posting cycle: schedule → generate → queue → publish → feedback
// ---------------------------------------------------------------------------

#[test]
fn posting_cycle_updates_state_memory_and_affinity() {
    let (_dir, store) = roster();
    let config = NpczConfig::default();
    let mut rng = StdRng::seed_from_u64(7);
    let author = store.load_profile(PersonaId(1)).expect("load");
    let mut state = store.load_state(author.id);
    let mut memory = store.load_memory(&author);

    // Fresh persona at a fully weighted hour with full energy always posts.
    state.energy = 1.0;
    assert!(scheduler::should_post_now(
        &author,
        &state,
        local(now()),
        &config.scheduler,
        &mut rng
    ));

    let text = "brewing a new espresso blend today";
    memory.record_generated_post(text, now(), &config.memory);
    let entry = QueueEntry::new(author.id, &author.name, text, PostPayload::Normal, now());
    let id = entry.id.clone();
    let queue = store.queue();
    queue.add(entry).expect("enqueue");
    queue.approve(&id, None, now()).expect("approve");
    let posted = queue.mark_posted(&id, Some("ev-1".into()), now()).expect("post");

    let next = scheduler::calculate_next_post_time(&author, now().timestamp(), &mut rng);
    assert_eq!(next - now().timestamp(), 28_800);
    state.record_post(text, posted.remote_id.clone(), now(), next, config.content.max_history_size);
    store.save_state(&state).expect("save state");

    // Ben reacts.
    let graph = store.load_graph().expect("graph");
    let manager = InteractionManager::new(&graph);
    let mut author_aff = store.load_affinity(author.id);
    let mut ben_aff = store.load_affinity(PersonaId(2));
    let kind = manager
        .should_react_to_post(PersonaId(2), author.id, text, 0.9, 1.0, &mut rng)
        .expect("close friends engage");
    let sensitivity = author.traits.sociability;
    relationship::apply_interaction(&mut author_aff, &mut ben_aff, kind, &config.affinity, now());
    memory.reinforce_from_feedback(text, kind, sensitivity, &config.memory);
    state.apply_feedback(kind, &config.affinity);
    store.save_affinity(&author_aff).expect("save");
    store.save_memory(&memory).expect("save");
    store.save_state(&state).expect("save");

    let reloaded = store.load_state(author.id);
    assert_eq!(reloaded.total_posts, 1);
    assert_eq!(reloaded.next_post_time, next);
    assert!(reloaded.mood > 0.0);

    let aff = store.load_affinity(author.id);
    assert!(aff.affinity(PersonaId(2)) > 0.0);
    assert!(aff.familiarity(PersonaId(2)) > 0.0);

    let mem = store.load_memory(&author);
    assert_eq!(mem.recent_posts, vec![text.to_string()]);
    let strength = mem.short_term.entries()[0].strength;
    assert!((strength - 1.0).abs() < f64::EPSILON, "reinforcement saturates at 1");
}

#[test]
fn duplicate_responses_are_blocked_across_runs() {
    let (_dir, store) = roster();
    let queue = store.queue();
    let target = ReplyTarget {
        target: Participant::Resident(PersonaId(1)),
        remote_id: "ev-9".into(),
        content: "hello".into(),
        pubkey: None,
    };
    let reply = interaction::create_reply_entry(PersonaId(2), "Ben", "hi!", target, None, now());
    queue.add(reply).expect("enqueue");

    let index = queue.build_index();
    assert!(index.already_responded(PersonaId(2), "ev-9"));
    assert!(!index.already_responded(PersonaId(3), "ev-9"));
    assert!(index.has_any_response("ev-9"));
}

#[test]
fn ignored_post_penalizes_partners_once() {
    let (_dir, store) = roster();
    let config = NpczConfig::default();
    let graph = store.load_graph().expect("graph");
    let queue = store.queue();

    let entry = QueueEntry::new(PersonaId(1), "Aki", "anyone there?", PostPayload::Normal, now());
    let id = entry.id.clone();
    queue.add(entry).expect("enqueue");
    queue.approve(&id, None, now()).expect("approve");
    queue.mark_posted(&id, Some("ev-2".into()), now()).expect("post");

    let index = queue.build_index();
    let mut record = store.load_affinity(PersonaId(1));
    for posted in queue.all(QueueStatus::Posted) {
        if posted.settled || posted.remote_id.as_deref().is_some_and(|r| index.has_any_response(r)) {
            continue;
        }
        assert_eq!(relationship::penalize_ignored(&mut record, &graph, &config.affinity), 2);
        queue
            .update_in_place(QueueStatus::Posted, &posted.id, |e| e.settled = true)
            .expect("settle");
    }
    assert!(record.affinity(PersonaId(2)) < 0.0);
    assert!(queue.all(QueueStatus::Posted).iter().all(|e| e.settled));
}

// ---------------------------------------------------------------------------
// Memory evolution
// ---------------------------------------------------------------------------

#[test]
fn series_completion_becomes_long_term_memory() {
    let (_dir, store) = roster();
    let config = NpczConfig::default();
    let profile = store.load_profile(PersonaId(3)).expect("load");
    let mut memory = store.load_memory(&profile);
    assert!(memory.start_series("latte art", 2));
    assert!(matches!(
        memory.record_generated_post("part one", now(), &config.memory),
        SeriesProgress::Advanced { index: 1, total: 2 }
    ));
    assert!(matches!(
        memory.record_generated_post("part two", now(), &config.memory),
        SeriesProgress::Completed { .. }
    ));
    store.save_memory(&memory).expect("save");
    let reloaded = store.load_memory(&profile);
    assert_eq!(reloaded.long_term.tagged("latte art").count(), 1);
    assert!(!reloaded.series.active);
}

#[test]
fn strong_feedback_promotes_to_long_term() {
    let config = NpczConfig::default();
    let profile = PersonaProfile::from_yaml(&profile_yaml(1, "Aki")).expect("valid");
    let mut memory = npcz_core::PersonaMemory::seeded(&profile);
    memory.add_short_term("espresso extraction", MemorySource::OwnPost, now(), &config.memory);
    memory.decay_short_term(0.2);
    assert!(memory.reinforce_from_feedback(
        "espresso extraction tips",
        InteractionKind::Reply,
        1.0,
        &config.memory
    ));
    let promoted = memory.check_and_promote(config.memory.promotion_threshold, now(), &config.memory);
    assert_eq!(promoted, vec!["espresso extraction".to_string()]);
    assert!(memory.short_term.is_empty());
}

// ---------------------------------------------------------------------------
// Tick cursor
// ---------------------------------------------------------------------------

#[test]
fn tick_cursor_persists_between_runs() {
    let (_dir, store) = roster();
    let ids = store.list_residents().expect("list");
    let mut cursor = store.load_tick_state();
    assert_eq!(cursor.advance(2, ids.len(), now()), 0..2);
    store.save_tick_state(&cursor).expect("save");

    let mut cursor = store.load_tick_state();
    assert_eq!(cursor.advance(2, ids.len(), now()), 2..3);
    assert_eq!(cursor.next_index, 0);
    assert_eq!(cursor.total_ticks, 2);
}
