//! End-to-end runs of the engine over a temporary roster.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use npcz_core::interaction::create_reply_entry;
use npcz_core::queue::{PostType, ReplyTarget};
use npcz_core::{NpczConfig, Participant, PersonaId, QueueStatus};
use npcz_llm::ScriptedGenerator;
use npcz_runtime::{DryRunPublisher, Engine, ExternalPost, OutgoingPost, RuntimeError, StaticTimeline};
use tempfile::TempDir;

const POST: &str = "Trying a slower pour-over this week.";
const REPLY: &str = "Sounds lovely, enjoy it!";

/// Monday 2024-05-06 10:00 UTC.
fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_714_989_600, 0).expect("valid timestamp")
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("has parent")).expect("mkdir");
    std::fs::write(path, body).expect("write");
}

fn resident(root: &Path, id: &str, name: &str, extra: &str) {
    write(
        root,
        &format!("residents/{id}/profile.yaml"),
        &format!(
            "id: {id}\nname: {name}\npersonality: {{ type: cheerful }}\n\
             interests: {{ topics: [coffee], keywords: [espresso] }}\n\
             behavior: {{ post_frequency: 3, post_frequency_variance: 0.0, active_hours: [10] }}\n\
             traits: {{ sociability: 1.0 }}\n{extra}"
        ),
    );
}

/// A shared, adjustable clock.
#[derive(Clone)]
struct Clock(Arc<AtomicI64>);

impl Clock {
    fn new() -> Self {
        Self(Arc::new(AtomicI64::new(start().timestamp())))
    }

    fn advance(&self, by: Duration) {
        self.0.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0.load(Ordering::SeqCst), 0).expect("valid timestamp")
    }
}

struct Harness {
    _dir: TempDir,
    engine: Engine,
    generator: Arc<ScriptedGenerator>,
    publisher: Arc<DryRunPublisher>,
    clock: Clock,
}

fn harness(setup: impl FnOnce(&Path), tweak: impl FnOnce(&mut NpczConfig)) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    setup(dir.path());
    let mut config = NpczConfig::default();
    config.storage.root = dir.path().to_path_buf();
    config.content.series_start_probability = 0.0;
    tweak(&mut config);

    let generator = Arc::new(ScriptedGenerator::default());
    let publisher = Arc::new(DryRunPublisher::new());
    let clock = Clock::new();
    let tick_clock = clock.clone();
    let engine = Engine::open(config, generator.clone(), publisher.clone())
        .expect("engine opens")
        .with_reviewer(Arc::new(ScriptedGenerator::repeating("OK")))
        .with_seed(7)
        .with_clock(move || tick_clock.now());
    Harness {
        _dir: dir,
        engine,
        generator,
        publisher,
        clock,
    }
}

/// Two cafe regulars; only npc001 posts.
fn cafe(root: &Path, reply_probability: f64) {
    resident(root, "npc001", "Aki", "");
    resident(root, "npc002", "Ben", "posts: false\n");
    write(
        root,
        "relationships/groups.yaml",
        &format!(
            "groups:\n  - id: cafe\n    name: Cafe regulars\n    members: [npc001, npc002]\n    \
             interaction: {{ reply_probability: {reply_probability} }}\n"
        ),
    );
}

/// Generate, approve and publish one post by npc001. Returns the remote id.
async fn publish_one(h: &mut Harness) -> String {
    h.generator.push(POST);
    let entry = h.engine.generate_for(PersonaId(1)).await.expect("generated");
    h.engine.review(&entry.id, "approve", None).expect("approved");
    assert_eq!(h.engine.publish_approved().await.expect("published"), 1);
    h.engine
        .queue()
        .get_by_id(&entry.id)
        .and_then(|e| e.remote_id)
        .expect("remote id recorded")
}

// ---------------------------------------------------------------------------
// Generation, review, publish
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generated_post_waits_for_review() {
    let mut h = harness(|root| cafe(root, 0.0), |_| {});
    h.generator.push(format!("\"{POST}\""));

    let entry = h.engine.generate_for(PersonaId(1)).await.expect("generated");
    assert_eq!(entry.status, QueueStatus::Pending);
    assert_eq!(entry.content, POST);
    assert_eq!(entry.author_name, "Aki");
    assert_eq!(h.engine.queue().count(QueueStatus::Pending), 1);

    let prompt = &h.generator.prompts()[0];
    assert!(prompt.starts_with("You are Aki."));

    let profile = h.engine.roster().get(PersonaId(1)).expect("loaded").clone();
    let memory = h.engine.store().load_memory(&profile);
    assert_eq!(memory.recent_posts, vec![POST.to_string()]);
    let state = h.engine.store().load_state(PersonaId(1));
    assert_eq!(state.next_post_time, start().timestamp() + 28_800);
}

#[tokio::test]
async fn dry_run_entries_never_reach_review() {
    let mut h = harness(|root| cafe(root, 0.0), |c| c.general.dry_run = true);
    h.generator.push(POST);
    let entry = h.engine.generate_for(PersonaId(1)).await.expect("generated");
    assert_eq!(entry.status, QueueStatus::DryRun);
    assert_eq!(h.engine.queue().count(QueueStatus::Pending), 0);
    assert!(h.engine.review(&entry.id, "approve", None).is_err());
}

#[tokio::test]
async fn failed_generation_reports_attempts() {
    let mut h = harness(|root| cafe(root, 0.0), |c| c.content.retry_count = 2);
    h.generator.push("## too short");
    h.generator.push_failure("connection refused");

    match h.engine.generate_for(PersonaId(1)).await {
        Err(RuntimeError::Generation { persona, attempts, .. }) => {
            assert_eq!(persona, PersonaId(1));
            assert_eq!(attempts, 2);
        }
        other => panic!("expected generation failure, got {other:?}"),
    }
    assert_eq!(h.engine.queue().count(QueueStatus::Pending), 0);
}

#[tokio::test]
async fn unknown_resident_is_an_error() {
    let mut h = harness(|root| cafe(root, 0.0), |_| {});
    assert!(matches!(
        h.engine.generate_for(PersonaId(42)).await,
        Err(RuntimeError::Core(_))
    ));
}

#[test]
fn out_of_range_utc_offset_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = NpczConfig::default();
    config.storage.root = dir.path().to_path_buf();
    config.general.utc_offset_hours = 1_000_000;
    let result = Engine::open(
        config,
        Arc::new(ScriptedGenerator::default()),
        Arc::new(DryRunPublisher::new()),
    );
    assert!(matches!(result, Err(RuntimeError::Core(npcz_core::NpczError::Config(_)))));
}

#[tokio::test]
async fn publish_updates_state_and_wire_shape() {
    let mut h = harness(|root| cafe(root, 0.0), |_| {});
    let remote = publish_one(&mut h).await;
    assert_eq!(remote, "dryrun-00000001");

    let state = h.engine.store().load_state(PersonaId(1));
    assert_eq!(state.total_posts, 1);
    assert_eq!(state.last_remote_id.as_deref(), Some(remote.as_str()));
    assert_eq!(
        h.publisher.published(),
        vec![OutgoingPost::Standalone {
            author: PersonaId(1),
            content: POST.into(),
            quote: None,
        }]
    );
    assert_eq!(h.engine.publish_approved().await.expect("nothing left"), 0);
}

#[tokio::test]
async fn review_rejects_unknown_decisions() {
    let mut h = harness(|root| cafe(root, 0.0), |_| {});
    h.generator.push(POST);
    let entry = h.engine.generate_for(PersonaId(1)).await.expect("generated");
    assert!(matches!(
        h.engine.review(&entry.id, "maybe", None),
        Err(RuntimeError::UnknownDecision(_))
    ));
    let rejected = h
        .engine
        .review(&entry.id, "reject", Some("off topic".into()))
        .expect("rejected");
    assert_eq!(rejected.status, QueueStatus::Rejected);
    assert_eq!(rejected.review_note.as_deref(), Some("off topic"));
}

#[tokio::test]
async fn rejection_feedback_reaches_the_next_prompt() {
    let mut h = harness(|root| cafe(root, 0.0), |_| {});
    h.generator.push(POST);
    let entry = h.engine.generate_for(PersonaId(1)).await.expect("generated");
    h.engine
        .review(&entry.id, "reject", Some("names a celebrity".into()))
        .expect("rejected");

    h.generator.push("Dialled in a new grinder setting today.");
    h.engine.generate_for(PersonaId(1)).await.expect("generated");
    let prompt = h.generator.prompts().last().cloned().expect("prompted");
    assert!(prompt.contains("names a celebrity"));
}

#[tokio::test]
async fn approved_backlog_suspends_generation() {
    let mut h = harness(|root| cafe(root, 0.0), |c| c.queue.approved_backlog_cap = 0);
    h.generator.push(POST);
    let entry = h.engine.generate_for(PersonaId(1)).await.expect("generated");
    h.engine.review(&entry.id, "approve", None).expect("approved");
    assert!(matches!(
        h.engine.generate_for(PersonaId(1)).await,
        Err(RuntimeError::BacklogFull { count: 1, cap: 0 })
    ));
}

// ---------------------------------------------------------------------------
// Ticks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn residents_reply_to_fresh_posts_once() {
    let mut h = harness(|root| cafe(root, 1.0), |_| {});
    let remote = publish_one(&mut h).await;
    let seeded = h.engine.store().load_affinity(PersonaId(1)).affinity(PersonaId(2));

    h.generator.push(REPLY);
    let summary = h.engine.tick(3).await.expect("tick");
    assert_eq!(summary.generated, 0);
    assert_eq!(summary.interactions, 1);
    assert_eq!(summary.reviewed, 1);

    let approved = h.engine.queue().all(QueueStatus::Approved);
    assert_eq!(approved.len(), 1);
    let reply = &approved[0];
    assert_eq!(reply.author, PersonaId(2));
    assert_eq!(reply.post_type(), PostType::Reply);
    assert_eq!(reply.content, REPLY);
    assert_eq!(reply.responded_remote_id(), Some(remote.as_str()));
    assert_eq!(reply.conversation().map(|c| c.depth), Some(1));

    let warmed = h.engine.store().load_affinity(PersonaId(1)).affinity(PersonaId(2));
    assert!(warmed > seeded, "{warmed} > {seeded}");
    assert!(h.engine.store().load_state(PersonaId(1)).mood > 0.0);

    let again = h.engine.tick(3).await.expect("tick");
    assert_eq!(again.interactions, 0);
}

#[tokio::test]
async fn unanswered_post_is_settled_once() {
    let mut h = harness(|root| cafe(root, 0.0), |_| {});
    publish_one(&mut h).await;
    let seeded = h.engine.store().load_affinity(PersonaId(1)).affinity(PersonaId(2));

    let early = h.engine.tick(3).await.expect("tick");
    assert_eq!(early.ignored, 0);

    h.clock.advance(Duration::hours(25));
    let late = h.engine.tick(3).await.expect("tick");
    assert_eq!(late.ignored, 1);
    let cooled = h.engine.store().load_affinity(PersonaId(1)).affinity(PersonaId(2));
    assert!(cooled < seeded);
    assert!(h.engine.queue().all(QueueStatus::Posted).iter().all(|e| e.settled));

    let later = h.engine.tick(3).await.expect("tick");
    assert_eq!(later.ignored, 0);
}

#[tokio::test]
async fn closing_message_ends_the_thread() {
    let mut h = harness(|root| cafe(root, 0.0), |_| {});
    let remote = publish_one(&mut h).await;

    let mut reply = create_reply_entry(
        PersonaId(2),
        "Ben",
        "Thanks, see you at the cafe!",
        ReplyTarget {
            target: Participant::Resident(PersonaId(1)),
            remote_id: remote,
            content: POST.into(),
            pubkey: None,
        },
        None,
        h.clock.now(),
    );
    reply.status = QueueStatus::Posted;
    reply.posted_at = Some(h.clock.now());
    reply.remote_id = Some("r-ben".into());
    h.engine.queue().add(reply).expect("added");

    let summary = h.engine.tick(3).await.expect("tick");
    assert_eq!(summary.interactions, 0);
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn watcher_supports_followed_account() {
    let mut h = harness(
        |root| {
            cafe(root, 0.0);
            write(
                root,
                "relationships/watchers.yaml",
                "watchers:\n  - resident: npc002\n    target: { pubkey: chef, display_name: Famous Chef }\n    \
                 behavior:\n      reaction_probability: 1.0\n      reactions: [{ type: support, probability: 1.0 }]\n",
            );
        },
        |_| {},
    );
    let timeline = StaticTimeline::new(vec![ExternalPost {
        remote_id: "ev1".into(),
        pubkey: "chef".into(),
        display_name: "Chef".into(),
        content: "New menu launched tonight".into(),
    }]);
    let mut engine = h.engine.with_timeline(Arc::new(timeline));

    let summary = engine.tick(3).await.expect("tick");
    assert_eq!(summary.external, 1);
    let approved = engine.queue().all(QueueStatus::Approved);
    assert_eq!(approved.len(), 1);
    let reaction = &approved[0];
    assert_eq!(reaction.author, PersonaId(2));
    assert_eq!(reaction.post_type(), PostType::Reaction);
    assert_eq!(
        reaction.reply_target().map(|t| t.target.clone()),
        Some(Participant::External { pubkey: "chef".into() })
    );

    assert_eq!(engine.tick(3).await.expect("tick").external, 0);
    assert_eq!(engine.publish_approved().await.expect("published"), 1);
    assert!(matches!(
        h.publisher.published().last(),
        Some(OutgoingPost::Reaction { target, target_pubkey: Some(pk), .. }) if target == "ev1" && pk == "chef"
    ));
}

#[tokio::test]
async fn tick_walks_the_roster_in_slices() {
    let mut h = harness(
        |root| {
            for (id, name) in [("npc001", "Aki"), ("npc002", "Ben"), ("npc003", "Cai")] {
                resident(root, id, name, "posts: false\n");
            }
        },
        |_| {},
    );
    for _ in 0..3 {
        h.engine.tick(2).await.expect("tick");
    }
    let cursor = h.engine.store().load_tick_state();
    assert_eq!(cursor.total_ticks, 3);
    assert_eq!(cursor.next_index, 0);
}
