//! Prompt and pipeline golden tests.
//!
//! A curated set of template renderings with strings that must and must not
//! appear, plus end-to-end checks of the clean → validate → retry pipeline
//! against a scripted generator. No network access is needed.

use npcz_llm::prompt::{self, PromptId};
use npcz_llm::validate::{self, ContentRules};
use npcz_llm::{GenerationOutcome, Rejection, RetryPolicy, ReviewVerdict, ScriptedGenerator, parse_review};

/// A golden test case for prompt rendering.
struct GoldenCase {
    /// Human-readable name for the test case.
    name: &'static str,
    /// Which template to render.
    id: PromptId,
    /// Template variables to fill in.
    vars: Vec<(&'static str, String)>,
    /// Strings that MUST appear in the rendered prompt.
    must_contain: Vec<&'static str>,
    /// Strings that MUST NOT appear in the rendered prompt.
    must_not_contain: Vec<&'static str>,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            name: "barista_first_post",
            id: PromptId::Post,
            vars: vec![
                ("name", "Aki".into()),
                ("personality", "cheerful, curious".into()),
                ("topic", "latte art".into()),
                ("context", String::new()),
                ("max_length", "140".into()),
                ("length_hint", "One or two short sentences.".into()),
                ("preferences", String::new()),
                ("history", String::new()),
                ("feedback", String::new()),
            ],
            must_contain: vec!["You are Aki", "latte art", "140 characters"],
            must_not_contain: vec!["{topic}", "{history}", "Your recent posts"],
        },
        GoldenCase {
            name: "post_with_history_and_feedback",
            id: PromptId::Post,
            vars: vec![
                ("name", "Ben".into()),
                ("personality", "dry humour".into()),
                ("topic", "rust".into()),
                ("context", "\nRecently interested in: borrow checker".into()),
                ("max_length", "280".into()),
                ("length_hint", "Several sentences are fine.".into()),
                (
                    "preferences",
                    prompt::preferences_section(&["tea".into()], &["meetings".into()], &[]),
                ),
                ("history", prompt::history_section(&["yesterday's post".into()], 5)),
                (
                    "feedback",
                    prompt::rejection_section(&[("a post naming a celebrity".into(), "real person".into())]),
                ),
            ],
            must_contain: vec![
                "borrow checker",
                "Likes: tea",
                "Avoids: meetings",
                "yesterday's post",
                "reason: real person",
            ],
            must_not_contain: vec!["{feedback}", "{preferences}", "Values:"],
        },
        GoldenCase {
            name: "series_opening_part",
            id: PromptId::SeriesPost,
            vars: vec![
                ("name", "Chie".into()),
                ("personality", "earnest".into()),
                ("part", "1".into()),
                ("total", "3".into()),
                ("theme", "moving house".into()),
                ("previous", prompt::series_section(&[])),
                ("max_length", "200".into()),
            ],
            must_contain: vec!["part 1 of a 3-part series", "moving house", "first part"],
            must_not_contain: vec!["{part}", "{total}"],
        },
        GoldenCase {
            name: "deep_reply_wraps_up",
            id: PromptId::Reply,
            vars: vec![
                ("name", "Aki".into()),
                ("personality", "cheerful".into()),
                ("target_content", "thanks for the tip!".into()),
                ("history", prompt::conversation_section([("npc002", "try a finer grind")])),
                ("relationship", "close friends".into()),
                ("tone", "playful".into()),
                ("closing_hint", prompt::closing_hint(3).into()),
            ],
            must_contain: vec!["npc002: try a finer grind", "close friends", "wrap the conversation up"],
            must_not_contain: vec!["{closing_hint}", "(first reply)"],
        },
        GoldenCase {
            name: "first_reply",
            id: PromptId::Reply,
            vars: vec![
                ("name", "Ben".into()),
                ("personality", "calm".into()),
                ("target_content", "new espresso machine!".into()),
                ("history", prompt::conversation_section([])),
                ("relationship", "fellow member of Cafe regulars".into()),
                ("tone", "friendly".into()),
                ("closing_hint", prompt::closing_hint(1).into()),
            ],
            must_contain: vec!["(first reply)", "new espresso machine!"],
            must_not_contain: vec!["wrap the conversation", "{tone}"],
        },
        GoldenCase {
            name: "mumble_about_watched_account",
            id: PromptId::Mumble,
            vars: vec![
                ("name", "Ben".into()),
                ("personality", "shy".into()),
                ("target_name", "Famous Chef".into()),
                ("target_content", "today's soup".into()),
            ],
            must_contain: vec!["Famous Chef: today's soup", "Do not address them directly"],
            must_not_contain: vec!["{target_name}"],
        },
        GoldenCase {
            name: "review_prompt",
            id: PromptId::Review,
            vars: vec![("content", "Had a great run this morning".into())],
            must_contain: vec!["Post: Had a great run this morning", "OK or NG"],
            must_not_contain: vec!["{content}"],
        },
    ]
}

// ---------------------------------------------------------------------------
// Offline tests: template rendering
// ---------------------------------------------------------------------------

#[test]
fn golden_prompts_render_without_unresolved_vars() {
    for case in golden_cases() {
        let vars: Vec<(&str, &str)> = case.vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let rendered = case.id.render(&vars);

        for needle in &case.must_contain {
            assert!(
                rendered.contains(needle),
                "Golden case '{}': rendered prompt must contain '{}'.\nRendered:\n{}",
                case.name,
                needle,
                rendered
            );
        }
        for needle in &case.must_not_contain {
            assert!(
                !rendered.contains(needle),
                "Golden case '{}': rendered prompt must NOT contain '{}'.\nRendered:\n{}",
                case.name,
                needle,
                rendered
            );
        }
    }
}

#[test]
fn every_persona_prompt_establishes_identity() {
    for id in [PromptId::Post, PromptId::SeriesPost, PromptId::Reply, PromptId::Mumble] {
        assert!(id.template().starts_with("You are {name}"), "{id} must open with identity");
    }
}

// ---------------------------------------------------------------------------
// Pipeline: clean → validate → length → similarity, under retry
// ---------------------------------------------------------------------------

fn pipeline(raw: &str, recent: &[String]) -> Result<String, Rejection> {
    let rules = ContentRules::plain(10, 60);
    let cleaned = validate::clean(raw, &rules);
    validate::validate(&cleaned, &rules)?;
    let adjusted = validate::adjust_length(&cleaned, rules.max_length);
    if let Some(ratio) = validate::too_similar(&adjusted, recent, 5, 0.6) {
        return Err(Rejection::TooSimilar { ratio });
    }
    Ok(adjusted)
}

#[tokio::test]
async fn pipeline_skips_markup_and_repeats() {
    let recent = vec!["brewing a new espresso blend today".to_string()];
    let generator = ScriptedGenerator::new([
        "**bold claims** everywhere",
        "brewing a new espresso blend today!",
        "\"<think>hmm</think>Trying a slower pour-over this week.\"",
    ]);
    let outcome = RetryPolicy::new(3)
        .run(&generator, Some(60), |_| "prompt".into(), |raw| pipeline(raw, &recent))
        .await;
    assert_eq!(
        outcome,
        GenerationOutcome::Success {
            content: "Trying a slower pour-over this week.".into(),
            attempts: 3
        }
    );
}

#[tokio::test]
async fn pipeline_reports_similarity_when_out_of_attempts() {
    let recent = vec!["brewing a new espresso blend today".to_string()];
    let generator = ScriptedGenerator::repeating("brewing a new espresso blend today");
    let outcome = RetryPolicy::new(2)
        .run(&generator, Some(60), |_| "prompt".into(), |raw| pipeline(raw, &recent))
        .await;
    assert!(matches!(
        outcome,
        GenerationOutcome::ValidationFailed {
            rejection: Rejection::TooSimilar { .. },
            ..
        }
    ));
}

#[test]
fn review_answers() {
    assert_eq!(parse_review("OK"), ReviewVerdict::Approve);
    assert!(matches!(parse_review("NG (political party)"), ReviewVerdict::Reject(_)));
}
