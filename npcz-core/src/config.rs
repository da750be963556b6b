//! Configuration for the NPCZ engine.
//!
//! Maps directly to `npcz.toml`. Every tuning constant the engine uses has a
//! named default here and can be overridden per deployment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NpczError, Result};

/// Top-level NPCZ configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NpczConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Where the roster and queue live on disk.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Content generation behaviour.
    #[serde(default)]
    pub content: ContentSettings,
    /// Per-persona memory limits and rates.
    #[serde(default)]
    pub memory: MemorySettings,
    /// Affinity and mood deltas.
    #[serde(default)]
    pub affinity: AffinitySettings,
    /// Activation probability tuning.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Queue pipeline limits.
    #[serde(default)]
    pub queue: QueueSettings,
    /// Tick pacing.
    #[serde(default)]
    pub tick: TickSettings,
    /// Content generator endpoint.
    #[serde(default)]
    pub llm: LlmSettings,
}

impl NpczConfig {
    /// Load configuration from a TOML string and validate it.
    ///
    /// # Errors
    /// Returns `NpczError::Config` if the TOML is invalid or a value is out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| NpczError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| NpczError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Reject values the engine cannot work with.
    ///
    /// # Errors
    /// Returns `NpczError::Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        fn unit(key: &str, v: f64) -> Result<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(NpczError::Config(format!("{key} must be within [0, 1], got {v}")))
            }
        }

        unit("content.series_start_probability", self.content.series_start_probability)?;
        unit("content.similarity_threshold", self.content.similarity_threshold)?;
        unit("memory.promotion_threshold", self.memory.promotion_threshold)?;
        unit("memory.active_interest_threshold", self.memory.active_interest_threshold)?;
        unit("memory.decay_rate", self.memory.decay_rate)?;
        unit("scheduler.default_hour_weight", self.scheduler.default_hour_weight)?;
        unit("scheduler.low_mental_health_threshold", self.scheduler.low_mental_health_threshold)?;

        if self.content.retry_count == 0 {
            return Err(NpczError::Config("content.retry_count must be at least 1".into()));
        }
        if self.content.series_min_parts == 0
            || self.content.series_min_parts > self.content.series_max_parts
        {
            return Err(NpczError::Config(
                "content.series_min_parts must be in 1..=series_max_parts".into(),
            ));
        }
        if self.memory.max_short_term == 0 || self.memory.max_long_term == 0 {
            return Err(NpczError::Config("memory capacities must be non-zero".into()));
        }
        if self.tick.batch_size == 0 {
            return Err(NpczError::Config("tick.batch_size must be non-zero".into()));
        }
        if !(-12..=14).contains(&self.general.utc_offset_hours) {
            return Err(NpczError::Config(format!(
                "general.utc_offset_hours must be within -12..=14, got {}",
                self.general.utc_offset_hours
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when `RUST_LOG` is unset: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
    /// Route newly generated content to DRY_RUN instead of PENDING.
    #[serde(default)]
    pub dry_run: bool,
    /// Fixed UTC offset (hours) used for active-hour checks.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            dry_run: false,
            utc_offset_hours: 0,
        }
    }
}

/// Storage layout root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `residents/`, `relationships/`, `queue/` and `tick_state.json`.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { root: default_root() }
    }
}

/// Content generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSettings {
    /// Generation attempts per turn before giving up.
    #[serde(default = "default_3_u32")]
    pub retry_count: u32,
    /// How many recent posts the similarity self-check compares against.
    #[serde(default = "default_5_usize")]
    pub history_check_count: usize,
    /// Posts kept in a persona's post history.
    #[serde(default = "default_20_usize")]
    pub max_history_size: usize,
    /// Chance that an idle persona starts a multi-part series.
    #[serde(default = "default_0_2")]
    pub series_start_probability: f64,
    /// Fewest parts in a new series.
    #[serde(default = "default_2_u32")]
    pub series_min_parts: u32,
    /// Most parts in a new series.
    #[serde(default = "default_5_u32")]
    pub series_max_parts: u32,
    /// Discover a new interest every N posts (0 disables).
    #[serde(default = "default_10_u64")]
    pub evolution_interval: u64,
    /// Similarity ratio above which a draft counts as a repeat.
    #[serde(default = "default_0_6")]
    pub similarity_threshold: f64,
    /// Topics personas may discover as their interests evolve.
    #[serde(default)]
    pub topic_pool: Vec<String>,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            retry_count: 3,
            history_check_count: 5,
            max_history_size: 20,
            series_start_probability: 0.2,
            series_min_parts: 2,
            series_max_parts: 5,
            evolution_interval: 10,
            similarity_threshold: 0.6,
            topic_pool: Vec::new(),
        }
    }
}

/// Memory capacities and rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Short-term capacity; weakest entries are evicted first.
    #[serde(default = "default_20_usize")]
    pub max_short_term: usize,
    /// Acquired long-term capacity; least important evicted first.
    #[serde(default = "default_50_usize")]
    pub max_long_term: usize,
    /// Recent posts remembered for prompt context.
    #[serde(default = "default_10_usize")]
    pub max_recent_posts: usize,
    /// Strength subtracted from every short-term entry per generation cycle.
    #[serde(default = "default_0_1")]
    pub decay_rate: f64,
    /// Strength at which a short-term entry is promoted.
    #[serde(default = "default_0_95")]
    pub promotion_threshold: f64,
    /// Importance given to promoted entries.
    #[serde(default = "default_0_6")]
    pub promoted_importance: f64,
    /// Importance given to a completed series.
    #[serde(default = "default_0_7")]
    pub series_importance: f64,
    /// Minimum strength for an entry to count as an active interest.
    #[serde(default = "default_0_5")]
    pub active_interest_threshold: f64,
    /// Most active interests surfaced at once.
    #[serde(default = "default_5_usize")]
    pub max_active_interests: usize,
    /// Strength boost when a post receives a reply.
    #[serde(default = "default_0_3")]
    pub reply_boost: f64,
    /// Strength boost when a post receives a reaction.
    #[serde(default = "default_0_15")]
    pub reaction_boost: f64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_short_term: 20,
            max_long_term: 50,
            max_recent_posts: 10,
            decay_rate: 0.1,
            promotion_threshold: 0.95,
            promoted_importance: 0.6,
            series_importance: 0.7,
            active_interest_threshold: 0.5,
            max_active_interests: 5,
            reply_boost: 0.3,
            reaction_boost: 0.15,
        }
    }
}

/// Affinity, familiarity and mood deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinitySettings {
    /// Author's affinity toward a replier.
    #[serde(default = "default_0_05")]
    pub delta_reply: f64,
    /// Author's affinity toward a reactor.
    #[serde(default = "default_0_02")]
    pub delta_reaction: f64,
    /// Applied to every graph partner when a post goes unanswered.
    #[serde(default = "default_neg_0_01")]
    pub delta_ignored: f64,
    /// Applied to partners not interacted with for `decay_after_days`.
    #[serde(default = "default_neg_0_02")]
    pub decay_weekly: f64,
    /// Idle period before decay applies.
    #[serde(default = "default_7_i64")]
    pub decay_after_days: i64,
    /// Hours a posted entry waits for responses before counting as ignored.
    #[serde(default = "default_24_i64")]
    pub ignored_after_hours: i64,
    /// Familiarity gained (both ways) per reply.
    #[serde(default = "default_0_03")]
    pub familiarity_reply: f64,
    /// Familiarity gained (both ways) per reaction.
    #[serde(default = "default_0_01")]
    pub familiarity_reaction: f64,
    /// Author mood change on receiving a reply.
    #[serde(default = "default_0_1")]
    pub mood_reply: f64,
    /// Author mood change on receiving a reaction.
    #[serde(default = "default_0_05")]
    pub mood_reaction: f64,
    /// Author mood change when a post goes unanswered.
    #[serde(default = "default_neg_0_03")]
    pub mood_ignored: f64,
}

impl Default for AffinitySettings {
    fn default() -> Self {
        Self {
            delta_reply: 0.05,
            delta_reaction: 0.02,
            delta_ignored: -0.01,
            decay_weekly: -0.02,
            decay_after_days: 7,
            ignored_after_hours: 24,
            familiarity_reply: 0.03,
            familiarity_reaction: 0.01,
            mood_reply: 0.1,
            mood_reaction: 0.05,
            mood_ignored: -0.03,
        }
    }
}

/// Activation probability tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Hour weight when the profile leaves an hour unconfigured.
    #[serde(default = "default_0_5")]
    pub default_hour_weight: f64,
    /// Multiplier inside a chronotype's peak window.
    #[serde(default = "default_1_3")]
    pub peak_multiplier: f64,
    /// Multiplier inside a chronotype's trough window.
    #[serde(default = "default_0_5")]
    pub trough_multiplier: f64,
    /// Mental health below this halves activation.
    #[serde(default = "default_0_3")]
    pub low_mental_health_threshold: f64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_hour_weight: 0.5,
            peak_multiplier: 1.3,
            trough_multiplier: 0.5,
            low_mental_health_threshold: 0.3,
        }
    }
}

/// Queue pipeline limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Generation is suspended while more than this many entries are APPROVED.
    #[serde(default = "default_200_usize")]
    pub approved_backlog_cap: usize,
    /// Recent rejections fed back into a persona's prompt.
    #[serde(default = "default_3_usize")]
    pub rejected_feedback_count: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            approved_backlog_cap: 200,
            rejected_feedback_count: 3,
        }
    }
}

/// Tick pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSettings {
    /// Personas processed per tick, one slot reserved for the reviewer.
    #[serde(default = "default_10_usize")]
    pub batch_size: usize,
    /// External-account reactions allowed per persona per tick.
    #[serde(default = "default_1_usize")]
    pub max_external_reactions: usize,
    /// Posts pulled from the external timeline per tick.
    #[serde(default = "default_50_usize")]
    pub external_timeline_limit: usize,
}

impl Default for TickSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_external_reactions: 1,
            external_timeline_limit: 50,
        }
    }
}

/// Content generator endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL of the Ollama server.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Hard timeout for a single request in milliseconds.
    #[serde(default = "default_60000")]
    pub request_timeout_ms: u64,
    /// Sampling temperature.
    #[serde(default = "default_0_8")]
    pub temperature: f64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_model(),
            request_timeout_ms: 60_000,
            temperature: 0.8,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_string()
}
fn default_root() -> PathBuf {
    PathBuf::from("data")
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "qwen2.5:7b".to_string()
}
fn default_1_usize() -> usize {
    1
}
fn default_3_usize() -> usize {
    3
}
fn default_5_usize() -> usize {
    5
}
fn default_10_usize() -> usize {
    10
}
fn default_20_usize() -> usize {
    20
}
fn default_50_usize() -> usize {
    50
}
fn default_200_usize() -> usize {
    200
}
fn default_2_u32() -> u32 {
    2
}
fn default_3_u32() -> u32 {
    3
}
fn default_5_u32() -> u32 {
    5
}
fn default_10_u64() -> u64 {
    10
}
fn default_60000() -> u64 {
    60_000
}
fn default_7_i64() -> i64 {
    7
}
fn default_24_i64() -> i64 {
    24
}
fn default_0_01() -> f64 {
    0.01
}
fn default_0_02() -> f64 {
    0.02
}
fn default_0_03() -> f64 {
    0.03
}
fn default_0_05() -> f64 {
    0.05
}
fn default_0_1() -> f64 {
    0.1
}
fn default_0_15() -> f64 {
    0.15
}
fn default_0_2() -> f64 {
    0.2
}
fn default_0_3() -> f64 {
    0.3
}
fn default_0_5() -> f64 {
    0.5
}
fn default_0_6() -> f64 {
    0.6
}
fn default_0_7() -> f64 {
    0.7
}
fn default_0_8() -> f64 {
    0.8
}
fn default_0_95() -> f64 {
    0.95
}
fn default_1_3() -> f64 {
    1.3
}
fn default_neg_0_01() -> f64 {
    -0.01
}
fn default_neg_0_02() -> f64 {
    -0.02
}
fn default_neg_0_03() -> f64 {
    -0.03
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = NpczConfig::from_toml("").expect("empty config is valid");
        assert_eq!(config.memory.max_short_term, 20);
        assert_eq!(config.queue.approved_backlog_cap, 200);
        assert!((config.affinity.delta_reply - 0.05).abs() < f64::EPSILON);
        assert!(!config.general.dry_run);
    }

    #[test]
    fn partial_section_overrides_only_named_keys() {
        let config = NpczConfig::from_toml(
            r#"
            [memory]
            max_short_term = 8

            [tick]
            batch_size = 4
            "#,
        )
        .expect("valid");
        assert_eq!(config.memory.max_short_term, 8);
        assert_eq!(config.memory.max_long_term, 50);
        assert_eq!(config.tick.batch_size, 4);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = NpczConfig::from_toml("[memory]\npromotion_threshold = 1.5").unwrap_err();
        assert!(err.to_string().contains("promotion_threshold"));
        assert!(NpczConfig::from_toml("[tick]\nbatch_size = 0").is_err());
        assert!(NpczConfig::from_toml("[content]\nretry_count = 0").is_err());
    }

    #[test]
    fn utc_offset_must_be_a_real_zone() {
        let err = NpczConfig::from_toml("[general]\nutc_offset_hours = 1000000").unwrap_err();
        assert!(err.to_string().contains("utc_offset_hours"));
        assert!(NpczConfig::from_toml("[general]\nutc_offset_hours = -13").is_err());
        let tokyo = NpczConfig::from_toml("[general]\nutc_offset_hours = 9").expect("valid");
        assert_eq!(tokyo.general.utc_offset_hours, 9);
        assert!(NpczConfig::from_toml("[general]\nutc_offset_hours = 14").is_ok());
    }
}
