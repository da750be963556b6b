//! Posting scheduler: decides whether a persona acts now and when it acts next.
//!
//! The activation probability is a product of independent factors:
//!
//! ```text
//! p = hour_weight × chronotype × (1 − 0.5·fatigue) × mental_health_gate × (0.5 + 0.5·energy)
//! ```
//!
//! `should_post_now` draws once against `p` and then consults the persisted
//! next-post time. Randomness is injected so every decision is reproducible.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use rand::Rng;

use crate::config::SchedulerSettings;
use crate::persona::{PersonaProfile, PersonaState};
use crate::types::{Chronotype, clamp_unit};

/// Seconds in a day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

fn in_morning_window(hour: u32) -> bool {
    (5..12).contains(&hour)
}

fn in_night_window(hour: u32) -> bool {
    hour >= 22 || hour < 5
}

/// Chronotype multiplier for a local hour.
#[must_use]
pub fn chronotype_multiplier(chronotype: Chronotype, hour: u32, settings: &SchedulerSettings) -> f64 {
    match chronotype {
        Chronotype::Lark if in_morning_window(hour) => settings.peak_multiplier,
        Chronotype::Lark if in_night_window(hour) => settings.trough_multiplier,
        Chronotype::Owl if in_night_window(hour) => settings.peak_multiplier,
        Chronotype::Owl if in_morning_window(hour) => settings.trough_multiplier,
        _ => 1.0,
    }
}

/// Composite activation probability for `now`, clamped to [0, 1].
///
/// Does not check the active weekday/hour set; see [`should_post_now`].
#[must_use]
pub fn activation_probability(
    profile: &PersonaProfile,
    state: &PersonaState,
    now: DateTime<FixedOffset>,
    settings: &SchedulerSettings,
) -> f64 {
    let hour = now.hour();
    let base = profile.hour_weight(hour).unwrap_or(settings.default_hour_weight);
    let rhythm = chronotype_multiplier(profile.behavior.chronotype, hour, settings);
    let fatigue = 1.0 - 0.5 * clamp_unit(state.fatigue);
    let mental = if state.mental_health < settings.low_mental_health_threshold {
        0.5
    } else {
        1.0
    };
    let energy = 0.5 + 0.5 * clamp_unit(state.energy);
    clamp_unit(base * rhythm * fatigue * mental * energy)
}

/// Whether the persona should post right now.
///
/// False outside the active weekday/hour set. Otherwise one draw must fall
/// under the activation probability, and the persisted next-post time must be
/// unset (0) or already elapsed.
pub fn should_post_now<R: Rng>(
    profile: &PersonaProfile,
    state: &PersonaState,
    now: DateTime<FixedOffset>,
    settings: &SchedulerSettings,
    rng: &mut R,
) -> bool {
    if !profile.posts || !profile.is_active_at(now.weekday(), now.hour()) {
        return false;
    }
    let p = activation_probability(profile, state, now, settings);
    if rng.r#gen::<f64>() >= p {
        return false;
    }
    state.next_post_time == 0 || now.timestamp() >= state.next_post_time
}

/// Epoch seconds of the next post: `now + (86400 / frequency) × uniform(1−v, 1+v)`.
///
/// With zero variance the interval is exactly the average.
#[allow(clippy::cast_possible_truncation)]
pub fn calculate_next_post_time<R: Rng>(
    profile: &PersonaProfile,
    now_epoch: i64,
    rng: &mut R,
) -> i64 {
    let frequency = f64::from(profile.behavior.post_frequency.max(1));
    let average = SECONDS_PER_DAY / frequency;
    let variance = clamp_unit(profile.behavior.post_frequency_variance);
    let factor = if variance > 0.0 {
        rng.gen_range((1.0 - variance)..=(1.0 + variance))
    } else {
        1.0
    };
    now_epoch + (average * factor).round() as i64
}
