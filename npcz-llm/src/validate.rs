//! Cleaning, validation and length adjustment of generated text.
//!
//! Generated text goes through [`clean`], then [`validate`], then
//! [`adjust_length`], then a similarity self-check against recent posts.
//! Any rejection sends the caller back for another attempt.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("static pattern"));
static PLACEHOLDERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)\[(?:リンク|ハッシュタグ|URL|画像|添付|参考|出典|注|Link|Hashtag|Image|Source|Note)[:：][^\]]*\]|\d+[/／]\d+投稿目[:：]?|\d+投稿目[:：]?|^(?:投稿|Post)[:：]",
    )
    .expect("static pattern")
});
static UNRESOLVED_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[a-z_]+\}").expect("static pattern"));
static MANY_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static pattern"));
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").expect("static pattern"));
static ANY_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static pattern"));

/// Instruction scaffolding that must never reach a post.
const LEAK_MARKERS: &[&str] = &[
    "<think>",
    "</think>",
    "Theme:",
    "テーマ:",
    "Conditions:",
    "【条件】",
    "【文体】",
    "As an AI",
];

/// Sentence-ending marks the truncation may back off to, strongest first.
const BREAK_MARKS: &[char] = &['。', '！', '？', '!', '?', '.', '、', ','];

/// Formatting and length rules for one persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRules {
    /// Markdown allowed.
    pub use_markdown: bool,
    /// Code fences allowed.
    pub use_code_blocks: bool,
    /// Minimum characters.
    pub min_length: usize,
    /// Maximum characters.
    pub max_length: usize,
}

impl ContentRules {
    /// Plain-text rules with the given bounds.
    #[must_use]
    pub fn plain(min_length: usize, max_length: usize) -> Self {
        Self {
            use_markdown: false,
            use_code_blocks: false,
            min_length,
            max_length,
        }
    }
}

/// Why an attempt's text was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Nothing left after cleaning.
    Empty,
    /// Shorter than the persona's minimum.
    TooShort {
        /// Characters produced.
        len: usize,
        /// Required minimum.
        min: usize,
    },
    /// Markdown or code fences where the persona does not use them.
    DisallowedMarkup(&'static str),
    /// Prompt scaffolding leaked into the text.
    LeakedPrompt(String),
    /// Too close to a recent post.
    TooSimilar {
        /// Highest similarity ratio found.
        ratio: f64,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::TooShort { len, min } => write!(f, "too short ({len} < {min})"),
            Self::DisallowedMarkup(m) => write!(f, "disallowed markup `{m}`"),
            Self::LeakedPrompt(m) => write!(f, "leaked prompt text `{m}`"),
            Self::TooSimilar { ratio } => write!(f, "too similar to a recent post ({ratio:.2})"),
        }
    }
}

/// Strip model artifacts and normalise whitespace.
///
/// Removes think blocks, placeholder tags, numbering leaks and wrapping
/// quotes. Markdown headings and code fences are removed unless the rules
/// allow them.
#[must_use]
pub fn clean(content: &str, rules: &ContentRules) -> String {
    let mut text = THINK_BLOCK.replace_all(content, "").into_owned();
    text = PLACEHOLDERS.replace_all(&text, "").into_owned();

    if !rules.use_markdown {
        text = text.replace("###", "");
        if !rules.use_code_blocks {
            text = text.replace("```", "");
        }
    }

    text = if rules.use_markdown || rules.use_code_blocks {
        let collapsed = MANY_NEWLINES.replace_all(&text, "\n\n");
        INLINE_SPACE.replace_all(&collapsed, " ").into_owned()
    } else {
        ANY_SPACE.replace_all(&text, " ").into_owned()
    };

    strip_wrapping_quotes(text.trim()).trim().to_string()
}

fn strip_wrapping_quotes(text: &str) -> &str {
    const PAIRS: &[(char, char)] = &[('"', '"'), ('「', '」'), ('『', '』'), ('“', '”'), ('\'', '\'')];
    for (open, close) in PAIRS {
        if let Some(inner) = text.strip_prefix(*open).and_then(|t| t.strip_suffix(*close)) {
            if !inner.contains(*open) && !inner.contains(*close) {
                return inner;
            }
        }
    }
    text
}

/// Check cleaned text against the rules.
///
/// # Errors
/// Returns the first [`Rejection`] found.
pub fn validate(content: &str, rules: &ContentRules) -> Result<(), Rejection> {
    let len = content.chars().count();
    if content.trim().is_empty() {
        return Err(Rejection::Empty);
    }
    if len < rules.min_length {
        return Err(Rejection::TooShort {
            len,
            min: rules.min_length,
        });
    }
    if !rules.use_markdown {
        for mark in ["###", "**"] {
            if content.contains(mark) {
                return Err(Rejection::DisallowedMarkup(mark));
            }
        }
        if !rules.use_code_blocks && content.contains("```") {
            return Err(Rejection::DisallowedMarkup("```"));
        }
    }
    if let Some(marker) = LEAK_MARKERS.iter().find(|m| content.contains(*m)) {
        return Err(Rejection::LeakedPrompt((*marker).to_string()));
    }
    if let Some(var) = UNRESOLVED_VARIABLE.find(content) {
        return Err(Rejection::LeakedPrompt(var.as_str().to_string()));
    }
    Ok(())
}

/// Trim text longer than `max_length` characters.
///
/// Cuts at the last sentence or clause mark in the second half of the
/// allowed span; otherwise cuts hard. Shorter text is returned unchanged.
#[must_use]
pub fn adjust_length(content: &str, max_length: usize) -> String {
    if content.chars().count() <= max_length {
        return content.to_string();
    }
    let head: Vec<char> = content.chars().take(max_length).collect();
    for mark in BREAK_MARKS {
        if let Some(pos) = head.iter().rposition(|c| c == mark) {
            if pos > max_length / 2 {
                return head[..=pos].iter().collect();
            }
        }
    }
    head.into_iter().collect()
}

/// Similarity ratio of two texts in [0, 1], 1 meaning identical.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Highest similarity above `threshold` against the last `window` posts.
#[must_use]
pub fn too_similar(content: &str, recent: &[String], window: usize, threshold: f64) -> Option<f64> {
    let start = recent.len().saturating_sub(window);
    recent[start..]
        .iter()
        .map(|old| similarity(content, old))
        .filter(|ratio| *ratio > threshold)
        .reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ContentRules {
        ContentRules::plain(5, 40)
    }

    #[test]
    fn clean_strips_artifacts() {
        let raw = "<think>plan the post</think>\nPost: brewing   coffee\n\nagain ### [Link: x]";
        assert_eq!(clean(raw, &rules()), "brewing coffee again");
        assert_eq!(clean("「今日は晴れ」", &rules()), "今日は晴れ");
        assert_eq!(clean("2/3投稿目: 続きです", &rules()), "続きです");
    }

    #[test]
    fn clean_keeps_markdown_paragraphs_when_allowed() {
        let r = ContentRules {
            use_markdown: true,
            ..rules()
        };
        assert_eq!(clean("a\n\n\n\nb   c", &r), "a\n\nb c");
    }

    #[test]
    fn validate_rejections() {
        let r = rules();
        assert_eq!(validate("   ", &r), Err(Rejection::Empty));
        assert!(matches!(validate("hey", &r), Err(Rejection::TooShort { len: 3, min: 5 })));
        assert_eq!(validate("this is **bold**", &r), Err(Rejection::DisallowedMarkup("**")));
        assert!(matches!(validate("Theme: coffee time", &r), Err(Rejection::LeakedPrompt(_))));
        assert!(matches!(validate("about {topic} today", &r), Err(Rejection::LeakedPrompt(_))));
        assert!(validate("a perfectly normal post", &r).is_ok());
    }

    #[test]
    fn adjust_length_prefers_sentence_boundary() {
        let text = "今日はいい天気。散歩に行こうかな。でも眠い";
        assert_eq!(adjust_length(text, 18), "今日はいい天気。散歩に行こうかな。");
        assert_eq!(adjust_length("abcdefghij", 4), "abcd");
        assert_eq!(adjust_length("short", 40), "short");
    }

    #[test]
    fn similarity_check_uses_recent_window() {
        let recent = vec![
            "brewing coffee this morning".to_string(),
            "compilers are fun".to_string(),
        ];
        assert!(too_similar("brewing coffee this morning!", &recent, 5, 0.6).is_some());
        assert!(too_similar("brewing coffee this morning!", &recent, 1, 0.6).is_none());
        assert!(too_similar("a walk in the park", &recent, 5, 0.6).is_none());
        assert!((similarity("same", "same") - 1.0).abs() < f64::EPSILON);
    }
}
