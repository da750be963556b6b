//! Prompt templates for persona content generation.
//!
//! Every prompt is a plain template with `{key}` placeholders filled by
//! [`render_template`]. Section helpers build the optional blocks (history,
//! rejection feedback, thread context) so callers only pass strings.

use std::fmt;

/// Standalone post.
pub const POST_TEMPLATE: &str = r"You are {name}. Personality: {personality}.
Write one social media post.

Topic: {topic}{context}
Maximum length: {max_length} characters

Rules:
- Write in your own voice and stay in character.
- {length_hint}
- Output only the post text, no labels or quotes.{preferences}{history}{feedback}

Post:";

/// Next part of a running series.
pub const SERIES_TEMPLATE: &str = r"You are {name}. Personality: {personality}.
You are writing part {part} of a {total}-part series of posts.

Series theme: {theme}

Earlier parts:
{previous}

Maximum length: {max_length} characters

Rules:
- Continue naturally from the earlier parts.
- Make it read like part {part} of {total}.
- Never write part numbers such as '{part}/{total}' in the text.
- Output only the post text.

Part {part}:";

/// Threaded reply.
pub const REPLY_TEMPLATE: &str = r"You are {name}. Personality: {personality}.
Write a reply.

Their post:
{target_content}

Conversation so far:
{history}

Your relationship: {relationship}
Tone: {tone}

Rules:
- Keep it short, roughly 20 to 80 characters.
- Stay on the thread's topic.{closing_hint}
- Output only the reply text.

Reply:";

/// Standalone remark about someone's post.
pub const MUMBLE_TEMPLATE: &str = r"You are {name}. Personality: {personality}.
You saw a post and mutter to yourself about it without replying.

The post:
{target_name}: {target_content}

Rules:
- Do not address them directly.
- Sound like talking to yourself.
- Roughly 20 to 60 characters.
- Output only the remark.

Remark:";

/// Content review.
pub const REVIEW_TEMPLATE: &str = r"Does this post contain forbidden content?

Post: {content}

Forbidden:
- Names of real, famous people
- Political parties or religious organizations
- Violent language such as threats or calls to kill

Allowed:
- Technical terms, product names
- Games, anime, books
- Ordinary everyday conversation

Answer with a single word, OK or NG. If NG, name the reason.";

/// Identifies a prompt template by purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Standalone post.
    Post,
    /// Series part.
    SeriesPost,
    /// Threaded reply.
    Reply,
    /// Remark about someone.
    Mumble,
    /// Content review.
    Review,
}

impl PromptId {
    /// Built-in template text.
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            Self::Post => POST_TEMPLATE,
            Self::SeriesPost => SERIES_TEMPLATE,
            Self::Reply => REPLY_TEMPLATE,
            Self::Mumble => MUMBLE_TEMPLATE,
            Self::Review => REVIEW_TEMPLATE,
        }
    }

    /// Render this template.
    #[must_use]
    pub fn render(self, vars: &[(&str, &str)]) -> String {
        render_template(self.template(), vars)
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Post => "post",
            Self::SeriesPost => "series_post",
            Self::Reply => "reply",
            Self::Mumble => "mumble",
            Self::Review => "review",
        };
        f.write_str(name)
    }
}

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

// ---------------------------------------------------------------------------
// Section helpers
// ---------------------------------------------------------------------------

/// "Do not repeat these" block listing the last `limit` posts.
#[must_use]
pub fn history_section(recent: &[String], limit: usize) -> String {
    let start = recent.len().saturating_sub(limit);
    let shown = &recent[start..];
    if shown.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\nYour recent posts:");
    for post in shown {
        out.push_str("\n- ");
        out.push_str(post);
    }
    out.push_str("\nDo not repeat their content or wording. Find a new angle.");
    out
}

/// "Learn from these" block for recently rejected posts as `(content, reason)`.
#[must_use]
pub fn rejection_section(rejected: &[(String, String)]) -> String {
    if rejected.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\nPosts of yours that were rejected:");
    for (content, reason) in rejected.iter().take(2) {
        let snippet: String = content.chars().take(30).collect();
        out.push_str(&format!("\n- \"{snippet}...\" (reason: {reason})"));
    }
    out.push_str("\nDo not make the same mistake.");
    out
}

/// Likes, dislikes and values as one block.
#[must_use]
pub fn preferences_section(likes: &[String], dislikes: &[String], values: &[String]) -> String {
    let mut lines = Vec::new();
    if !likes.is_empty() {
        lines.push(format!("Likes: {}", join_first(likes, 3)));
    }
    if !dislikes.is_empty() {
        lines.push(format!("Avoids: {}", join_first(dislikes, 2)));
    }
    if !values.is_empty() {
        lines.push(format!("Values: {}", join_first(values, 3)));
    }
    if lines.is_empty() {
        String::new()
    } else {
        format!("\n\nAbout you:\n{}", lines.join("\n"))
    }
}

fn join_first(items: &[String], n: usize) -> String {
    items.iter().take(n).map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Numbered list of earlier series parts.
#[must_use]
pub fn series_section(previous: &[String]) -> String {
    if previous.is_empty() {
        return "(none yet, this is the first part)".into();
    }
    previous
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Part {}: {p}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Last five thread messages as `author: text` lines.
#[must_use]
pub fn conversation_section<'a>(messages: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let lines: Vec<String> = messages
        .into_iter()
        .map(|(author, content)| format!("  {author}: {content}"))
        .collect();
    if lines.is_empty() {
        return "  (first reply)".into();
    }
    lines[lines.len().saturating_sub(5)..].join("\n")
}

/// Nudge toward wrapping up as a thread deepens.
#[must_use]
pub fn closing_hint(depth: u32) -> &'static str {
    match depth {
        0..=1 => "",
        2 => "\n- Do not let it run long.",
        _ => "\n- It is fine to wrap the conversation up with a short answer.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_every_placeholder() {
        let out = PromptId::Mumble.render(&[
            ("name", "Aki"),
            ("personality", "cheerful"),
            ("target_name", "Chef"),
            ("target_content", "new soup recipe"),
        ]);
        assert!(out.contains("Aki"));
        assert!(out.contains("Chef: new soup recipe"));
        assert!(!out.contains('{'));
    }

    #[test]
    fn series_template_mentions_part_numbers() {
        let previous = series_section(&["first".to_string()]);
        let out = PromptId::SeriesPost.render(&[
            ("name", "Aki"),
            ("personality", "calm"),
            ("part", "2"),
            ("total", "4"),
            ("theme", "latte art"),
            ("previous", previous.as_str()),
            ("max_length", "140"),
        ]);
        assert!(out.contains("part 2 of a 4-part series"));
        assert!(out.contains("Part 1: first"));
        assert!(out.ends_with("Part 2:"));
    }

    #[test]
    fn sections_are_empty_without_input() {
        assert!(history_section(&[], 5).is_empty());
        assert!(rejection_section(&[]).is_empty());
        assert!(preferences_section(&[], &[], &[]).is_empty());
        assert_eq!(conversation_section([]), "  (first reply)");
    }

    #[test]
    fn history_section_keeps_latest() {
        let recent: Vec<String> = (0..8).map(|i| format!("post {i}")).collect();
        let out = history_section(&recent, 3);
        assert!(out.contains("post 7") && out.contains("post 5"));
        assert!(!out.contains("post 4"));
    }

    #[test]
    fn rejection_section_truncates_snippets() {
        let out = rejection_section(&[("x".repeat(50), "violent".into())]);
        assert!(out.contains(&format!("\"{}...\"", "x".repeat(30))));
        assert!(out.contains("violent"));
    }

    #[test]
    fn closing_hint_grows_with_depth() {
        assert!(closing_hint(1).is_empty());
        assert!(!closing_hint(2).is_empty());
        assert_ne!(closing_hint(2), closing_hint(3));
    }
}
