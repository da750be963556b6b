//! Interpreting a reviewer's answer.

/// Words that make an NG answer concrete enough to act on.
const NG_REASONS: &[&str] = &[
    "実在",
    "有名人",
    "政治",
    "宗教",
    "暴力",
    "死ね",
    "殺",
    "REAL PERSON",
    "FAMOUS",
    "CELEBRITY",
    "POLITIC",
    "RELIGIO",
    "VIOLEN",
];

/// Longest note kept from a rejecting answer.
const MAX_NOTE_CHARS: usize = 100;

/// What the reviewer decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewVerdict {
    /// Post may go out.
    Approve,
    /// Post is refused, with the reviewer's words as the note.
    Reject(String),
}

/// Turn a raw reviewer answer into a verdict.
///
/// Only an answer that says NG *and* names a concrete reason rejects.
/// Everything else, including unclear answers, approves.
#[must_use]
pub fn parse_review(response: &str) -> ReviewVerdict {
    let upper = response.trim().to_uppercase();
    let says_ng = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == "NG");
    let has_reason = NG_REASONS.iter().any(|r| upper.contains(r));
    if says_ng && has_reason {
        ReviewVerdict::Reject(upper.chars().take(MAX_NOTE_CHARS).collect())
    } else {
        ReviewVerdict::Approve
    }
}
