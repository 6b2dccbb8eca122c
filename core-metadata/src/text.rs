//! Title and author heuristics shared by the cover providers.
//!
//! Provider catalogues rarely spell a title exactly the way an export does
//! (series suffixes, subtitles, punctuation), so matching works on loosely
//! normalized strings and a prefix overlap rather than equality.

use regex::Regex;
use std::sync::LazyLock;

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*").expect("parenthesized regex must compile"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[[^\]]*\]\s*").expect("bracketed regex must compile"));
static SUBTITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*.*$").expect("subtitle regex must compile"));
static GENERATIONAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(Jr\.|Sr\.|II|III|IV)$").expect("suffix regex must compile")
});

/// Lowercases, drops everything but ASCII word characters and whitespace,
/// collapses whitespace runs to one space and trims.
pub fn normalize(value: &str) -> String {
    let lowered = value.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips series markers in `(...)` or `[...]` and any subtitle after a colon.
///
/// ```
/// use core_metadata::text::clean_title;
///
/// assert_eq!(clean_title("The Hobbit (The Lord of the Rings, #0)"), "The Hobbit");
/// assert_eq!(clean_title("Sapiens: A Brief History of Humankind"), "Sapiens");
/// ```
pub fn clean_title(title: &str) -> String {
    let without_parens = PARENTHESIZED.replace_all(title, "");
    let without_brackets = BRACKETED.replace_all(&without_parens, "");
    SUBTITLE
        .replace(&without_brackets, "")
        .trim()
        .to_string()
}

/// Last whitespace-separated token of an author name, after removing one
/// trailing generational suffix.
///
/// Names in "Last, First" order are not reordered, so
/// `"Martin, George R. R. Jr."` yields `"R."`.
pub fn author_last_name(author: &str) -> String {
    if author.is_empty() {
        return String::new();
    }
    let stripped = GENERATIONAL_SUFFIX.replace(author, "");
    stripped
        .trim()
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_string()
}

/// True when either string contains the leading `max(5, len / 2)` characters
/// of the other. An empty string has an empty prefix, so it overlaps with
/// anything.
pub fn prefix_overlap(a: &str, b: &str) -> bool {
    a.contains(&leading(b)) || b.contains(&leading(a))
}

fn leading(value: &str) -> String {
    let len = value.chars().count();
    value.chars().take((len / 2).max(5)).collect()
}

/// Either author contains the last space-separated token of the other.
pub(crate) fn author_overlap(a: &str, b: &str) -> bool {
    let last_of = |s: &str| s.rsplit(' ').next().unwrap_or_default().to_string();
    a.contains(&last_of(b)) || b.contains(&last_of(a))
}
