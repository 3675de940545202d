//! CID-10 code pattern: one letter, two digits, optionally `.` and one or two
//! more digits (`S38`, `M54.5`, `F32.10`).

use std::sync::LazyLock;

use regex::Regex;

static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z][0-9]{2}(?:\.[0-9]{1,2})?)\b").expect("code mention pattern is valid")
});

static CANONICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][0-9]{2}(?:\.[0-9]{1,2})?$").expect("canonical code pattern is valid")
});

/// Canonical form of a code: trimmed and uppercased, or `None` when the
/// input does not have the code shape.
#[must_use]
pub fn canonicalize(code: &str) -> Option<String> {
    let upper = code.trim().to_ascii_uppercase();
    CANONICAL.is_match(&upper).then_some(upper)
}

#[must_use]
pub fn is_canonical(code: &str) -> bool {
    CANONICAL.is_match(code)
}

/// First code-shaped token in `text`, canonicalized.
///
/// Matching is case-insensitive and bounded by word boundaries, so `CID S38`
/// and `s38.9?` match while `CID10` does not.
#[must_use]
pub fn find_code_mention(text: &str) -> Option<String> {
    MENTION
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}
