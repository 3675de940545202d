//! Rendering of retrieval results as a prompt context block.

use std::fmt::Write;

use crate::retriever::RetrievalResult;

pub const CONTEXT_HEADER: &str = "## Informações Relevantes do CID-10:";
pub const ELIGIBLE_MARKER: &str = "Elegível para BPC/LOAS";
pub const LEGAL_NOTES_LABEL: &str = "Notas Legais";
pub const SIMILARITY_LABEL: &str = "Similaridade";
pub const DEFAULT_MAX_FIELD_CHARS: usize = 500;

const ESCAPED: [char; 11] = ['\\', '*', '_', '`', '#', '[', ']', '<', '>', '|', '~'];

/// Formats results as a markdown block for the generation prompt.
///
/// Stored text is untrusted: whitespace runs and control characters collapse
/// to a single space and markdown metacharacters are backslash-escaped.
/// Description and legal notes are cut at `max_field_chars` characters with a
/// trailing `…`; the code is never cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFormatter {
    max_field_chars: usize,
}

impl Default for ContextFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FIELD_CHARS)
    }
}

impl ContextFormatter {
    #[must_use]
    pub fn new(max_field_chars: usize) -> Self {
        Self {
            max_field_chars: max_field_chars.max(1),
        }
    }

    #[must_use]
    pub fn max_field_chars(&self) -> usize {
        self.max_field_chars
    }

    /// Render `results` in order. An empty slice renders as an empty string.
    #[must_use]
    pub fn format(&self, results: &[RetrievalResult]) -> String {
        if results.is_empty() {
            return String::new();
        }

        let mut out = String::from(CONTEXT_HEADER);
        out.push('\n');

        for result in results {
            out.push('\n');
            let _ = writeln!(
                out,
                "**{}**: {}",
                neutralize(&result.code, None),
                self.bounded(&result.description)
            );
            if result.eligible {
                let _ = writeln!(out, "  - {ELIGIBLE_MARKER}");
            }
            if let Some(notes) = result.legal_notes.as_deref().map(|n| self.bounded(n))
                && !notes.is_empty()
            {
                let _ = writeln!(out, "  - {LEGAL_NOTES_LABEL}: {notes}");
            }
            let _ = writeln!(
                out,
                "  - {SIMILARITY_LABEL}: {:.1}%",
                percent(result.similarity)
            );
        }

        out
    }

    fn bounded(&self, text: &str) -> String {
        neutralize(text, Some(self.max_field_chars))
    }
}

/// Similarity as a percentage rounded to one decimal, halves away from zero.
fn percent(similarity: f32) -> f64 {
    (f64::from(similarity) * 1000.0).round() / 10.0
}

/// Collapse whitespace and control runs, drop invisible characters and escape
/// markdown. With `max_chars`, stop after that many visible characters and
/// append `…`.
fn neutralize(text: &str, max_chars: Option<usize>) -> String {
    let limit = max_chars.unwrap_or(usize::MAX);
    let mut out = String::with_capacity(text.len().min(limit.saturating_mul(2)));
    let mut taken = 0usize;
    let mut pending_space = false;

    for ch in text.chars() {
        if is_invisible(ch) {
            continue;
        }
        if ch.is_whitespace() || ch.is_control() {
            pending_space = taken > 0;
            continue;
        }
        if taken == limit {
            out.push('…');
            return out;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
            taken += 1;
            if taken == limit {
                out.push('…');
                return out;
            }
        }
        if ESCAPED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
        taken += 1;
    }

    out
}

/// Zero-width and bidi-override characters that could hide text from a reader.
fn is_invisible(ch: char) -> bool {
    matches!(
        ch,
        '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{FEFF}'
    )
}
