use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static HEADLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*HEADLINE:[ \t]*(.*)").unwrap());
static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)SUMMARY:\s*(.*)").unwrap());

/// The externally observable unit: re-derived after every delta, so the
/// summary only ever grows within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResult {
    pub headline: String,
    pub summary: String,
}

/// Accumulates text deltas for one session and derives the current
/// (headline, summary) pair from the fixed textual contract: a `HEADLINE:`
/// line plus a `SUMMARY:` marker. Without the marker the whole text is the
/// summary and the headline stays empty.
pub struct SummaryAccumulator {
    full_text: String,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self {
            full_text: String::new(),
        }
    }

    pub fn push_delta(&mut self, delta: &str) {
        self.full_text.push_str(delta);
    }

    pub fn has_text(&self) -> bool {
        !self.full_text.is_empty()
    }

    pub fn current(&self) -> SummaryResult {
        match SUMMARY_RE.captures(&self.full_text) {
            Some(caps) => {
                let summary = caps
                    .get(1)
                    .map(|m| m.as_str().trim())
                    .unwrap_or("")
                    .to_string();
                let headline = HEADLINE_RE
                    .captures(&self.full_text)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                SummaryResult { headline, summary }
            }
            None => SummaryResult {
                headline: String::new(),
                summary: self.full_text.trim().to_string(),
            },
        }
    }
}
