use crate::transcript::TranscriptItem;
use once_cell::sync::Lazy;
use regex::Regex;

/// Result shown when the video has no usable transcript.
pub const NO_TRANSCRIPT_PLACEHOLDER: &str = "No transcript available.";

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]*").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*•][ \t]+").unwrap());
static EMPHASIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_`]+").unwrap());

/// Joined plain text of a transcript, in caption order.
pub fn transcript_text(items: &[TranscriptItem]) -> String {
    items
        .iter()
        .map(|item| item.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the summarization prompt. The response format instruction must
/// match what the accumulator derives the (headline, summary) pair from.
pub fn build_prompt(items: &[TranscriptItem]) -> String {
    format!(
        "Summarize the following video transcript.\n\
         Respond in exactly this format, with no other preamble:\n\
         HEADLINE: <one short, catchy headline>\n\
         SUMMARY:\n\
         <a concise summary of what the video covers>\n\n\
         Transcript:\n{}",
        transcript_text(items)
    )
}

/// Strip the light markdown the model tends to emit, so the text reads
/// naturally when spoken aloud.
pub fn plain_text(summary: &str) -> String {
    let text = HEADING_RE.replace_all(summary, "");
    let text = BULLET_RE.replace_all(&text, "");
    let text = EMPHASIS_RE.replace_all(&text, "");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str) -> TranscriptItem {
        TranscriptItem {
            text: text.to_string(),
            start_time_text: String::new(),
            start_ms: 0,
            end_ms: 0,
        }
    }

    #[test]
    fn test_transcript_text_joins_in_order() {
        let items = vec![item("first part"), item("  second part "), item("third")];
        assert_eq!(transcript_text(&items), "first part second part third");
    }

    #[test]
    fn test_transcript_text_skips_blank_items() {
        let items = vec![item("a"), item("   "), item("b")];
        assert_eq!(transcript_text(&items), "a b");
    }

    #[test]
    fn test_prompt_carries_format_and_transcript() {
        let prompt = build_prompt(&[item("the cat sat")]);
        assert!(prompt.contains("HEADLINE:"));
        assert!(prompt.contains("SUMMARY:"));
        assert!(prompt.contains("the cat sat"));
    }

    #[test]
    fn test_plain_text_strips_markdown() {
        let spoken = plain_text("## Key points\n- **Fast** results\n- `code` stuff\n* done *");
        assert!(!spoken.contains('#'));
        assert!(!spoken.contains('*'));
        assert!(!spoken.contains('`'));
        assert!(spoken.contains("Key points"));
        assert!(spoken.contains("Fast results"));
    }

    #[test]
    fn test_plain_text_leaves_ordinary_text_alone() {
        assert_eq!(plain_text("Cats are great."), "Cats are great.");
    }
}
