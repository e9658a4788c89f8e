use crate::gemini::GenerateRecord;
use log::warn;

/// Reassembles complete JSON records from incrementally delivered text.
/// Records may be split across any chunk boundary; anything before the next
/// candidate `{` is discarded, and an unparseable balanced span costs one
/// character before rescanning, so malformed input never stalls the stream.
pub struct RecordAssembler {
    buffer: String,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Append decoded text and drain every record that is now complete.
    pub fn push(&mut self, text: &str) -> Vec<GenerateRecord> {
        self.buffer.push_str(text);
        let mut records = Vec::new();

        loop {
            let Some(start) = self.buffer.find('{') else {
                self.buffer.clear();
                return records;
            };

            match balanced_object_len(&self.buffer[start..]) {
                Some(len) => {
                    let candidate = &self.buffer[start..start + len];
                    match serde_json::from_str::<GenerateRecord>(candidate) {
                        Ok(record) => {
                            records.push(record);
                            self.buffer.drain(..start + len);
                        }
                        Err(e) => {
                            warn!("Skipping malformed record span: {}", e);
                            self.buffer.drain(..start + 1);
                        }
                    }
                }
                None => {
                    // incomplete object, keep it from the candidate start
                    self.buffer.drain(..start);
                    return records;
                }
            }
        }
    }

    /// Text still waiting for completion, for end-of-stream diagnostics.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Byte length of the balanced object beginning at the `{` that starts
/// `text`, or None while it is still incomplete. Depth tracking is
/// string-aware: braces inside string literals and escaped quotes do not
/// count.
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(text: &str) -> String {
        format!(
            r#"{{"candidates": [{{"content": {{"parts": [{{"text": "{}"}}]}}}}]}}"#,
            text
        )
    }

    fn texts(records: &[GenerateRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.deltas().collect::<String>())
            .collect()
    }

    #[test]
    fn test_whole_record_in_one_push() {
        let mut assembler = RecordAssembler::new();
        let records = assembler.push(&record_json("hello"));
        assert_eq!(texts(&records), vec!["hello"]);
        assert!(assembler.pending().is_empty());
    }

    #[test]
    fn test_record_split_across_pushes() {
        let mut assembler = RecordAssembler::new();
        let json = record_json("split me");
        let (head, tail) = json.split_at(json.len() / 2);

        assert!(assembler.push(head).is_empty());
        let records = assembler.push(tail);
        assert_eq!(texts(&records), vec!["split me"]);
    }

    #[test]
    fn test_two_records_in_one_push() {
        let mut assembler = RecordAssembler::new();
        let body = format!("[{},\n{}]", record_json("one"), record_json("two"));
        let records = assembler.push(&body);
        assert_eq!(texts(&records), vec!["one", "two"]);
    }

    #[test]
    fn test_array_punctuation_between_records_is_skipped() {
        let mut assembler = RecordAssembler::new();
        assert!(assembler.push("[\n").is_empty());
        let records = assembler.push(&record_json("a"));
        assert_eq!(records.len(), 1);
        assert!(assembler.push(",\n").is_empty());
        assert!(assembler.pending().is_empty());
    }

    #[test]
    fn test_braces_inside_strings_do_not_close_early() {
        let mut assembler = RecordAssembler::new();
        let records = assembler.push(&record_json("a } inside { text"));
        assert_eq!(texts(&records), vec!["a } inside { text"]);
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let mut assembler = RecordAssembler::new();
        let records = assembler.push(&record_json(r#"she said \"hi\" { ok }"#));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_malformed_span_between_valid_records() {
        let mut assembler = RecordAssembler::new();
        let body = format!(
            "{} {{broken: }} {}",
            record_json("first"),
            record_json("second")
        );
        let records = assembler.push(&body);
        assert_eq!(texts(&records), vec!["first", "second"]);
    }

    #[test]
    fn test_incomplete_tail_retained_from_candidate_start() {
        let mut assembler = RecordAssembler::new();
        assert!(assembler.push("junk before {\"cand").is_empty());
        assert_eq!(assembler.pending(), "{\"cand");
    }

    #[test]
    fn test_push_boundary_invariance() {
        let body = format!(
            "[{},\n{},\n{}]",
            record_json("alpha"),
            record_json("beta"),
            record_json("gamma")
        );

        let mut whole = RecordAssembler::new();
        let expected = texts(&whole.push(&body));

        for split in 0..=body.len() {
            if !body.is_char_boundary(split) {
                continue;
            }
            let mut assembler = RecordAssembler::new();
            let mut got = assembler.push(&body[..split]);
            got.extend(assembler.push(&body[split..]));
            assert_eq!(texts(&got), expected, "split at {}", split);
        }
    }
}
