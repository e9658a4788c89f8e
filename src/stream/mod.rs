pub mod decoder;
pub mod records;
pub mod summary;

pub use decoder::ChunkDecoder;
pub use records::RecordAssembler;
pub use summary::{SummaryAccumulator, SummaryResult};

use log::debug;

/// What one chunk contributed: one refreshed result per completed record
/// that carried text, in record order, and whether the provider's explicit
/// stop marker has been seen.
pub struct ChunkOutcome {
    pub updates: Vec<SummaryResult>,
    pub stop: bool,
}

/// The full per-chunk pipeline for one streaming request: bytes → text →
/// records → accumulated (headline, summary). Chunks are incorporated
/// strictly in arrival order.
pub struct StreamAssembly {
    decoder: ChunkDecoder,
    assembler: RecordAssembler,
    accumulator: SummaryAccumulator,
    saw_stop: bool,
    emissions: usize,
}

impl StreamAssembly {
    pub fn new() -> Self {
        Self {
            decoder: ChunkDecoder::new(),
            assembler: RecordAssembler::new(),
            accumulator: SummaryAccumulator::new(),
            saw_stop: false,
            emissions: 0,
        }
    }

    /// Incorporate one raw chunk.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> ChunkOutcome {
        let text = self.decoder.push(chunk);
        self.absorb(&text)
    }

    /// Flush held-back bytes at end of stream and incorporate whatever they
    /// complete.
    pub fn finish(&mut self) -> ChunkOutcome {
        let tail = self.decoder.finish();
        let outcome = self.absorb(&tail);
        let leftover = self.assembler.pending().len();
        if leftover > 0 {
            debug!("Discarding {} bytes of incomplete record at end of stream", leftover);
        }
        outcome
    }

    fn absorb(&mut self, text: &str) -> ChunkOutcome {
        let mut updates = Vec::new();
        for record in self.assembler.push(text) {
            if record.is_stop() {
                self.saw_stop = true;
            }
            let mut contributed = false;
            for delta in record.deltas() {
                if !delta.is_empty() {
                    contributed = true;
                }
                self.accumulator.push_delta(delta);
            }
            if contributed {
                self.emissions += 1;
                updates.push(self.accumulator.current());
            }
        }
        ChunkOutcome {
            updates,
            stop: self.saw_stop,
        }
    }

    /// The latest derived result, regardless of whether the last chunk
    /// changed it.
    pub fn current(&self) -> SummaryResult {
        self.accumulator.current()
    }

    pub fn saw_stop(&self) -> bool {
        self.saw_stop
    }

    /// How many updates this stream has produced so far.
    pub fn emissions(&self) -> usize {
        self.emissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(text: &str) -> String {
        format!(
            r#"{{"candidates": [{{"content": {{"parts": [{{"text": "{}"}}]}}}}]}}"#,
            text.replace('\n', "\\n")
        )
    }

    fn stop_record_json(text: &str) -> String {
        format!(
            r#"{{"candidates": [{{"content": {{"parts": [{{"text": "{}"}}]}}, "finishReason": "STOP"}}]}}"#,
            text.replace('\n', "\\n")
        )
    }

    #[test]
    fn test_contract_scenario_across_two_chunks() {
        let body = format!(
            "[{},\n{},\n{}]",
            record_json("HEAD"),
            record_json("LINE: Cats\n\nSUMMARY:\nCats "),
            stop_record_json("are great.")
        );
        let bytes = body.as_bytes();
        let mid = bytes.len() / 2;

        let mut assembly = StreamAssembly::new();
        assembly.push_bytes(&bytes[..mid]);
        let outcome = assembly.push_bytes(&bytes[mid..]);

        assert!(outcome.stop);
        let result = assembly.current();
        assert_eq!(result.headline, "Cats");
        assert_eq!(result.summary, "Cats are great.");
    }

    #[test]
    fn test_partition_invariance() {
        let body = format!(
            "[{},\n{},\n{}]",
            record_json("HEADLINE: Waves\n"),
            record_json("SUMMARY:\nWaves move "),
            stop_record_json("energy, not water.")
        );
        let bytes = body.as_bytes();

        let mut whole = StreamAssembly::new();
        whole.push_bytes(bytes);
        whole.finish();
        let expected = whole.current();

        for chunk_size in [1, 2, 3, 5, 7, 16, 64] {
            let mut assembly = StreamAssembly::new();
            for chunk in bytes.chunks(chunk_size) {
                assembly.push_bytes(chunk);
            }
            assembly.finish();
            assert_eq!(assembly.current(), expected, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_stop_marker_reported() {
        let mut assembly = StreamAssembly::new();
        let outcome = assembly.push_bytes(record_json("partial").as_bytes());
        assert!(!outcome.stop);
        assert_eq!(outcome.updates.len(), 1);

        let outcome = assembly.push_bytes(stop_record_json(" and done").as_bytes());
        assert!(outcome.stop);
        assert_eq!(assembly.emissions(), 2);
    }

    #[test]
    fn test_no_update_without_new_text() {
        let mut assembly = StreamAssembly::new();
        let outcome = assembly.push_bytes(b"[\n");
        assert!(outcome.updates.is_empty());
        assert_eq!(assembly.emissions(), 0);
    }

    #[test]
    fn test_one_update_per_contributing_record() {
        let body = format!(
            "[{},\n{}]",
            record_json("first part "),
            record_json("second part")
        );
        let mut assembly = StreamAssembly::new();
        let outcome = assembly.push_bytes(body.as_bytes());

        assert_eq!(outcome.updates.len(), 2);
        assert_eq!(outcome.updates[0].summary, "first part");
        assert_eq!(outcome.updates[1].summary, "first part second part");
    }

    #[test]
    fn test_malformed_record_does_not_abort() {
        let body = format!(
            "{} {{oops}} {}",
            record_json("good one "),
            stop_record_json("good two")
        );
        let mut assembly = StreamAssembly::new();
        let outcome = assembly.push_bytes(body.as_bytes());
        assert!(outcome.stop);
        assert_eq!(assembly.current().summary, "good one good two");
    }

    #[test]
    fn test_multibyte_text_split_mid_character() {
        let body = record_json("résumé");
        let bytes = body.as_bytes();
        // split inside the é of the payload
        let split = body.find('é').unwrap() + 1;

        let mut assembly = StreamAssembly::new();
        assembly.push_bytes(&bytes[..split]);
        assembly.push_bytes(&bytes[split..]);
        assert_eq!(assembly.current().summary, "résumé");
    }
}
