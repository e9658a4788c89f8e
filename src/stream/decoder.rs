/// Decodes a raw byte stream into text without assuming chunk boundaries
/// fall on UTF-8 sequence boundaries. An incomplete trailing sequence is
/// held back until the next chunk; genuinely invalid bytes come out as
/// U+FFFD so the stream always makes progress.
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Decode the next chunk, returning whatever text is complete so far.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let keep = incomplete_suffix_len(&self.pending);
        let tail = self.pending.split_off(self.pending.len() - keep);
        let ready = std::mem::replace(&mut self.pending, tail);
        String::from_utf8_lossy(&ready).into_owned()
    }

    /// Flush the held-back tail at end of stream. A sequence that never
    /// completed decodes lossily.
    pub fn finish(&mut self) -> String {
        let tail = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&tail).into_owned()
    }
}

/// Length of the trailing bytes that start a multi-byte sequence the buffer
/// does not yet contain in full. 0 when the buffer ends on a character
/// boundary or in bytes no continuation could ever repair.
fn incomplete_suffix_len(buf: &[u8]) -> usize {
    // A UTF-8 sequence is at most four bytes, so only the tail matters.
    let start = buf.len().saturating_sub(3);
    for (offset, &byte) in buf[start..].iter().enumerate() {
        let index = start + offset;
        let needed = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => continue,
        };
        let available = buf.len() - index;
        if available < needed && buf[index + 1..].iter().all(|b| (0x80..=0xBF).contains(b)) {
            return available;
        }
    }
    0
}
