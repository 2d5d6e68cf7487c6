//! Incremental assembly of a chat-completions `text/event-stream` body.
//!
//! The transport hands over raw byte chunks whose boundaries are arbitrary:
//! a chunk may end mid-line, mid-UTF-8-sequence, or mid-JSON. The assembler
//! buffers until a full `data:` line is available, extracts the token delta
//! from it, and exposes the growing text after every feed. It is a lenient
//! reader, not a strict protocol decoder: a frame that can never parse is
//! dropped rather than aborting the stream, since losing one fragment only
//! degrades the rendering, never persisted state.

use serde::Deserialize;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Result of feeding one transport chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamUpdate {
    /// Text extracted from frames completed by this chunk. Empty when the
    /// chunk did not complete any frame.
    pub delta: String,
    /// True once the end-of-stream sentinel has been observed.
    pub done: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

impl StreamChunk {
    fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.delta.content)
    }
}

#[derive(Debug, Default)]
pub struct StreamAssembler {
    buf: Vec<u8>,
    accumulated: String,
    done: bool,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full text assembled so far.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume the next transport chunk and extract whatever complete frames
    /// it makes available. Never fails: malformed frames are skipped, frames
    /// split across chunk boundaries wait for the rest to arrive.
    pub fn feed(&mut self, chunk: &[u8]) -> StreamUpdate {
        self.buf.extend_from_slice(chunk);
        let mut delta = String::new();

        while !self.done {
            let Some(nl) = self.buf.iter().position(|&b| b == b'\n') else {
                break;
            };
            let mut line_end = nl;
            if line_end > 0 && self.buf[line_end - 1] == b'\r' {
                line_end -= 1;
            }
            let line = String::from_utf8_lossy(&self.buf[..line_end]).into_owned();

            if line.is_empty() || line.starts_with(':') {
                self.buf.drain(..=nl);
                continue;
            }
            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                // Other SSE fields (event:, id:, retry:) carry nothing we need.
                self.buf.drain(..=nl);
                continue;
            };
            let payload = payload.trim();
            if payload == DONE_SENTINEL {
                self.done = true;
                self.buf.drain(..=nl);
                break;
            }

            match serde_json::from_str::<StreamChunk>(payload) {
                Ok(frame) => {
                    if let Some(text) = frame.into_content() {
                        self.accumulated.push_str(&text);
                        delta.push_str(&text);
                    }
                    self.buf.drain(..=nl);
                }
                Err(e) if e.is_eof() => {
                    // The frame was cut at a chunk boundary that happened to
                    // carry a newline. Drop only the terminator so the rest
                    // of the payload rejoins the line when it arrives.
                    self.buf.drain(line_end..=nl);
                    break;
                }
                Err(_) => {
                    self.buf.drain(..=nl);
                }
            }
        }

        StreamUpdate {
            delta,
            done: self.done,
        }
    }

    /// Best-effort pass over whatever is still buffered once the transport
    /// ends without a trailing terminator. A well-formed residual frame is
    /// extracted; anything else is discarded silently.
    pub fn finalize(mut self) -> String {
        // Complete lines may still be queued if a feed stopped early.
        let _ = self.feed(b"");
        if !self.done && !self.buf.is_empty() {
            let line = String::from_utf8_lossy(&self.buf).into_owned();
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
                let payload = payload.trim();
                if payload != DONE_SENTINEL
                    && let Ok(frame) = serde_json::from_str::<StreamChunk>(payload)
                    && let Some(text) = frame.into_content()
                {
                    self.accumulated.push_str(&text);
                }
            }
        }
        self.accumulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n",
            serde_json::to_string(content).unwrap()
        )
    }

    #[test]
    fn assembles_fragments_across_frames() {
        let mut assembler = StreamAssembler::new();
        assembler.feed(frame("Hel").as_bytes());
        assembler.feed(frame("lo").as_bytes());
        let last = assembler.feed(b"data: [DONE]\n\n");

        assert_eq!(assembler.accumulated(), "Hello");
        assert!(last.done);
    }

    #[test]
    fn chunking_does_not_change_the_result() {
        let body = format!("{}{}{}", frame("one "), frame("two "), "data: [DONE]\n\n");

        // One call with everything.
        let mut whole = StreamAssembler::new();
        let update = whole.feed(body.as_bytes());
        assert!(update.done);

        // One byte at a time.
        let mut tiny = StreamAssembler::new();
        for byte in body.as_bytes() {
            tiny.feed(std::slice::from_ref(byte));
        }

        // Arbitrary split points.
        let mut split = StreamAssembler::new();
        for part in body.as_bytes().chunks(7) {
            split.feed(part);
        }

        assert_eq!(whole.accumulated(), "one two ");
        assert_eq!(tiny.accumulated(), "one two ");
        assert_eq!(split.accumulated(), "one two ");
        assert!(tiny.is_done() && split.is_done());
    }

    #[test]
    fn multibyte_characters_survive_byte_level_chunking() {
        let body = format!("{}{}", frame("héllo ← 🌍"), "data: [DONE]\n\n");
        let mut assembler = StreamAssembler::new();
        for byte in body.as_bytes() {
            assembler.feed(std::slice::from_ref(byte));
        }
        assert_eq!(assembler.accumulated(), "héllo ← 🌍");
    }

    #[test]
    fn sentinel_stops_processing_within_the_same_feed() {
        let body = format!("data: [DONE]\n\n{}", frame("after"));
        let mut assembler = StreamAssembler::new();
        let update = assembler.feed(body.as_bytes());

        assert!(update.done);
        assert_eq!(update.delta, "");
        assert_eq!(assembler.accumulated(), "");
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let plain = format!("{}{}", frame("a"), frame("b"));
        let noisy = format!(": keep-alive\n\n{}: another comment\n\n\n{}", frame("a"), frame("b"));

        let mut a = StreamAssembler::new();
        a.feed(plain.as_bytes());
        let mut b = StreamAssembler::new();
        b.feed(noisy.as_bytes());

        assert_eq!(a.accumulated(), b.accumulated());
        assert_eq!(b.accumulated(), "ab");
    }

    #[test]
    fn non_data_fields_are_skipped() {
        let body = format!("event: message\nid: 42\n{}", frame("x"));
        let mut assembler = StreamAssembler::new();
        assembler.feed(body.as_bytes());
        assert_eq!(assembler.accumulated(), "x");
    }

    #[test]
    fn frame_split_after_an_embedded_newline_is_rejoined() {
        let mut assembler = StreamAssembler::new();
        let first = assembler.feed(b"data: {\"choices\":[{\"delta\":\n");
        assert_eq!(first.delta, "");

        let second = assembler.feed(b"{\"content\":\"Hi\"}}]}\n");
        assert_eq!(second.delta, "Hi");
        assert_eq!(assembler.accumulated(), "Hi");
    }

    #[test]
    fn malformed_frame_is_skipped_without_stalling() {
        let body = format!("data: {{\"choices\":}}\n{}", frame("ok"));
        let mut assembler = StreamAssembler::new();
        let update = assembler.feed(body.as_bytes());

        assert_eq!(update.delta, "ok");
        assert_eq!(assembler.accumulated(), "ok");
    }

    #[test]
    fn frames_without_content_contribute_nothing() {
        let body = "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\
                    data: {\"choices\":[]}\n";
        let mut assembler = StreamAssembler::new();
        let update = assembler.feed(body.as_bytes());
        assert_eq!(update.delta, "");
    }

    #[test]
    fn carriage_return_terminators_are_accepted() {
        let body =
            "data: {\"choices\":[{\"delta\":{\"content\":\"crlf\"}}]}\r\n\r\ndata: [DONE]\r\n";
        let mut assembler = StreamAssembler::new();
        let update = assembler.feed(body.as_bytes());
        assert_eq!(assembler.accumulated(), "crlf");
        assert!(update.done);
    }

    #[test]
    fn finalize_extracts_a_wellformed_residual_frame() {
        let mut assembler = StreamAssembler::new();
        assembler.feed(frame("start ").as_bytes());
        // Residual frame with no trailing newline.
        assembler.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}");
        assert_eq!(assembler.accumulated(), "start ");

        assert_eq!(assembler.finalize(), "start end");
    }

    #[test]
    fn finalize_discards_a_truncated_residual() {
        let mut assembler = StreamAssembler::new();
        assembler.feed(frame("kept").as_bytes());
        assembler.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"lo");
        assert_eq!(assembler.finalize(), "kept");
    }

    #[test]
    fn feeds_after_done_are_ignored() {
        let mut assembler = StreamAssembler::new();
        assembler.feed(b"data: [DONE]\n");
        let update = assembler.feed(frame("late").as_bytes());
        assert_eq!(update.delta, "");
        assert!(update.done);
        assert_eq!(assembler.accumulated(), "");
    }
}
