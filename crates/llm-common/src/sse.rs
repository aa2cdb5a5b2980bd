//! Incremental decoder for the `text/event-stream` body of a streaming
//! chat-completions response.
//!
//! Bytes are buffered until a blank line closes an event, so multi-byte
//! characters split across network chunks decode intact. Each `data:` line
//! carries either a JSON chunk with a content delta or the `[DONE]` marker.

use serde::Deserialize;
use tracing::warn;

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    /// Newly generated content, not the running total.
    Delta(String),
    /// Upstream signalled the end of the completion.
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched for an event boundary.
    scanned: usize,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw body bytes; returns the events completed by them. Nothing is
    /// returned once `Done` has been seen.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<ChatStreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend(bytes.iter().copied().filter(|&b| b != b'\r'));

        let mut out = Vec::new();
        while let Some(idx) = self.find_event_end() {
            let event: Vec<u8> = self.buffer.drain(..idx + 2).collect();
            self.scanned = 0;
            self.decode_event(&event[..idx], &mut out);
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        out
    }

    /// Decode whatever is left once the body has ended, for servers that do
    /// not terminate the final event with a blank line.
    pub fn finish(&mut self) -> Vec<ChatStreamEvent> {
        let mut out = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.scanned = 0;
            self.decode_event(&rest, &mut out);
        }
        out
    }

    /// Offset of the next blank line. Resumes one byte before where the
    /// previous search stopped so a `\n\n` split across pushes is found.
    fn find_event_end(&mut self) -> Option<usize> {
        let from = self.scanned.saturating_sub(1);
        match self.buffer[from..].windows(2).position(|w| w == b"\n\n") {
            Some(i) => Some(from + i),
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    fn decode_event(&mut self, event: &[u8], out: &mut Vec<ChatStreamEvent>) {
        let event = String::from_utf8_lossy(event);
        for line in event.lines() {
            let Some(data) = line.trim().strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == DONE_MARKER {
                self.done = true;
                out.push(ChatStreamEvent::Done);
                return;
            }
            if data.is_empty() {
                continue;
            }
            match serde_json::from_str::<ChatCompletionStreamChunk>(data) {
                Ok(chunk) => {
                    if let Some(piece) = chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content)
                        .filter(|s| !s.is_empty())
                    {
                        out.push(ChatStreamEvent::Delta(piece));
                    }
                }
                Err(e) => warn!(error = %e, "skipping undecodable stream chunk"),
            }
        }
    }
}


#[derive(Debug, Deserialize)]
struct ChatCompletionStreamChunk {
    #[serde(default)]
    choices: Vec<ChatCompletionStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionStreamChoice {
    delta: ChatCompletionStreamDelta,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionStreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(s: &str) -> String {
        format!("data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n", serde_json::json!(s))
    }

    #[test]
    fn decodes_deltas_then_done() {
        let mut dec = SseDecoder::new();
        let body = format!("{}{}data: [DONE]\n\n", delta("Sum"), delta("mary"));
        assert_eq!(
            dec.push(body.as_bytes()),
            vec![
                ChatStreamEvent::Delta("Sum".into()),
                ChatStreamEvent::Delta("mary".into()),
                ChatStreamEvent::Done,
            ]
        );
        assert!(dec.is_done());
    }

    #[test]
    fn events_split_across_chunks() {
        let mut dec = SseDecoder::new();
        let body = delta("Keywords");
        let (a, b) = body.as_bytes().split_at(10);
        assert!(dec.push(a).is_empty());
        assert_eq!(dec.push(b), vec![ChatStreamEvent::Delta("Keywords".into())]);
    }

    #[test]
    fn byte_at_a_time_does_not_rescan_buffered_prefix() {
        let mut dec = SseDecoder::new();
        let long = "word ".repeat(2_000);
        let body = format!("{}{}data: [DONE]\n\n", delta(&long), delta("tail"));
        let mut events = Vec::new();
        for b in body.as_bytes() {
            events.extend(dec.push(std::slice::from_ref(b)));
            assert!(dec.scanned <= dec.buffer.len());
        }
        assert_eq!(
            events,
            vec![
                ChatStreamEvent::Delta(long),
                ChatStreamEvent::Delta("tail".into()),
                ChatStreamEvent::Done,
            ]
        );
    }

    #[test]
    fn blank_line_split_between_pushes() {
        let mut dec = SseDecoder::new();
        let body = delta("x");
        let (a, b) = body.as_bytes().split_at(body.len() - 1);
        assert!(dec.push(a).is_empty());
        assert_eq!(dec.scanned, a.len());
        assert_eq!(dec.push(b), vec![ChatStreamEvent::Delta("x".into())]);
        assert!(dec.buffer.is_empty());
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let mut dec = SseDecoder::new();
        let body = delta("café");
        let bytes = body.as_bytes();
        let cut = body.find('é').map(|i| i + 1).unwrap();
        assert!(dec.push(&bytes[..cut]).is_empty());
        assert_eq!(dec.push(&bytes[cut..]), vec![ChatStreamEvent::Delta("café".into())]);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut dec = SseDecoder::new();
        let body = delta("x").replace('\n', "\r\n");
        assert_eq!(dec.push(body.as_bytes()), vec![ChatStreamEvent::Delta("x".into())]);
    }

    #[test]
    fn role_only_and_comment_lines_are_skipped() {
        let mut dec = SseDecoder::new();
        let body = ": keep-alive\n\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n";
        assert!(dec.push(body.as_bytes()).is_empty());
        assert!(!dec.is_done());
    }

    #[test]
    fn nothing_after_done() {
        let mut dec = SseDecoder::new();
        let body = format!("data: [DONE]\n\n{}", delta("late"));
        assert_eq!(dec.push(body.as_bytes()), vec![ChatStreamEvent::Done]);
        assert!(dec.push(delta("later").as_bytes()).is_empty());
        assert!(dec.finish().is_empty());
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut dec = SseDecoder::new();
        assert!(dec.push(b"data: [DONE]").is_empty());
        assert_eq!(dec.finish(), vec![ChatStreamEvent::Done]);
    }
}
