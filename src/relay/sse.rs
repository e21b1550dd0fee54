//! Server-Sent Events Decoder
//!
//! Incremental decoder for the provider's `text/event-stream` body. Bytes are
//! buffered until a full line is available, so lines (and UTF-8 sequences)
//! may be split across network chunks.

/// Payload marking the end of a chat-completion stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Joined `data:` lines of one event
    Data(String),
    /// The provider sent `[DONE]`
    Done,
}

/// Line-oriented SSE decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `[DONE]` has been seen; later input is ignored
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk of bytes, returning every event it completes
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.buf.extend_from_slice(bytes);

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let line = String::from_utf8_lossy(&line).into_owned();
            if let Some(event) = self.process_line(&line) {
                let is_done = event == SseEvent::Done;
                events.push(event);
                if is_done {
                    self.buf.clear();
                    break;
                }
            }
        }

        events
    }

    /// Flush at end of input; an unterminated trailing event is still dispatched
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&rest);
            let line = line.trim_end_matches('\r').to_string();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        if let Some(event) = self.dispatch() {
            events.push(event);
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment / keepalive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data.push(value.to_string());
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            return None;
        }

        let payload = self.data.join("\n");
        self.data.clear();

        if payload.trim() == DONE_SENTINEL {
            self.done = true;
            Some(SseEvent::Done)
        } else {
            Some(SseEvent::Data(payload))
        }
    }
}
