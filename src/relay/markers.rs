//! Stream Markers
//!
//! Sentinel tokens interleaved with prose in the chunked response body. The
//! browser matches them literally, so the byte layout below is fixed:
//!
//! ```text
//! \n__TOOL_CALL_START__\n__TOOL_DATA__:<json>\n__TOOL_CALL_END__\n
//! ```
//!
//! [`MarkerParser`] is the reading side, used by the CLI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TOOL_CALL_START: &str = "__TOOL_CALL_START__";
pub const TOOL_DATA_PREFIX: &str = "__TOOL_DATA__:";
pub const TOOL_CALL_END: &str = "__TOOL_CALL_END__";

/// Line appended when the stream has to be cut short
pub const APOLOGY: &str =
    "\n\nSorry, I ran into a problem while working on that. Please try again.";

const BLOCK_OPEN: &str = "\n__TOOL_CALL_START__\n";
const BLOCK_CLOSE: &str = "__TOOL_CALL_END__\n";

/// Payload carried by `__TOOL_DATA__:`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallCard {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub result: Value,
}

/// Render the marker block for one executed call
pub fn encode_block(card: &ToolCallCard) -> Result<String, serde_json::Error> {
    let data = serde_json::to_string(card)?;
    Ok(format!(
        "\n{}\n{}{}\n{}\n",
        TOOL_CALL_START, TOOL_DATA_PREFIX, data, TOOL_CALL_END
    ))
}

/// Item recovered from the relayed stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Text(String),
    ToolCall(ToolCallCard),
}

/// Incremental parser for relayed text
///
/// Chunk boundaries may fall anywhere, including inside a marker. Only the
/// tail that could still turn into a marker block is withheld.
#[derive(Debug, Default)]
pub struct MarkerParser {
    buf: String,
}

impl MarkerParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Vec<StreamItem> {
        self.buf.push_str(chunk);
        let mut items = Vec::new();

        loop {
            let Some(start) = self.buf.find(BLOCK_OPEN) else {
                let keep = partial_suffix_len(&self.buf, BLOCK_OPEN);
                let emit = self.buf.len() - keep;
                push_text(&mut items, self.buf.drain(..emit).collect());
                break;
            };

            let body_start = start + BLOCK_OPEN.len();
            let Some(rel_end) = self.buf[body_start..].find(BLOCK_CLOSE) else {
                // Block still open: release the prose in front of it
                push_text(&mut items, self.buf.drain(..start).collect());
                break;
            };

            let body_end = body_start + rel_end;
            let body = self.buf[body_start..body_end].to_string();
            push_text(&mut items, self.buf[..start].to_string());
            self.buf.drain(..body_end + BLOCK_CLOSE.len());

            match parse_body(&body) {
                Some(card) => items.push(StreamItem::ToolCall(card)),
                None => tracing::warn!(body = %body, "Ignoring unreadable tool-call block"),
            }
        }

        items
    }

    /// Flush whatever is left once the stream closes
    pub fn finish(&mut self) -> Vec<StreamItem> {
        let mut items = Vec::new();
        push_text(&mut items, std::mem::take(&mut self.buf));
        items
    }
}

fn push_text(items: &mut Vec<StreamItem>, text: String) {
    if text.is_empty() {
        return;
    }
    // Merge with a preceding text item so callers see one run of prose
    if let Some(StreamItem::Text(prev)) = items.last_mut() {
        prev.push_str(&text);
    } else {
        items.push(StreamItem::Text(text));
    }
}

fn parse_body(body: &str) -> Option<ToolCallCard> {
    let line = body.trim_end_matches('\n');
    let json = line.strip_prefix(TOOL_DATA_PREFIX)?;
    serde_json::from_str(json).ok()
}

/// Length of the longest proper prefix of `pattern` that `text` ends with
fn partial_suffix_len(text: &str, pattern: &str) -> usize {
    let max = pattern.len().saturating_sub(1).min(text.len());
    (1..=max)
        .rev()
        .find(|&k| text.ends_with(&pattern[..k]))
        .unwrap_or(0)
}
