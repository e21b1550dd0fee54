//! Tool-Call Accumulator
//!
//! Reassembles indexed function calls from streamed fragments and decides
//! when each call is complete.
//!
//! The provider never says "this call is finished". A call at index `i` is
//! considered *superseded* once fragments for a higher index arrive, and it is
//! released when it is superseded, named, and its arguments are empty or parse
//! as a complete JSON object. Calls are released strictly in index order, so a call whose
//! arguments are still open holds back every higher index until it closes or
//! the stream ends. At end of stream everything left is released.
//!
//! The policy relies on the provider never revisiting an index after it has
//! been released. Such fragments are dropped with a warning.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::wire::{Delta, ToolCallDelta};

/// A fully reassembled function call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub index: u32,
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Output of the accumulator, in the order it must be relayed
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Prose to forward untouched
    Text(String),
    /// A complete call ready for its handler
    Call(ToolCall),
    /// A call whose arguments never formed valid JSON
    Malformed {
        index: u32,
        name: String,
        raw_arguments: String,
        error: String,
    },
}

#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl PartialCall {
    /// Whether a superseded call can be released
    ///
    /// Empty arguments count as `{}` for tools that take none.
    fn is_ready(&self) -> bool {
        if self.name.is_empty() {
            return false;
        }
        let arguments = self.arguments.trim();
        arguments.is_empty()
            || serde_json::from_str::<Value>(arguments)
                .map(|v| v.is_object())
                .unwrap_or(false)
    }
}

/// Incremental tool-call state for one streamed response
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    pending: BTreeMap<u32, PartialCall>,
    released: BTreeSet<u32>,
    highest_index: Option<u32>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls seen but not yet released
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of calls released so far
    pub fn released_len(&self) -> usize {
        self.released.len()
    }

    /// Consume one delta
    pub fn push_delta(&mut self, delta: &Delta) -> Vec<RelayEvent> {
        let mut events = Vec::new();

        if let Some(content) = delta.content.as_deref() {
            if !content.is_empty() {
                events.push(RelayEvent::Text(content.to_string()));
            }
        }

        if let Some(fragments) = delta.tool_calls.as_deref() {
            for fragment in fragments {
                self.absorb(fragment);
            }
            events.extend(self.release_ready());
        }

        events
    }

    /// End of stream: release every pending call in index order
    pub fn finish(&mut self) -> Vec<RelayEvent> {
        let pending = std::mem::take(&mut self.pending);

        pending
            .into_iter()
            .map(|(index, call)| {
                self.released.insert(index);
                finalize(index, call)
            })
            .collect()
    }

    fn absorb(&mut self, fragment: &ToolCallDelta) {
        let index = fragment.index;

        if self.released.contains(&index) {
            tracing::warn!(
                index,
                "Dropping fragment for a tool call that was already released"
            );
            return;
        }

        let call = self.pending.entry(index).or_default();

        if let Some(id) = fragment.id.as_deref() {
            if !id.is_empty() && call.id.is_none() {
                call.id = Some(id.to_string());
            }
        }

        if let Some(function) = &fragment.function {
            if let Some(name) = function.name.as_deref() {
                call.name.push_str(name);
            }
            if let Some(arguments) = function.arguments.as_deref() {
                call.arguments.push_str(arguments);
            }
        }

        self.highest_index = Some(self.highest_index.map_or(index, |h| h.max(index)));
    }

    fn release_ready(&mut self) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        let Some(highest) = self.highest_index else {
            return events;
        };

        while let Some(entry) = self.pending.first_entry() {
            let index = *entry.key();
            if index >= highest || !entry.get().is_ready() {
                break;
            }

            let call = entry.remove();
            self.released.insert(index);
            events.push(finalize(index, call));
        }

        events
    }
}

fn finalize(index: u32, call: PartialCall) -> RelayEvent {
    let PartialCall {
        id,
        name,
        arguments,
    } = call;

    if name.is_empty() {
        return RelayEvent::Malformed {
            index,
            name,
            raw_arguments: arguments,
            error: "missing function name".to_string(),
        };
    }

    let parsed = if arguments.trim().is_empty() {
        Ok(Value::Object(Default::default()))
    } else {
        serde_json::from_str::<Value>(&arguments)
    };

    match parsed {
        Ok(value) => RelayEvent::Call(ToolCall {
            index,
            id: id.unwrap_or_else(|| format!("call_{}", index)),
            name,
            arguments: value,
        }),
        Err(e) => RelayEvent::Malformed {
            index,
            name,
            raw_arguments: arguments,
            error: e.to_string(),
        },
    }
}
