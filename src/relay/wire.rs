//! Provider Wire Types
//!
//! Serde types for the chat-completion streaming format. Every field the
//! provider may omit is optional, and unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// One `data:` payload of a streaming chat completion
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatCompletionChunk {
    /// Delta of the first choice, the only one relayed
    pub fn first_delta(&self) -> Option<&Delta> {
        self.choices.first().map(|c| &c.delta)
    }

    /// Finish reason of the first choice, if the provider sent one
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental fragment of the assistant message
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

impl Delta {
    /// Delta carrying prose only
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Delta carrying a single tool-call fragment
    pub fn tool_call(fragment: ToolCallDelta) -> Self {
        Self {
            tool_calls: Some(vec![fragment]),
            ..Default::default()
        }
    }
}

/// Fragment of one indexed function call
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

impl ToolCallDelta {
    /// Opening fragment: carries the id and function name
    pub fn start(index: u32, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
            kind: Some("function".to_string()),
            function: Some(FunctionDelta {
                name: Some(name.into()),
                arguments: Some(String::new()),
            }),
        }
    }

    /// Continuation fragment: carries a slice of the arguments JSON
    pub fn arguments(index: u32, fragment: impl Into<String>) -> Self {
        Self {
            index,
            id: None,
            kind: None,
            function: Some(FunctionDelta {
                name: None,
                arguments: Some(fragment.into()),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}
