//! Tool handler seam
//!
//! The relay hands every released call to a [`ToolHandler`]. Implementations
//! perform the side effect and return the JSON shown on the client's tool card.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::accumulator::ToolCall;
use crate::backend::BackendError;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute one call
    async fn handle(&self, call: &ToolCall) -> Result<Value, ToolError>;
}

/// Errors returned by tool handlers
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments were valid JSON but not a valid request
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    /// Whether the relay may skip this call and keep streaming
    pub fn is_skippable(&self) -> bool {
        matches!(self, ToolError::InvalidArguments(_) | ToolError::UnknownTool(_))
    }
}
