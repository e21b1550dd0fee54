//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::provider::ChatMessage;

// ============================================
// ASSISTANT DTOs
// ============================================

/// Chat request from the browser
#[derive(Debug, Deserialize)]
pub struct AssistantChatRequest {
    /// Conversation so far, oldest first; the last entry is the new user message
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", "unhealthy"
    pub status: String,
    /// Provider status: "configured" or "not_configured"
    pub provider: String,
    /// Backend status: "ok" or "unreachable"
    pub backend: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}
