//! LLM Provider Integration
//!
//! Client for an OpenAI-compatible chat-completion API with streaming and
//! function calling.
//!
//! ## Architecture
//!
//! - **Client**: sends the request and checks the status before any stream opens
//! - **Request**: message, role and tool-definition types sent to the provider
//! - **Stream**: SSE bytes decoded into [`ChatCompletionChunk`](crate::relay::ChatCompletionChunk)s

mod client;
mod request;

pub use client::{decode_chunks, ChunkStream, ProviderClient, ProviderError};
pub use request::{ChatMessage, ChatRequest, FunctionDefinition, Role, ToolDefinition};
