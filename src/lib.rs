//! # StudyHub
//!
//! Backend for the StudyHub study assistant. Relays a streamed LLM chat
//! completion to the browser, turning the model's tool calls into study
//! sessions and practice tasks in the study backend.
//!
//! ## Features
//!
//! - **Streaming relay**: prose is forwarded as soon as it arrives
//! - **Tool-call reassembly**: fragmented function calls are rebuilt and run in order
//! - **Client markers**: executed calls are announced with literal sentinel blocks
//! - **Study context**: subjects and upcoming exams are added to the prompt
//!
//! ## Modules
//!
//! - [`relay`]: Delta decoding, tool-call accumulation, markers and the relay loop
//! - [`provider`]: Chat-completion client
//! - [`backend`]: Study backend REST client
//! - [`tools`]: Tool catalogue and handler
//! - [`assistant`]: Prompt assembly
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studyhub::relay::{MarkerParser, StreamItem};
//!
//! let mut parser = MarkerParser::new();
//! for item in parser.push("Booked it!\n__TOOL_CALL_START__\n") {
//!     if let StreamItem::Text(text) = item {
//!         print!("{}", text);
//!     }
//! }
//! ```

pub mod api;
pub mod assistant;
pub mod backend;
pub mod config;
pub mod provider;
pub mod relay;
pub mod tools;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, AppState};

pub use assistant::{build_messages, load_context, StudyContext};

pub use backend::{BackendClient, BackendError};

pub use config::{
    AssistantConfig, BackendConfig, Config, ConfigError, LoggingConfig, ProviderConfig,
    ServerConfig,
};

pub use provider::{ChatMessage, ChatRequest, ProviderClient, ProviderError, Role};

pub use relay::{
    relay_stream, run_relay, MarkerParser, RelayError, RelaySummary, StreamItem, ToolCall,
    ToolCallAccumulator, ToolCallCard, ToolError, ToolHandler,
};

pub use tools::{tool_definitions, StudyToolHandler};
