//! Chat-Completion REST Client
//!
//! HTTP client for the provider's streaming `POST /chat/completions`.

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::Client;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

use super::request::{ChatRequest, CompletionBody};
use crate::config::ProviderConfig;
use crate::relay::sse::{SseDecoder, SseEvent};
use crate::relay::ChatCompletionChunk;

/// Decoded chunks of one streamed completion
pub type ChunkStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, ProviderError>> + Send>>;

/// Chat-completion API client
pub struct ProviderClient {
    client: Client,
    config: ProviderConfig,
}

impl ProviderClient {
    /// Create a new provider client with the given configuration
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        // Streams can legitimately run for minutes, so only connecting is bounded
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Whether an API key is available
    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Start a streaming completion
    ///
    /// A non-success status is turned into [`ProviderError::Status`] before any
    /// chunk is produced, so callers can still answer with a plain error.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, ProviderError> {
        let api_key = self.api_key().ok_or(ProviderError::NotConfigured)?;
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = CompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            tools: &request.tools,
            tool_choice: (!request.tools.is_empty()).then_some("auto"),
            temperature: self.config.temperature,
            stream: true,
        };

        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Requesting streamed completion"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(decode_chunks(response.bytes_stream()))
    }
}

fn classify(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if e.is_connect() {
        ProviderError::Unavailable
    } else {
        ProviderError::Request(e)
    }
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    queue: VecDeque<Result<ChatCompletionChunk, ProviderError>>,
    exhausted: bool,
}

impl<S> DecodeState<S> {
    fn enqueue(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Data(payload) => {
                    let chunk = serde_json::from_str::<ChatCompletionChunk>(&payload)
                        .map_err(|e| ProviderError::Decode(e.to_string()));
                    self.queue.push_back(chunk);
                }
                SseEvent::Done => self.exhausted = true,
            }
        }
    }
}

/// Turn a raw SSE byte stream into chat-completion chunks
///
/// The stream ends at `[DONE]` or when the bytes run out, whichever is first.
pub fn decode_chunks<S, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        queue: VecDeque::new(),
        exhausted: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queue.pop_front() {
                return Some((item, st));
            }
            if st.exhausted {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(bytes)) => {
                    let events = st.decoder.push(&bytes);
                    st.enqueue(events);
                }
                Some(Err(e)) => {
                    st.exhausted = true;
                    st.queue.push_back(Err(e.into()));
                }
                None => {
                    let events = st.decoder.finish();
                    st.enqueue(events);
                    st.exhausted = true;
                }
            }
        }
    }))
}

/// Errors that can occur when talking to the provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider API key is not configured")]
    NotConfigured,

    #[error("Provider unavailable")]
    Unavailable,

    #[error("Provider request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed stream chunk: {0}")]
    Decode(String),
}
