//! Streaming Tool-Call Relay
//!
//! Reads a streamed chat completion, forwards prose to the client as it
//! arrives, executes each reassembled tool call, and interleaves marker blocks
//! describing the executed calls.
//!
//! ## Flow
//!
//! 1. [`sse`] decodes the provider body into `data:` payloads
//! 2. [`wire`] types parse each payload into a [`ChatCompletionChunk`]
//! 3. [`accumulator`] reassembles calls and decides when each is complete
//! 4. [`ToolHandler`] runs the side effect, serially and in index order
//! 5. [`markers`] renders the block the browser looks for
//!
//! Any failure after streaming has started ends the body with
//! [`markers::APOLOGY`]. Side effects of earlier calls stay in place.

pub mod accumulator;
pub mod handler;
pub mod markers;
pub mod sse;
pub mod wire;

pub use accumulator::{RelayEvent, ToolCall, ToolCallAccumulator};
pub use handler::{ToolError, ToolHandler};
pub use markers::{MarkerParser, StreamItem, ToolCallCard};
pub use wire::{ChatCompletionChunk, Delta, ToolCallDelta};

use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::provider::ProviderError;

/// Capacity of the channel between the relay task and the response body
pub const RELAY_CHANNEL_CAPACITY: usize = 64;

/// Counters for one relayed response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelaySummary {
    pub prose_bytes: usize,
    pub calls_executed: usize,
    pub calls_skipped: usize,
}

/// Reasons a relay stops early
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Provider stream failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool '{name}' failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: ToolError,
    },

    #[error("Failed to encode tool-call markers: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Client disconnected")]
    ClientGone,
}

/// Relay a chunk stream into `tx`
///
/// Returns on end of stream, or with the first error. Nothing is written to
/// `tx` for the error itself; see [`run_relay`].
pub async fn relay_stream<S, H>(
    mut chunks: S,
    handler: &H,
    tx: &mpsc::Sender<String>,
) -> Result<RelaySummary, RelayError>
where
    S: Stream<Item = Result<ChatCompletionChunk, ProviderError>> + Unpin,
    H: ToolHandler + ?Sized,
{
    let mut acc = ToolCallAccumulator::new();
    let mut summary = RelaySummary::default();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;

        if let Some(delta) = chunk.first_delta() {
            for event in acc.push_delta(delta) {
                apply(event, handler, tx, &mut summary).await?;
            }
        }

        if let Some(reason) = chunk.finish_reason() {
            tracing::debug!(finish_reason = reason, "Provider finished");
        }
    }

    for event in acc.finish() {
        apply(event, handler, tx, &mut summary).await?;
    }

    Ok(summary)
}

/// Relay to completion, appending the apology line on failure
///
/// Consumes `tx`, so the response body ends once this returns.
pub async fn run_relay<S, H>(
    chunks: S,
    handler: H,
    tx: mpsc::Sender<String>,
) -> Result<RelaySummary, RelayError>
where
    S: Stream<Item = Result<ChatCompletionChunk, ProviderError>> + Unpin,
    H: ToolHandler,
{
    match relay_stream(chunks, &handler, &tx).await {
        Ok(summary) => {
            tracing::info!(
                prose_bytes = summary.prose_bytes,
                calls_executed = summary.calls_executed,
                calls_skipped = summary.calls_skipped,
                "Relay finished"
            );
            Ok(summary)
        }
        Err(RelayError::ClientGone) => {
            tracing::info!("Client went away, relay stopped");
            Err(RelayError::ClientGone)
        }
        Err(e) => {
            tracing::error!(error = %e, "Relay aborted");
            let _ = tx.send(markers::APOLOGY.to_string()).await;
            Err(e)
        }
    }
}

async fn apply<H>(
    event: RelayEvent,
    handler: &H,
    tx: &mpsc::Sender<String>,
    summary: &mut RelaySummary,
) -> Result<(), RelayError>
where
    H: ToolHandler + ?Sized,
{
    match event {
        RelayEvent::Text(text) => {
            summary.prose_bytes += text.len();
            send(tx, text).await
        }
        RelayEvent::Malformed {
            index,
            name,
            raw_arguments,
            error,
        } => {
            tracing::warn!(
                index,
                tool = %name,
                arguments = %raw_arguments,
                error = %error,
                "Skipping tool call with malformed arguments"
            );
            summary.calls_skipped += 1;
            Ok(())
        }
        RelayEvent::Call(call) => {
            if tx.is_closed() {
                return Err(RelayError::ClientGone);
            }

            tracing::info!(index = call.index, call_id = %call.id, tool = %call.name, "Executing tool call");

            match handler.handle(&call).await {
                Ok(result) => {
                    let block = markers::encode_block(&ToolCallCard {
                        id: call.id,
                        name: call.name,
                        arguments: call.arguments,
                        result,
                    })?;
                    summary.calls_executed += 1;
                    send(tx, block).await
                }
                Err(e) if e.is_skippable() => {
                    tracing::warn!(index = call.index, tool = %call.name, error = %e, "Skipping tool call");
                    summary.calls_skipped += 1;
                    Ok(())
                }
                Err(source) => Err(RelayError::Tool {
                    name: call.name,
                    source,
                }),
            }
        }
    }
}

async fn send(tx: &mpsc::Sender<String>, text: String) -> Result<(), RelayError> {
    tx.send(text).await.map_err(|_| RelayError::ClientGone)
}
