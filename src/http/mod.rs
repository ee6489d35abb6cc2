//! HTTP Transport layer for the Model Context Protocol
//!
//! Provides the external API routing: the streamable `/mcp` endpoint, the legacy
//! `/sse` + `/messages` pair, and the public metadata endpoints.

use std::{convert::Infallible, sync::Arc};

use axum::response::sse::Event;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::session::SessionTransport;

pub mod handlers;
pub mod sse;
pub mod streamable;

/// Closes the session when the owning stream is dropped, i.e. the client went away.
struct CloseOnDrop(Arc<SessionTransport>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Server-to-client messages of one session as `message` events. Ends when the
/// session closes. With `close_on_drop`, dropping the stream closes the session.
pub(crate) fn session_events(
    transport: &Arc<SessionTransport>,
    close_on_drop: bool,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let mut outbound = transport.subscribe();
    let mut closed = transport.closed_signal();
    let already_closed = transport.is_closed();
    let guard = close_on_drop.then(|| CloseOnDrop(transport.clone()));
    let session_id = transport.id().to_string();

    async_stream::stream! {
        let _guard = guard;
        if already_closed {
            return;
        }

        loop {
            let message = tokio::select! {
                message = outbound.recv() => message,
                changed = closed.changed() => {
                    if changed.is_err() || *closed.borrow() {
                        break;
                    }
                    continue;
                }
            };

            match message {
                Ok(message) => yield Ok(Event::default().event("message").data(message.to_string())),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session_id = %session_id, skipped, "slow event stream dropped messages");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
