//! Server-to-client messaging for one protocol session
//!
//! Carries notifications and server-initiated requests (`sampling/createMessage`) out over
//! whatever stream the transport attached, and matches client replies to pending requests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
};

use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use tracing::debug;

const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SamplingError {
    #[error("client cannot service sampling requests")]
    Unavailable,
    #[error("sampling request failed: {0}")]
    Failed(String),
}

type PendingReply = oneshot::Sender<Result<Value, String>>;

pub struct Peer {
    outbound: broadcast::Sender<Value>,
    pending: Mutex<HashMap<String, PendingReply>>,
    next_request_id: AtomicU64,
    sampling_supported: AtomicBool,
}

impl Default for Peer {
    fn default() -> Self {
        Self::new()
    }
}

impl Peer {
    pub fn new() -> Self {
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_request_id: AtomicU64::new(1),
            sampling_supported: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.outbound.subscribe()
    }

    /// Returns false when no stream is attached to receive the message.
    pub fn send(&self, message: Value) -> bool {
        self.outbound.send(message).is_ok()
    }

    pub fn set_sampling_supported(&self, supported: bool) {
        self.sampling_supported.store(supported, Ordering::Release);
    }

    pub fn sampling_supported(&self) -> bool {
        self.sampling_supported.load(Ordering::Acquire)
    }

    /// Asks the client's model for a completion of a single user prompt.
    pub async fn create_message(&self, prompt: &str, max_tokens: u32) -> Result<String, SamplingError> {
        if !self.sampling_supported() {
            return Err(SamplingError::Unavailable);
        }

        let request_id = format!(
            "server-{}",
            self.next_request_id.fetch_add(1, Ordering::Relaxed)
        );
        let (reply_tx, reply_rx) = oneshot::channel();
        self.lock_pending().insert(request_id.clone(), reply_tx);

        let request = json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "method": "sampling/createMessage",
            "params": {
                "messages": [{
                    "role": "user",
                    "content": { "type": "text", "text": prompt }
                }],
                "maxTokens": max_tokens
            }
        });

        if !self.send(request) {
            self.lock_pending().remove(&request_id);
            return Err(SamplingError::Unavailable);
        }
        debug!(request_id = %request_id, "sampling request sent");

        let result = reply_rx
            .await
            .map_err(|_| SamplingError::Failed("session closed before reply".to_string()))?
            .map_err(SamplingError::Failed)?;

        result
            .get("content")
            .and_then(|content| content.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SamplingError::Failed("reply carried no text content".to_string()))
    }

    /// Routes a client reply to the waiting request. Returns false for unknown ids.
    pub fn resolve(&self, reply: &Value) -> bool {
        let Some(request_id) = reply.get("id").map(reply_key) else {
            return false;
        };

        let Some(waiter) = self.lock_pending().remove(&request_id) else {
            debug!(request_id = %request_id, "reply for unknown request dropped");
            return false;
        };

        let outcome = match reply.get("error") {
            Some(error) => Err(error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("client returned an error")
                .to_string()),
            None => Ok(reply.get("result").cloned().unwrap_or(Value::Null)),
        };

        waiter.send(outcome).is_ok()
    }

    /// Fails every outstanding request; used when the session closes.
    pub fn cancel_pending(&self) {
        self.lock_pending().clear();
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingReply>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn reply_key(id: &Value) -> String {
    match id {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{Peer, SamplingError};

    #[tokio::test]
    async fn sampling_is_unavailable_without_capability() {
        let peer = Peer::new();
        let _stream = peer.subscribe();

        assert_eq!(
            peer.create_message("refine", 16).await,
            Err(SamplingError::Unavailable)
        );
    }

    #[tokio::test]
    async fn sampling_is_unavailable_without_attached_stream() {
        let peer = Peer::new();
        peer.set_sampling_supported(true);

        assert_eq!(
            peer.create_message("refine", 16).await,
            Err(SamplingError::Unavailable)
        );
    }

    #[tokio::test]
    async fn sampling_round_trip_resolves_reply_text() {
        let peer = Arc::new(Peer::new());
        peer.set_sampling_supported(true);
        let mut stream = peer.subscribe();

        let requester = {
            let peer = peer.clone();
            tokio::spawn(async move { peer.create_message("refine: cats", 32).await })
        };

        let request = stream.recv().await.expect("sampling request");
        assert_eq!(request["method"], "sampling/createMessage");
        assert_eq!(request["params"]["maxTokens"], 32);
        assert_eq!(
            request["params"]["messages"][0]["content"]["text"],
            "refine: cats"
        );

        assert!(peer.resolve(&json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "result": {
                "role": "assistant",
                "content": { "type": "text", "text": "funny cat videos" },
                "model": "test-model"
            }
        })));

        let text = requester.await.expect("join").expect("sampling reply");
        assert_eq!(text, "funny cat videos");
    }

    #[tokio::test]
    async fn client_error_reply_fails_request() {
        let peer = Arc::new(Peer::new());
        peer.set_sampling_supported(true);
        let mut stream = peer.subscribe();

        let requester = {
            let peer = peer.clone();
            tokio::spawn(async move { peer.create_message("format", 32).await })
        };

        let request = stream.recv().await.expect("sampling request");
        assert!(peer.resolve(&json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": { "code": -1, "message": "user rejected sampling" }
        })));

        assert_eq!(
            requester.await.expect("join"),
            Err(SamplingError::Failed("user rejected sampling".to_string()))
        );
    }

    #[test]
    fn unknown_reply_is_ignored() {
        let peer = Peer::new();
        assert!(!peer.resolve(&json!({"jsonrpc": "2.0", "id": "server-99", "result": {}})));
    }
}
