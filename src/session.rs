//! Session transport registry
//!
//! Maps server-issued session ids to the transport serving that session. A transport
//! is created on first contact, registered once the session is established, and
//! removed by a watcher task as soon as it signals closure.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{mcp::server::McpServer, Services};

pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid or missing session id")]
    InvalidSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Active,
    Closed,
}

/// One live protocol session: its engine plus the close signal.
pub struct SessionTransport {
    id: String,
    server: McpServer,
    closed: watch::Sender<bool>,
}

impl SessionTransport {
    fn new(id: String, services: Services) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id,
            server: McpServer::new(services),
            closed,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn server(&self) -> &McpServer {
        &self.server
    }

    pub fn state(&self) -> SessionState {
        if self.is_closed() {
            SessionState::Closed
        } else if self.server.is_initialized() {
            SessionState::Active
        } else {
            SessionState::Uninitialized
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub async fn handle_payload(&self, payload: Value) -> Option<Value> {
        self.server.handle_payload(payload).await
    }

    /// Server-to-client messages for an attached stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.server.peer().subscribe()
    }

    pub fn send(&self, message: Value) -> bool {
        self.server.peer().send(message)
    }

    pub fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    /// Signals closure. Only the first call has any effect.
    pub fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        self.server.peer().cancel_pending();
        info!(session_id = %self.id, "session closed");
    }
}

pub struct SessionRegistry {
    services: Services,
    sessions: Mutex<HashMap<String, Arc<SessionTransport>>>,
}

impl SessionRegistry {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the transport for a request.
    ///
    /// A known id yields the registered transport. No id plus an initialize request
    /// yields a fresh, not yet registered transport. Anything else is rejected.
    pub async fn get_or_create(
        &self,
        session_id: Option<&str>,
        is_init_request: bool,
    ) -> Result<(Arc<SessionTransport>, bool), SessionError> {
        let sessions = self.sessions.lock().await;

        match session_id {
            Some(id) => sessions
                .get(id)
                .filter(|transport| !transport.is_closed())
                .map(|transport| (transport.clone(), false))
                .ok_or(SessionError::InvalidSession),
            None if is_init_request => {
                let id = fresh_id(&sessions);
                debug!(session_id = %id, "session created");
                Ok((Arc::new(SessionTransport::new(id, self.services.clone())), true))
            }
            None => Err(SessionError::InvalidSession),
        }
    }

    /// A transport for a stream-first session, which is registered before any message.
    pub async fn create(&self) -> Arc<SessionTransport> {
        let sessions = self.sessions.lock().await;
        let id = fresh_id(&sessions);
        Arc::new(SessionTransport::new(id, self.services.clone()))
    }

    /// Inserts the transport and watches its close signal. Returns false for
    /// closed transports and ids that are already taken.
    pub async fn register(self: &Arc<Self>, transport: &Arc<SessionTransport>) -> bool {
        {
            let mut sessions = self.sessions.lock().await;
            if transport.is_closed() || sessions.contains_key(transport.id()) {
                return false;
            }
            sessions.insert(transport.id().to_string(), transport.clone());
        }
        info!(session_id = %transport.id(), "session registered");

        let registry = Arc::downgrade(self);
        let mut closed = transport.closed_signal();
        let session_id = transport.id().to_string();
        tokio::spawn(async move {
            let _ = closed.wait_for(|closed| *closed).await;
            if let Some(registry) = registry.upgrade() {
                registry.remove(&session_id).await;
            }
        });

        true
    }

    pub async fn remove(&self, session_id: &str) {
        if self.sessions.lock().await.remove(session_id).is_some() {
            debug!(session_id = %session_id, "session removed");
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Closes every registered session; their watchers remove them.
    pub async fn close_all(&self) {
        let transports: Vec<_> = self.sessions.lock().await.values().cloned().collect();
        for transport in &transports {
            transport.close();
        }
        if !transports.is_empty() {
            info!(closed = transports.len(), "sessions closed on shutdown");
        }
    }
}

fn fresh_id(sessions: &HashMap<String, Arc<SessionTransport>>) -> String {
    loop {
        let candidate = Uuid::new_v4().to_string();
        if !sessions.contains_key(&candidate) {
            return candidate;
        }
    }
}
