//! Legacy HTTP+SSE transport
//!
//! `GET /sse` opens a session whose first event names the endpoint the client posts
//! to. Responses to those posts travel back over the event stream.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::http::session_events;
use crate::mcp::rpc::{json_rpc_error, PARSE_ERROR};
use crate::AppState;

pub const MESSAGES_PATH: &str = "/messages";

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

pub async fn open_stream(State(state): State<AppState>) -> Response {
    let transport = state.sse_sessions.create().await;
    let events = session_events(&transport, true);
    if !state.sse_sessions.register(&transport).await {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Session could not be opened").into_response();
    }
    info!(session_id = %transport.id(), "sse connection opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{MESSAGES_PATH}?sessionId={}", transport.id()));
    let stream = stream::once(async move { Ok(endpoint) }).chain(events);

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

pub async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: axum::body::Bytes,
) -> Response {
    let session_id = query.session_id.as_deref().map(str::trim);
    let transport = match session_id.filter(|id| !id.is_empty()) {
        Some(id) => state.sse_sessions.get_or_create(Some(id), false).await.ok(),
        None => None,
    };
    let Some((transport, _)) = transport else {
        return (StatusCode::BAD_REQUEST, "Invalid or missing session ID").into_response();
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json_rpc_error(None, PARSE_ERROR, "Parse error")),
            )
                .into_response()
        }
    };

    tokio::spawn(async move {
        if let Some(response) = transport.handle_payload(payload).await {
            transport.send(response);
        }
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
