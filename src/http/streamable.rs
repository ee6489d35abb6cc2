//! Streamable HTTP transport on `/mcp`
//!
//! `POST` carries client messages and returns the responses inline, `GET` attaches an
//! event stream for server-initiated messages, `DELETE` ends the session. Sessions are
//! keyed by the `mcp-session-id` header issued on initialization.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::http::session_events;
use crate::mcp::rpc::{json_rpc_error, PARSE_ERROR};
use crate::session::{SessionError, SessionTransport, MCP_SESSION_ID_HEADER};
use crate::AppState;

pub async fn post_mcp(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(json_rpc_error(None, PARSE_ERROR, "Parse error")),
            )
                .into_response()
        }
    };

    let session_id = session_id_header(&headers);
    let is_init = is_initialize_payload(&payload);
    let (transport, is_new) = match state.sessions.get_or_create(session_id, is_init).await {
        Ok(found) => found,
        Err(SessionError::InvalidSession) => return no_valid_session_response(),
    };

    let response = transport.handle_payload(payload).await;

    let registered = if is_new {
        transport.server().is_initialized() && state.sessions.register(&transport).await
    } else {
        true
    };
    if is_new && !registered {
        debug!(session_id = %transport.id(), "session discarded before initialization");
    }

    let mut response = match response {
        Some(body) => (StatusCode::OK, Json(body)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };
    if registered {
        attach_session_id(&mut response, &transport);
    }
    response
}

pub async fn get_mcp(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let transport = match state
        .sessions
        .get_or_create(session_id_header(&headers), false)
        .await
    {
        Ok((transport, _)) => transport,
        Err(SessionError::InvalidSession) => return invalid_session_response(),
    };

    let mut response = Sse::new(session_events(&transport, false))
        .keep_alive(KeepAlive::default())
        .into_response();
    attach_session_id(&mut response, &transport);
    response
}

pub async fn delete_mcp(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let transport = match state
        .sessions
        .get_or_create(session_id_header(&headers), false)
        .await
    {
        Ok((transport, _)) => transport,
        Err(SessionError::InvalidSession) => return invalid_session_response(),
    };

    transport.close();
    StatusCode::OK.into_response()
}

fn session_id_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// True when the body is an `initialize` request, alone or inside a batch.
pub fn is_initialize_payload(payload: &Value) -> bool {
    let is_initialize = |message: &Value| {
        message.get("method").and_then(Value::as_str) == Some("initialize")
            && message.get("id").is_some()
    };

    match payload {
        Value::Array(batch) => batch.iter().any(is_initialize),
        message => is_initialize(message),
    }
}

fn attach_session_id(response: &mut Response, transport: &SessionTransport) {
    match HeaderValue::from_str(transport.id()) {
        Ok(value) => {
            response.headers_mut().insert(MCP_SESSION_ID_HEADER, value);
        }
        Err(err) => warn!(error = %err, "session id is not a valid header value"),
    }
}

fn no_valid_session_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32000,
                "message": "Bad Request: No valid session ID provided",
            },
            "id": null,
        })),
    )
        .into_response()
}

fn invalid_session_response() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid or missing session ID").into_response()
}
