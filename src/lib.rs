use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod session;
pub mod youtube_client;

#[cfg(test)]
mod test_support;

use domain::resources::DocumentSource;
use session::SessionRegistry;
use youtube_client::VideoPlatform;

/// Outbound collaborators shared by every session.
#[derive(Clone)]
pub struct Services {
    pub video_platform: Arc<dyn VideoPlatform>,
    pub documents: Arc<dyn DocumentSource>,
}

#[derive(Clone)]
pub struct AppState {
    pub api_token: Option<Arc<str>>,
    pub issuer: Arc<str>,
    pub services: Services,
    pub sessions: Arc<SessionRegistry>,
    pub sse_sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(api_token: Option<String>, issuer: String, services: Services) -> Self {
        Self {
            api_token: api_token.map(Arc::<str>::from),
            issuer: Arc::<str>::from(issuer),
            sessions: Arc::new(SessionRegistry::new(services.clone())),
            sse_sessions: Arc::new(SessionRegistry::new(services.clone())),
            services,
        }
    }

    pub async fn close_all_sessions(&self) {
        self.sessions.close_all().await;
        self.sse_sessions.close_all().await;
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/mcp",
            post(http::streamable::post_mcp)
                .get(http::streamable::get_mcp)
                .delete(http::streamable::delete_mcp),
        )
        .route("/sse", get(http::sse::open_stream))
        .route(http::sse::MESSAGES_PATH, post(http::sse::post_message))
        .route("/message", post(http::sse::post_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .route(
            "/.well-known/oauth-authorization-server",
            get(http::handlers::oauth_authorization_server),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(http::handlers::oauth_protected_resource),
        )
        .merge(protected)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
