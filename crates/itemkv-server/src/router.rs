use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response};
use axum::routing::get;
use axum::{middleware, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::auth::require_auth;
use crate::config::ServerConfig;
use crate::error::json_error_body;
use crate::handler::{self, AppState};

/// Per-request resource bounds applied by [`build_router`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpLimits {
    pub max_body_bytes: usize,
    /// Requests still running after this answer 408.
    pub request_timeout: Duration,
}

impl HttpLimits {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
            request_timeout: config.request_timeout(),
        }
    }
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

/// Build the axum router with all itemkv endpoints.
///
/// ```text
/// GET    /health        store ping, no auth
/// GET    /items         list, ?type=T&tag=G...
/// POST   /items         create
/// GET    /items/:id     fetch
/// PUT    /items/:id     replace
/// DELETE /items/:id     delete
/// ```
pub fn build_router(state: AppState, limits: HttpLimits) -> Router {
    let items = Router::new()
        .route("/items", get(handler::list_items).post(handler::create_item))
        .route(
            "/items/:id",
            get(handler::get_item)
                .put(handler::update_item)
                .delete(handler::delete_item),
        )
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), require_auth));

    Router::new()
        .route("/health", get(handler::health_handler))
        .merge(items)
        .layer(DefaultBodyLimit::max(limits.max_body_bytes))
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(middleware::map_response(json_error_body))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_request(())
                .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "request completed"
                    );
                }),
        )
        .with_state(state)
}
