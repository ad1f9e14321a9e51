//! HTTP server for itemkv.
//!
//! Exposes item CRUD over JSON, guarded by bearer API keys, with one
//! unauthenticated `/health` endpoint that pings the backing store.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{Action, ApiKeyAuth, AuthProvider, Credentials, Identity};
pub use config::{parse_api_keys, ServerConfig};
pub use error::{json_error_body, Challenge, ServerError, ServerResult};
pub use handler::AppState;
pub use router::{build_router, HttpLimits};
pub use server::ItemServer;
