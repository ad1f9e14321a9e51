use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;

use crate::config::ServerConfig;
use crate::error::{Challenge, ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub authenticated: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { name: "anonymous".into(), authenticated: false }
    }

    pub fn client(name: impl Into<String>) -> Self {
        Self { name: name.into(), authenticated: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read `Authorization: Bearer <token>`. Any other scheme, or no header,
    /// counts as anonymous.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| Self::Bearer(token.trim().to_string()))
            .unwrap_or(Self::Anonymous)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

impl Action {
    pub fn for_method(method: &Method) -> Self {
        if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
            Self::Read
        } else {
            Self::Write
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool>;
}

/// Static allow-list of bearer tokens.
///
/// Writes need a listed token. Reads are open to anonymous callers when
/// `allow_anonymous_read` is set, but a presented token is always checked.
pub struct ApiKeyAuth {
    keys: HashMap<String, usize>,
    allow_anonymous_read: bool,
}

impl ApiKeyAuth {
    pub fn new<I, S>(keys: I, allow_anonymous_read: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = HashMap::new();
        for key in keys {
            let next = map.len() + 1;
            map.entry(key.into()).or_insert(next);
        }
        Self { keys: map, allow_anonymous_read }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.api_keys.iter().cloned(), config.allow_anonymous_read)
    }
}

#[async_trait]
impl AuthProvider for ApiKeyAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => match self.keys.get(token) {
                Some(n) => Ok(Identity::client(format!("api-key-{n}"))),
                None => {
                    tracing::warn!("rejected unknown API key");
                    Err(ServerError::Unauthorized { challenge: Challenge::InvalidToken })
                }
            },
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool> {
        Ok(match action {
            Action::Read => identity.authenticated || self.allow_anonymous_read,
            Action::Write => identity.authenticated,
        })
    }
}

/// Middleware gating a route group on [`AuthProvider`].
pub async fn require_auth(
    State(auth): State<Arc<dyn AuthProvider>>,
    request: Request,
    next: Next,
) -> ServerResult<Response> {
    let credentials = Credentials::from_headers(request.headers());
    let action = Action::for_method(request.method());
    let identity = auth.authenticate(&credentials).await?;
    if !auth.authorize(&identity, &action).await? {
        tracing::debug!(%action, identity = %identity.name, "request needs credentials");
        return Err(ServerError::Unauthorized { challenge: Challenge::MissingToken });
    }
    tracing::trace!(%action, identity = %identity.name, "request authorized");
    Ok(next.run(request).await)
}
