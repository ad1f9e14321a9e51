use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use itemkv_repo::RepoError;
use serde_json::json;
use thiserror::Error;

/// Which `WWW-Authenticate` challenge a 401 carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Challenge {
    /// No bearer token was presented.
    MissingToken,
    /// A bearer token was presented but is not on the allow-list.
    InvalidToken,
}

impl Challenge {
    pub fn header_value(self) -> &'static str {
        match self {
            Self::MissingToken => r#"Bearer realm="itemkv""#,
            Self::InvalidToken => r#"Bearer realm="itemkv", error="invalid_token""#,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized { challenge: Challenge },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Repo(RepoError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Repo(RepoError::Invalid(_)) => StatusCode::BAD_REQUEST,
            Self::Repo(_) | Self::Config(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Server-side failures are logged in full but reported opaquely.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
            status
                .canonical_reason()
                .unwrap_or("internal error")
                .to_lowercase()
        } else {
            self.to_string()
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if let Self::Unauthorized { challenge } = self {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(challenge.header_value()),
            );
        }
        response
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Give error responses produced outside the handlers (extractor rejections,
/// 404/405 fallbacks, timeouts) the same `{"error": ...}` body as
/// [`ServerError`]. Status and other headers are kept.
pub async fn json_error_body(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    let message = status.canonical_reason().unwrap_or("error").to_lowercase();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(json!({ "error": message }).to_string()))
}
