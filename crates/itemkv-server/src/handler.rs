use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use itemkv_repo::{ItemRepository, ListFilter};
use itemkv_types::{Item, ItemDraft, ItemId};
use serde_json::json;

use crate::auth::AuthProvider;
use crate::error::{ServerError, ServerResult};

/// Dependencies shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub repo: ItemRepository,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(repo: ItemRepository, auth: Arc<dyn AuthProvider>) -> Self {
        Self { repo, auth }
    }
}

fn parse_draft(body: &[u8]) -> ServerResult<ItemDraft> {
    ItemDraft::from_json_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("invalid request payload: {e}")))
}

/// Build a filter from `?type=T&tag=a&tag=b`. Other parameters are ignored.
fn filter_from_query(params: Vec<(String, String)>) -> ListFilter {
    params
        .into_iter()
        .fold(ListFilter::all(), |filter, (name, value)| match name.as_str() {
            "type" => filter.with_type(value),
            "tag" => filter.with_tag(value),
            _ => filter,
        })
}

/// `GET /items`
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ServerResult<Json<Vec<Item>>> {
    let filter = filter_from_query(params);
    Ok(Json(state.repo.list(&filter).await?))
}

/// `POST /items`
pub async fn create_item(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<impl IntoResponse> {
    let draft = parse_draft(&body)?;
    let item = state.repo.create(draft).await?;
    tracing::info!(id = %item.id, kind = %item.kind, "item created");
    let location = format!("/items/{}", item.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(item)))
}

/// `GET /items/{id}`
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Item>> {
    Ok(Json(state.repo.get(&ItemId::from(id)).await?))
}

/// `PUT /items/{id}`
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ServerResult<Json<Item>> {
    let draft = parse_draft(&body)?;
    let item = state.repo.update(&ItemId::from(id), draft).await?;
    tracing::info!(id = %item.id, kind = %item.kind, "item updated");
    Ok(Json(item))
}

/// `DELETE /items/{id}`
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let removed = state.repo.delete(&ItemId::from(id)).await?;
    tracing::info!(id = %removed.id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Health check handler. Answers 503 when the store does not respond.
pub async fn health_handler(State(state): State<AppState>) -> ServerResult<Json<serde_json::Value>> {
    state
        .repo
        .ping()
        .await
        .map_err(|e| ServerError::Unavailable(e.to_string()))?;
    Ok(Json(json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn query_builds_filter() {
        let f = filter_from_query(pairs(&[("type", "a"), ("tag", "red"), ("tag", "blue"), ("page", "2")]));
        assert_eq!(f.kind(), Some("a"));
        assert_eq!(f.tags().len(), 2);
    }

    #[test]
    fn empty_query_values_mean_no_filter() {
        assert!(filter_from_query(pairs(&[("type", ""), ("tag", "")])).is_empty());
        assert!(filter_from_query(Vec::new()).is_empty());
    }

    #[test]
    fn bad_payload_is_bad_request() {
        let err = parse_draft(b"{").unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(ref m) if m.starts_with("invalid request payload")));
    }
}
