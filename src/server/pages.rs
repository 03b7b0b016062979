use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::auth::RequireEditor;
use crate::content::{PageContent, registry, render_content, render_document, slugify};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreatePageRequest, PreviewRequest, UpsertPageRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_content, validate_slug, validate_title};
use crate::types::PageDocument;

pub async fn list_pages(
    _auth: RequireEditor,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // Most-recently-updated first; the management view's ordering.
    let pages = state.store.list_pages().api_err("Failed to list pages")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(pages)))
}

pub async fn get_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let page = state
        .store
        .get_page_by_slug(&slug)
        .api_err("Failed to get page")?
        .or_not_found("Page not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(page)))
}

pub async fn create_page(
    _auth: RequireEditor,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePageRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_title(&req.title)?;

    let slug = match req.slug {
        Some(slug) => slug,
        None => slugify(&req.title),
    };
    validate_slug(&slug)?;

    let content = req.content.unwrap_or_else(|| json!({ "blocks": [] }));
    validate_content(&content)?;

    let now = Utc::now();
    let page = PageDocument {
        id: Uuid::new_v4().to_string(),
        slug,
        title: req.title,
        content,
        created_at: now,
        updated_at: now,
    };

    match store.create_page(&page) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => {
            return Err(ApiError::conflict("A page with this slug already exists"));
        }
        Err(_) => return Err(ApiError::internal("Failed to create page")),
    }

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(page))))
}

pub async fn upsert_page(
    _auth: RequireEditor,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(req): Json<UpsertPageRequest>,
) -> impl IntoResponse {
    validate_slug(&slug)?;
    validate_title(&req.title)?;
    validate_content(&req.content)?;

    // Create-or-replace keyed by slug; last write wins.
    let now = Utc::now();
    let page = PageDocument {
        id: Uuid::new_v4().to_string(),
        slug: slug.clone(),
        title: req.title,
        content: req.content,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .upsert_page(&page)
        .api_err("Failed to save page")?;

    // Re-read so the response carries the surviving row's id and created_at.
    let saved = state
        .store
        .get_page_by_slug(&slug)
        .api_err("Failed to reload page")?
        .or_not_found("Page not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(saved)))
}

pub async fn delete_page(
    _auth: RequireEditor,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_page(&id)
        .api_err("Failed to delete page")?;

    if !deleted {
        return Err(ApiError::not_found("Page not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

/// Renders a draft tree without persisting it, so the editor can show
/// exactly what publish would produce.
pub async fn preview_page(
    _auth: RequireEditor,
    Json(req): Json<PreviewRequest>,
) -> impl IntoResponse {
    validate_content(&req.content)?;

    let content = PageContent::from_value(&req.content);
    let title = req
        .title
        .or_else(|| content.title.clone())
        .unwrap_or_else(|| "Preview".to_string());
    let html = render_document(&title, &render_content(&content));

    Ok::<_, ApiError>(Html(html))
}

pub async fn list_block_kinds() -> impl IntoResponse {
    Json(ApiResponse::success(registry()))
}
