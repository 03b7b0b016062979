use std::fmt::Write;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};

use crate::content::{PageContent, escape_html, render_content, render_document};
use crate::server::AppState;
use crate::server::response::{ApiError, StoreResultExt};
use crate::types::PageDocument;

const HOME_SLUG: &str = "home";

fn render_page(page: &PageDocument) -> Html<String> {
    let content = PageContent::from_value(&page.content);
    Html(render_document(&page.title, &render_content(&content)))
}

fn not_found_page() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(render_document(
            "Page not found",
            "<h1>Page not found</h1><p><a href=\"/\">Back to the start</a></p>",
        )),
    )
}

/// Serves the page with slug `home`, or an index of all pages if no home
/// page has been published yet.
pub async fn home(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Some(page) = state
        .store
        .get_page_by_slug(HOME_SLUG)
        .api_err("Failed to load page")?
    {
        return Ok::<_, ApiError>(render_page(&page).into_response());
    }

    let pages = state.store.list_pages().api_err("Failed to list pages")?;

    let mut body = String::from("<h1>Pages</h1>\n<ul>\n");
    for page in &pages {
        let _ = write!(
            body,
            "<li><a href=\"/p/{}\">{}</a></li>\n",
            escape_html(&page.slug),
            escape_html(&page.title)
        );
    }
    body.push_str("</ul>\n");

    Ok(Html(render_document("Index", &body)).into_response())
}

pub async fn view_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let page = state
        .store
        .get_page_by_slug(&slug)
        .api_err("Failed to load page")?;

    match page {
        Some(page) => Ok::<_, ApiError>(render_page(&page).into_response()),
        None => Ok(not_found_page().into_response()),
    }
}
