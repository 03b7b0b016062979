use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, patch, post},
};

use super::{admin, auth_routes, pages, site};
use crate::auth::{AuthEvents, Mailer};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub events: AuthEvents,
    /// Absolute base URL used when building magic-link URLs.
    pub base_url: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        events: AuthEvents,
        base_url: Option<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            events,
            base_url: base_url.unwrap_or_else(|| "http://127.0.0.1:8080".to_string()),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(auth_routes::sign_up))
        .route("/signin", post(auth_routes::sign_in))
        .route("/magic-link", post(auth_routes::request_magic_link))
        .route("/magic-link/verify", post(auth_routes::verify_magic_link))
        .route("/refresh", post(auth_routes::refresh))
        .route("/signout", post(auth_routes::sign_out))
        .route("/session", get(auth_routes::get_session))
}

pub fn pages_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pages", get(pages::list_pages))
        .route("/pages", post(pages::create_page))
        .route("/pages/preview", post(pages::preview_page))
        .route(
            "/pages/{slug}",
            get(pages::get_page)
                .put(pages::upsert_page)
                .delete(pages::delete_page),
        )
        .route("/blocks", get(pages::list_block_kinds))
}

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", patch(admin::update_user_role))
}

pub fn service_router() -> Router<Arc<AppState>> {
    Router::new().route("/reset-password", post(admin::reset_password))
}

pub fn site_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(site::home))
        .route("/p/{slug}", get(site::view_page))
        .route("/auth/magic-link", get(auth_routes::redeem_magic_link))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1/service", service_router())
        .nest("/api/v1", pages_router())
        .merge(site_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
