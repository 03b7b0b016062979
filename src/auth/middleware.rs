use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::session::{AuthContext, SessionError, resolve_session};
use super::token::{TokenGenerator, parse_token};
use crate::server::AppState;
use crate::types::{Role, ServiceToken};

/// Extractor that requires any signed-in user
pub struct RequireUser(pub AuthContext);

/// Extractor that requires an effective role of editor or above
pub struct RequireEditor(pub AuthContext);

/// Extractor that requires an effective role of admin
pub struct RequireAdmin(pub AuthContext);

/// Extractor that requires the service-level credential
pub struct RequireService(pub ServiceToken);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    Forbidden(&'static str),
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"chronicle\"".parse().unwrap(),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = extract_and_resolve(parts, state)?;
        Ok(RequireUser(ctx))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireEditor {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = extract_and_resolve(parts, state)?;

        if !ctx.effective_role().satisfies(Role::Editor) {
            return Err(AuthError::Forbidden("Editor access required"));
        }

        Ok(RequireEditor(ctx))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = extract_and_resolve(parts, state)?;

        if !ctx.effective_role().satisfies(Role::Admin) {
            return Err(AuthError::Forbidden("Admin access required"));
        }

        Ok(RequireAdmin(ctx))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireService {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw_token = bearer_token(parts)?.ok_or(AuthError::MissingAuth)?;

        let (lookup, _secret) =
            parse_token(&raw_token).map_err(|_| AuthError::InvalidToken)?;

        let token = state
            .store
            .get_service_token_by_lookup(&lookup)
            .map_err(|_| AuthError::InternalError)?
            .ok_or(AuthError::InvalidToken)?;

        let generator = TokenGenerator::new();
        if !generator
            .verify(&raw_token, &token.token_hash)
            .map_err(|_| AuthError::InternalError)?
        {
            return Err(AuthError::InvalidToken);
        }

        if let Err(e) = state.store.touch_service_token(&token.id) {
            tracing::warn!("Failed to update service token last_used_at: {e}");
        }

        Ok(RequireService(token))
    }
}

fn extract_and_resolve(
    parts: &mut Parts,
    state: &Arc<AppState>,
) -> Result<AuthContext, AuthError> {
    let raw_token = bearer_token(parts)?.ok_or(AuthError::MissingAuth)?;

    resolve_session(state.store.as_ref(), &raw_token).map_err(|e| match e {
        SessionError::InvalidToken => AuthError::InvalidToken,
        SessionError::TokenExpired => AuthError::TokenExpired,
        SessionError::InternalError => AuthError::InternalError,
    })
}

/// Extracts the bearer token from the Authorization header.
/// Returns `Ok(None)` if no header is present.
fn bearer_token(parts: &Parts) -> Result<Option<String>, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth_header {
        Some(header) => {
            let token = header
                .strip_prefix("Bearer ")
                .ok_or(AuthError::InvalidScheme)?;
            Ok(Some(token.to_string()))
        }
        None => Ok(None),
    }
}
