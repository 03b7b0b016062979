use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::auth::{RequireAdmin, RequireService, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::{
    PaginationParams, ResetPasswordRequest, UpdateRoleRequest, UserResponse,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_password;
use crate::types::Role;

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let profiles = state
        .store
        .list_profiles(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list users")?;

    let (profiles, next_cursor, has_more) =
        paginate(profiles, DEFAULT_PAGE_SIZE as usize, |p| p.user_id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(profiles, next_cursor, has_more)))
}

pub async fn update_user_role(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let role: Role = req
        .role
        .parse()
        .map_err(|_| ApiError::bad_request("Role must be one of: viewer, editor, admin"))?;

    store
        .get_profile(&id)
        .api_err("Failed to get profile")?
        .or_not_found("User not found")?;

    store
        .update_profile_role(&id, role)
        .api_err("Failed to update role")?;

    let profile = store
        .get_profile(&id)
        .api_err("Failed to reload profile")?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}

/// Resets a user's password on behalf of an operator. Guarded by the
/// service token, not a user session; revokes every session the user holds.
pub async fn reset_password(
    _service: RequireService,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (Some(email), Some(new_password)) = (req.email, req.new_password) else {
        return Err(ApiError::bad_request("email and new_password are required"));
    };
    validate_password(&new_password)?;

    let user = store
        .get_user_by_email(&email.trim().to_lowercase())
        .api_err("Failed to look up user")?
        .or_not_found("User not found")?;

    let generator = TokenGenerator::new();
    let password_hash = generator
        .hash(&new_password)
        .map_err(|_| ApiError::internal("Failed to hash password"))?;

    store
        .update_user_password(&user.id, &password_hash)
        .api_err("Failed to update password")?;

    let revoked = store
        .delete_user_sessions(&user.id)
        .api_err("Failed to revoke sessions")?;
    tracing::info!("Password reset for {}; {} session(s) revoked", user.email, revoked);

    Ok::<_, ApiError>(Json(json!({
        "message": "Password has been reset",
        "user": UserResponse::from(user),
    })))
}
