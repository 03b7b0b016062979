use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::auth::session::{
    SessionError, SessionTokens, establish_session, issue_login_token, redeem_login_token,
    refresh_session,
};
use crate::auth::{RequireUser, TokenGenerator};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    MagicLinkRedeemParams, MagicLinkRequest, MagicLinkVerifyRequest, RefreshRequest,
    SessionInfoResponse, SessionResponse, SignInRequest, SignUpRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{validate_email, validate_password};
use crate::types::{Profile, Role, Session, User};

fn session_response(
    state: &AppState,
    session: &Session,
    tokens: SessionTokens,
    user: User,
) -> Result<SessionResponse, ApiError> {
    let profile = state
        .store
        .get_profile(&user.id)
        .api_err("Failed to load profile")?;

    Ok(SessionResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at: session.expires_at,
        user: user.into(),
        profile,
    })
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignUpRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let email = req.email.trim().to_lowercase();

    validate_email(&email)?;
    validate_password(&req.password)?;

    let generator = TokenGenerator::new();
    let password_hash = generator
        .hash(&req.password)
        .map_err(|_| ApiError::internal("Failed to hash password"))?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        password_hash: Some(password_hash),
        created_at: now,
    };

    match store.create_user(&user) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => {
            return Err(ApiError::conflict("Email already registered"));
        }
        Err(_) => return Err(ApiError::internal("Failed to create user")),
    }

    // New accounts start at the lowest capability.
    let profile = Profile {
        user_id: user.id.clone(),
        email,
        full_name: req.full_name,
        role: Role::Viewer,
        created_at: now,
        updated_at: now,
    };
    store
        .create_profile(&profile)
        .api_err("Failed to create profile")?;

    let (session, tokens) =
        establish_session(store, &user.id).api_err("Failed to establish session")?;

    state.events.signed_in(&user.id);

    let response = session_response(&state, &session, tokens, user)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let email = req.email.trim().to_lowercase();

    // Same response for unknown email and wrong password.
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = store
        .get_user_by_email(&email)
        .api_err("Failed to look up user")?
        .ok_or_else(invalid)?;

    let password_hash = user.password_hash.as_deref().ok_or_else(invalid)?;

    let generator = TokenGenerator::new();
    let verified = generator
        .verify(&req.password, password_hash)
        .map_err(|_| ApiError::internal("Failed to verify password"))?;
    if !verified {
        return Err(invalid());
    }

    let (session, tokens) =
        establish_session(store, &user.id).api_err("Failed to establish session")?;

    state.events.signed_in(&user.id);

    let response = session_response(&state, &session, tokens, user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

pub async fn request_magic_link(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MagicLinkRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let email = req.email.trim().to_lowercase();

    validate_email(&email)?;

    // Issue only for existing accounts, but answer identically either way so
    // the endpoint does not reveal which emails are registered.
    if let Some(user) = store
        .get_user_by_email(&email)
        .api_err("Failed to look up user")?
    {
        let raw_token =
            issue_login_token(store, &user.id).api_err("Failed to issue login token")?;
        let link = format!("{}/auth/magic-link?token={raw_token}", state.base_url);
        state.mailer.send_magic_link(&email, &link);
    }

    Ok::<_, ApiError>((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(json!({
            "message": "If that account exists, a sign-in link has been sent"
        }))),
    ))
}

fn redeem_to_session(state: &AppState, raw_token: &str) -> Result<SessionResponse, ApiError> {
    let store = state.store.as_ref();

    let user_id = redeem_login_token(store, raw_token).map_err(|e| match e {
        SessionError::TokenExpired => ApiError::unauthorized("Sign-in link has expired"),
        SessionError::InvalidToken => ApiError::unauthorized("Invalid sign-in link"),
        SessionError::InternalError => ApiError::internal("Failed to verify sign-in link"),
    })?;

    let user = store
        .get_user(&user_id)
        .api_err("Failed to load user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid sign-in link"))?;

    let (session, tokens) =
        establish_session(store, &user.id).api_err("Failed to establish session")?;

    state.events.signed_in(&user.id);

    session_response(state, &session, tokens, user)
}

pub async fn verify_magic_link(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MagicLinkVerifyRequest>,
) -> impl IntoResponse {
    let response = redeem_to_session(&state, &req.token)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

/// Landing route for the emailed link itself: redeems on click, so the link
/// works without a client app posting to the verify endpoint.
pub async fn redeem_magic_link(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MagicLinkRedeemParams>,
) -> impl IntoResponse {
    let response = redeem_to_session(&state, &params.token)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (session, tokens) = refresh_session(store, &req.refresh_token).map_err(|e| match e {
        SessionError::InvalidToken | SessionError::TokenExpired => {
            ApiError::unauthorized("Invalid refresh token")
        }
        SessionError::InternalError => ApiError::internal("Failed to refresh session"),
    })?;

    let user = store
        .get_user(&session.user_id)
        .api_err("Failed to load user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    state.events.refreshed(&user.id);

    let response = session_response(&state, &session, tokens, user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

pub async fn sign_out(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let ctx = auth.0;

    state
        .store
        .delete_session(&ctx.session.id)
        .api_err("Failed to delete session")?;

    state.events.signed_out(&ctx.user.id);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn get_session(auth: RequireUser) -> impl IntoResponse {
    let ctx = auth.0;
    let role = ctx.effective_role();

    Json(ApiResponse::success(SessionInfoResponse {
        user: ctx.user.into(),
        profile: ctx.profile,
        role,
        issued_at: ctx.session.issued_at,
        expires_at: ctx.session.expires_at,
    }))
}
