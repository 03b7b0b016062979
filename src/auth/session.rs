use chrono::{Duration, Utc};
use uuid::Uuid;

use super::token::{TokenGenerator, parse_token};
use crate::store::Store;
use crate::types::{LoginToken, Profile, Session, User};

/// Access tokens expire after an hour; the refresh token stays valid until
/// the session row itself is deleted.
const ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

/// Magic links are short-lived and single-use.
const LOGIN_TOKEN_TTL_SECONDS: i64 = 15 * 60;

#[derive(Debug)]
pub enum SessionError {
    InvalidToken,
    TokenExpired,
    InternalError,
}

/// Raw token pair handed to the client exactly once, at establishment or
/// rotation. Only hashes are retained server-side.
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// The resolved identity behind a valid bearer token.
pub struct AuthContext {
    pub session: Session,
    pub user: User,
    pub profile: Option<Profile>,
}

impl AuthContext {
    /// A session whose profile row is missing defaults to the lowest
    /// capability rather than failing.
    #[must_use]
    pub fn effective_role(&self) -> crate::types::Role {
        self.profile.as_ref().map(|p| p.role).unwrap_or_default()
    }
}

/// Creates a new session for `user_id` and returns it with the raw tokens.
pub fn establish_session(
    store: &dyn Store,
    user_id: &str,
) -> crate::error::Result<(Session, SessionTokens)> {
    let generator = TokenGenerator::new();
    let (access_token, access_lookup, access_hash) = generator.generate()?;
    let (refresh_token, refresh_lookup, refresh_hash) = generator.generate()?;

    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        access_lookup,
        access_hash,
        refresh_lookup,
        refresh_hash,
        issued_at: now,
        expires_at: now + Duration::seconds(ACCESS_TOKEN_TTL_SECONDS),
        last_used_at: None,
    };

    store.create_session(&session)?;

    Ok((
        session,
        SessionTokens {
            access_token,
            refresh_token,
        },
    ))
}

/// Validates a raw access token and resolves the session, user, and profile
/// behind it.
pub fn resolve_session(store: &dyn Store, raw_token: &str) -> Result<AuthContext, SessionError> {
    let (lookup, _secret) = parse_token(raw_token).map_err(|_| SessionError::InvalidToken)?;

    let session = store
        .get_session_by_access_lookup(&lookup)
        .map_err(|_| SessionError::InternalError)?
        .ok_or(SessionError::InvalidToken)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_token, &session.access_hash)
        .map_err(|_| SessionError::InternalError)?
    {
        return Err(SessionError::InvalidToken);
    }

    if session.expires_at < Utc::now() {
        return Err(SessionError::TokenExpired);
    }

    let user = store
        .get_user(&session.user_id)
        .map_err(|_| SessionError::InternalError)?
        .ok_or(SessionError::InvalidToken)?;

    let profile = profile_for_live_session(store, &session)?;

    if let Err(e) = store.touch_session(&session.id) {
        tracing::warn!("Failed to update session last_used_at: {e}");
    }

    Ok(AuthContext {
        session,
        user,
        profile,
    })
}

/// Fetches the profile for a session, then re-checks that the session still
/// exists. A profile fetched for a session revoked while the fetch was in
/// flight is never applied.
pub(crate) fn profile_for_live_session(
    store: &dyn Store,
    session: &Session,
) -> Result<Option<Profile>, SessionError> {
    let profile = store
        .get_profile(&session.user_id)
        .map_err(|_| SessionError::InternalError)?;

    let still_live = store
        .get_session(&session.id)
        .map_err(|_| SessionError::InternalError)?
        .is_some();
    if !still_live {
        return Err(SessionError::InvalidToken);
    }

    Ok(profile)
}

/// Exchanges a raw refresh token for a rotated session. Both tokens are
/// replaced, so the previous access token stops validating immediately.
pub fn refresh_session(
    store: &dyn Store,
    raw_refresh_token: &str,
) -> Result<(Session, SessionTokens), SessionError> {
    let (lookup, _secret) =
        parse_token(raw_refresh_token).map_err(|_| SessionError::InvalidToken)?;

    let mut session = store
        .get_session_by_refresh_lookup(&lookup)
        .map_err(|_| SessionError::InternalError)?
        .ok_or(SessionError::InvalidToken)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_refresh_token, &session.refresh_hash)
        .map_err(|_| SessionError::InternalError)?
    {
        return Err(SessionError::InvalidToken);
    }

    let (access_token, access_lookup, access_hash) =
        generator.generate().map_err(|_| SessionError::InternalError)?;
    let (refresh_token, refresh_lookup, refresh_hash) =
        generator.generate().map_err(|_| SessionError::InternalError)?;

    session.access_lookup = access_lookup;
    session.access_hash = access_hash;
    session.refresh_lookup = refresh_lookup;
    session.refresh_hash = refresh_hash;
    session.expires_at = Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECONDS);

    store
        .rotate_session(&session)
        .map_err(|_| SessionError::InternalError)?;

    Ok((
        session,
        SessionTokens {
            access_token,
            refresh_token,
        },
    ))
}

/// Issues a single-use magic-link token for `user_id` and returns the raw
/// token for delivery.
pub fn issue_login_token(store: &dyn Store, user_id: &str) -> crate::error::Result<String> {
    let generator = TokenGenerator::new();
    let (raw_token, lookup, hash) = generator.generate()?;

    let now = Utc::now();
    let login_token = LoginToken {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        token_lookup: lookup,
        token_hash: hash,
        created_at: now,
        expires_at: now + Duration::seconds(LOGIN_TOKEN_TTL_SECONDS),
    };

    store.create_login_token(&login_token)?;

    Ok(raw_token)
}

/// Redeems a magic-link token. The token is consumed whether or not it has
/// expired, so a link can never be used twice.
pub fn redeem_login_token(store: &dyn Store, raw_token: &str) -> Result<String, SessionError> {
    let (lookup, _secret) = parse_token(raw_token).map_err(|_| SessionError::InvalidToken)?;

    let login_token = store
        .get_login_token_by_lookup(&lookup)
        .map_err(|_| SessionError::InternalError)?
        .ok_or(SessionError::InvalidToken)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_token, &login_token.token_hash)
        .map_err(|_| SessionError::InternalError)?
    {
        return Err(SessionError::InvalidToken);
    }

    store
        .delete_login_token(&login_token.id)
        .map_err(|_| SessionError::InternalError)?;

    if login_token.expires_at < Utc::now() {
        return Err(SessionError::TokenExpired);
    }

    Ok(login_token.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{Role, User};

    fn memory_store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn seed_user(store: &dyn Store, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: None,
            created_at: Utc::now(),
        };
        store.create_user(&user).unwrap();
        user
    }

    fn seed_profile(store: &dyn Store, user: &User, role: Role) {
        let now = Utc::now();
        store
            .create_profile(&Profile {
                user_id: user.id.clone(),
                email: user.email.clone(),
                full_name: None,
                role,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    #[test]
    fn test_establish_and_resolve() {
        let store = memory_store();
        let user = seed_user(&store, "a@example.com");
        seed_profile(&store, &user, Role::Editor);

        let (session, tokens) = establish_session(&store, &user.id).unwrap();
        let ctx = resolve_session(&store, &tokens.access_token).unwrap();

        assert_eq!(ctx.session.id, session.id);
        assert_eq!(ctx.user.email, "a@example.com");
        assert_eq!(ctx.effective_role(), Role::Editor);
    }

    #[test]
    fn test_missing_profile_defaults_to_viewer() {
        let store = memory_store();
        let user = seed_user(&store, "noprofile@example.com");

        let (_, tokens) = establish_session(&store, &user.id).unwrap();
        let ctx = resolve_session(&store, &tokens.access_token).unwrap();

        assert!(ctx.profile.is_none());
        assert_eq!(ctx.effective_role(), Role::Viewer);
    }

    #[test]
    fn test_revoked_session_does_not_resolve() {
        let store = memory_store();
        let user = seed_user(&store, "b@example.com");

        let (session, tokens) = establish_session(&store, &user.id).unwrap();
        store.delete_session(&session.id).unwrap();

        assert!(matches!(
            resolve_session(&store, &tokens.access_token),
            Err(SessionError::InvalidToken)
        ));
    }

    #[test]
    fn test_profile_not_applied_after_sign_out() {
        // Slow profile fetch racing a sign-out: the fetched profile must not
        // be applied once the session is gone.
        let store = memory_store();
        let user = seed_user(&store, "race@example.com");
        seed_profile(&store, &user, Role::Admin);

        let (session, _tokens) = establish_session(&store, &user.id).unwrap();
        store.delete_session(&session.id).unwrap();

        assert!(matches!(
            profile_for_live_session(&store, &session),
            Err(SessionError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_access_token_rejected() {
        let store = memory_store();
        let user = seed_user(&store, "late@example.com");

        let (mut session, tokens) = establish_session(&store, &user.id).unwrap();
        session.expires_at = Utc::now() - Duration::seconds(1);
        store.rotate_session(&session).unwrap();

        assert!(matches!(
            resolve_session(&store, &tokens.access_token),
            Err(SessionError::TokenExpired)
        ));
    }

    #[test]
    fn test_expired_login_token_rejected_and_consumed() {
        let store = memory_store();
        let user = seed_user(&store, "slow@example.com");

        let generator = TokenGenerator::new();
        let (raw, lookup, hash) = generator.generate().unwrap();
        let now = Utc::now();
        store
            .create_login_token(&LoginToken {
                id: Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                token_lookup: lookup,
                token_hash: hash,
                created_at: now - Duration::seconds(LOGIN_TOKEN_TTL_SECONDS + 1),
                expires_at: now - Duration::seconds(1),
            })
            .unwrap();

        assert!(matches!(
            redeem_login_token(&store, &raw),
            Err(SessionError::TokenExpired)
        ));
        // an expired link is consumed by the failed redemption
        assert!(matches!(
            redeem_login_token(&store, &raw),
            Err(SessionError::InvalidToken)
        ));
    }

    #[test]
    fn test_refresh_rotates_both_tokens() {
        let store = memory_store();
        let user = seed_user(&store, "c@example.com");

        let (_, tokens) = establish_session(&store, &user.id).unwrap();
        let (_, rotated) = refresh_session(&store, &tokens.refresh_token).unwrap();

        assert!(resolve_session(&store, &rotated.access_token).is_ok());
        assert!(matches!(
            resolve_session(&store, &tokens.access_token),
            Err(SessionError::InvalidToken)
        ));
        assert!(matches!(
            refresh_session(&store, &tokens.refresh_token),
            Err(SessionError::InvalidToken)
        ));
    }

    #[test]
    fn test_login_token_is_single_use() {
        let store = memory_store();
        let user = seed_user(&store, "d@example.com");

        let raw = issue_login_token(&store, &user.id).unwrap();
        assert_eq!(redeem_login_token(&store, &raw).unwrap(), user.id);
        assert!(matches!(
            redeem_login_token(&store, &raw),
            Err(SessionError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let store = memory_store();
        assert!(matches!(
            resolve_session(&store, "not-a-token"),
            Err(SessionError::InvalidToken)
        ));
    }
}
