use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Role;

/// An account held by the identity subsystem. `password_hash` is `None` for
/// accounts that only ever sign in through magic links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Companion record for a user, 1:1 by `user_id`. Carries the role consulted
/// by the authorization gate; a user whose profile row is missing is treated
/// as a viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A signed-in session. Both tokens are opaque bearer strings; only their
/// argon2 hashes and lookup prefixes are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    #[serde(skip)]
    pub access_lookup: String,
    #[serde(skip)]
    pub access_hash: String,
    #[serde(skip)]
    pub refresh_lookup: String,
    #[serde(skip)]
    pub refresh_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// A single-use magic-link credential. Deleted on redemption.
#[derive(Debug, Clone)]
pub struct LoginToken {
    pub id: String,
    pub user_id: String,
    pub token_lookup: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Service-level credential guarding the administrative endpoint. Created by
/// `chronicle admin init`, independent of any user session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceToken {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// A named page keyed by a unique URL slug. `content` is the serialized block
/// tree, stored verbatim; saves are last-write-wins replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDocument {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
