mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn update_user_password(&self, id: &str, password_hash: &str) -> Result<()>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Profile operations
    fn create_profile(&self, profile: &Profile) -> Result<()>;
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;
    fn list_profiles(&self, cursor: &str, limit: i32) -> Result<Vec<Profile>>;
    fn update_profile_role(&self, user_id: &str, role: Role) -> Result<()>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session(&self, id: &str) -> Result<Option<Session>>;
    fn get_session_by_access_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn get_session_by_refresh_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn rotate_session(&self, session: &Session) -> Result<()>;
    fn touch_session(&self, id: &str) -> Result<()>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn delete_user_sessions(&self, user_id: &str) -> Result<usize>;

    // Magic-link login token operations
    fn create_login_token(&self, token: &LoginToken) -> Result<()>;
    fn get_login_token_by_lookup(&self, lookup: &str) -> Result<Option<LoginToken>>;
    fn delete_login_token(&self, id: &str) -> Result<bool>;

    // Service token operations
    fn create_service_token(&self, token: &ServiceToken) -> Result<()>;
    fn get_service_token_by_lookup(&self, lookup: &str) -> Result<Option<ServiceToken>>;
    fn touch_service_token(&self, id: &str) -> Result<()>;
    fn has_service_token(&self) -> Result<bool>;

    // Page document operations
    fn create_page(&self, page: &PageDocument) -> Result<()>;
    fn upsert_page(&self, page: &PageDocument) -> Result<()>;
    fn get_page_by_slug(&self, slug: &str) -> Result<Option<PageDocument>>;
    fn list_pages(&self) -> Result<Vec<PageDocument>>;
    fn delete_page(&self, id: &str) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
