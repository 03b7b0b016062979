use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a transient in-memory database. Used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Maps unique-constraint violations to `Error::AlreadyExists` so handlers
/// can surface them as conflicts.
fn map_insert_err(e: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            return Error::AlreadyExists;
        }
    }
    Error::Database(e)
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn profile_from_row(row: &Row) -> rusqlite::Result<Profile> {
    let role: String = row.get(3)?;
    Ok(Profile {
        user_id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: role.parse().unwrap_or_default(),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn session_from_row(row: &Row) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        access_lookup: row.get(2)?,
        access_hash: row.get(3)?,
        refresh_lookup: row.get(4)?,
        refresh_hash: row.get(5)?,
        issued_at: parse_datetime(&row.get::<_, String>(6)?),
        expires_at: parse_datetime(&row.get::<_, String>(7)?),
        last_used_at: row
            .get::<_, Option<String>>(8)?
            .map(|s| parse_datetime(&s)),
    })
}

fn page_from_row(row: &Row) -> rusqlite::Result<PageDocument> {
    let content: String = row.get(3)?;
    Ok(PageDocument {
        id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        content: serde_json::from_str(&content).unwrap_or(serde_json::Value::Null),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const USER_COLS: &str = "id, email, password_hash, created_at";
const PROFILE_COLS: &str = "user_id, email, full_name, role, created_at, updated_at";
const SESSION_COLS: &str = "id, user_id, access_lookup, access_hash, refresh_lookup, refresh_hash, issued_at, expires_at, last_used_at";
const PAGE_COLS: &str = "id, slug, title, content, created_at, updated_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id,
                    user.email,
                    user.password_hash,
                    format_datetime(&user.created_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_user_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Profile operations

    fn create_profile(&self, profile: &Profile) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO profiles (user_id, email, full_name, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    profile.user_id,
                    profile.email,
                    profile.full_name,
                    profile.role.as_str(),
                    format_datetime(&profile.created_at),
                    format_datetime(&profile.updated_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROFILE_COLS} FROM profiles WHERE user_id = ?1"),
            params![user_id],
            profile_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_profiles(&self, cursor: &str, limit: i32) -> Result<Vec<Profile>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLS} FROM profiles WHERE user_id > ?1 ORDER BY user_id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], profile_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_profile_role(&self, user_id: &str, role: Role) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE profiles SET role = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![role.as_str(), format_datetime(&Utc::now()), user_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            &format!("INSERT INTO sessions ({SESSION_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                session.id,
                session.user_id,
                session.access_lookup,
                session.access_hash,
                session.refresh_lookup,
                session.refresh_hash,
                format_datetime(&session.issued_at),
                format_datetime(&session.expires_at),
                session.last_used_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SESSION_COLS} FROM sessions WHERE id = ?1"),
            params![id],
            session_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_session_by_access_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SESSION_COLS} FROM sessions WHERE access_lookup = ?1"),
            params![lookup],
            session_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_session_by_refresh_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SESSION_COLS} FROM sessions WHERE refresh_lookup = ?1"),
            params![lookup],
            session_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn rotate_session(&self, session: &Session) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE sessions SET access_lookup = ?1, access_hash = ?2,
             refresh_lookup = ?3, refresh_hash = ?4, expires_at = ?5 WHERE id = ?6",
            params![
                session.access_lookup,
                session.access_hash,
                session.refresh_lookup,
                session.refresh_hash,
                format_datetime(&session.expires_at),
                session.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn touch_session(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sessions SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn delete_user_sessions(&self, user_id: &str) -> Result<usize> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
        Ok(rows)
    }

    // Magic-link login token operations

    fn create_login_token(&self, token: &LoginToken) -> Result<()> {
        self.conn().execute(
            "INSERT INTO login_tokens (id, user_id, token_lookup, token_hash, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.user_id,
                token.token_lookup,
                token.token_hash,
                format_datetime(&token.created_at),
                format_datetime(&token.expires_at),
            ],
        )?;
        Ok(())
    }

    fn get_login_token_by_lookup(&self, lookup: &str) -> Result<Option<LoginToken>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, token_lookup, token_hash, created_at, expires_at
             FROM login_tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(LoginToken {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    token_lookup: row.get(2)?,
                    token_hash: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: parse_datetime(&row.get::<_, String>(5)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_login_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM login_tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Service token operations

    fn create_service_token(&self, token: &ServiceToken) -> Result<()> {
        self.conn().execute(
            "INSERT INTO service_tokens (id, token_lookup, token_hash, created_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                token.id,
                token.token_lookup,
                token.token_hash,
                format_datetime(&token.created_at),
                token.last_used_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_service_token_by_lookup(&self, lookup: &str) -> Result<Option<ServiceToken>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_lookup, token_hash, created_at, last_used_at
             FROM service_tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(ServiceToken {
                    id: row.get(0)?,
                    token_lookup: row.get(1)?,
                    token_hash: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                    last_used_at: row
                        .get::<_, Option<String>>(4)?
                        .map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn touch_service_token(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE service_tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_service_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 =
            conn.query_row("SELECT COUNT(*) FROM service_tokens", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    // Page document operations

    fn create_page(&self, page: &PageDocument) -> Result<()> {
        let content = serde_json::to_string(&page.content)?;
        self.conn()
            .execute(
                &format!("INSERT INTO pages ({PAGE_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    page.id,
                    page.slug,
                    page.title,
                    content,
                    format_datetime(&page.created_at),
                    format_datetime(&page.updated_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn upsert_page(&self, page: &PageDocument) -> Result<()> {
        let content = serde_json::to_string(&page.content)?;
        self.conn().execute(
            &format!(
                "INSERT INTO pages ({PAGE_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (slug) DO UPDATE SET
                    title = excluded.title,
                    content = excluded.content,
                    updated_at = excluded.updated_at"
            ),
            params![
                page.id,
                page.slug,
                page.title,
                content,
                format_datetime(&page.created_at),
                format_datetime(&page.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_page_by_slug(&self, slug: &str) -> Result<Option<PageDocument>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PAGE_COLS} FROM pages WHERE slug = ?1"),
            params![slug],
            page_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_pages(&self) -> Result<Vec<PageDocument>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PAGE_COLS} FROM pages ORDER BY updated_at DESC, slug"
        ))?;

        let rows = stmt.query_map([], page_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_page(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM pages WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
