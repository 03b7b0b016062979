pub const SCHEMA: &str = r#"
-- Accounts owned by the identity subsystem
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT,            -- NULL for magic-link-only accounts
    created_at TEXT DEFAULT (datetime('now'))
);

-- Companion profile, exactly one per user; role drives the authorization gate
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    email TEXT NOT NULL,
    full_name TEXT,
    role TEXT NOT NULL DEFAULT 'viewer',  -- viewer | editor | admin
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Sessions hold argon2 hashes of the access and refresh tokens plus a lookup
-- prefix for each, so validation is one indexed read and one verify
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    access_lookup TEXT NOT NULL,
    access_hash TEXT NOT NULL,
    refresh_lookup TEXT NOT NULL,
    refresh_hash TEXT NOT NULL,
    issued_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL,      -- access token expiry; refresh lives with the row
    last_used_at TEXT
);

-- Single-use magic-link credentials, deleted on redemption
CREATE TABLE IF NOT EXISTS login_tokens (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_lookup TEXT NOT NULL,
    token_hash TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL
);

-- Service-level credentials for the administrative endpoint
CREATE TABLE IF NOT EXISTS service_tokens (
    id TEXT PRIMARY KEY,
    token_lookup TEXT NOT NULL,
    token_hash TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    last_used_at TEXT
);

-- Page documents; content is the serialized block tree, saved as given
CREATE TABLE IF NOT EXISTS pages (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_access_lookup ON sessions(access_lookup);
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_refresh_lookup ON sessions(refresh_lookup);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_login_tokens_lookup ON login_tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_login_tokens_user ON login_tokens(user_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_service_tokens_lookup ON service_tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_pages_updated ON pages(updated_at);
"#;
