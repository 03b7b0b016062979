//! # Chronicle
//!
//! A content server for small local-history websites, usable both as a
//! standalone binary and as a library.
//!
//! Pages are block-structured documents keyed by a URL slug. Editing routes
//! are gated by an ordered role model (viewer < editor < admin) backed by
//! opaque bearer session tokens.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! chronicle = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use chronicle::auth::{AuthEvents, LogMailer};
//! use chronicle::server::{AppState, create_router};
//! use chronicle::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/chronicle.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     Arc::new(LogMailer),
//!     AuthEvents::new(),
//!     None,
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the binary's CLI. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
