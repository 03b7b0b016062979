use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use chronicle::auth::{AuthEvents, Mailer, TokenGenerator};
use chronicle::server::{AppState, create_router};
use chronicle::store::{SqliteStore, Store};
use chronicle::types::{Role, ServiceToken};

/// Captures magic links instead of logging them, so tests can redeem them.
#[derive(Default)]
pub struct MemoryMailer {
    pub links: Mutex<Vec<(String, String)>>,
}

impl Mailer for MemoryMailer {
    fn send_magic_link(&self, email: &str, link: &str) {
        self.links
            .lock()
            .unwrap()
            .push((email.to_string(), link.to_string()));
    }
}

impl MemoryMailer {
    pub fn sent_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    /// Raw token from the most recently sent magic link.
    pub fn last_token(&self) -> Option<String> {
        let links = self.links.lock().unwrap();
        let (_, link) = links.last()?;
        link.split("token=").nth(1).map(str::to_string)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<SqliteStore>,
    pub mailer: Arc<MemoryMailer>,
    pub service_token: String,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store =
            Arc::new(SqliteStore::new(temp_dir.path().join("test.db")).expect("open store"));
        store.initialize().expect("initialize store");

        let generator = TokenGenerator::new();
        let (service_token, lookup, hash) = generator.generate().expect("generate token");
        store
            .create_service_token(&ServiceToken {
                id: Uuid::new_v4().to_string(),
                token_hash: hash,
                token_lookup: lookup,
                created_at: Utc::now(),
                last_used_at: None,
            })
            .expect("seed service token");

        let mailer = Arc::new(MemoryMailer::default());
        let state = Arc::new(AppState::new(
            store.clone(),
            mailer.clone(),
            AuthEvents::new(),
            Some("http://test.local".to_string()),
        ));

        Self {
            router: create_router(state),
            store,
            mailer,
            service_token,
            _temp_dir: temp_dir,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, text) = self.request_raw(method, uri, token, body).await;
        let json = serde_json::from_str(&text).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn request_raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("send request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Signs up an account through the API and returns (user_id, access_token).
    pub async fn sign_up(&self, email: &str, password: &str) -> (String, String) {
        let (status, body) = self
            .request(
                "POST",
                "/api/v1/auth/signup",
                None,
                Some(serde_json::json!({"email": email, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");

        let user_id = body["data"]["user"]["id"].as_str().expect("user id").to_string();
        let token = body["data"]["access_token"]
            .as_str()
            .expect("access token")
            .to_string();
        (user_id, token)
    }

    /// Promotes an account directly in the store, bypassing the admin route.
    /// Used to bootstrap the first editor/admin in a test.
    pub fn set_role(&self, user_id: &str, role: Role) {
        self.store
            .update_profile_role(user_id, role)
            .expect("update role");
    }
}
