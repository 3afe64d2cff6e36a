#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use rookery::{
    ServerConfig, create_app,
    db::Database,
    mail::Mailer,
    password::hash_password,
    rate_limit::RateLimits,
    token::{Claims, TokenSigner, TokenTtls, TokenType},
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Signing secret shared by the app under test and hand-crafted tokens.
pub const TEST_SECRET: &[u8] = b"test-secret-key-long-enough-for-hs256";

/// Mailer that captures outbound (email, token) pairs so tests can consume
/// verification and reset tokens without a mail server.
#[derive(Default)]
pub struct CapturingMailer {
    pub verifications: Mutex<Vec<(String, String)>>,
    pub resets: Mutex<Vec<(String, String)>>,
}

impl Mailer for CapturingMailer {
    fn send_verification(&self, email: &str, token: &str) {
        self.verifications
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
    }

    fn send_password_reset(&self, email: &str, token: &str) {
        self.resets
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
    }
}

impl CapturingMailer {
    pub fn last_verification(&self) -> Option<(String, String)> {
        self.verifications.lock().unwrap().last().cloned()
    }

    pub fn last_reset(&self) -> Option<(String, String)> {
        self.resets.lock().unwrap().last().cloned()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.lock().unwrap().len()
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub signer: TokenSigner,
    pub mailer: Arc<CapturingMailer>,
}

/// Create a test app with an in-memory database and generous rate limits.
pub async fn setup() -> TestApp {
    setup_with_limits(RateLimits {
        login_per_minute: 10_000,
        register_per_minute: 10_000,
        reset_request_per_minute: 10_000,
    })
    .await
}

pub async fn setup_with_limits(limits: RateLimits) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let mailer = Arc::new(CapturingMailer::default());

    let config = ServerConfig {
        db: db.clone(),
        token_secret: TEST_SECRET.to_vec(),
        ttls: TokenTtls::default(),
        mailer: mailer.clone(),
        rate_limits: limits,
    };

    TestApp {
        app: create_app(&config),
        db,
        signer: TokenSigner::new(TEST_SECRET, TokenTtls::default()),
        mailer,
    }
}

impl TestApp {
    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed")
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> Response<Body> {
        self.request(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .method("GET")
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_with_token(&self, path: &str, token: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json_with_token(
        &self,
        path: &str,
        token: &str,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.request(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Create an active user directly in the database. Returns the user ID.
    pub async fn create_active_user(&self, username: &str, email: &str, password: &str) -> i64 {
        let hash = hash_password(password).expect("Failed to hash password");
        let id = self
            .db
            .users()
            .create(username, email, &hash)
            .await
            .expect("Failed to create user");

        let mut tx = self.db.begin().await.expect("Failed to begin transaction");
        self.db
            .users()
            .activate_in_tx(&mut tx, id)
            .await
            .expect("Failed to activate user");
        tx.commit().await.expect("Failed to commit");

        id
    }

    /// Create an active admin user directly in the database.
    pub async fn create_admin_user(&self, username: &str, email: &str, password: &str) -> i64 {
        let hash = hash_password(password).expect("Failed to hash password");
        self.db
            .users()
            .create_admin(username, email, &hash)
            .await
            .expect("Failed to create admin")
    }

    /// Log in through the API and return the bearer token.
    pub async fn login(&self, login: &str, password: &str) -> String {
        let response = self
            .post_json(
                "/api/sessions",
                serde_json::json!({ "login": login, "password": password }),
            )
            .await;
        assert_eq!(response.status(), 200, "Login failed");
        let body = body_json(response).await;
        body["token"].as_str().expect("No token in response").to_string()
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not valid JSON")
}

/// Sign a token with arbitrary claims, for expiry and watermark tests that
/// need timestamps the real issuer would never produce.
pub fn forge_token(user_id: i64, token_type: TokenType, iat: u64, exp: u64) -> String {
    let claims = Claims {
        iat,
        exp,
        user_id,
        token_type,
        jti: uuid::Uuid::new_v4().to_string(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET),
    )
    .expect("Failed to sign test token")
}
