//! Common test utilities: an in-memory SQLite store with migrations
//! applied, a recording mailer double and request helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use domain::models::Campaign;
use persistence::repositories::CampaignRepository;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tinylist_api::app::create_app;
use tinylist_api::config::{
    AuthConfig, Config, DatabaseConfig, LoggingConfig, SendingConfig, ServerConfig,
};
use tinylist_api::services::email::{MailError, Mailer, SmtpConfig};
use tokio_util::sync::CancellationToken;

pub const TEST_USERNAME: &str = "admin";
pub const TEST_PASSWORD: &str = "s3cret";
pub const TEST_PUBLIC_URL: &str = "http://lists.test";

/// One recorded outbound email.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub kind: SentKind,
    pub to: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentKind {
    Test,
    Verification,
    Campaign,
}

/// Mailer double that records every send instead of talking SMTP.
///
/// Behavior knobs: `fail_recipients` makes campaign sends to those
/// addresses fail permanently; `delay` makes each campaign send take that
/// long (raced against the cancellation signal, like the real transport).
pub struct RecordingMailer {
    configured: AtomicBool,
    pub sent: Mutex<Vec<SentEmail>>,
    pub fail_recipients: Mutex<HashSet<String>>,
    pub delay: Mutex<Option<Duration>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        RecordingMailer {
            configured: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
            fail_recipients: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
        }
    }

    pub fn unconfigured() -> Self {
        let mailer = Self::new();
        mailer.configured.store(false, Ordering::SeqCst);
        mailer
    }

    pub fn fail_for(&self, email: &str) {
        self.fail_recipients
            .lock()
            .unwrap()
            .insert(email.to_string());
    }

    pub fn delay_sends(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn campaign_sends(&self) -> Vec<SentEmail> {
        self.sent_emails()
            .into_iter()
            .filter(|email| email.kind == SentKind::Campaign)
            .collect()
    }

    pub fn verification_sends(&self) -> Vec<SentEmail> {
        self.sent_emails()
            .into_iter()
            .filter(|email| email.kind == SentKind::Verification)
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn configure(&self, config: SmtpConfig) {
        self.configured
            .store(config.is_configured(), Ordering::SeqCst);
    }

    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    async fn send_test(&self, to_email: &str) -> Result<(), MailError> {
        if !self.is_configured() {
            return Err(MailError::NotConfigured);
        }
        self.sent.lock().unwrap().push(SentEmail {
            kind: SentKind::Test,
            to: to_email.to_string(),
            subject: "TinyList - Test Email".to_string(),
            body_text: String::new(),
            body_html: None,
            url: None,
        });
        Ok(())
    }

    async fn send_verification(
        &self,
        to_email: &str,
        _to_name: &str,
        verify_url: &str,
    ) -> Result<(), MailError> {
        if !self.is_configured() {
            return Err(MailError::NotConfigured);
        }
        self.sent.lock().unwrap().push(SentEmail {
            kind: SentKind::Verification,
            to: to_email.to_string(),
            subject: "Please verify your email address".to_string(),
            body_text: String::new(),
            body_html: None,
            url: Some(verify_url.to_string()),
        });
        Ok(())
    }

    async fn send_campaign(
        &self,
        cancel: &CancellationToken,
        to_email: &str,
        _to_name: &str,
        subject: &str,
        body_text: &str,
        body_html: Option<&str>,
        unsubscribe_url: &str,
    ) -> Result<(), MailError> {
        if cancel.is_cancelled() {
            return Err(MailError::Cancelled);
        }

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(MailError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if self.fail_recipients.lock().unwrap().contains(to_email) {
            return Err(MailError::Smtp("550 permanent failure".to_string()));
        }

        self.sent.lock().unwrap().push(SentEmail {
            kind: SentKind::Campaign,
            to: to_email.to_string(),
            subject: subject.to_string(),
            body_text: body_text.to_string(),
            body_html: body_html.map(str::to_string),
            url: Some(unsubscribe_url.to_string()),
        });
        Ok(())
    }
}

/// Create an in-memory test database pool with migrations applied.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn create_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("invalid connect options")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Test configuration: fast rate limit, no retries, small batches.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_url: TEST_PUBLIC_URL.to_string(),
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            path: ":memory:".to_string(),
            max_connections: 1,
        },
        auth: AuthConfig {
            username: TEST_USERNAME.to_string(),
            password: TEST_PASSWORD.to_string(),
        },
        sending: SendingConfig {
            rate_limit: 1000,
            max_retries: 0,
            retry_delay_secs: 0,
            batch_size: 2,
        },
        logging: LoggingConfig::default(),
    }
}

/// Builds the full application over a fresh in-memory store.
pub async fn create_test_app() -> (Router, SqlitePool, Arc<RecordingMailer>) {
    create_test_app_with(test_config()).await
}

pub async fn create_test_app_with(config: Config) -> (Router, SqlitePool, Arc<RecordingMailer>) {
    let pool = create_test_pool().await;
    let mailer = Arc::new(RecordingMailer::new());
    let app = create_app(config, pool.clone(), mailer.clone());
    (app, pool, mailer)
}

pub fn basic_auth_value() -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{TEST_USERNAME}:{TEST_PASSWORD}"))
    )
}

/// Helper to create a JSON request.
pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Helper to create an authenticated JSON request.
pub fn authed_json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, basic_auth_value())
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Helper to create an authenticated request without a body.
pub fn authed_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth_value())
        .body(Body::empty())
        .unwrap()
}

/// Helper to parse a JSON response body.
pub async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// Helper to read a response body as a string.
pub async fn body_string(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Polls until the campaign reaches a terminal status.
pub async fn wait_for_terminal(pool: &SqlitePool, uuid: &str) -> Campaign {
    let campaigns = CampaignRepository::new(pool.clone());
    for _ in 0..500 {
        let campaign = campaigns.by_uuid(uuid).await.expect("campaign must exist");
        if campaign.status.is_terminal() {
            return campaign;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("campaign {uuid} did not reach a terminal status in time");
}
