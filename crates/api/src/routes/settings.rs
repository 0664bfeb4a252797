//! Private SMTP settings endpoints.
//!
//! Settings live in the store, not the config file, so the transport can
//! be reconfigured without a process restart. The password is never
//! echoed back; `***` (or an empty value) on update means "keep existing".

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::email::SmtpConfig;

const PASSWORD_MASK: &str = "***";

/// Wire shape of the SMTP settings, shared by GET and PUT.
#[derive(Debug, Serialize, Deserialize)]
pub struct SmtpSettings {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub from_name: String,
    #[serde(default = "default_tls")]
    pub tls: bool,
}

fn default_port() -> u16 {
    587
}

fn default_tls() -> bool {
    true
}

/// GET /api/private/settings/smtp
pub async fn get_smtp_settings(State(state): State<AppState>) -> Json<SmtpSettings> {
    // A fresh install has no settings rows; fall back to defaults.
    let stored = state.settings.get_all().await.unwrap_or_default();

    let port = stored
        .get("smtp_port")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(default_port);
    let tls = stored
        .get("smtp_tls")
        .map(|raw| raw == "true")
        .unwrap_or_else(default_tls);
    let password = if stored.get("smtp_password").is_some_and(|p| !p.is_empty()) {
        PASSWORD_MASK.to_string()
    } else {
        String::new()
    };

    Json(SmtpSettings {
        host: stored.get("smtp_host").cloned().unwrap_or_default(),
        port,
        username: stored.get("smtp_username").cloned().unwrap_or_default(),
        password,
        from_email: stored.get("smtp_from_email").cloned().unwrap_or_default(),
        from_name: stored.get("smtp_from_name").cloned().unwrap_or_default(),
        tls,
    })
}

/// PUT /api/private/settings/smtp
pub async fn update_smtp_settings(
    State(state): State<AppState>,
    Json(req): Json<SmtpSettings>,
) -> Result<Json<Value>, ApiError> {
    if req.host.is_empty() {
        return Err(ApiError::BadRequest("SMTP host is required".to_string()));
    }
    if req.from_email.is_empty() {
        return Err(ApiError::BadRequest("From email is required".to_string()));
    }

    state.settings.set("smtp_host", &req.host).await?;
    state.settings.set("smtp_port", &req.port.to_string()).await?;
    state.settings.set("smtp_username", &req.username).await?;
    if !req.password.is_empty() && req.password != PASSWORD_MASK {
        state.settings.set("smtp_password", &req.password).await?;
    }
    state.settings.set("smtp_from_email", &req.from_email).await?;
    state.settings.set("smtp_from_name", &req.from_name).await?;
    state
        .settings
        .set("smtp_tls", if req.tls { "true" } else { "false" })
        .await?;

    // A masked password means the persisted one stays in effect.
    let password = if !req.password.is_empty() && req.password != PASSWORD_MASK {
        req.password
    } else {
        state.settings.get("smtp_password").await?.unwrap_or_default()
    };

    state.mailer.configure(SmtpConfig {
        host: req.host,
        port: req.port,
        username: req.username,
        password,
        from_email: req.from_email,
        from_name: req.from_name,
        tls: req.tls,
    });

    Ok(Json(json!({ "message": "Settings saved successfully" })))
}

#[derive(Debug, Deserialize)]
pub struct TestSmtpRequest {
    #[serde(default)]
    pub email: String,
}

/// POST /api/private/settings/smtp/test
pub async fn test_smtp_settings(
    State(state): State<AppState>,
    Json(req): Json<TestSmtpRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.email.is_empty() {
        return Err(ApiError::BadRequest("Email address is required".to_string()));
    }

    if !state.mailer.is_configured() {
        return Err(ApiError::BadRequest("SMTP is not configured".to_string()));
    }

    state
        .mailer
        .send_test(&req.email)
        .await
        .map_err(|err| ApiError::Internal(format!("Failed to send test email: {err}")))?;

    Ok(Json(json!({ "message": "Test email sent successfully" })))
}
