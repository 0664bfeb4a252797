//! Public subscription endpoint (first half of double opt-in).

use axum::{extract::State, Json};
use domain::models::SubscriberStatus;
use persistence::repositories::NewSubscriber;
use persistence::StoreError;
use serde::{Deserialize, Serialize};
use shared::validation::{is_valid_email, normalize_email, normalize_name};
use tracing::warn;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// The one public success message. Identical for fresh and duplicate
/// signups so the endpoint never discloses whether an address exists.
const SUBSCRIBE_MESSAGE: &str = "Please check your email to verify your subscription.";

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub message: String,
}

fn opaque_success() -> Json<SubscribeResponse> {
    Json(SubscribeResponse {
        message: SUBSCRIBE_MESSAGE.to_string(),
    })
}

/// POST /api/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(ApiError::BadRequest("email is required".to_string()));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("invalid email format".to_string()));
    }

    let name = normalize_name(&req.name);

    // Existing subscribers get the same response as fresh signups.
    match state.subscribers.by_email(&email).await {
        Ok(_) => return Ok(opaque_success()),
        Err(StoreError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    let verify_token = Uuid::new_v4().to_string();
    let new = NewSubscriber {
        uuid: Uuid::new_v4().to_string(),
        email: email.clone(),
        name: name.clone(),
        status: SubscriberStatus::Pending,
        verify_token: Some(verify_token.clone()),
        unsubscribe_token: Uuid::new_v4().to_string(),
    };

    match state.subscribers.create(new).await {
        Ok(_) => {}
        // Lost the race against a concurrent signup for the same address.
        Err(StoreError::Duplicate) => return Ok(opaque_success()),
        Err(err) => return Err(err.into()),
    }

    if state.mailer.is_configured() {
        let verify_url = format!(
            "{}/api/verify/{}",
            state.config.server.public_url.trim_end_matches('/'),
            verify_token
        );
        let display_name = if name.is_empty() { "there" } else { name.as_str() };
        if let Err(err) = state
            .mailer
            .send_verification(&email, display_name, &verify_url)
            .await
        {
            warn!(email = %email, error = %err, "failed to send verification email");
        }
    }

    Ok(opaque_success())
}
