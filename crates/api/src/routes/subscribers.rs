//! Private subscriber management endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{Subscriber, SubscriberStatus};
use persistence::repositories::NewSubscriber;
use persistence::StoreError;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::pagination::{PageParams, Paginated};
use shared::validation::{is_valid_email, normalize_email, MAX_NAME_LENGTH};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriberRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSubscribersQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// POST /api/private/subscribers
pub async fn create_subscriber(
    State(state): State<AppState>,
    Json(req): Json<CreateSubscriberRequest>,
) -> Result<(StatusCode, Json<Subscriber>), ApiError> {
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(ApiError::BadRequest("email is required".to_string()));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("invalid email format".to_string()));
    }

    // Unlike the public endpoint, over-long names are rejected here
    // rather than truncated.
    let name = req.name.trim().to_string();
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest(
            "name must be 255 characters or less".to_string(),
        ));
    }

    match state.subscribers.by_email(&email).await {
        Ok(_) => {
            return Err(ApiError::Conflict(
                "subscriber with this email already exists".to_string(),
            ));
        }
        Err(StoreError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    let new = NewSubscriber {
        uuid: Uuid::new_v4().to_string(),
        email,
        name,
        status: SubscriberStatus::Pending,
        verify_token: Some(Uuid::new_v4().to_string()),
        unsubscribe_token: Uuid::new_v4().to_string(),
    };

    match state.subscribers.create(new).await {
        Ok(subscriber) => Ok((StatusCode::CREATED, Json(subscriber))),
        Err(StoreError::Duplicate) => Err(ApiError::Conflict(
            "subscriber with this email already exists".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

/// GET /api/private/subscribers
pub async fn list_subscribers(
    State(state): State<AppState>,
    Query(query): Query<ListSubscribersQuery>,
) -> Result<Json<Paginated<Subscriber>>, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<SubscriberStatus>().map_err(|_| {
            ApiError::BadRequest(
                "invalid status: must be pending, verified, or unsubscribed".to_string(),
            )
        })?),
    };

    let params = PageParams::from_query(query.page, query.per_page);
    let (subscribers, total) = state
        .subscribers
        .list(status, params.page, params.per_page)
        .await?;

    Ok(Json(Paginated::new(subscribers, params, total)))
}

/// GET /api/private/subscribers/{id}
pub async fn get_subscriber(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Subscriber>, ApiError> {
    match state.subscribers.by_uuid(&id).await {
        Ok(subscriber) => Ok(Json(subscriber)),
        Err(StoreError::NotFound) => Err(ApiError::NotFound("subscriber not found".to_string())),
        Err(err) => Err(err.into()),
    }
}

/// DELETE /api/private/subscribers/{id}
pub async fn delete_subscriber(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let subscriber = match state.subscribers.by_uuid(&id).await {
        Ok(subscriber) => subscriber,
        Err(StoreError::NotFound) => {
            return Err(ApiError::NotFound("subscriber not found".to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    state.subscribers.delete(subscriber.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/private/subscribers/{id}/send-verification
pub async fn send_verification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let subscriber = match state.subscribers.by_uuid(&id).await {
        Ok(subscriber) => subscriber,
        Err(StoreError::NotFound) => {
            return Err(ApiError::NotFound("subscriber not found".to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    if subscriber.status != SubscriberStatus::Pending {
        return Err(ApiError::BadRequest(
            "can only send verification email to pending subscribers".to_string(),
        ));
    }

    if !state.mailer.is_configured() {
        return Err(ApiError::BadRequest("SMTP is not configured".to_string()));
    }

    let verify_token = match subscriber.verify_token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => {
            return Err(ApiError::Internal(
                "subscriber has no verification token".to_string(),
            ));
        }
    };

    let verify_url = format!(
        "{}/api/verify/{}",
        state.config.server.public_url.trim_end_matches('/'),
        verify_token
    );
    let display_name = if subscriber.name.is_empty() {
        "there"
    } else {
        subscriber.name.as_str()
    };

    state
        .mailer
        .send_verification(&subscriber.email, display_name, &verify_url)
        .await
        .map_err(|err| ApiError::Internal(format!("failed to send verification email: {err}")))?;

    Ok(Json(json!({ "message": "verification email sent" })))
}
