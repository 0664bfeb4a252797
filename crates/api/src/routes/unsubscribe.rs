//! Public unsubscribe endpoint. Idempotent.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::SubscriberStatus;
use persistence::StoreError;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub message: String,
}

/// GET /api/unsubscribe/{token}
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<UnsubscribeResponse>, ApiError> {
    let subscriber = match state.subscribers.by_unsubscribe_token(&token).await {
        Ok(subscriber) => subscriber,
        Err(StoreError::NotFound) => {
            return Err(ApiError::NotFound("invalid unsubscribe link".to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    if subscriber.status == SubscriberStatus::Unsubscribed {
        return Ok(Json(UnsubscribeResponse {
            message: "You have already been unsubscribed.".to_string(),
        }));
    }

    state
        .subscribers
        .update_status(subscriber.id, SubscriberStatus::Unsubscribed)
        .await?;

    Ok(Json(UnsubscribeResponse {
        message: "You have been unsubscribed successfully.".to_string(),
    }))
}
