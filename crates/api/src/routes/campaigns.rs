//! Private campaign management endpoints.
//!
//! Edit and delete are restricted to `draft`; send and cancel delegate to
//! the delivery engine, which owns the sending registry.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{Campaign, CampaignJournal, CampaignStatus};
use persistence::repositories::NewCampaign;
use persistence::StoreError;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::validation::MAX_SUBJECT_LENGTH;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::worker::SendCampaignError;

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCampaignRequest {
    pub subject: Option<String>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
}

fn validate_subject(raw: &str) -> Result<String, ApiError> {
    let subject = raw.trim();
    if subject.is_empty() {
        return Err(ApiError::BadRequest("subject is required".to_string()));
    }
    if subject.chars().count() > MAX_SUBJECT_LENGTH {
        return Err(ApiError::BadRequest(
            "subject must be 500 characters or less".to_string(),
        ));
    }
    Ok(subject.to_string())
}

fn validate_body_text(raw: &str) -> Result<String, ApiError> {
    let body_text = raw.trim();
    if body_text.is_empty() {
        return Err(ApiError::BadRequest("body_text is required".to_string()));
    }
    Ok(body_text.to_string())
}

/// Trims the HTML body; a whitespace-only body collapses to none.
fn normalize_body_html(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

async fn load_campaign(state: &AppState, uuid: &str) -> Result<Campaign, ApiError> {
    match state.campaigns.by_uuid(uuid).await {
        Ok(campaign) => Ok(campaign),
        Err(StoreError::NotFound) => Err(ApiError::NotFound("campaign not found".to_string())),
        Err(err) => Err(err.into()),
    }
}

/// POST /api/private/campaigns
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Campaign>), ApiError> {
    let subject = validate_subject(&req.subject)?;
    let body_text = validate_body_text(&req.body_text)?;
    let body_html = normalize_body_html(req.body_html.as_deref());

    let campaign = state
        .campaigns
        .create(NewCampaign {
            uuid: Uuid::new_v4().to_string(),
            subject,
            body_text,
            body_html,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /api/private/campaigns
pub async fn list_campaigns(
    State(state): State<AppState>,
) -> Result<Json<Vec<Campaign>>, ApiError> {
    let campaigns = state.campaigns.list().await?;
    Ok(Json(campaigns))
}

/// GET /api/private/campaigns/{id}
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiError> {
    let campaign = load_campaign(&state, &id).await?;
    Ok(Json(campaign))
}

/// PUT /api/private/campaigns/{id}
pub async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<Json<Campaign>, ApiError> {
    let mut campaign = load_campaign(&state, &id).await?;

    if campaign.status != CampaignStatus::Draft {
        return Err(ApiError::BadRequest(
            "can only edit draft campaigns".to_string(),
        ));
    }

    if let Some(subject) = req.subject.as_deref() {
        campaign.subject = validate_subject(subject)?;
    }
    if let Some(body_text) = req.body_text.as_deref() {
        campaign.body_text = validate_body_text(body_text)?;
    }
    if req.body_html.is_some() {
        campaign.body_html = normalize_body_html(req.body_html.as_deref());
    }

    state
        .campaigns
        .update_fields(
            campaign.id,
            &campaign.subject,
            &campaign.body_text,
            campaign.body_html.as_deref(),
        )
        .await?;

    Ok(Json(campaign))
}

/// DELETE /api/private/campaigns/{id}
pub async fn delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let campaign = load_campaign(&state, &id).await?;

    if campaign.status != CampaignStatus::Draft {
        return Err(ApiError::BadRequest(
            "can only delete draft campaigns".to_string(),
        ));
    }

    state.campaigns.delete(campaign.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/private/campaigns/{id}/send
pub async fn send_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let campaign = load_campaign(&state, &id).await?;

    state.worker.send(campaign.id).await.map_err(|err| match err {
        SendCampaignError::AlreadySending => {
            ApiError::BadRequest("campaign is already being sent".to_string())
        }
        SendCampaignError::WrongStatus => {
            ApiError::BadRequest("can only send draft campaigns".to_string())
        }
        SendCampaignError::NoRecipients => {
            ApiError::BadRequest("no verified subscribers to send to".to_string())
        }
        SendCampaignError::Store(store_err) => ApiError::from(store_err),
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "campaign sending started",
            "id": campaign.uuid,
        })),
    ))
}

/// POST /api/private/campaigns/{id}/cancel
pub async fn cancel_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let campaign = load_campaign(&state, &id).await?;

    state
        .worker
        .cancel(campaign.id)
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    Ok(Json(json!({
        "message": "campaign cancellation requested",
        "id": campaign.uuid,
    })))
}

/// GET /api/private/campaigns/{id}/journal
pub async fn get_journal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CampaignJournal>>, ApiError> {
    let campaign = load_campaign(&state, &id).await?;
    let journal = state.campaigns.list_journal(campaign.id).await?;
    Ok(Json(journal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_is_trimmed_and_bounded() {
        assert_eq!(validate_subject("  Hello  ").unwrap(), "Hello");
        assert!(validate_subject("   ").is_err());
        assert!(validate_subject(&"s".repeat(500)).is_ok());
        assert!(validate_subject(&"s".repeat(501)).is_err());
    }

    #[test]
    fn body_text_must_be_non_empty_after_trim() {
        assert_eq!(validate_body_text(" Body ").unwrap(), "Body");
        assert!(validate_body_text("\n\t ").is_err());
    }

    #[test]
    fn whitespace_only_html_collapses_to_none() {
        assert_eq!(normalize_body_html(None), None);
        assert_eq!(normalize_body_html(Some("  ")), None);
        assert_eq!(
            normalize_body_html(Some(" <p>Hi</p> ")),
            Some("<p>Hi</p>".to_string())
        );
    }
}
