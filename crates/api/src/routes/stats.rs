//! Private dashboard statistics endpoint.

use axum::{extract::State, Json};
use domain::models::{CampaignStatus, Stats, SubscriberStatus};

use crate::app::AppState;
use crate::error::ApiError;

/// GET /api/private/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    let stats = Stats {
        total_subscribers: state.subscribers.count_all().await?,
        verified_subscribers: state
            .subscribers
            .count_by_status(SubscriberStatus::Verified)
            .await?,
        pending_subscribers: state
            .subscribers
            .count_by_status(SubscriberStatus::Pending)
            .await?,
        total_campaigns: state.campaigns.count_all().await?,
        sent_campaigns: state
            .campaigns
            .count_by_status(CampaignStatus::Sent)
            .await?,
    };

    Ok(Json(stats))
}
