//! Campaign domain models: the campaign itself, per-recipient delivery
//! logs and the lifecycle journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a campaign.
///
/// The observable sequence is always a subsequence of
/// `draft -> sending -> {sent, failed, cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Sent,
    Failed,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Failed => "failed",
            CampaignStatus::Cancelled => "cancelled",
        }
    }

    /// A campaign in a terminal status is immutable except for deletion,
    /// and deletion is only permitted in `draft`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CampaignStatus::Sent | CampaignStatus::Failed | CampaignStatus::Cancelled
        )
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single email broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub uuid: String,
    pub subject: String,
    pub body_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
    pub status: CampaignStatus,
    pub total_count: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of one delivery attempt, after retries were exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutcome {
    Sent,
    Failed,
}

impl LogOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogOutcome::Sent => "sent",
            LogOutcome::Failed => "failed",
        }
    }
}

/// Per-recipient delivery record. At most one row exists per
/// `(campaign, subscriber)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignLog {
    pub id: i64,
    pub campaign_id: i64,
    pub subscriber_id: i64,
    pub outcome: LogOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Severity of a journal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalKind {
    Info,
    Warning,
    Error,
    Success,
}

impl JournalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalKind::Info => "info",
            JournalKind::Warning => "warning",
            JournalKind::Error => "error",
            JournalKind::Success => "success",
        }
    }
}

/// Human-readable lifecycle event emitted while a campaign sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignJournal {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub campaign_id: i64,
    #[serde(rename = "event_type")]
    pub kind: JournalKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
