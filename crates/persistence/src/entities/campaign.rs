//! Campaign, campaign log and campaign journal entities.

use chrono::{DateTime, Utc};
use domain::models::{
    Campaign, CampaignJournal, CampaignLog, CampaignStatus, JournalKind, LogOutcome,
};
use sqlx::FromRow;

/// Database representation of the campaign status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum CampaignStatusDb {
    Draft,
    Sending,
    Sent,
    Failed,
    Cancelled,
}

impl From<CampaignStatus> for CampaignStatusDb {
    fn from(status: CampaignStatus) -> Self {
        match status {
            CampaignStatus::Draft => CampaignStatusDb::Draft,
            CampaignStatus::Sending => CampaignStatusDb::Sending,
            CampaignStatus::Sent => CampaignStatusDb::Sent,
            CampaignStatus::Failed => CampaignStatusDb::Failed,
            CampaignStatus::Cancelled => CampaignStatusDb::Cancelled,
        }
    }
}

impl From<CampaignStatusDb> for CampaignStatus {
    fn from(status: CampaignStatusDb) -> Self {
        match status {
            CampaignStatusDb::Draft => CampaignStatus::Draft,
            CampaignStatusDb::Sending => CampaignStatus::Sending,
            CampaignStatusDb::Sent => CampaignStatus::Sent,
            CampaignStatusDb::Failed => CampaignStatus::Failed,
            CampaignStatusDb::Cancelled => CampaignStatus::Cancelled,
        }
    }
}

/// Database representation of the log outcome column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum LogOutcomeDb {
    Sent,
    Failed,
}

impl From<LogOutcome> for LogOutcomeDb {
    fn from(outcome: LogOutcome) -> Self {
        match outcome {
            LogOutcome::Sent => LogOutcomeDb::Sent,
            LogOutcome::Failed => LogOutcomeDb::Failed,
        }
    }
}

impl From<LogOutcomeDb> for LogOutcome {
    fn from(outcome: LogOutcomeDb) -> Self {
        match outcome {
            LogOutcomeDb::Sent => LogOutcome::Sent,
            LogOutcomeDb::Failed => LogOutcome::Failed,
        }
    }
}

/// Database representation of the journal event type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum JournalKindDb {
    Info,
    Warning,
    Error,
    Success,
}

impl From<JournalKind> for JournalKindDb {
    fn from(kind: JournalKind) -> Self {
        match kind {
            JournalKind::Info => JournalKindDb::Info,
            JournalKind::Warning => JournalKindDb::Warning,
            JournalKind::Error => JournalKindDb::Error,
            JournalKind::Success => JournalKindDb::Success,
        }
    }
}

impl From<JournalKindDb> for JournalKind {
    fn from(kind: JournalKindDb) -> Self {
        match kind {
            JournalKindDb::Info => JournalKind::Info,
            JournalKindDb::Warning => JournalKind::Warning,
            JournalKindDb::Error => JournalKind::Error,
            JournalKindDb::Success => JournalKind::Success,
        }
    }
}

/// Database row mapping for the campaigns table.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignEntity {
    pub id: i64,
    pub uuid: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub status: CampaignStatusDb,
    pub total_count: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<CampaignEntity> for Campaign {
    fn from(row: CampaignEntity) -> Self {
        Campaign {
            id: row.id,
            uuid: row.uuid,
            subject: row.subject,
            body_text: row.body_text,
            body_html: row.body_html,
            status: row.status.into(),
            total_count: row.total_count,
            sent_count: row.sent_count,
            failed_count: row.failed_count,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

/// Database row mapping for the campaign_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignLogEntity {
    pub id: i64,
    pub campaign_id: i64,
    pub subscriber_id: i64,
    pub outcome: LogOutcomeDb,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl From<CampaignLogEntity> for CampaignLog {
    fn from(row: CampaignLogEntity) -> Self {
        CampaignLog {
            id: row.id,
            campaign_id: row.campaign_id,
            subscriber_id: row.subscriber_id,
            outcome: row.outcome.into(),
            error: row.error,
            sent_at: row.sent_at,
        }
    }
}

/// Database row mapping for the campaign_journal table.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignJournalEntity {
    pub id: i64,
    pub campaign_id: i64,
    pub event_type: JournalKindDb,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<CampaignJournalEntity> for CampaignJournal {
    fn from(row: CampaignJournalEntity) -> Self {
        CampaignJournal {
            id: row.id,
            campaign_id: row.campaign_id,
            kind: row.event_type.into(),
            message: row.message,
            created_at: row.created_at,
        }
    }
}
