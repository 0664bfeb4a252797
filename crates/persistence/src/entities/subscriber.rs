//! Subscriber entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Subscriber, SubscriberStatus};
use sqlx::FromRow;

/// Database representation of the subscriber status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum SubscriberStatusDb {
    Pending,
    Verified,
    Unsubscribed,
}

impl From<SubscriberStatus> for SubscriberStatusDb {
    fn from(status: SubscriberStatus) -> Self {
        match status {
            SubscriberStatus::Pending => SubscriberStatusDb::Pending,
            SubscriberStatus::Verified => SubscriberStatusDb::Verified,
            SubscriberStatus::Unsubscribed => SubscriberStatusDb::Unsubscribed,
        }
    }
}

impl From<SubscriberStatusDb> for SubscriberStatus {
    fn from(status: SubscriberStatusDb) -> Self {
        match status {
            SubscriberStatusDb::Pending => SubscriberStatus::Pending,
            SubscriberStatusDb::Verified => SubscriberStatus::Verified,
            SubscriberStatusDb::Unsubscribed => SubscriberStatus::Unsubscribed,
        }
    }
}

/// Database row mapping for the subscribers table.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriberEntity {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub name: String,
    pub status: SubscriberStatusDb,
    pub verify_token: Option<String>,
    pub unsubscribe_token: String,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriberEntity> for Subscriber {
    fn from(row: SubscriberEntity) -> Self {
        Subscriber {
            id: row.id,
            uuid: row.uuid,
            email: row.email,
            name: row.name,
            status: row.status.into(),
            verify_token: row.verify_token,
            unsubscribe_token: row.unsubscribe_token,
            created_at: row.created_at,
            verified_at: row.verified_at,
            updated_at: row.updated_at,
        }
    }
}
