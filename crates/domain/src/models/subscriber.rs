//! Subscriber domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a subscriber.
///
/// Permitted transitions are `pending -> verified`,
/// `pending -> unsubscribed` and `verified -> unsubscribed`; handlers
/// enforce the direction, the store only enforces the value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    Pending,
    Verified,
    Unsubscribed,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberStatus::Pending => "pending",
            SubscriberStatus::Verified => "verified",
            SubscriberStatus::Unsubscribed => "unsubscribed",
        }
    }
}

impl std::fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriberStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubscriberStatus::Pending),
            "verified" => Ok(SubscriberStatus::Verified),
            "unsubscribed" => Ok(SubscriberStatus::Unsubscribed),
            _ => Err(()),
        }
    }
}

/// An email subscriber.
///
/// The numeric row id and both capability tokens never leave the process;
/// only the external UUID is exposed as `id` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub uuid: String,
    pub email: String,
    pub name: String,
    pub status: SubscriberStatus,
    #[serde(skip)]
    pub verify_token: Option<String>,
    #[serde(skip)]
    pub unsubscribe_token: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
