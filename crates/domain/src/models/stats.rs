//! Dashboard statistics.

use serde::{Deserialize, Serialize};

/// Aggregate counters shown on the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_subscribers: i64,
    pub verified_subscribers: i64,
    pub pending_subscribers: i64,
    pub total_campaigns: i64,
    pub sent_campaigns: i64,
}
