//! Domain layer for TinyList.
//!
//! This crate contains:
//! - Domain models (Subscriber, Campaign, CampaignLog, CampaignJournal)
//! - Closed status enumerations used across all other crates
//! - Wire-facing serde shapes (external UUIDs serialize as `id`, tokens
//!   are never serialized)

pub mod models;
