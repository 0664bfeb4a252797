//! Domain models.

mod campaign;
mod stats;
mod subscriber;

pub use campaign::{
    Campaign, CampaignJournal, CampaignLog, CampaignStatus, JournalKind, LogOutcome,
};
pub use stats::Stats;
pub use subscriber::{Subscriber, SubscriberStatus};
