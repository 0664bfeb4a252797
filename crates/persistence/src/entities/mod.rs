//! Entity definitions (database row mappings).

mod campaign;
mod setting;
mod subscriber;

pub use campaign::{
    CampaignEntity, CampaignJournalEntity, CampaignLogEntity, CampaignStatusDb, JournalKindDb,
    LogOutcomeDb,
};
pub use setting::SettingEntity;
pub use subscriber::{SubscriberEntity, SubscriberStatusDb};
