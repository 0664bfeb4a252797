//! Repository implementations.

mod campaign;
mod setting;
mod subscriber;

pub use campaign::{CampaignRepository, NewCampaign};
pub use setting::SettingRepository;
pub use subscriber::{NewSubscriber, SubscriberRepository};
