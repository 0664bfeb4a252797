//! Background workers.

pub mod campaign;

pub use campaign::{CampaignWorker, NotSendingError, SendCampaignError};
