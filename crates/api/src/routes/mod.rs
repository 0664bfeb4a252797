//! HTTP route handlers.
//!
//! Public handlers (subscribe, verify, unsubscribe, health) are
//! unauthenticated; everything under `/api/private` goes through the
//! Basic Auth middleware.

pub mod campaigns;
pub mod health;
pub mod settings;
pub mod stats;
pub mod subscribe;
pub mod subscribers;
pub mod unsubscribe;
pub mod verify;
