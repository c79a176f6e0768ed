//! Announcement moderation service
//!
//! Keeps the moderation queue of a community network's announcements.
//! Moderators approve, reject or re-tag queued announcements; decisions are
//! batched for the external dispatch job that relays them to the mailing
//! list once a day.

pub mod api;
pub mod categories;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod moderation;
pub mod server;

pub use context::AppContext;
pub use error::{ActionResult, ModerationError, ModerationResult};
