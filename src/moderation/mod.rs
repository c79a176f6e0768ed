/// Announcement Moderation
///
/// Queue state for announcements awaiting a moderator, the daily dispatch
/// window decisions are batched into, and the read-side sync view.

pub mod clock;
pub mod models;
pub mod schedule;
pub mod scheduler;
pub mod store;
pub mod sync;

pub use clock::{Clock, FixedClock, SystemClock};
pub use models::{
    AnnouncementStatus, ModerationDecision, ModerationRecord, ModerationUpdate, NewAnnouncement,
    StatusChange,
};
pub use schedule::{format_iso, DispatchWindow, DispatchZone};
pub use scheduler::{ModerationScheduler, ScheduleOutcome};
pub use store::{ModerationStore, SqliteModerationStore};
pub use sync::{is_synced, SyncState, SyncSummary};
