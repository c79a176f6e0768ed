/// Read-side view of dispatch sync state
use super::models::{AnnouncementStatus, ModerationRecord};
use serde::{Deserialize, Serialize};

/// Whether the external dispatch job confirmed delivery since the last decision
pub fn is_synced(record: &ModerationRecord) -> bool {
    record.synced_to_sympa
}

/// Sync state as shown on the moderator badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No decision yet
    Undecided,
    /// Decided, waiting for the next dispatch
    AwaitingDispatch,
    /// Relayed to the mailing list
    Sent,
}

impl SyncState {
    pub fn of(record: &ModerationRecord) -> Self {
        match (record.status, is_synced(record)) {
            (AnnouncementStatus::Pending, _) => SyncState::Undecided,
            (_, false) => SyncState::AwaitingDispatch,
            (_, true) => SyncState::Sent,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncState::Undecided => "Awaiting moderation",
            SyncState::AwaitingDispatch => "Scheduled",
            SyncState::Sent => "Synced",
        }
    }
}

/// Per-state counts for a moderation queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub undecided: usize,
    pub awaiting_dispatch: usize,
    pub sent: usize,
}

impl SyncSummary {
    pub fn from_records(records: &[ModerationRecord]) -> Self {
        records
            .iter()
            .fold(SyncSummary::default(), |mut summary, record| {
                match SyncState::of(record) {
                    SyncState::Undecided => summary.undecided += 1,
                    SyncState::AwaitingDispatch => summary.awaiting_dispatch += 1,
                    SyncState::Sent => summary.sent += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.undecided + self.awaiting_dispatch + self.sent
    }
}
