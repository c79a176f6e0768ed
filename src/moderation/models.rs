/// Announcement moderation records
use crate::error::{ModerationError, ModerationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation status of a queued announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementStatus {
    /// Waiting for a moderator
    Pending,
    /// Will be relayed to the list at the next dispatch
    Approved,
    /// Will be refused at the next dispatch
    Rejected,
}

impl AnnouncementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementStatus::Pending => "pending",
            AnnouncementStatus::Approved => "approved",
            AnnouncementStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> ModerationResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AnnouncementStatus::Pending),
            "approved" => Ok(AnnouncementStatus::Approved),
            "rejected" => Ok(AnnouncementStatus::Rejected),
            _ => Err(ModerationError::Validation(format!(
                "Invalid announcement status: {}",
                s
            ))),
        }
    }
}

/// A queued announcement and its moderation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub id: String,
    pub network_id: String,
    pub status: AnnouncementStatus,
    pub category: Option<String>,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub subject: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub scheduled_send_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub synced_to_sympa: bool,
    pub version: i64,
}

/// Inbound announcement, as produced by mail ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnnouncement {
    pub network_id: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub subject: String,
    pub content: String,
    pub category: Option<String>,
}

/// What a moderator asked for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationDecision {
    /// New status; `None` leaves the status and schedule untouched
    pub status: Option<AnnouncementStatus>,
    /// New category; `None` leaves the category untouched
    pub category: Option<String>,
    /// Version the moderator last saw; `None` skips the stale-write check
    pub expected_version: Option<i64>,
}

impl ModerationDecision {
    pub fn status(status: AnnouncementStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn expecting_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.category.is_none()
    }
}

/// Fields written when a status decision is recorded
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: AnnouncementStatus,
    pub moderated_at: DateTime<Utc>,
    pub scheduled_send_at: DateTime<Utc>,
}

/// Keyed partial update handed to the store
///
/// A `status_change` also resets `synced_to_sympa` and clears `sent_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationUpdate {
    pub status_change: Option<StatusChange>,
    pub category: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub expected_version: Option<i64>,
}
