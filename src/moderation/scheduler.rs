/// Moderation scheduler
///
/// Records a moderator's decision and stamps it with the next dispatch slot.
use super::clock::Clock;
use super::models::{
    AnnouncementStatus, ModerationDecision, ModerationRecord, ModerationUpdate, StatusChange,
};
use super::schedule::{format_iso, DispatchWindow};
use super::store::ModerationStore;
use crate::error::{ActionResult, ModerationError, ModerationResult};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a successful scheduling call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub record: ModerationRecord,
    /// Next dispatch slot computed for this call, ISO-8601
    pub scheduled_send_at: String,
    pub message: String,
}

/// Moderation scheduler
#[derive(Clone)]
pub struct ModerationScheduler {
    store: Arc<dyn ModerationStore>,
    clock: Arc<dyn Clock>,
    window: DispatchWindow,
}

impl ModerationScheduler {
    pub fn new(
        store: Arc<dyn ModerationStore>,
        clock: Arc<dyn Clock>,
        window: DispatchWindow,
    ) -> Self {
        Self {
            store,
            clock,
            window,
        }
    }

    pub fn window(&self) -> DispatchWindow {
        self.window
    }

    /// Apply a moderation decision to one record.
    ///
    /// A status change moves the record into the next dispatch batch and
    /// resets its sync bookkeeping. A category-only decision touches nothing
    /// but the category.
    pub async fn schedule_moderation(
        &self,
        record_id: &str,
        decision: ModerationDecision,
    ) -> ModerationResult<ScheduleOutcome> {
        if decision.is_empty() {
            return Err(ModerationError::Validation(
                "Nothing to update: provide a status or a category".to_string(),
            ));
        }
        if let Some(category) = &decision.category {
            if category.trim().is_empty() {
                return Err(ModerationError::Validation(
                    "Category cannot be empty".to_string(),
                ));
            }
        }

        let now = self.clock.now();
        let scheduled = self.window.next_dispatch_at(now);

        let update = ModerationUpdate {
            status_change: decision.status.map(|status| StatusChange {
                status,
                moderated_at: now,
                scheduled_send_at: scheduled,
            }),
            category: decision.category.clone(),
            updated_at: now,
            expected_version: decision.expected_version,
        };

        let record = match self.store.update_moderation_record(record_id, update).await {
            Ok(record) => record,
            Err(e) => {
                metrics::record_failure(e.kind());
                warn!(record_id, kind = e.kind(), "moderation update failed: {}", e);
                return Err(e);
            }
        };

        let message = match decision.status {
            Some(status) => {
                metrics::record_decision(status.as_str());
                info!(
                    record_id,
                    network_id = %record.network_id,
                    status = status.as_str(),
                    scheduled_send_at = %format_iso(scheduled),
                    "moderation decision recorded"
                );
                self.decision_message(status, scheduled)
            }
            None => {
                info!(record_id, category = ?record.category, "announcement category updated");
                "Category updated".to_string()
            }
        };

        Ok(ScheduleOutcome {
            record,
            scheduled_send_at: format_iso(scheduled),
            message,
        })
    }

    /// Same as [`schedule_moderation`](Self::schedule_moderation), folded into
    /// the `{ success, message }` shape moderator UIs display.
    pub async fn moderate(&self, record_id: &str, decision: ModerationDecision) -> ActionResult {
        match self.schedule_moderation(record_id, decision).await {
            Ok(outcome) => ActionResult::ok(outcome.message),
            Err(e) => ActionResult::failed(&e),
        }
    }

    pub async fn get_record(&self, record_id: &str) -> ModerationResult<ModerationRecord> {
        self.store.get_moderation_record(record_id).await
    }

    /// Records of a network, newest first, optionally limited to one status
    pub async fn list_records(
        &self,
        network_id: &str,
        status: Option<AnnouncementStatus>,
    ) -> ModerationResult<Vec<ModerationRecord>> {
        self.store.read_moderation_records(network_id, status).await
    }

    fn decision_message(
        &self,
        status: AnnouncementStatus,
        scheduled: chrono::DateTime<chrono::Utc>,
    ) -> String {
        let when = self.window.display(scheduled);
        match status {
            AnnouncementStatus::Approved => {
                format!("Announcement approved, dispatch scheduled for {}", when)
            }
            AnnouncementStatus::Rejected => {
                format!("Announcement rejected, dispatch scheduled for {}", when)
            }
            AnnouncementStatus::Pending => {
                format!("Announcement returned to the queue, next dispatch at {}", when)
            }
        }
    }
}
