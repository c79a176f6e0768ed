/// Background task implementations
use crate::{
    context::AppContext,
    error::{ModerationError, ModerationResult},
    metrics,
    moderation::{format_iso, Clock},
};
use chrono::Duration;

/// Count decided announcements whose dispatch slot passed more than the
/// grace period ago without the sync flag being set. Read-only.
pub async fn check_overdue_dispatches(ctx: &AppContext) -> ModerationResult<usize> {
    let minutes = ctx.config.jobs.overdue_grace_minutes;
    let cutoff = Duration::try_minutes(minutes)
        .and_then(|grace| ctx.clock.now().checked_sub_signed(grace))
        .ok_or_else(|| {
            ModerationError::Config(format!("Overdue grace period out of range: {} minutes", minutes))
        })?;

    let overdue = ctx.moderation_store.list_overdue(cutoff).await?;

    for record in &overdue {
        tracing::warn!(
            record_id = %record.id,
            network_id = %record.network_id,
            status = record.status.as_str(),
            scheduled_send_at = %record.scheduled_send_at.map(format_iso).unwrap_or_default(),
            "announcement dispatch overdue"
        );
    }

    metrics::MODERATION_OVERDUE_DISPATCHES.set(overdue.len() as i64);

    Ok(overdue.len())
}
