/// Moderation queue endpoints
use crate::{
    context::AppContext,
    error::{ModerationError, ModerationResult},
    moderation::{AnnouncementStatus, ModerationDecision, ModerationRecord, SyncState, SyncSummary},
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build moderation queue routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/networks/:network_id/announcements",
            get(list_announcements),
        )
        .route("/api/announcements/:id", get(get_announcement))
        .route("/api/announcements/:id/moderate", post(moderate_announcement))
}

/// Record plus its sync badge
#[derive(Debug, Serialize)]
pub struct AnnouncementView {
    #[serde(flatten)]
    pub record: ModerationRecord,
    pub sync_state: SyncState,
    pub sync_label: &'static str,
}

impl From<ModerationRecord> for AnnouncementView {
    fn from(record: ModerationRecord) -> Self {
        let sync_state = SyncState::of(&record);
        Self {
            record,
            sync_state,
            sync_label: sync_state.label(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    announcements: Vec<AnnouncementView>,
    summary: SyncSummary,
}

/// List a network's queue, newest first
async fn list_announcements(
    State(ctx): State<AppContext>,
    Path(network_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ModerationResult<Json<ListResponse>> {
    let status = parse_status(query.status.as_deref())?;
    let records = ctx.scheduler.list_records(&network_id, status).await?;

    let summary = SyncSummary::from_records(&records);
    let announcements = records.into_iter().map(AnnouncementView::from).collect();

    Ok(Json(ListResponse {
        announcements,
        summary,
    }))
}

async fn get_announcement(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ModerationResult<Json<AnnouncementView>> {
    let record = ctx.scheduler.get_record(&id).await?;
    Ok(Json(record.into()))
}

#[derive(Debug, Deserialize)]
struct ModerateRequest {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    expected_version: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ModerateResponse {
    success: bool,
    message: String,
    scheduled_send_at: String,
    announcement: AnnouncementView,
}

/// Approve, reject or re-tag an announcement
async fn moderate_announcement(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<ModerateRequest>, JsonRejection>,
) -> ModerationResult<Json<ModerateResponse>> {
    let Json(req) = payload?;
    let decision = ModerationDecision {
        status: parse_status(req.status.as_deref())?,
        category: req.category,
        expected_version: req.expected_version,
    };

    let outcome = ctx.scheduler.schedule_moderation(&id, decision).await?;

    Ok(Json(ModerateResponse {
        success: true,
        message: outcome.message,
        scheduled_send_at: outcome.scheduled_send_at,
        announcement: outcome.record.into(),
    }))
}

fn parse_status(raw: Option<&str>) -> ModerationResult<Option<AnnouncementStatus>> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Err(ModerationError::Validation(
            "Status cannot be empty".to_string(),
        )),
        Some(s) => AnnouncementStatus::from_str(s.trim()).map(Some),
    }
}
