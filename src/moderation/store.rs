/// Persistence boundary for the moderation queue
use super::models::{AnnouncementStatus, ModerationRecord, ModerationUpdate, NewAnnouncement};
use super::schedule::format_iso;
use crate::error::{classify_db_error, ModerationError, ModerationResult};
use crate::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::time::Instant;
use uuid::Uuid;

const TABLE: &str = "announcement_moderation";

const COLUMNS: &str = "id, network_id, status, category, sender_email, sender_name, subject, \
     content, created_at, updated_at, moderated_at, scheduled_send_at, sent_at, \
     synced_to_sympa, version";

/// Storage operations the moderation scheduler relies on
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Queue a new announcement as `pending`
    async fn insert_moderation_record(
        &self,
        new: NewAnnouncement,
        created_at: DateTime<Utc>,
    ) -> ModerationResult<ModerationRecord>;

    async fn get_moderation_record(&self, id: &str) -> ModerationResult<ModerationRecord>;

    /// Records of a network, newest first
    async fn read_moderation_records(
        &self,
        network_id: &str,
        status: Option<AnnouncementStatus>,
    ) -> ModerationResult<Vec<ModerationRecord>>;

    /// Keyed partial update applied as one statement; returns the updated row
    async fn update_moderation_record(
        &self,
        id: &str,
        update: ModerationUpdate,
    ) -> ModerationResult<ModerationRecord>;

    /// Called by the external dispatch job once the list server accepted the decision
    async fn mark_dispatched(
        &self,
        id: &str,
        sent_at: DateTime<Utc>,
    ) -> ModerationResult<ModerationRecord>;

    /// Decided, unsynced records whose dispatch slot is before `before`
    async fn list_overdue(&self, before: DateTime<Utc>) -> ModerationResult<Vec<ModerationRecord>>;
}

/// SQLite-backed moderation store
#[derive(Clone)]
pub struct SqliteModerationStore {
    db: SqlitePool,
}

impl SqliteModerationStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Explain why a guarded update touched no row
    async fn missed_update(&self, id: &str, expected_version: Option<i64>) -> ModerationError {
        let current: Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar(&format!("SELECT version FROM {} WHERE id = ?", TABLE))
                .bind(id)
                .fetch_optional(&self.db)
                .await;

        match (current, expected_version) {
            (Ok(None), _) => ModerationError::NotFound(format!("Announcement {}", id)),
            (Ok(Some(actual)), Some(expected)) => ModerationError::Conflict(format!(
                "Announcement {} is at version {}, expected {}",
                id, actual, expected
            )),
            (Ok(Some(_)), None) => {
                ModerationError::Internal(format!("Update of announcement {} matched no row", id))
            }
            (Err(e), _) => ModerationError::Database(e),
        }
    }
}

#[async_trait]
impl ModerationStore for SqliteModerationStore {
    async fn insert_moderation_record(
        &self,
        new: NewAnnouncement,
        created_at: DateTime<Utc>,
    ) -> ModerationResult<ModerationRecord> {
        let id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO {table}
            (id, network_id, status, category, sender_email, sender_name, subject, content,
             created_at, updated_at, synced_to_sympa, version)
            VALUES (?1, ?2, 'pending', ?3, ?4, ?5, ?6, ?7, ?8, ?8, 0, 1)
            RETURNING {columns}
            "#,
            table = TABLE,
            columns = COLUMNS
        ))
        .bind(&id)
        .bind(&new.network_id)
        .bind(&new.category)
        .bind(&new.sender_email)
        .bind(&new.sender_name)
        .bind(&new.subject)
        .bind(&new.content)
        .bind(format_iso(created_at))
        .fetch_one(&self.db)
        .await
        .map_err(|e| classify_db_error(e, &format!("Announcement {}", id)))?;

        metrics::record_db_query("insert", TABLE, started.elapsed().as_secs_f64());
        parse_record(&row)
    }

    async fn get_moderation_record(&self, id: &str) -> ModerationResult<ModerationRecord> {
        let row = sqlx::query(&format!("SELECT {} FROM {} WHERE id = ?", COLUMNS, TABLE))
            .bind(id)
            .fetch_one(&self.db)
            .await
            .map_err(|e| classify_db_error(e, &format!("Announcement {}", id)))?;

        parse_record(&row)
    }

    async fn read_moderation_records(
        &self,
        network_id: &str,
        status: Option<AnnouncementStatus>,
    ) -> ModerationResult<Vec<ModerationRecord>> {
        let started = Instant::now();

        let rows = sqlx::query(&format!(
            r#"
            SELECT {columns}
            FROM {table}
            WHERE network_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, id DESC
            "#,
            table = TABLE,
            columns = COLUMNS
        ))
        .bind(network_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        metrics::record_db_query("select", TABLE, started.elapsed().as_secs_f64());
        rows.iter().map(parse_record).collect()
    }

    async fn update_moderation_record(
        &self,
        id: &str,
        update: ModerationUpdate,
    ) -> ModerationResult<ModerationRecord> {
        let started = Instant::now();
        let change = update.status_change.as_ref();

        // Without a status change, the schedule and sync columns keep their values
        let row = sqlx::query(&format!(
            r#"
            UPDATE {table}
            SET status = COALESCE(?1, status),
                moderated_at = CASE WHEN ?1 IS NULL THEN moderated_at ELSE ?2 END,
                scheduled_send_at = CASE WHEN ?1 IS NULL THEN scheduled_send_at ELSE ?3 END,
                synced_to_sympa = CASE WHEN ?1 IS NULL THEN synced_to_sympa ELSE 0 END,
                sent_at = CASE WHEN ?1 IS NULL THEN sent_at ELSE NULL END,
                category = COALESCE(?4, category),
                updated_at = ?5,
                version = version + 1
            WHERE id = ?6 AND (?7 IS NULL OR version = ?7)
            RETURNING {columns}
            "#,
            table = TABLE,
            columns = COLUMNS
        ))
        .bind(change.map(|c| c.status.as_str()))
        .bind(change.map(|c| format_iso(c.moderated_at)))
        .bind(change.map(|c| format_iso(c.scheduled_send_at)))
        .bind(&update.category)
        .bind(format_iso(update.updated_at))
        .bind(id)
        .bind(update.expected_version)
        .fetch_optional(&self.db)
        .await?;

        metrics::record_db_query("update", TABLE, started.elapsed().as_secs_f64());

        match row {
            Some(row) => parse_record(&row),
            None => Err(self.missed_update(id, update.expected_version).await),
        }
    }

    async fn mark_dispatched(
        &self,
        id: &str,
        sent_at: DateTime<Utc>,
    ) -> ModerationResult<ModerationRecord> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE {table}
            SET synced_to_sympa = 1,
                sent_at = ?1,
                updated_at = ?1,
                version = version + 1
            WHERE id = ?2 AND status != 'pending'
            RETURNING {columns}
            "#,
            table = TABLE,
            columns = COLUMNS
        ))
        .bind(format_iso(sent_at))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => parse_record(&row),
            None => {
                // Either missing or still pending
                self.get_moderation_record(id).await?;
                Err(ModerationError::Validation(format!(
                    "Announcement {} is still pending and cannot be dispatched",
                    id
                )))
            }
        }
    }

    async fn list_overdue(&self, before: DateTime<Utc>) -> ModerationResult<Vec<ModerationRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {columns}
            FROM {table}
            WHERE status != 'pending'
              AND synced_to_sympa = 0
              AND scheduled_send_at IS NOT NULL
              AND scheduled_send_at < ?
            ORDER BY scheduled_send_at ASC
            "#,
            table = TABLE,
            columns = COLUMNS
        ))
        .bind(format_iso(before))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_record).collect()
    }
}

fn parse_timestamp(raw: &str) -> ModerationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ModerationError::Internal(format!("Invalid timestamp {:?}: {}", raw, e)))
}

fn parse_optional_timestamp(row: &SqliteRow, column: &str) -> ModerationResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.as_deref().map(parse_timestamp).transpose()
}

/// Parse a database row into a ModerationRecord
fn parse_record(row: &SqliteRow) -> ModerationResult<ModerationRecord> {
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(ModerationRecord {
        id: row.try_get("id")?,
        network_id: row.try_get("network_id")?,
        status: AnnouncementStatus::from_str(&status)?,
        category: row.try_get("category")?,
        sender_email: row.try_get("sender_email")?,
        sender_name: row.try_get("sender_name")?,
        subject: row.try_get("subject")?,
        content: row.try_get("content")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        moderated_at: parse_optional_timestamp(row, "moderated_at")?,
        scheduled_send_at: parse_optional_timestamp(row, "scheduled_send_at")?,
        sent_at: parse_optional_timestamp(row, "sent_at")?,
        synced_to_sympa: row.try_get("synced_to_sympa")?,
        version: row.try_get("version")?,
    })
}
