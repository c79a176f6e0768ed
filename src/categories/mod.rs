/// Announcement categories
///
/// Per-network tags moderators assign to announcements. Slugs are unique
/// within a network and the display order is rewritten atomically.
use crate::error::{classify_db_error, ModerationError, ModerationResult};
use crate::moderation::{format_iso, Clock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Category record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub network_id: String,
    pub name: String,
    pub slug: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// Category manager
#[derive(Clone)]
pub struct CategoryManager {
    db: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl CategoryManager {
    pub fn new(db: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Create a category at the end of the network's list
    pub async fn create_category(
        &self,
        network_id: &str,
        name: &str,
        slug: Option<&str>,
    ) -> ModerationResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModerationError::Validation(
                "Category name cannot be empty".to_string(),
            ));
        }

        let slug = slugify(slug.unwrap_or(name));
        if slug.is_empty() {
            return Err(ModerationError::Validation(format!(
                "Cannot derive a slug from {:?}",
                name
            )));
        }

        let id = Uuid::new_v4().to_string();
        let now = self.clock.now();

        let position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM announcement_category WHERE network_id = ?",
        )
        .bind(network_id)
        .fetch_one(&self.db)
        .await?;

        let row = sqlx::query(
            r#"
            INSERT INTO announcement_category (id, network_id, name, slug, position, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, network_id, name, slug, position, created_at
            "#,
        )
        .bind(&id)
        .bind(network_id)
        .bind(name)
        .bind(&slug)
        .bind(position)
        .bind(format_iso(now))
        .fetch_one(&self.db)
        .await
        .map_err(|e| classify_db_error(e, &format!("A category with slug '{}'", slug)))?;

        tracing::info!(network_id, slug = %slug, "category created");

        parse_category(&row)
    }

    /// Categories of a network in display order
    pub async fn list_categories(&self, network_id: &str) -> ModerationResult<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, network_id, name, slug, position, created_at
            FROM announcement_category
            WHERE network_id = ?
            ORDER BY position ASC, name ASC
            "#,
        )
        .bind(network_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_category).collect()
    }

    /// Give each category its index in `ordered_ids` as position.
    ///
    /// `ordered_ids` must name every category of the network exactly once.
    /// All positions are written in one transaction; an id that does not
    /// belong to the network aborts the whole reorder.
    pub async fn reorder_categories(
        &self,
        network_id: &str,
        ordered_ids: &[String],
    ) -> ModerationResult<Vec<Category>> {
        let mut seen = HashSet::with_capacity(ordered_ids.len());
        if let Some(dup) = ordered_ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(ModerationError::Validation(format!(
                "Category {} is listed more than once",
                dup
            )));
        }

        let mut tx = self.db.begin().await?;

        for (position, id) in ordered_ids.iter().enumerate() {
            let result = sqlx::query(
                "UPDATE announcement_category SET position = ? WHERE id = ? AND network_id = ?",
            )
            .bind(position as i64)
            .bind(id)
            .bind(network_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(ModerationError::NotFound(format!(
                    "Category {} in network {}",
                    id, network_id
                )));
            }
        }

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM announcement_category WHERE network_id = ?")
                .bind(network_id)
                .fetch_one(&mut *tx)
                .await?;
        if total != ordered_ids.len() as i64 {
            tx.rollback().await?;
            return Err(ModerationError::Validation(format!(
                "Reorder must list all {} categories of the network, got {}",
                total,
                ordered_ids.len()
            )));
        }

        tx.commit().await?;
        tracing::info!(network_id, count = ordered_ids.len(), "categories reordered");

        self.list_categories(network_id).await
    }
}

fn parse_category(row: &SqliteRow) -> ModerationResult<Category> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Category {
        id: row.try_get("id")?,
        network_id: row.try_get("network_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        position: row.try_get("position")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| ModerationError::Internal(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc),
    })
}

/// Lowercase ASCII slug; runs of anything else collapse to a single `-`
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
