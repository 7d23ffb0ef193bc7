use sqlx::SqlitePool;
use uuid::Uuid;

use crate::utils::utc_now;

/// Kind tag for project associations. The table can hold other kinds
/// later; everything in this store is keyed on this one.
const PROJECT_KIND: &str = "project";

/// Marketing entity types that can carry a project link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Plan,
    Expense,
}

impl LinkTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkTarget::Plan => "plan",
            LinkTarget::Expense => "expense",
        }
    }
}

/// Look up the project linked to the given entity, if any.
pub async fn linked_project_id(
    pool: &SqlitePool,
    target: LinkTarget,
    entity_id: Uuid,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT linked_entity_id FROM marketing_entity_links WHERE marketing_entity_type = ? AND marketing_entity_id = ? AND linked_entity_kind = ?",
    )
    .bind(target.as_str())
    .bind(entity_id)
    .bind(PROJECT_KIND)
    .fetch_optional(pool)
    .await
}

/// All project links for one entity type, for decorating list responses
/// without a query per row.
pub async fn linked_project_ids(
    pool: &SqlitePool,
    target: LinkTarget,
) -> Result<Vec<(Uuid, Uuid)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT marketing_entity_id, linked_entity_id FROM marketing_entity_links WHERE marketing_entity_type = ? AND linked_entity_kind = ?",
    )
    .bind(target.as_str())
    .bind(PROJECT_KIND)
    .fetch_all(pool)
    .await
}

/// Replace the project link for an entity. Any existing project link is
/// removed first; a fresh row is inserted when `project_id` is present.
/// Runs in one transaction so a concurrent reader never observes the
/// intermediate unlinked state.
pub async fn set_linked_project_id(
    pool: &SqlitePool,
    target: LinkTarget,
    entity_id: Uuid,
    project_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM marketing_entity_links WHERE marketing_entity_type = ? AND marketing_entity_id = ? AND linked_entity_kind = ?",
    )
    .bind(target.as_str())
    .bind(entity_id)
    .bind(PROJECT_KIND)
    .execute(&mut *tx)
    .await?;

    if let Some(project_id) = project_id {
        let now = utc_now();
        sqlx::query(
            "INSERT INTO marketing_entity_links (id, marketing_entity_type, marketing_entity_id, linked_entity_kind, linked_entity_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(target.as_str())
        .bind(entity_id)
        .bind(PROJECT_KIND)
        .bind(project_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Remove every link for an entity. Cleanup cascade run by delete
/// handlers; the linked entity lives in another subsystem, so there is no
/// database-level cascade.
pub async fn clear_links(
    pool: &SqlitePool,
    target: LinkTarget,
    entity_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "DELETE FROM marketing_entity_links WHERE marketing_entity_type = ? AND marketing_entity_id = ?",
    )
    .bind(target.as_str())
    .bind(entity_id)
    .execute(pool)
    .await?;

    Ok(())
}
