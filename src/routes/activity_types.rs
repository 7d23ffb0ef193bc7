use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{ActionVerb, Caller, ScopeFilter};
use crate::errors::{AppError, AppResult};
use crate::models::lookup::{ActivityType, LookupCreateRequest, LookupUpdateRequest};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/activity-types",
    tag = "Lookups",
    responses((status = 200, description = "List activity types", body = [ActivityType])),
    security(("bearerAuth" = []))
)]
pub async fn list_activity_types(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<Vec<ActivityType>>> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Read).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Ok(Json(Vec::new()));
    }

    let activity_types = sqlx::query_as::<_, ActivityType>(
        "SELECT id, name, description, created_at, updated_at, deleted_at FROM activity_types WHERE deleted_at IS NULL ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(activity_types))
}

#[utoipa::path(
    post,
    path = "/activity-types",
    tag = "Lookups",
    request_body = LookupCreateRequest,
    responses(
        (status = 201, description = "Activity type created", body = ActivityType),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_activity_type(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<LookupCreateRequest>,
) -> AppResult<(StatusCode, Json<ActivityType>)> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Write).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden(
            "insufficient scope to manage activity types",
        ));
    }

    let now = utc_now();
    let activity_type = ActivityType {
        id: Uuid::new_v4(),
        name: payload.name,
        description: payload.description,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO activity_types (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(activity_type.id)
    .bind(&activity_type.name)
    .bind(&activity_type.description)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(activity_type)))
}

#[utoipa::path(
    put,
    path = "/activity-types/{id}",
    tag = "Lookups",
    params(("id" = Uuid, Path, description = "Activity type id")),
    request_body = LookupUpdateRequest,
    responses(
        (status = 200, description = "Activity type updated", body = ActivityType),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_activity_type(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<LookupUpdateRequest>,
) -> AppResult<Json<ActivityType>> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Write).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden(
            "insufficient scope to manage activity types",
        ));
    }

    let mut activity_type = fetch_activity_type(&state.pool, id).await?;

    if let Some(name) = payload.name.as_ref() {
        activity_type.name = name.clone();
    }
    if payload.description.is_some() {
        activity_type.description = payload.description.clone();
    }

    let now = utc_now();

    sqlx::query("UPDATE activity_types SET name = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(&activity_type.name)
        .bind(&activity_type.description)
        .bind(now)
        .bind(activity_type.id)
        .execute(&state.pool)
        .await?;

    activity_type.updated_at = now;
    Ok(Json(activity_type))
}

#[utoipa::path(
    delete,
    path = "/activity-types/{id}",
    tag = "Lookups",
    params(("id" = Uuid, Path, description = "Activity type id")),
    responses(
        (status = 204, description = "Activity type soft deleted"),
        (status = 403, description = "Delete scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_activity_type(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Delete).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden(
            "insufficient scope to manage activity types",
        ));
    }

    let _ = fetch_activity_type(&state.pool, id).await?;

    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE activity_types SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(&state.pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("activity type not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_activity_type(pool: &SqlitePool, activity_type_id: Uuid) -> AppResult<ActivityType> {
    sqlx::query_as::<_, ActivityType>(
        "SELECT id, name, description, created_at, updated_at, deleted_at FROM activity_types WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(activity_type_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("activity type not found"))
}
