//! Plan type lookup table plus per-type fiscal-year budgets. Lookup
//! tables have no entity-specific scope keys; access resolves against the
//! pack-wide tier.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{ActionVerb, Caller, ScopeFilter};
use crate::errors::{AppError, AppResult};
use crate::models::lookup::{
    BudgetUpsertRequest, DbPlanTypeBudget, LookupCreateRequest, LookupUpdateRequest, PlanType,
    PlanTypeBudget,
};
use crate::utils::{format_amount, utc_now};

#[utoipa::path(
    get,
    path = "/plan-types",
    tag = "Lookups",
    responses((status = 200, description = "List plan types", body = [PlanType])),
    security(("bearerAuth" = []))
)]
pub async fn list_plan_types(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<Vec<PlanType>>> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Read).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Ok(Json(Vec::new()));
    }

    let plan_types = sqlx::query_as::<_, PlanType>(
        "SELECT id, name, description, created_at, updated_at, deleted_at FROM plan_types WHERE deleted_at IS NULL ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(plan_types))
}

#[utoipa::path(
    post,
    path = "/plan-types",
    tag = "Lookups",
    request_body = LookupCreateRequest,
    responses(
        (status = 201, description = "Plan type created", body = PlanType),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_plan_type(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<LookupCreateRequest>,
) -> AppResult<(StatusCode, Json<PlanType>)> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Write).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to manage plan types"));
    }

    let now = utc_now();
    let plan_type = PlanType {
        id: Uuid::new_v4(),
        name: payload.name,
        description: payload.description,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO plan_types (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(plan_type.id)
    .bind(&plan_type.name)
    .bind(&plan_type.description)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(plan_type)))
}

#[utoipa::path(
    put,
    path = "/plan-types/{id}",
    tag = "Lookups",
    params(("id" = Uuid, Path, description = "Plan type id")),
    request_body = LookupUpdateRequest,
    responses(
        (status = 200, description = "Plan type updated", body = PlanType),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_plan_type(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<LookupUpdateRequest>,
) -> AppResult<Json<PlanType>> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Write).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to manage plan types"));
    }

    let mut plan_type = fetch_plan_type(&state.pool, id).await?;

    if let Some(name) = payload.name.as_ref() {
        plan_type.name = name.clone();
    }
    if payload.description.is_some() {
        plan_type.description = payload.description.clone();
    }

    let now = utc_now();

    sqlx::query("UPDATE plan_types SET name = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(&plan_type.name)
        .bind(&plan_type.description)
        .bind(now)
        .bind(plan_type.id)
        .execute(&state.pool)
        .await?;

    plan_type.updated_at = now;
    Ok(Json(plan_type))
}

#[utoipa::path(
    delete,
    path = "/plan-types/{id}",
    tag = "Lookups",
    params(("id" = Uuid, Path, description = "Plan type id")),
    responses(
        (status = 204, description = "Plan type soft deleted"),
        (status = 403, description = "Delete scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_plan_type(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Delete).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to manage plan types"));
    }

    let _ = fetch_plan_type(&state.pool, id).await?;

    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE plan_types SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(&state.pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("plan type not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/plan-types/{id}/budgets",
    tag = "Lookups",
    params(("id" = Uuid, Path, description = "Plan type id")),
    responses((status = 200, description = "Fiscal-year budgets for a plan type", body = [PlanTypeBudget])),
    security(("bearerAuth" = []))
)]
pub async fn list_budgets(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<PlanTypeBudget>>> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Read).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Ok(Json(Vec::new()));
    }

    let _ = fetch_plan_type(&state.pool, id).await?;

    let rows = sqlx::query_as::<_, DbPlanTypeBudget>(
        "SELECT id, plan_type_id, fiscal_year, amount, created_at, updated_at FROM plan_type_budgets WHERE plan_type_id = ? ORDER BY fiscal_year",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let budgets: Vec<PlanTypeBudget> = rows
        .into_iter()
        .map(PlanTypeBudget::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(budgets))
}

#[utoipa::path(
    post,
    path = "/plan-types/{id}/budgets",
    tag = "Lookups",
    params(("id" = Uuid, Path, description = "Plan type id")),
    request_body = BudgetUpsertRequest,
    responses(
        (status = 200, description = "Budget upserted", body = PlanTypeBudget),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn upsert_budget(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<BudgetUpsertRequest>,
) -> AppResult<Json<PlanTypeBudget>> {
    let mode = state.scope.resolve(&caller, None, ActionVerb::Write).await;
    if mode.filter(&caller, false) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to manage budgets"));
    }

    let _ = fetch_plan_type(&state.pool, id).await?;

    let now = utc_now();

    // One budget row per (plan type, fiscal year).
    sqlx::query(
        r#"
        INSERT INTO plan_type_budgets (id, plan_type_id, fiscal_year, amount, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (plan_type_id, fiscal_year)
        DO UPDATE SET amount = excluded.amount, updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(id)
    .bind(payload.fiscal_year)
    .bind(format_amount(payload.amount))
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let row = sqlx::query_as::<_, DbPlanTypeBudget>(
        "SELECT id, plan_type_id, fiscal_year, amount, created_at, updated_at FROM plan_type_budgets WHERE plan_type_id = ? AND fiscal_year = ?",
    )
    .bind(id)
    .bind(payload.fiscal_year)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(row.try_into()?))
}

async fn fetch_plan_type(pool: &SqlitePool, plan_type_id: Uuid) -> AppResult<PlanType> {
    sqlx::query_as::<_, PlanType>(
        "SELECT id, name, description, created_at, updated_at, deleted_at FROM plan_types WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(plan_type_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("plan type not found"))
}
