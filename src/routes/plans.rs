use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{ActionVerb, Caller, EntityKind, ScopeFilter};
use crate::errors::{AppError, AppResult};
use crate::linking::{resolve_link_change, store, LinkChange, LinkTarget, LinkingPolicy};
use crate::models::plan::{DbPlan, Plan, PlanCreateRequest, PlanUpdateRequest};
use crate::utils::{format_amount, utc_now};

const PLAN_COLUMNS: &str = "id, name, description, plan_type_id, vendor_id, amount, start_date, end_date, created_at, updated_at, deleted_at";

// Plans have no ownership column, so `own` scope can never match a record.
const HAS_OWNER: bool = false;

#[utoipa::path(
    get,
    path = "/plans",
    tag = "Plans",
    responses((status = 200, description = "List plans", body = [Plan])),
    security(("bearerAuth" = []))
)]
pub async fn list_plans(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Vec<Plan>>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Read)
        .await;

    // Denied listings are empty, not errors, so existence is not leaked.
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Ok(Json(Vec::new()));
    }

    let rows = sqlx::query_as::<_, DbPlan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM plans WHERE deleted_at IS NULL ORDER BY created_at DESC",
    ))
    .fetch_all(&state.pool)
    .await?;

    let links: HashMap<Uuid, Uuid> = store::linked_project_ids(&state.pool, LinkTarget::Plan)
        .await?
        .into_iter()
        .collect();

    let plans: Vec<Plan> = rows
        .into_iter()
        .map(|row| {
            let project_id = links.get(&row.id).copied();
            Plan::try_from(row).map(|plan| plan.with_project(project_id))
        })
        .collect::<Result<_, _>>()?;

    Ok(Json(plans))
}

#[utoipa::path(
    post,
    path = "/plans",
    tag = "Plans",
    request_body = PlanCreateRequest,
    responses(
        (status = 201, description = "Plan created", body = Plan),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_plan(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<PlanCreateRequest>,
) -> AppResult<(StatusCode, Json<Plan>)> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Write)
        .await;
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to create plans"));
    }

    let policy = LinkingPolicy::from_config(&caller.config);
    let link = resolve_link_change(policy, payload.project_id.clone().map(Some), true)?;

    let now = utc_now();
    let plan_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO plans (id, name, description, plan_type_id, vendor_id, amount, start_date, end_date, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(plan_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.plan_type_id)
    .bind(payload.vendor_id)
    .bind(format_amount(payload.amount))
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    if let LinkChange::Set(project_id) = link {
        store::set_linked_project_id(&state.pool, LinkTarget::Plan, plan_id, Some(project_id))
            .await?;
    }

    let plan: Plan = fetch_plan(&state.pool, plan_id).await?.try_into()?;
    let project_id = store::linked_project_id(&state.pool, LinkTarget::Plan, plan_id).await?;

    Ok((StatusCode::CREATED, Json(plan.with_project(project_id))))
}

#[utoipa::path(
    get,
    path = "/plans/{id}",
    tag = "Plans",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Plan detail", body = Plan),
        (status = 404, description = "Plan not found or read scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_plan(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Plan>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Read)
        .await;
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Err(AppError::not_found("plan not found"));
    }

    let plan: Plan = fetch_plan(&state.pool, id).await?.try_into()?;
    let project_id = store::linked_project_id(&state.pool, LinkTarget::Plan, id).await?;

    Ok(Json(plan.with_project(project_id)))
}

#[utoipa::path(
    put,
    path = "/plans/{id}",
    tag = "Plans",
    params(("id" = Uuid, Path, description = "Plan id")),
    request_body = PlanUpdateRequest,
    responses(
        (status = 200, description = "Plan updated", body = Plan),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_plan(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<PlanUpdateRequest>,
) -> AppResult<Json<Plan>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Write)
        .await;
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to update plans"));
    }

    let policy = LinkingPolicy::from_config(&caller.config);
    let link = resolve_link_change(policy, payload.project_id.clone(), false)?;

    let mut plan = fetch_plan(&state.pool, id).await?;

    if let Some(name) = payload.name.as_ref() {
        plan.name = name.clone();
    }
    if payload.description.is_some() {
        plan.description = payload.description.clone();
    }
    if payload.plan_type_id.is_some() {
        plan.plan_type_id = payload.plan_type_id;
    }
    if payload.vendor_id.is_some() {
        plan.vendor_id = payload.vendor_id;
    }
    if let Some(amount) = payload.amount {
        plan.amount = format_amount(amount);
    }
    if payload.start_date.is_some() {
        plan.start_date = payload.start_date;
    }
    if payload.end_date.is_some() {
        plan.end_date = payload.end_date;
    }

    let now = utc_now();

    sqlx::query(
        "UPDATE plans SET name = ?, description = ?, plan_type_id = ?, vendor_id = ?, amount = ?, start_date = ?, end_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&plan.name)
    .bind(&plan.description)
    .bind(plan.plan_type_id)
    .bind(plan.vendor_id)
    .bind(&plan.amount)
    .bind(plan.start_date)
    .bind(plan.end_date)
    .bind(now)
    .bind(plan.id)
    .execute(&state.pool)
    .await?;

    match link {
        LinkChange::Keep => {}
        LinkChange::Clear => {
            store::set_linked_project_id(&state.pool, LinkTarget::Plan, id, None).await?;
        }
        LinkChange::Set(project_id) => {
            store::set_linked_project_id(&state.pool, LinkTarget::Plan, id, Some(project_id))
                .await?;
        }
    }

    plan.updated_at = now;
    let plan: Plan = plan.try_into()?;
    let project_id = store::linked_project_id(&state.pool, LinkTarget::Plan, id).await?;

    Ok(Json(plan.with_project(project_id)))
}

#[utoipa::path(
    delete,
    path = "/plans/{id}",
    tag = "Plans",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 204, description = "Plan soft deleted"),
        (status = 403, description = "Delete scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_plan(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Delete)
        .await;
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to delete plans"));
    }

    let _ = fetch_plan(&state.pool, id).await?;

    let now = utc_now();
    let affected =
        sqlx::query("UPDATE plans SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&state.pool)
            .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("plan not found"));
    }

    store::clear_links(&state.pool, LinkTarget::Plan, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_plan(pool: &SqlitePool, plan_id: Uuid) -> AppResult<DbPlan> {
    sqlx::query_as::<_, DbPlan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM plans WHERE id = ? AND deleted_at IS NULL",
    ))
    .bind(plan_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("plan not found"))
}
