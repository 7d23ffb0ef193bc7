use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{ActionVerb, Caller, EntityKind, ScopeFilter};
use crate::errors::{AppError, AppResult};
use crate::linking::{resolve_link_change, store, LinkChange, LinkTarget, LinkingPolicy};
use crate::models::expense::{
    DbExpense, Expense, ExpenseCreateRequest, ExpenseListQuery, ExpenseUpdateRequest,
};
use crate::utils::{format_amount, utc_now};

const EXPENSE_COLUMNS: &str = "id, description, amount, expense_date, plan_id, vendor_id, activity_type_id, created_by, created_at, updated_at, deleted_at";

#[utoipa::path(
    get,
    path = "/expenses",
    tag = "Expenses",
    params(ExpenseListQuery),
    responses((status = 200, description = "List expenses visible to the caller", body = [Expense])),
    security(("bearerAuth" = []))
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ExpenseListQuery>,
) -> AppResult<Json<Vec<Expense>>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Expenses), ActionVerb::Read)
        .await;

    let owner = match mode.filter(&caller, true) {
        ScopeFilter::DenyAll => return Ok(Json(Vec::new())),
        ScopeFilter::OwnedBy(user_id) => Some(user_id),
        ScopeFilter::Unrestricted => None,
    };

    let rows = sqlx::query_as::<_, DbExpense>(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE deleted_at IS NULL AND (? IS NULL OR created_by = ?) AND (? IS NULL OR plan_id = ?) ORDER BY created_at DESC",
    ))
    .bind(owner)
    .bind(owner)
    .bind(query.plan_id)
    .bind(query.plan_id)
    .fetch_all(&state.pool)
    .await?;

    let links: HashMap<Uuid, Uuid> = store::linked_project_ids(&state.pool, LinkTarget::Expense)
        .await?
        .into_iter()
        .collect();

    let expenses: Vec<Expense> = rows
        .into_iter()
        .map(|row| {
            let project_id = links.get(&row.id).copied();
            Expense::try_from(row).map(|expense| expense.with_project(project_id))
        })
        .collect::<Result<_, _>>()?;

    Ok(Json(expenses))
}

#[utoipa::path(
    post,
    path = "/expenses",
    tag = "Expenses",
    request_body = ExpenseCreateRequest,
    responses(
        (status = 201, description = "Expense created", body = Expense),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_expense(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<ExpenseCreateRequest>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Expenses), ActionVerb::Write)
        .await;
    // `own` permits creation: the new record is owned by the caller.
    if mode.filter(&caller, true) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to create expenses"));
    }

    let policy = LinkingPolicy::from_config(&caller.config);
    let link = resolve_link_change(policy, payload.project_id.clone().map(Some), true)?;

    let now = utc_now();
    let expense_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO expenses (id, description, amount, expense_date, plan_id, vendor_id, activity_type_id, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(expense_id)
    .bind(&payload.description)
    .bind(format_amount(payload.amount))
    .bind(payload.expense_date)
    .bind(payload.plan_id)
    .bind(payload.vendor_id)
    .bind(payload.activity_type_id)
    .bind(caller.user_id)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    if let LinkChange::Set(project_id) = link {
        store::set_linked_project_id(&state.pool, LinkTarget::Expense, expense_id, Some(project_id))
            .await?;
    }

    let expense: Expense = fetch_expense(&state.pool, expense_id).await?.try_into()?;
    let project_id = store::linked_project_id(&state.pool, LinkTarget::Expense, expense_id).await?;

    Ok((StatusCode::CREATED, Json(expense.with_project(project_id))))
}

#[utoipa::path(
    get,
    path = "/expenses/{id}",
    tag = "Expenses",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense detail", body = Expense),
        (status = 404, description = "Expense not found or not visible"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_expense(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Expense>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Expenses), ActionVerb::Read)
        .await;
    let filter = mode.filter(&caller, true);
    if filter == ScopeFilter::DenyAll {
        return Err(AppError::not_found("expense not found"));
    }

    let expense = fetch_expense(&state.pool, id).await?;
    // Reads outside the caller's scope surface as not-found, never as
    // forbidden, so record existence is not revealed.
    if !filter.allows(Some(expense.created_by)) {
        return Err(AppError::not_found("expense not found"));
    }

    let expense: Expense = expense.try_into()?;
    let project_id = store::linked_project_id(&state.pool, LinkTarget::Expense, id).await?;

    Ok(Json(expense.with_project(project_id)))
}

#[utoipa::path(
    put,
    path = "/expenses/{id}",
    tag = "Expenses",
    params(("id" = Uuid, Path, description = "Expense id")),
    request_body = ExpenseUpdateRequest,
    responses(
        (status = 200, description = "Expense updated", body = Expense),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Write scope denied or not the owner"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_expense(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdateRequest>,
) -> AppResult<Json<Expense>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Expenses), ActionVerb::Write)
        .await;
    let filter = mode.filter(&caller, true);
    if filter == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to update expenses"));
    }

    let policy = LinkingPolicy::from_config(&caller.config);
    let link = resolve_link_change(policy, payload.project_id.clone(), false)?;

    let mut expense = fetch_expense(&state.pool, id).await?;
    if !filter.allows(Some(expense.created_by)) {
        return Err(AppError::forbidden("not the owner of this expense"));
    }

    if let Some(description) = payload.description.as_ref() {
        expense.description = description.clone();
    }
    if let Some(amount) = payload.amount {
        expense.amount = format_amount(amount);
    }
    if payload.expense_date.is_some() {
        expense.expense_date = payload.expense_date;
    }
    if payload.plan_id.is_some() {
        expense.plan_id = payload.plan_id;
    }
    if payload.vendor_id.is_some() {
        expense.vendor_id = payload.vendor_id;
    }
    if payload.activity_type_id.is_some() {
        expense.activity_type_id = payload.activity_type_id;
    }

    let now = utc_now();

    sqlx::query(
        "UPDATE expenses SET description = ?, amount = ?, expense_date = ?, plan_id = ?, vendor_id = ?, activity_type_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&expense.description)
    .bind(&expense.amount)
    .bind(expense.expense_date)
    .bind(expense.plan_id)
    .bind(expense.vendor_id)
    .bind(expense.activity_type_id)
    .bind(now)
    .bind(expense.id)
    .execute(&state.pool)
    .await?;

    match link {
        LinkChange::Keep => {}
        LinkChange::Clear => {
            store::set_linked_project_id(&state.pool, LinkTarget::Expense, id, None).await?;
        }
        LinkChange::Set(project_id) => {
            store::set_linked_project_id(&state.pool, LinkTarget::Expense, id, Some(project_id))
                .await?;
        }
    }

    expense.updated_at = now;
    let expense: Expense = expense.try_into()?;
    let project_id = store::linked_project_id(&state.pool, LinkTarget::Expense, id).await?;

    Ok(Json(expense.with_project(project_id)))
}

#[utoipa::path(
    delete,
    path = "/expenses/{id}",
    tag = "Expenses",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 204, description = "Expense soft deleted"),
        (status = 403, description = "Delete scope denied or not the owner"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Expenses), ActionVerb::Delete)
        .await;
    let filter = mode.filter(&caller, true);
    if filter == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to delete expenses"));
    }

    let expense = fetch_expense(&state.pool, id).await?;
    if !filter.allows(Some(expense.created_by)) {
        return Err(AppError::forbidden("not the owner of this expense"));
    }

    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE expenses SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(&state.pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("expense not found"));
    }

    store::clear_links(&state.pool, LinkTarget::Expense, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_expense(pool: &SqlitePool, expense_id: Uuid) -> AppResult<DbExpense> {
    sqlx::query_as::<_, DbExpense>(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ? AND deleted_at IS NULL",
    ))
    .bind(expense_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("expense not found"))
}
