use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{ActionVerb, Caller, EntityKind, ScopeFilter};
use crate::errors::{AppError, AppResult};
use crate::models::vendor::{DbVendor, Vendor, VendorCreateRequest, VendorUpdateRequest};
use crate::utils::utc_now;

const VENDOR_COLUMNS: &str =
    "id, name, contact_name, contact_email, website, notes, created_at, updated_at, deleted_at";

// Vendors have no ownership column.
const HAS_OWNER: bool = false;

#[utoipa::path(
    get,
    path = "/vendors",
    tag = "Vendors",
    responses((status = 200, description = "List vendors", body = [Vendor])),
    security(("bearerAuth" = []))
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<Vec<Vendor>>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Vendors), ActionVerb::Read)
        .await;
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Ok(Json(Vec::new()));
    }

    let rows = sqlx::query_as::<_, DbVendor>(&format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors WHERE deleted_at IS NULL ORDER BY name",
    ))
    .fetch_all(&state.pool)
    .await?;

    let vendors: Vec<Vendor> = rows
        .into_iter()
        .map(Vendor::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(vendors))
}

#[utoipa::path(
    post,
    path = "/vendors",
    tag = "Vendors",
    request_body = VendorCreateRequest,
    responses(
        (status = 201, description = "Vendor created", body = Vendor),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_vendor(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<VendorCreateRequest>,
) -> AppResult<(StatusCode, Json<Vendor>)> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Vendors), ActionVerb::Write)
        .await;
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to create vendors"));
    }

    let now = utc_now();
    let vendor_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO vendors (id, name, contact_name, contact_email, website, notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(vendor_id)
    .bind(&payload.name)
    .bind(&payload.contact_name)
    .bind(&payload.contact_email)
    .bind(&payload.website)
    .bind(&payload.notes)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let vendor: Vendor = fetch_vendor(&state.pool, vendor_id).await?.try_into()?;

    Ok((StatusCode::CREATED, Json(vendor)))
}

#[utoipa::path(
    get,
    path = "/vendors/{id}",
    tag = "Vendors",
    params(("id" = Uuid, Path, description = "Vendor id")),
    responses(
        (status = 200, description = "Vendor detail", body = Vendor),
        (status = 404, description = "Vendor not found or read scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_vendor(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vendor>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Vendors), ActionVerb::Read)
        .await;
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Err(AppError::not_found("vendor not found"));
    }

    let vendor: Vendor = fetch_vendor(&state.pool, id).await?.try_into()?;
    Ok(Json(vendor))
}

#[utoipa::path(
    put,
    path = "/vendors/{id}",
    tag = "Vendors",
    params(("id" = Uuid, Path, description = "Vendor id")),
    request_body = VendorUpdateRequest,
    responses(
        (status = 200, description = "Vendor updated", body = Vendor),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_vendor(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<VendorUpdateRequest>,
) -> AppResult<Json<Vendor>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Vendors), ActionVerb::Write)
        .await;
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to update vendors"));
    }

    let mut vendor = fetch_vendor(&state.pool, id).await?;

    if let Some(name) = payload.name.as_ref() {
        vendor.name = name.clone();
    }
    if payload.contact_name.is_some() {
        vendor.contact_name = payload.contact_name.clone();
    }
    if payload.contact_email.is_some() {
        vendor.contact_email = payload.contact_email.clone();
    }
    if payload.website.is_some() {
        vendor.website = payload.website.clone();
    }
    if payload.notes.is_some() {
        vendor.notes = payload.notes.clone();
    }

    let now = utc_now();

    sqlx::query(
        "UPDATE vendors SET name = ?, contact_name = ?, contact_email = ?, website = ?, notes = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&vendor.name)
    .bind(&vendor.contact_name)
    .bind(&vendor.contact_email)
    .bind(&vendor.website)
    .bind(&vendor.notes)
    .bind(now)
    .bind(vendor.id)
    .execute(&state.pool)
    .await?;

    vendor.updated_at = now;
    let vendor: Vendor = vendor.try_into()?;

    Ok(Json(vendor))
}

#[utoipa::path(
    delete,
    path = "/vendors/{id}",
    tag = "Vendors",
    params(("id" = Uuid, Path, description = "Vendor id")),
    responses(
        (status = 204, description = "Vendor soft deleted"),
        (status = 403, description = "Delete scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_vendor(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Vendors), ActionVerb::Delete)
        .await;
    if mode.filter(&caller, HAS_OWNER) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to delete vendors"));
    }

    let _ = fetch_vendor(&state.pool, id).await?;

    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE vendors SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(&state.pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("vendor not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_vendor(pool: &SqlitePool, vendor_id: Uuid) -> AppResult<DbVendor> {
    sqlx::query_as::<_, DbVendor>(&format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = ? AND deleted_at IS NULL",
    ))
    .bind(vendor_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("vendor not found"))
}
