use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{ActionVerb, Caller, EntityKind, ScopeFilter};
use crate::errors::{AppError, AppResult};
use crate::models::campaign::{
    Campaign, CampaignCreateRequest, CampaignUpdateRequest, DbCampaign,
};
use crate::utils::{format_amount, utc_now};

const CAMPAIGN_COLUMNS: &str = "id, name, description, amount, division, department, location, start_date, end_date, owner_user_id, created_at, updated_at, deleted_at";

#[utoipa::path(
    get,
    path = "/campaigns",
    tag = "Campaigns",
    responses((status = 200, description = "List campaigns visible to the caller", body = [Campaign])),
    security(("bearerAuth" = []))
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<Vec<Campaign>>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Campaigns), ActionVerb::Read)
        .await;

    let owner = match mode.filter(&caller, true) {
        ScopeFilter::DenyAll => return Ok(Json(Vec::new())),
        ScopeFilter::OwnedBy(user_id) => Some(user_id),
        ScopeFilter::Unrestricted => None,
    };

    let rows = sqlx::query_as::<_, DbCampaign>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE deleted_at IS NULL AND (? IS NULL OR owner_user_id = ?) ORDER BY created_at DESC",
    ))
    .bind(owner)
    .bind(owner)
    .fetch_all(&state.pool)
    .await?;

    let campaigns: Vec<Campaign> = rows
        .into_iter()
        .map(Campaign::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(campaigns))
}

#[utoipa::path(
    post,
    path = "/campaigns",
    tag = "Campaigns",
    request_body = CampaignCreateRequest,
    responses(
        (status = 201, description = "Campaign created", body = Campaign),
        (status = 403, description = "Write scope denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_campaign(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<CampaignCreateRequest>,
) -> AppResult<(StatusCode, Json<Campaign>)> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Campaigns), ActionVerb::Write)
        .await;
    if mode.filter(&caller, true) == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to create campaigns"));
    }

    let now = utc_now();
    let campaign_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO campaigns (id, name, description, amount, division, department, location, start_date, end_date, owner_user_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(campaign_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.amount.map(format_amount))
    .bind(&payload.division)
    .bind(&payload.department)
    .bind(&payload.location)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(caller.user_id)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let campaign: Campaign = fetch_campaign(&state.pool, campaign_id).await?.try_into()?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

#[utoipa::path(
    get,
    path = "/campaigns/{id}",
    tag = "Campaigns",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign detail", body = Campaign),
        (status = 404, description = "Campaign not found or not visible"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_campaign(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Campaign>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Campaigns), ActionVerb::Read)
        .await;
    let filter = mode.filter(&caller, true);
    if filter == ScopeFilter::DenyAll {
        return Err(AppError::not_found("campaign not found"));
    }

    let campaign = fetch_campaign(&state.pool, id).await?;
    if !filter.allows(Some(campaign.owner_user_id)) {
        return Err(AppError::not_found("campaign not found"));
    }

    let campaign: Campaign = campaign.try_into()?;
    Ok(Json(campaign))
}

#[utoipa::path(
    put,
    path = "/campaigns/{id}",
    tag = "Campaigns",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = CampaignUpdateRequest,
    responses(
        (status = 200, description = "Campaign updated", body = Campaign),
        (status = 403, description = "Write scope denied or not the owner"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_campaign(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<CampaignUpdateRequest>,
) -> AppResult<Json<Campaign>> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Campaigns), ActionVerb::Write)
        .await;
    let filter = mode.filter(&caller, true);
    if filter == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to update campaigns"));
    }

    let mut campaign = fetch_campaign(&state.pool, id).await?;
    if !filter.allows(Some(campaign.owner_user_id)) {
        return Err(AppError::forbidden("not the owner of this campaign"));
    }

    if let Some(name) = payload.name.as_ref() {
        campaign.name = name.clone();
    }
    if payload.description.is_some() {
        campaign.description = payload.description.clone();
    }
    if let Some(amount) = payload.amount {
        campaign.amount = Some(format_amount(amount));
    }
    if payload.division.is_some() {
        campaign.division = payload.division.clone();
    }
    if payload.department.is_some() {
        campaign.department = payload.department.clone();
    }
    if payload.location.is_some() {
        campaign.location = payload.location.clone();
    }
    if payload.start_date.is_some() {
        campaign.start_date = payload.start_date;
    }
    if payload.end_date.is_some() {
        campaign.end_date = payload.end_date;
    }

    let now = utc_now();

    sqlx::query(
        "UPDATE campaigns SET name = ?, description = ?, amount = ?, division = ?, department = ?, location = ?, start_date = ?, end_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&campaign.name)
    .bind(&campaign.description)
    .bind(&campaign.amount)
    .bind(&campaign.division)
    .bind(&campaign.department)
    .bind(&campaign.location)
    .bind(campaign.start_date)
    .bind(campaign.end_date)
    .bind(now)
    .bind(campaign.id)
    .execute(&state.pool)
    .await?;

    campaign.updated_at = now;
    let campaign: Campaign = campaign.try_into()?;

    Ok(Json(campaign))
}

#[utoipa::path(
    delete,
    path = "/campaigns/{id}",
    tag = "Campaigns",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 204, description = "Campaign soft deleted"),
        (status = 403, description = "Delete scope denied or not the owner"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_campaign(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mode = state
        .scope
        .resolve(&caller, Some(EntityKind::Campaigns), ActionVerb::Delete)
        .await;
    let filter = mode.filter(&caller, true);
    if filter == ScopeFilter::DenyAll {
        return Err(AppError::forbidden("insufficient scope to delete campaigns"));
    }

    let campaign = fetch_campaign(&state.pool, id).await?;
    if !filter.allows(Some(campaign.owner_user_id)) {
        return Err(AppError::forbidden("not the owner of this campaign"));
    }

    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE campaigns SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(&state.pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("campaign not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_campaign(pool: &SqlitePool, campaign_id: Uuid) -> AppResult<DbCampaign> {
    sqlx::query_as::<_, DbCampaign>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ? AND deleted_at IS NULL",
    ))
    .bind(campaign_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("campaign not found"))
}
