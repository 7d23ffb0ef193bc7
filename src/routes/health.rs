use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::query_scalar;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::AppResult;

const SERVICE: &str = "marketing-budget";

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub db_ok: bool,
    pub db_error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let db_error = query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .err()
        .map(|e| e.to_string());

    Ok(Json(HealthResponse {
        status: "ok",
        service: SERVICE,
        db_ok: db_error.is_none(),
        db_error,
    }))
}
