use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::{ActionVerb, Caller, EntityKind};
use crate::errors::AppResult;
use crate::linking::LinkingPolicy;

/// Pack configuration the UI needs: whether to render project-linking
/// controls, and the caller's effective read scope per entity.
#[derive(Debug, Serialize, ToSchema)]
pub struct PackConfigResponse {
    pub project_linking_enabled: bool,
    pub project_linking_required: bool,
    pub read_scopes: ReadScopes,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadScopes {
    pub plans: &'static str,
    pub expenses: &'static str,
    pub vendors: &'static str,
    pub campaigns: &'static str,
}

#[utoipa::path(
    get,
    path = "/api/config",
    tag = "Config",
    responses((status = 200, description = "Pack configuration for the caller", body = PackConfigResponse)),
    security(("bearerAuth" = []))
)]
pub async fn get_config(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<PackConfigResponse>> {
    let policy = LinkingPolicy::from_config(&caller.config);

    let read_scopes = ReadScopes {
        plans: state
            .scope
            .resolve(&caller, Some(EntityKind::Plans), ActionVerb::Read)
            .await
            .as_str(),
        expenses: state
            .scope
            .resolve(&caller, Some(EntityKind::Expenses), ActionVerb::Read)
            .await
            .as_str(),
        vendors: state
            .scope
            .resolve(&caller, Some(EntityKind::Vendors), ActionVerb::Read)
            .await
            .as_str(),
        campaigns: state
            .scope
            .resolve(&caller, Some(EntityKind::Campaigns), ActionVerb::Read)
            .await
            .as_str(),
    };

    Ok(Json(PackConfigResponse {
        project_linking_enabled: policy.enabled,
        project_linking_required: policy.required,
        read_scopes,
    }))
}
