use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::config::get_config,
        routes::plans::list_plans,
        routes::plans::create_plan,
        routes::plans::get_plan,
        routes::plans::update_plan,
        routes::plans::delete_plan,
        routes::expenses::list_expenses,
        routes::expenses::create_expense,
        routes::expenses::get_expense,
        routes::expenses::update_expense,
        routes::expenses::delete_expense,
        routes::vendors::list_vendors,
        routes::vendors::create_vendor,
        routes::vendors::get_vendor,
        routes::vendors::update_vendor,
        routes::vendors::delete_vendor,
        routes::campaigns::list_campaigns,
        routes::campaigns::create_campaign,
        routes::campaigns::get_campaign,
        routes::campaigns::update_campaign,
        routes::campaigns::delete_campaign,
        routes::plan_types::list_plan_types,
        routes::plan_types::create_plan_type,
        routes::plan_types::update_plan_type,
        routes::plan_types::delete_plan_type,
        routes::plan_types::list_budgets,
        routes::plan_types::upsert_budget,
        routes::activity_types::list_activity_types,
        routes::activity_types::create_activity_type,
        routes::activity_types::update_activity_type,
        routes::activity_types::delete_activity_type,
    ),
    components(
        schemas(
            models::plan::Plan,
            models::plan::PlanCreateRequest,
            models::plan::PlanUpdateRequest,
            models::expense::Expense,
            models::expense::ExpenseCreateRequest,
            models::expense::ExpenseUpdateRequest,
            models::vendor::Vendor,
            models::vendor::VendorCreateRequest,
            models::vendor::VendorUpdateRequest,
            models::campaign::Campaign,
            models::campaign::CampaignCreateRequest,
            models::campaign::CampaignUpdateRequest,
            models::lookup::PlanType,
            models::lookup::ActivityType,
            models::lookup::PlanTypeBudget,
            models::lookup::LookupCreateRequest,
            models::lookup::LookupUpdateRequest,
            models::lookup::BudgetUpsertRequest,
            routes::config::PackConfigResponse,
            routes::config::ReadScopes,
            routes::health::HealthResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness probes"),
        (name = "Config", description = "Caller-scoped pack configuration"),
        (name = "Plans", description = "Marketing plan management"),
        (name = "Expenses", description = "Expense tracking"),
        (name = "Vendors", description = "Vendor directory"),
        (name = "Campaigns", description = "Campaign management"),
        (name = "Lookups", description = "Plan types, activity types and budgets"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI document and inject the bearer auth scheme so the
/// Swagger Authorize dialog can attach tokens.
pub fn build_openapi() -> anyhow::Result<utoipa::openapi::OpenApi> {
    let mut doc = serde_json::to_value(ApiDoc::openapi())?;

    ensure_bearer_scheme(&mut doc);

    Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
    let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .persist_authorization(true);

    let doc_json = Arc::new(serde_json::to_value(&doc).expect("OpenAPI serialization must succeed"));

    let json_route = {
        let doc_json = Arc::clone(&doc_json);
        get(move || {
            let doc_json = Arc::clone(&doc_json);
            async move { Json((*doc_json).clone()) }
        })
    };

    Router::new()
        .route("/api-docs/openapi.json", json_route)
        .merge(SwaggerUi::new("/docs").config(swagger_config))
}

fn ensure_bearer_scheme(doc: &mut Value) {
    let components = doc
        .as_object_mut()
        .expect("OpenAPI document is an object")
        .entry("components")
        .or_insert_with(|| json!({}));

    if let Some(components) = components.as_object_mut() {
        let schemes = components
            .entry("securitySchemes")
            .or_insert_with(|| json!({}));
        if let Some(schemes) = schemes.as_object_mut() {
            schemes.insert(
                "bearerAuth".to_string(),
                json!({
                    "type": "http",
                    "scheme": "bearer",
                    "bearerFormat": "JWT"
                }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();

        assert!(!paths.is_empty(), "document must carry operations");
        for path in [
            "/api/health",
            "/api/config",
            "/plans",
            "/plans/{id}",
            "/expenses",
            "/expenses/{id}",
            "/vendors/{id}",
            "/campaigns/{id}",
            "/plan-types/{id}/budgets",
            "/activity-types/{id}",
        ] {
            assert!(paths.contains_key(path), "missing path: {path}");
        }

        // Each method documented on a path shows up as an operation.
        assert!(paths["/plans"].get("get").is_some());
        assert!(paths["/plans"].get("post").is_some());
        assert!(paths["/plans/{id}"].get("put").is_some());
        assert!(paths["/plans/{id}"].get("delete").is_some());
    }

    #[test]
    fn built_document_carries_bearer_scheme() {
        let doc = build_openapi().unwrap();
        let doc = serde_json::to_value(doc).unwrap();

        assert_eq!(
            doc["components"]["securitySchemes"]["bearerAuth"]["scheme"],
            "bearer"
        );
        assert!(!doc["paths"].as_object().unwrap().is_empty());
    }
}
