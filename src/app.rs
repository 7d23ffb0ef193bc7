use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{ClaimSetChecker, ScopeResolver};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{
    activity_types, campaigns, config, expenses, health, plan_types, plans, vendors,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub scope: ScopeResolver,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, scope: ScopeResolver) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            scope,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let scope = ScopeResolver::new(Arc::new(ClaimSetChecker::new()));
    let state = AppState::new(pool, jwt_config, scope);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let plan_routes = Router::new()
        .route("/", get(plans::list_plans))
        .route("/", post(plans::create_plan))
        .route("/:id", get(plans::get_plan))
        .route("/:id", put(plans::update_plan))
        .route("/:id", delete(plans::delete_plan));

    let expense_routes = Router::new()
        .route("/", get(expenses::list_expenses))
        .route("/", post(expenses::create_expense))
        .route("/:id", get(expenses::get_expense))
        .route("/:id", put(expenses::update_expense))
        .route("/:id", delete(expenses::delete_expense));

    let vendor_routes = Router::new()
        .route("/", get(vendors::list_vendors))
        .route("/", post(vendors::create_vendor))
        .route("/:id", get(vendors::get_vendor))
        .route("/:id", put(vendors::update_vendor))
        .route("/:id", delete(vendors::delete_vendor));

    let campaign_routes = Router::new()
        .route("/", get(campaigns::list_campaigns))
        .route("/", post(campaigns::create_campaign))
        .route("/:id", get(campaigns::get_campaign))
        .route("/:id", put(campaigns::update_campaign))
        .route("/:id", delete(campaigns::delete_campaign));

    let plan_type_routes = Router::new()
        .route("/", get(plan_types::list_plan_types))
        .route("/", post(plan_types::create_plan_type))
        .route("/:id", put(plan_types::update_plan_type))
        .route("/:id", delete(plan_types::delete_plan_type))
        .route("/:id/budgets", get(plan_types::list_budgets))
        .route("/:id/budgets", post(plan_types::upsert_budget));

    let activity_type_routes = Router::new()
        .route("/", get(activity_types::list_activity_types))
        .route("/", post(activity_types::create_activity_type))
        .route("/:id", put(activity_types::update_activity_type))
        .route("/:id", delete(activity_types::delete_activity_type));

    let router = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/config", get(config::get_config))
        .nest("/plans", plan_routes)
        .nest("/expenses", expense_routes)
        .nest("/vendors", vendor_routes)
        .nest("/campaigns", campaign_routes)
        .nest("/plan-types", plan_type_routes)
        .nest("/activity-types", activity_type_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
