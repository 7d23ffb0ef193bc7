use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use marketing_budget::authz::PackConfig;
use marketing_budget::create_app;
use marketing_budget::jwt::{Claims, JwtConfig};
use marketing_budget::linking::{store, LinkTarget};

async fn setup() -> Result<(Router, SqlitePool, TempDir)> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok((app, pool, dir))
}

fn bearer(perms: &[&str], features: PackConfig) -> Result<String> {
    let jwt = JwtConfig::from_env()?;
    let claims = Claims::new(Uuid::new_v4(), 1)
        .with_permissions(perms.iter().map(|p| p.to_string()))
        .with_features(features);
    Ok(jwt.encode(&claims)?)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> Result<Response> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));

    let request = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            builder.body(Body::from(serde_json::to_vec(&value)?))?
        }
        None => builder.body(Body::empty())?,
    };

    Ok(app.clone().oneshot(request).await?)
}

async fn json_body(resp: Response) -> Result<Value> {
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn link_row_count(pool: &SqlitePool, entity_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM marketing_entity_links WHERE marketing_entity_id = ?",
    )
    .bind(Uuid::parse_str(entity_id)?)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

const PLAN_ADMIN: &[&str] = &[
    "marketing.plans.read.scope.any",
    "marketing.plans.write.scope.any",
    "marketing.plans.delete.scope.any",
];

const LINKING_ON: PackConfig = PackConfig {
    enable_project_linking: true,
    require_project_linking: false,
};

const LINKING_REQUIRED: PackConfig = PackConfig {
    enable_project_linking: true,
    require_project_linking: true,
};

#[tokio::test]
async fn plan_link_set_replace_and_clear() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    let token = bearer(PLAN_ADMIN, LINKING_ON)?;

    let project_a = Uuid::new_v4();
    let project_b = Uuid::new_v4();

    // create with a link
    let resp = send(
        &app,
        "POST",
        "/plans",
        &token,
        Some(json!({ "name": "Linked plan", "amount": 100.0, "project_id": project_a.to_string() })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await?;
    let plan_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["project_id"], project_a.to_string());
    assert_eq!(link_row_count(&pool, &plan_id).await?, 1);

    // replacing leaves exactly one row behind
    let resp = send(
        &app,
        "PUT",
        &format!("/plans/{plan_id}"),
        &token,
        Some(json!({ "project_id": project_b.to_string() })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = json_body(resp).await?;
    assert_eq!(updated["project_id"], project_b.to_string());
    assert_eq!(link_row_count(&pool, &plan_id).await?, 1);

    // an update without the field keeps the link
    let resp = send(
        &app,
        "PUT",
        &format!("/plans/{plan_id}"),
        &token,
        Some(json!({ "name": "Renamed" })),
    )
    .await?;
    let updated = json_body(resp).await?;
    assert_eq!(updated["project_id"], project_b.to_string());

    // explicit null clears it
    let resp = send(
        &app,
        "PUT",
        &format!("/plans/{plan_id}"),
        &token,
        Some(json!({ "project_id": null })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = json_body(resp).await?;
    assert!(updated["project_id"].is_null());
    assert_eq!(link_row_count(&pool, &plan_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn empty_string_project_id_clears_the_link() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    let token = bearer(PLAN_ADMIN, LINKING_ON)?;

    let project = Uuid::new_v4();
    let resp = send(
        &app,
        "POST",
        "/plans",
        &token,
        Some(json!({ "name": "P", "amount": 1.0, "project_id": project.to_string() })),
    )
    .await?;
    let plan_id = json_body(resp).await?["id"].as_str().unwrap().to_string();

    let resp = send(
        &app,
        "PUT",
        &format!("/plans/{plan_id}"),
        &token,
        Some(json!({ "project_id": "" })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(link_row_count(&pool, &plan_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn malformed_project_id_is_a_validation_error() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let token = bearer(PLAN_ADMIN, LINKING_ON)?;

    let resp = send(
        &app,
        "POST",
        "/plans",
        &token,
        Some(json!({ "name": "Bad link", "amount": 1.0, "project_id": "not-a-uuid" })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn project_id_rejected_when_linking_disabled() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let token = bearer(PLAN_ADMIN, PackConfig::default())?;

    let resp = send(
        &app,
        "POST",
        "/plans",
        &token,
        Some(json!({ "name": "No linking", "amount": 1.0, "project_id": Uuid::new_v4().to_string() })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn required_linking_enforced_on_create_and_clear() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let token = bearer(PLAN_ADMIN, LINKING_REQUIRED)?;

    // create without a project id is rejected
    let resp = send(
        &app,
        "POST",
        "/plans",
        &token,
        Some(json!({ "name": "Unlinked", "amount": 1.0 })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // with one it goes through
    let resp = send(
        &app,
        "POST",
        "/plans",
        &token,
        Some(json!({ "name": "Linked", "amount": 1.0, "project_id": Uuid::new_v4().to_string() })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let plan_id = json_body(resp).await?["id"].as_str().unwrap().to_string();

    // clearing a required link is rejected
    let resp = send(
        &app,
        "PUT",
        &format!("/plans/{plan_id}"),
        &token,
        Some(json!({ "project_id": null })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // but an update that leaves the field out is fine
    let resp = send(
        &app,
        "PUT",
        &format!("/plans/{plan_id}"),
        &token,
        Some(json!({ "name": "Still linked" })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn deleting_a_plan_removes_its_links() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    let token = bearer(PLAN_ADMIN, LINKING_ON)?;

    let resp = send(
        &app,
        "POST",
        "/plans",
        &token,
        Some(json!({ "name": "Doomed", "amount": 1.0, "project_id": Uuid::new_v4().to_string() })),
    )
    .await?;
    let plan_id = json_body(resp).await?["id"].as_str().unwrap().to_string();
    assert_eq!(link_row_count(&pool, &plan_id).await?, 1);

    let resp = send(&app, "DELETE", &format!("/plans/{plan_id}"), &token, None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(link_row_count(&pool, &plan_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn expense_links_are_isolated_per_target_type() -> Result<()> {
    let (_app, pool, _dir) = setup().await?;

    // Same entity id under both target types; each keeps its own link.
    let shared_id = Uuid::new_v4();
    let plan_project = Uuid::new_v4();
    let expense_project = Uuid::new_v4();

    store::set_linked_project_id(&pool, LinkTarget::Plan, shared_id, Some(plan_project)).await?;
    store::set_linked_project_id(&pool, LinkTarget::Expense, shared_id, Some(expense_project))
        .await?;

    assert_eq!(
        store::linked_project_id(&pool, LinkTarget::Plan, shared_id).await?,
        Some(plan_project)
    );
    assert_eq!(
        store::linked_project_id(&pool, LinkTarget::Expense, shared_id).await?,
        Some(expense_project)
    );

    // Re-setting the same value is idempotent: still one row per target.
    store::set_linked_project_id(&pool, LinkTarget::Plan, shared_id, Some(plan_project)).await?;
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM marketing_entity_links WHERE marketing_entity_id = ?",
    )
    .bind(shared_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(count, 2);

    store::clear_links(&pool, LinkTarget::Plan, shared_id).await?;
    assert_eq!(
        store::linked_project_id(&pool, LinkTarget::Plan, shared_id).await?,
        None
    );
    assert_eq!(
        store::linked_project_id(&pool, LinkTarget::Expense, shared_id).await?,
        Some(expense_project)
    );

    Ok(())
}
