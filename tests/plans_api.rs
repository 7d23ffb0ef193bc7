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

fn bearer(user: Uuid, perms: &[&str], features: PackConfig) -> Result<String> {
    let jwt = JwtConfig::from_env()?;
    let claims = Claims::new(user, 1)
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

const PLAN_ADMIN: &[&str] = &[
    "marketing.plans.read.scope.any",
    "marketing.plans.write.scope.any",
    "marketing.plans.delete.scope.any",
];

#[tokio::test]
async fn plan_crud_round_trip() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let token = bearer(Uuid::new_v4(), PLAN_ADMIN, PackConfig::default())?;

    // create
    let resp = send(
        &app,
        "POST",
        "/plans",
        &token,
        Some(json!({
            "name": "Q3 Social Push",
            "description": "paid social for Q3",
            "amount": 15000.0
        })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await?;
    let plan_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "Q3 Social Push");
    assert_eq!(created["amount"], 15000.0);
    assert!(created["project_id"].is_null());

    // list contains the plan
    let resp = send(&app, "GET", "/plans", &token, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed = json_body(resp).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    // get by id
    let resp = send(&app, "GET", &format!("/plans/{plan_id}"), &token, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // partial update leaves untouched fields alone
    let resp = send(
        &app,
        "PUT",
        &format!("/plans/{plan_id}"),
        &token,
        Some(json!({ "amount": 18000.0 })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = json_body(resp).await?;
    assert_eq!(updated["amount"], 18000.0);
    assert_eq!(updated["name"], "Q3 Social Push");

    // soft delete
    let resp = send(&app, "DELETE", &format!("/plans/{plan_id}"), &token, None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&app, "GET", &format!("/plans/{plan_id}"), &token, None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, "GET", "/plans", &token, None).await?;
    let listed = json_body(resp).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn ungranted_caller_sees_nothing_and_cannot_write() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;

    let admin = bearer(Uuid::new_v4(), PLAN_ADMIN, PackConfig::default())?;
    let resp = send(
        &app,
        "POST",
        "/plans",
        &admin,
        Some(json!({ "name": "Hidden", "amount": 100.0 })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let plan_id = json_body(resp).await?["id"].as_str().unwrap().to_string();

    // No grants resolves to `own`, and plans carry no owner: deny everything.
    let nobody = bearer(Uuid::new_v4(), &[], PackConfig::default())?;

    let resp = send(&app, "GET", "/plans", &nobody, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed = json_body(resp).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));

    // Denied single read hides existence.
    let resp = send(&app, "GET", &format!("/plans/{plan_id}"), &nobody, None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(
        &app,
        "PUT",
        &format!("/plans/{plan_id}"),
        &nobody,
        Some(json!({ "name": "Taken over" })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(&app, "DELETE", &format!("/plans/{plan_id}"), &nobody, None).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(
        &app,
        "POST",
        "/plans",
        &nobody,
        Some(json!({ "name": "Mine", "amount": 1.0 })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn none_grant_overrides_broader_plan_grants() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;

    let admin = bearer(Uuid::new_v4(), PLAN_ADMIN, PackConfig::default())?;
    let resp = send(
        &app,
        "POST",
        "/plans",
        &admin,
        Some(json!({ "name": "Visible to some", "amount": 50.0 })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Most restrictive grant wins even when `any` is also present.
    let blocked = bearer(
        Uuid::new_v4(),
        &[
            "marketing.plans.read.scope.none",
            "marketing.plans.read.scope.any",
        ],
        PackConfig::default(),
    )?;

    let resp = send(&app, "GET", "/plans", &blocked, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed = json_body(resp).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn pack_tier_grant_applies_when_entity_tier_is_silent() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;

    // Pack-wide grants, nothing entity specific.
    let pack_admin = bearer(
        Uuid::new_v4(),
        &["marketing.read.scope.any", "marketing.write.scope.any"],
        PackConfig::default(),
    )?;

    let resp = send(
        &app,
        "POST",
        "/plans",
        &pack_admin,
        Some(json!({ "name": "Pack-wide", "amount": 10.0 })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&app, "GET", "/plans", &pack_admin, None).await?;
    let listed = json_body(resp).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    // An entity-tier `none` beats the caller's pack-wide `any`.
    let entity_blocked = bearer(
        Uuid::new_v4(),
        &[
            "marketing.read.scope.any",
            "marketing.plans.read.scope.none",
        ],
        PackConfig::default(),
    )?;
    let resp = send(&app, "GET", "/plans", &entity_blocked, None).await?;
    let listed = json_body(resp).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;

    let request = Request::builder()
        .method("GET")
        .uri("/plans")
        .body(Body::empty())?;
    let resp = app.clone().oneshot(request).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
