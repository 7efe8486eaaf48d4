use std::{env::VarError, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    Router,
};
use chrono::Utc;
use flipdesk_core::{build_app_config, flatten, AppConfig, CategoryNode};
use flipdesk_ebay::{EbayClient, EbaySettings};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::super::{build_app, default_rate_limit_state, AppState};
use super::*;
use crate::middleware::AuthState;

fn test_config() -> Arc<AppConfig> {
    let config = build_app_config(|key| match key {
        "DATABASE_URL" => Ok("postgres://localhost/flipdesk_test".to_string()),
        _ => Err(VarError::NotPresent),
    })
    .expect("config");
    Arc::new(config)
}

/// Pool that never connects; for requests rejected before any query.
fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/flipdesk_test")
        .expect("lazy pool")
}

fn app(pool: PgPool, ebay: Option<EbayClient>) -> Router {
    let auth = AuthState::from_keys(None, true).expect("auth");
    let state = AppState {
        pool,
        ebay: ebay.map(Arc::new),
        config: test_config(),
    };
    build_app(state, auth, default_rate_limit_state())
}

async fn post_action(app: Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/categories")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&bytes).expect("json parse");
    (status, json)
}

fn motors_tree() -> CategoryNode {
    CategoryNode::new(
        "6000",
        "eBay Motors",
        vec![
            CategoryNode::new(
                "6028",
                "Parts & Accessories",
                vec![CategoryNode::new("33615", "Brakes", vec![])],
            ),
            CategoryNode::new("6001", "Cars & Trucks", vec![]),
        ],
    )
}

async fn seed_motors(pool: &PgPool) {
    let records = flatten(&motors_tree()).expect("flatten");
    flipdesk_db::upsert_categories(pool, &records, Utc::now())
        .await
        .expect("seed categories");
}

fn mock_ebay(server: &MockServer) -> EbayClient {
    EbayClient::new(EbaySettings {
        client_id: "app-id".to_string(),
        client_secret: "app-secret".to_string(),
        user_token: None,
        base_url: server.uri(),
        marketplace_id: "EBAY_US".to_string(),
        category_tree_id: Some("0".to_string()),
        site_id: 0,
        timeout_secs: 5,
    })
    .expect("client")
}

async fn mount_motors_tree(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/identity/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "app-token",
            "expires_in": 7200
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/commerce/taxonomy/v1/category_tree/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "categoryTreeId": "0",
            "categoryTreeVersion": "130",
            "rootCategoryNode": {
                "category": { "categoryId": "6000", "categoryName": "eBay Motors" },
                "childCategoryTreeNodes": [
                    {
                        "category": { "categoryId": "6028", "categoryName": "Parts & Accessories" },
                        "childCategoryTreeNodes": [
                            { "category": { "categoryId": "33615", "categoryName": "Brakes" } }
                        ]
                    },
                    { "category": { "categoryId": "6001", "categoryName": "Cars & Trucks" } }
                ]
            }
        })))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Request validation (no database)
// ---------------------------------------------------------------------------

#[test]
fn parse_action_accepts_camel_case_params() {
    let action = parse_action(
        json!({ "action": "sync_categories", "fullSync": true, "parentId": "6000" }),
        "req-1",
    )
    .expect("parse");
    let CategoryAction::SyncCategories {
        full_resync,
        parent_id,
    } = action
    else {
        panic!("expected sync action");
    };
    assert!(full_resync);
    assert_eq!(parent_id.as_deref(), Some("6000"));

    let action = parse_action(
        json!({ "action": "resolve", "categoryId": "6000", "knownLeaf": true }),
        "req-1",
    )
    .expect("parse");
    let CategoryAction::Resolve(request) = action else {
        panic!("expected resolve action");
    };
    assert_eq!(request.category_id.as_deref(), Some("6000"));
    assert!(request.known_leaf);
}

#[test]
fn parse_action_defaults_sync_to_incremental() {
    let action = parse_action(json!({ "action": "sync_categories" }), "req-1").expect("parse");
    assert!(matches!(
        action,
        CategoryAction::SyncCategories {
            full_resync: false,
            parent_id: None
        }
    ));
}

#[tokio::test]
async fn unknown_action_is_bad_request() {
    let (status, json) = post_action(app(lazy_pool(), None), r#"{"action":"purge"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"]["code"], "unknown_action");
}

#[tokio::test]
async fn missing_action_is_bad_request() {
    let (status, json) = post_action(app(lazy_pool(), None), r#"{"title":"pyrex"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn missing_parameter_is_bad_request() {
    let (status, json) = post_action(app(lazy_pool(), None), r#"{"action":"validate"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "failed");
    assert!(json["error"]["message"]
        .as_str()
        .expect("message")
        .contains("category_id"));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (status, json) = post_action(app(lazy_pool(), None), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn sync_without_ebay_credentials_fails() {
    let (status, json) =
        post_action(app(lazy_pool(), None), r#"{"action":"sync_categories"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"]["code"], "ebay_unconfigured");
}

#[tokio::test]
async fn suggest_without_ebay_credentials_fails() {
    let (status, json) = post_action(
        app(lazy_pool(), None),
        r#"{"action":"suggest","title":"vintage pyrex"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "ebay_unconfigured");
}

#[tokio::test]
async fn validate_rejects_non_numeric_id_without_lookup() {
    let (status, json) = post_action(
        app(lazy_pool(), None),
        r#"{"action":"validate","category_id":"abc"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["exists"], false);
    assert_eq!(json["is_leaf"], false);
}

#[tokio::test]
async fn resolve_with_nothing_known_falls_back() {
    let (status, json) = post_action(app(lazy_pool(), None), r#"{"action":"resolve"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["category_id"], "1249");
    assert_eq!(json["is_leaf"], true);
    assert_eq!(json["source"], "fallback");
    assert!(json["meta"]["request_id"].is_string());
}

// ---------------------------------------------------------------------------
// Stored categories (with DB)
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn validate_reports_stored_leaf(pool: PgPool) {
    seed_motors(&pool).await;

    let (status, json) = post_action(
        app(pool, None),
        r#"{"action":"validate","categoryId":"33615"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["exists"], true);
    assert_eq!(json["is_leaf"], true);
    assert_eq!(json["category_name"], "Brakes");
    assert_eq!(
        json["path"],
        json!(["eBay Motors", "Parts & Accessories", "Brakes"])
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn resolve_descends_from_stored_parent(pool: PgPool) {
    seed_motors(&pool).await;

    let (status, json) = post_action(
        app(pool, None),
        r#"{"action":"resolve","category_id":"6000"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["category_id"], "6001");
    assert_eq!(json["is_leaf"], true);
    assert_eq!(json["source"], "descended");
    assert_eq!(json["path"], json!(["eBay Motors", "Cars & Trucks"]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn leaf_children_lists_only_leaves(pool: PgPool) {
    seed_motors(&pool).await;

    let (status, json) = post_action(
        app(pool, None),
        r#"{"action":"getLeafChildren","parent_id":"6000"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let children = json["children"].as_array().expect("children");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["category_id"], "6001");
}

#[sqlx::test(migrations = "../../migrations")]
async fn sync_action_persists_then_skips_inside_window(pool: PgPool) {
    let server = MockServer::start().await;
    mount_motors_tree(&server).await;

    let (status, json) = post_action(
        app(pool.clone(), Some(mock_ebay(&server))),
        r#"{"action":"sync_categories"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {json}");
    assert_eq!(json["status"], "success");
    assert_eq!(json["inserted_count"], 4);
    assert!(json["run_id"].is_string());

    let (status, json) = post_action(
        app(pool.clone(), Some(mock_ebay(&server))),
        r#"{"action":"sync_categories"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "skipped");
    assert_eq!(json["inserted_count"], 0);

    let response = app(pool, None)
        .oneshot(
            Request::builder()
                .uri("/api/v1/categories/sync-runs?limit=5")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let runs: Value = serde_json::from_slice(&bytes).expect("json parse");
    let runs = runs["data"].as_array().expect("data array");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["status"], "skipped");
    assert_eq!(runs[0]["trigger_source"], "api");
    assert_eq!(runs[1]["status"], "succeeded");
    assert_eq!(runs[1]["records_processed"], 4);
}

#[sqlx::test(migrations = "../../migrations")]
async fn sync_action_reports_upstream_failure(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/identity/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let (status, json) = post_action(
        app(pool.clone(), Some(mock_ebay(&server))),
        r#"{"action":"sync_categories","full_resync":true}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"]["code"], "sync_failed");

    let runs = flipdesk_db::list_sync_runs(&pool, 1).await.expect("runs");
    assert_eq!(runs[0].status, "failed");
    assert_eq!(runs[0].sync_mode, "full");
}

#[sqlx::test(migrations = "../../migrations")]
async fn sync_action_flags_ebay_outage(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/identity/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "app-token",
            "expires_in": 7200
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/commerce/taxonomy/v1/category_tree/0"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let (status, json) = post_action(
        app(pool.clone(), Some(mock_ebay(&server))),
        r#"{"action":"sync_categories","full_resync":true}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"]["code"], "ebay_unavailable");
    assert_eq!(json["inserted_count"], 0);

    let runs = flipdesk_db::list_sync_runs(&pool, 1).await.expect("runs");
    assert_eq!(runs[0].status, "failed");
}
