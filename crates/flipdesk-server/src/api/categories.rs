use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use flipdesk_categories::{
    run_recorded_sync, LeafResolver, ResolveRequest, StoredCategories, SyncOptions, SyncOutcome,
    TriggerSource,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const ACTIONS: [&str; 5] = [
    "sync_categories",
    "suggest",
    "validate",
    "getLeafChildren",
    "resolve",
];

#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
enum CategoryAction {
    #[serde(rename = "sync_categories")]
    SyncCategories {
        #[serde(default, alias = "fullResync", alias = "fullSync")]
        full_resync: bool,
        #[serde(default, alias = "parentId")]
        parent_id: Option<String>,
    },
    #[serde(rename = "suggest")]
    Suggest {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename = "validate")]
    Validate {
        #[serde(alias = "categoryId")]
        category_id: String,
    },
    #[serde(rename = "getLeafChildren")]
    GetLeafChildren {
        #[serde(alias = "parentId")]
        parent_id: String,
    },
    #[serde(rename = "resolve")]
    Resolve(ResolveRequest),
}

/// `{status, ...payload, meta}` envelope returned by the action handler.
#[derive(Debug, Serialize)]
struct ActionReply {
    status: &'static str,
    #[serde(flatten)]
    payload: Value,
    meta: ResponseMeta,
}

fn reply(code: StatusCode, status: &'static str, payload: Value, req_id: String) -> Response {
    (
        code,
        Json(ActionReply {
            status,
            payload,
            meta: ResponseMeta::new(req_id),
        }),
    )
        .into_response()
}

fn success(payload: Value, req_id: String) -> Response {
    reply(StatusCode::OK, "success", payload, req_id)
}

fn lookup_failed(req_id: String, action: &str, error: &impl std::fmt::Display) -> ApiError {
    tracing::error!(action, error = %error, "category lookup failed");
    ApiError::new(req_id, "lookup_failed", error.to_string())
}

fn parse_action(body: Value, req_id: &str) -> Result<CategoryAction, ApiError> {
    let Some(action) = body.get("action").and_then(Value::as_str) else {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "request body must carry a string \"action\"",
        ));
    };
    if !ACTIONS.contains(&action) {
        return Err(ApiError::new(
            req_id,
            "unknown_action",
            format!("unknown action {action:?}; expected one of {}", ACTIONS.join(", ")),
        ));
    }
    serde_json::from_value(body)
        .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))
}

/// `POST /api/v1/categories`: single entry point for category operations,
/// selected by the body's `action` field.
pub(super) async fn dispatch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) =
        body.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;
    let action = parse_action(body, &req_id.0)?;

    let resolver = LeafResolver::new(
        StoredCategories::new(state.pool.clone(), state.ebay.clone()),
        &state.config.category_sync,
    );

    match action {
        CategoryAction::SyncCategories {
            full_resync,
            parent_id,
        } => {
            let options = SyncOptions {
                full_resync,
                parent_id: parent_id.filter(|id| !id.trim().is_empty()),
            };
            sync(&state, options, req_id.0).await
        }
        CategoryAction::Suggest { title, description } => {
            if state.ebay.is_none() {
                return Err(ebay_unconfigured(req_id.0));
            }
            let suggestions = resolver
                .suggest(
                    title.as_deref().unwrap_or_default(),
                    description.as_deref().unwrap_or_default(),
                )
                .await
                .map_err(|e| lookup_failed(req_id.0.clone(), "suggest", &e))?;
            Ok(success(json!({ "suggestions": suggestions }), req_id.0))
        }
        CategoryAction::Validate { category_id } => {
            let validation = resolver
                .validate(&category_id)
                .await
                .map_err(|e| lookup_failed(req_id.0.clone(), "validate", &e))?;
            Ok(success(json!(validation), req_id.0))
        }
        CategoryAction::GetLeafChildren { parent_id } => {
            let children = resolver
                .leaf_children(&parent_id)
                .await
                .map_err(|e| lookup_failed(req_id.0.clone(), "getLeafChildren", &e))?;
            Ok(success(
                json!({ "parent_id": parent_id.trim(), "children": children }),
                req_id.0,
            ))
        }
        CategoryAction::Resolve(request) => {
            let resolution = resolver.resolve(&request).await;
            Ok(success(json!(resolution), req_id.0))
        }
    }
}

fn ebay_unconfigured(req_id: String) -> ApiError {
    ApiError::new(
        req_id,
        "ebay_unconfigured",
        "eBay credentials are not configured",
    )
}

async fn sync(
    state: &AppState,
    options: SyncOptions,
    req_id: String,
) -> Result<Response, ApiError> {
    let Some(ebay) = state.ebay.as_deref() else {
        return Err(ebay_unconfigured(req_id));
    };

    let recorded = run_recorded_sync(
        &state.pool,
        ebay,
        &state.config.category_sync,
        &options,
        TriggerSource::Api,
    )
    .await
    .map_err(|e| map_db_error(req_id.clone(), &e))?;

    let run_id = recorded.run.public_id;
    let response = match recorded.result {
        Ok(SyncOutcome::Completed(summary)) => success(
            json!({
                "run_id": run_id,
                "inserted_count": summary.inserted_count,
                "new_rows": summary.new_rows,
                "updated_rows": summary.updated_rows,
                "retired_count": summary.retired_count,
                "batches": summary.batches,
            }),
            req_id,
        ),
        Ok(SyncOutcome::Skipped { last_updated }) => reply(
            StatusCode::OK,
            "skipped",
            json!({
                "run_id": run_id,
                "reason": "categories were refreshed recently",
                "last_updated": last_updated,
                "inserted_count": 0,
            }),
            req_id,
        ),
        Err(err) => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed",
            json!({
                "run_id": run_id,
                "error": {
                    "code": if err.is_upstream() { "ebay_unavailable" } else { "sync_failed" },
                    "message": err.to_string(),
                },
                "inserted_count": err.records_written(),
            }),
            req_id,
        ),
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub(super) struct SyncRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncRunItem {
    sync_run_id: Uuid,
    trigger_source: String,
    sync_mode: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    records_processed: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

/// `GET /api/v1/categories/sync-runs`: most recent runs first.
pub(super) async fn list_sync_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SyncRunsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncRunItem>>>, ApiError> {
    let rows = flipdesk_db::list_sync_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| SyncRunItem {
            sync_run_id: row.public_id,
            trigger_source: row.trigger_source,
            sync_mode: row.sync_mode,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            records_processed: row.records_processed,
            error_message: row.error_message,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
#[path = "categories_test.rs"]
mod tests;
