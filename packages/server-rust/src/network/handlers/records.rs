//! Record CRUD endpoints.
//!
//! Handlers turn each request into an [`Operation`] and dispatch it through
//! the operation pipeline, so load shedding, deadlines and metrics apply to
//! HTTP traffic. The tenant and branch bound by the HTTP tenant context
//! layer are carried into the operation as the requested scope.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;
use serde_json::json;
use tenancy_core::Actor;

use super::AppState;
use crate::network::extract::{ApiError, CurrentContext};
use crate::service::{service_names, Operation, OperationError, OperationResponse};
use crate::storage::Record;

#[derive(Debug, Serialize)]
pub struct KeyedRecord {
    pub key: String,
    #[serde(flatten)]
    pub record: Record,
}

fn unexpected(resp: &OperationResponse) -> ApiError {
    ApiError(OperationError::Internal(anyhow::anyhow!(
        "unexpected operation response: {resp:?}"
    )))
}

/// `GET /records/{collection}`
pub async fn scan_records_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    CurrentContext(bound): CurrentContext,
    Path(collection): Path<String>,
) -> Result<Json<Vec<KeyedRecord>>, ApiError> {
    let op = Operation::ScanRecords {
        ctx: state.operation_context(service_names::RECORDS, actor, &bound),
        collection,
    };
    match state.dispatch(op).await? {
        OperationResponse::Records { records, .. } => Ok(Json(
            records
                .into_iter()
                .map(|(key, record)| KeyedRecord { key, record })
                .collect(),
        )),
        other => Err(unexpected(&other)),
    }
}

/// `GET /records/{collection}/{key}`
pub async fn get_record_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    CurrentContext(bound): CurrentContext,
    Path((collection, key)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let op = Operation::GetRecord {
        ctx: state.operation_context(service_names::RECORDS, actor, &bound),
        collection,
        key: key.clone(),
    };
    match state.dispatch(op).await? {
        OperationResponse::Record {
            record: Some(record),
            ..
        } => Ok(Json(KeyedRecord { key, record }).into_response()),
        OperationResponse::Record { record: None, .. } => Ok(StatusCode::NOT_FOUND.into_response()),
        other => Err(unexpected(&other)),
    }
}

/// `PUT /records/{collection}/{key}`
///
/// `201 Created` when the put created the record (or claimed an unowned
/// one), `200 OK` when it replaced the caller's own record.
pub async fn put_record_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    CurrentContext(bound): CurrentContext,
    Path((collection, key)): Path<(String, String)>,
    Json(value): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    let op = Operation::PutRecord {
        ctx: state.operation_context(service_names::RECORDS, actor, &bound),
        collection,
        key,
        value,
    };
    match state.dispatch(op).await? {
        OperationResponse::Stored { previous: Some(_), .. } => Ok(StatusCode::OK),
        OperationResponse::Stored { previous: None, .. } => Ok(StatusCode::CREATED),
        other => Err(unexpected(&other)),
    }
}

/// `DELETE /records/{collection}/{key}`
pub async fn delete_record_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    CurrentContext(bound): CurrentContext,
    Path((collection, key)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let op = Operation::RemoveRecord {
        ctx: state.operation_context(service_names::RECORDS, actor, &bound),
        collection,
        key,
    };
    match state.dispatch(op).await? {
        OperationResponse::Record { record: Some(_), .. } => Ok(StatusCode::NO_CONTENT),
        OperationResponse::Record { record: None, .. } => Ok(StatusCode::NOT_FOUND),
        other => Err(unexpected(&other)),
    }
}

/// `DELETE /admin/collections/{collection}`. Operators only.
pub async fn purge_collection_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    CurrentContext(bound): CurrentContext,
    Path(collection): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let op = Operation::PurgeCollection {
        ctx: state.operation_context(service_names::ADMIN, actor, &bound),
        collection,
    };
    match state.dispatch(op).await? {
        OperationResponse::Purged { removed, .. } => Ok(Json(json!({ "removed": removed }))),
        other => Err(unexpected(&other)),
    }
}
