//! axum extractors and rejections for tenant-scoped handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tenancy_core::{ExecutionContext, IsolationError, TenantId};

use crate::context;
use crate::service::OperationError;

/// HTTP rendering of an isolation failure.
///
/// The body names the failure kind but never the other tenant involved.
#[derive(Debug)]
pub struct IsolationRejection(pub IsolationError);

impl From<IsolationError> for IsolationRejection {
    fn from(err: IsolationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for IsolationRejection {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &self.0 {
            IsolationError::MissingContext { field } => format!("no {field} bound for request"),
            IsolationError::NoUnitOfWork => "internal error".to_string(),
            _ => "access denied".to_string(),
        };
        (
            status,
            Json(json!({
                "error": self.0.kind(),
                "message": message,
            })),
        )
            .into_response()
    }
}

/// HTTP rendering of an operation failure.
#[derive(Debug)]
pub struct ApiError(pub OperationError);

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            OperationError::Isolation(err) => IsolationRejection(err).into_response(),
            OperationError::UnknownCollection { name } => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "unknown_collection", "message": name })),
            )
                .into_response(),
            OperationError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT.into_response(),
            OperationError::Overloaded => StatusCode::SERVICE_UNAVAILABLE.into_response(),
            other => {
                tracing::error!(error = %other, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// The execution context bound for the current request.
#[derive(Debug, Clone)]
pub struct CurrentContext(pub ExecutionContext);

impl<S: Send + Sync> FromRequestParts<S> for CurrentContext {
    type Rejection = IsolationRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ExecutionContext>()
            .cloned()
            .or_else(context::current)
            .map(Self)
            .ok_or(IsolationRejection(IsolationError::NoUnitOfWork))
    }
}

/// The tenant bound for the current request. Rejects root-scope requests.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub TenantId);

impl<S: Send + Sync> FromRequestParts<S> for CurrentTenant {
    type Rejection = IsolationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentContext(ctx) = CurrentContext::from_request_parts(parts, state).await?;
        ctx.tenant_id
            .filter(|t| !t.is_empty())
            .map(Self)
            .ok_or_else(|| IsolationRejection(IsolationError::missing_tenant()))
    }
}
