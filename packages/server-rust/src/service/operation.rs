//! Operation types flowing through the tower pipeline.

use tenancy_core::{Actor, BranchId, IsolationError, TenantId};

use crate::storage::Record;

/// Service names used for routing.
pub mod service_names {
    /// Tenant-scoped record CRUD.
    pub const RECORDS: &str = "records";
    /// Operator-only maintenance.
    pub const ADMIN: &str = "admin";
}

/// Context carried with every operation through the pipeline.
///
/// `actor` is produced by authentication upstream. The requested tenant
/// and branch are what the caller asks to act on; the dispatch layer
/// decides what actually gets bound.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub call_id: u64,
    pub service_name: &'static str,
    pub actor: Actor,
    pub requested_tenant: Option<TenantId>,
    pub requested_branch: Option<BranchId>,
    pub call_timeout_ms: u64,
}

impl OperationContext {
    #[must_use]
    pub fn new(call_id: u64, service_name: &'static str, actor: Actor, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            service_name,
            actor,
            requested_tenant: None,
            requested_branch: None,
            call_timeout_ms,
        }
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<TenantId>) -> Self {
        self.requested_tenant = Some(tenant.into());
        self
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<BranchId>) -> Self {
        self.requested_branch = Some(branch.into());
        self
    }
}

/// Typed operation variants dispatched through the pipeline.
#[derive(Debug)]
#[non_exhaustive]
pub enum Operation {
    GetRecord {
        ctx: OperationContext,
        collection: String,
        key: String,
    },
    PutRecord {
        ctx: OperationContext,
        collection: String,
        key: String,
        value: serde_json::Value,
    },
    RemoveRecord {
        ctx: OperationContext,
        collection: String,
        key: String,
    },
    ScanRecords {
        ctx: OperationContext,
        collection: String,
    },
    /// Removes every record of a collection. Operators only.
    PurgeCollection {
        ctx: OperationContext,
        collection: String,
    },
}

impl Operation {
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Self::GetRecord { ctx, .. }
            | Self::PutRecord { ctx, .. }
            | Self::RemoveRecord { ctx, .. }
            | Self::ScanRecords { ctx, .. }
            | Self::PurgeCollection { ctx, .. } => ctx,
        }
    }

    /// Service an operation must be addressed to. Purges live on the
    /// admin surface, everything else on the record surface.
    #[must_use]
    pub fn owning_service(&self) -> &'static str {
        match self {
            Self::PurgeCollection { .. } => service_names::ADMIN,
            _ => service_names::RECORDS,
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::GetRecord { collection, .. }
            | Self::PutRecord { collection, .. }
            | Self::RemoveRecord { collection, .. }
            | Self::ScanRecords { collection, .. }
            | Self::PurgeCollection { collection, .. } => collection,
        }
    }
}

/// Successful response from an operation handler.
#[derive(Debug)]
pub enum OperationResponse {
    /// The payload replaced by a put, `None` when the put created the record.
    Stored { call_id: u64, previous: Option<serde_json::Value> },
    Record { call_id: u64, record: Option<Record> },
    Records { call_id: u64, records: Vec<(String, Record)> },
    Purged { call_id: u64, removed: usize },
}

/// Errors returned by operation handlers.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unknown service: {name}")]
    UnknownService { name: String },
    #[error("unknown collection: {name}")]
    UnknownCollection { name: String },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("operation belongs to service '{expected}', not '{addressed}'")]
    WrongService {
        expected: &'static str,
        addressed: &'static str,
    },
    #[error(transparent)]
    Isolation(#[from] IsolationError),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl OperationError {
    /// Maps a storage error, recovering isolation violations raised inside it.
    #[must_use]
    pub fn from_storage(err: anyhow::Error) -> Self {
        match err.downcast::<IsolationError>() {
            Ok(isolation) => Self::Isolation(isolation),
            Err(other) => Self::Internal(other),
        }
    }

    /// The isolation error behind this failure, if any.
    #[must_use]
    pub fn as_isolation(&self) -> Option<&IsolationError> {
        match self {
            Self::Isolation(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_requested_identity() {
        let ctx = OperationContext::new(7, service_names::RECORDS, Actor::unaffiliated("a", "X"), 100)
            .with_tenant("T1")
            .with_branch("main");
        assert_eq!(ctx.requested_tenant, Some(TenantId::new("T1")));
        assert_eq!(ctx.requested_branch, Some(BranchId::new("main")));
    }

    #[test]
    fn ctx_and_collection_are_reachable_from_every_variant() {
        let ctx = OperationContext::new(1, service_names::ADMIN, Actor::unaffiliated("a", "X"), 100);
        let op = Operation::PurgeCollection {
            ctx,
            collection: "orders".to_string(),
        };
        assert_eq!(op.ctx().call_id, 1);
        assert_eq!(op.collection(), "orders");
        assert_eq!(op.owning_service(), service_names::ADMIN);
    }

    #[test]
    fn storage_errors_recover_isolation_failures() {
        let err = anyhow::Error::new(IsolationError::ResourceTenantMismatch {
            owner: TenantId::new("T2"),
            requested: TenantId::new("T1"),
        });
        let mapped = OperationError::from_storage(err);
        assert!(mapped
            .as_isolation()
            .is_some_and(IsolationError::is_integrity_violation));

        let other = OperationError::from_storage(anyhow::anyhow!("disk on fire"));
        assert!(matches!(other, OperationError::Internal(_)));
    }
}
