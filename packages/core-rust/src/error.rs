//! Isolation error taxonomy.
//!
//! These errors are local and synchronous. None of them is transient, so
//! callers propagate them immediately instead of retrying. Mapping to a wire
//! format belongs to an outer translation layer; [`IsolationError::status_code`]
//! only suggests the HTTP status such a layer would use.

use crate::types::TenantId;

/// Which part of the execution context a failed read asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    Tenant,
    Branch,
}

impl std::fmt::Display for ContextField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tenant => f.write_str("tenant"),
            Self::Branch => f.write_str("branch"),
        }
    }
}

/// Failures raised by context access and the access control gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IsolationError {
    /// A required identity was read while no context was bound.
    #[error("no {field} bound to the current unit of work")]
    MissingContext { field: ContextField },

    /// The actor's bound tenant differs from the tenant it tried to act on.
    #[error("tenant mismatch: bound to '{bound}', requested '{requested}'")]
    TenantMismatch { bound: TenantId, requested: TenantId },

    /// A resource's stored tenant differs from the requested tenant.
    #[error("resource belongs to tenant '{owner}', requested '{requested}'")]
    ResourceTenantMismatch { owner: TenantId, requested: TenantId },

    /// A non-operator actor attempted an operator-only action.
    #[error("actor '{actor}' lacks operator privilege")]
    InsufficientPrivilege { actor: String },

    /// Context was written outside of any unit of work.
    #[error("no unit of work is active on this task")]
    NoUnitOfWork,
}

impl IsolationError {
    /// Shorthand for a missing tenant.
    #[must_use]
    pub fn missing_tenant() -> Self {
        Self::MissingContext {
            field: ContextField::Tenant,
        }
    }

    /// Shorthand for a missing branch.
    #[must_use]
    pub fn missing_branch() -> Self {
        Self::MissingContext {
            field: ContextField::Branch,
        }
    }

    /// Whether this is an authorization decision (as opposed to a wiring bug).
    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            Self::TenantMismatch { .. }
                | Self::ResourceTenantMismatch { .. }
                | Self::InsufficientPrivilege { .. }
        )
    }

    /// A stored tenant disagreeing with the request points at a stamping bug
    /// or cross-tenant reference corruption and deserves investigation.
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::ResourceTenantMismatch { .. })
    }

    /// Stable machine-readable kind, used in audit logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingContext { .. } => "missing_context",
            Self::TenantMismatch { .. } => "tenant_mismatch",
            Self::ResourceTenantMismatch { .. } => "resource_tenant_mismatch",
            Self::InsufficientPrivilege { .. } => "insufficient_privilege",
            Self::NoUnitOfWork => "no_unit_of_work",
        }
    }

    /// HTTP status an error translation layer would answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingContext { .. } => 401,
            Self::TenantMismatch { .. }
            | Self::ResourceTenantMismatch { .. }
            | Self::InsufficientPrivilege { .. } => 403,
            Self::NoUnitOfWork => 500,
        }
    }
}
