//! Access control gate.
//!
//! The single place where tenant-match checks and the operator bypass are
//! decided. Every decision, allow or deny, is written to the audit log on
//! target `tenancy::audit` and counted in `tenancy_access_decisions_total`.

use std::sync::Arc;

use tenancy_core::{Actor, BranchId, ExecutionContext, IsolationError, TenantId};
use tracing::{debug, info, warn};

use crate::context::ContextAccessor;
use crate::service::config::IsolationConfig;

const AUDIT_TARGET: &str = "tenancy::audit";

/// Outcome reason recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reason {
    PrivilegedBypass,
    TenantMatch,
    Denied(&'static str),
}

impl Reason {
    fn as_str(self) -> &'static str {
        match self {
            Self::PrivilegedBypass => "privileged_bypass",
            Self::TenantMatch => "tenant_match",
            Self::Denied(kind) => kind,
        }
    }
}

/// Authorization boundary for tenant-sensitive operations.
pub struct AccessGate {
    accessor: Arc<dyn ContextAccessor>,
    operator_roles: Vec<String>,
}

impl AccessGate {
    /// Creates a gate recognising the operator roles listed in `config`.
    #[must_use]
    pub fn new(accessor: Arc<dyn ContextAccessor>, config: &IsolationConfig) -> Self {
        Self {
            accessor,
            operator_roles: config.operator_roles.clone(),
        }
    }

    /// Whether the actor holds any configured operator role.
    #[must_use]
    pub fn has_privileged_role(&self, actor: &Actor) -> bool {
        self.operator_roles.iter().any(|role| actor.has_role(role))
    }

    /// Checks that the actor may act on `requested`.
    ///
    /// # Errors
    ///
    /// - [`IsolationError::MissingContext`] if a non-operator runs without a bound tenant.
    /// - [`IsolationError::TenantMismatch`] if the bound tenant differs from `requested`.
    pub fn validate_tenant_access(
        &self,
        actor: &Actor,
        requested: &TenantId,
    ) -> Result<(), IsolationError> {
        if self.has_privileged_role(actor) {
            audit(actor, "tenant_access", Some(requested), Ok(Reason::PrivilegedBypass));
            return Ok(());
        }
        let result = self.check_bound_tenant(requested);
        audit(
            actor,
            "tenant_access",
            Some(requested),
            result.as_ref().map(|()| Reason::TenantMatch),
        );
        result
    }

    /// Checks that the actor may act on `requested` and that the resource
    /// stored under `owner` really belongs to `requested`.
    ///
    /// # Errors
    ///
    /// Everything [`validate_tenant_access`](Self::validate_tenant_access)
    /// returns, plus [`IsolationError::ResourceTenantMismatch`] when `owner`
    /// differs from `requested`.
    pub fn validate_resource_access(
        &self,
        actor: &Actor,
        owner: &TenantId,
        requested: &TenantId,
    ) -> Result<(), IsolationError> {
        if self.has_privileged_role(actor) {
            audit(actor, "resource_access", Some(requested), Ok(Reason::PrivilegedBypass));
            return Ok(());
        }
        let result = self.check_bound_tenant(requested).and_then(|()| {
            if owner == requested {
                Ok(())
            } else {
                Err(IsolationError::ResourceTenantMismatch {
                    owner: owner.clone(),
                    requested: requested.clone(),
                })
            }
        });
        audit(
            actor,
            "resource_access",
            Some(requested),
            result.as_ref().map(|()| Reason::TenantMatch),
        );
        result
    }

    /// Checks that the actor holds an operator role.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::InsufficientPrivilege`] otherwise.
    pub fn validate_operator_access(&self, actor: &Actor) -> Result<(), IsolationError> {
        let result = if self.has_privileged_role(actor) {
            Ok(Reason::PrivilegedBypass)
        } else {
            Err(IsolationError::InsufficientPrivilege {
                actor: actor.id.clone(),
            })
        };
        audit(actor, "operator_access", None, result.as_ref().copied());
        result.map(|_| ())
    }

    /// Execution context a dispatcher should bind for `actor`.
    ///
    /// Operators get the requested tenant when they name one and a system
    /// context otherwise. Everyone else is bound to their own affiliation,
    /// and naming any other tenant is rejected before the unit of work runs.
    ///
    /// # Errors
    ///
    /// - [`IsolationError::MissingContext`] if a non-operator has no tenant affiliation.
    /// - [`IsolationError::TenantMismatch`] if a non-operator requests a foreign tenant.
    pub fn context_for(
        &self,
        actor: &Actor,
        requested_tenant: Option<&TenantId>,
        requested_branch: Option<BranchId>,
    ) -> Result<ExecutionContext, IsolationError> {
        let requested_tenant = requested_tenant.filter(|t| !t.is_empty());

        if self.has_privileged_role(actor) {
            audit(actor, "dispatch", requested_tenant, Ok(Reason::PrivilegedBypass));
            return Ok(match requested_tenant {
                Some(tenant) => ExecutionContext::for_tenant(tenant.clone(), requested_branch),
                None => ExecutionContext::system(),
            });
        }

        let result = match actor.tenant_id.as_ref().filter(|t| !t.is_empty()) {
            None => Err(IsolationError::missing_tenant()),
            Some(own) => match requested_tenant {
                Some(requested) if requested != own => Err(IsolationError::TenantMismatch {
                    bound: own.clone(),
                    requested: requested.clone(),
                }),
                _ => Ok(ExecutionContext::for_tenant(own.clone(), requested_branch)),
            },
        };
        audit(
            actor,
            "dispatch",
            requested_tenant,
            result.as_ref().map(|_| Reason::TenantMatch),
        );
        result
    }

    fn check_bound_tenant(&self, requested: &TenantId) -> Result<(), IsolationError> {
        let bound = self.accessor.require_tenant_id()?;
        if &bound == requested {
            Ok(())
        } else {
            Err(IsolationError::TenantMismatch {
                bound,
                requested: requested.clone(),
            })
        }
    }
}

fn audit(
    actor: &Actor,
    check: &'static str,
    requested: Option<&TenantId>,
    outcome: Result<Reason, &IsolationError>,
) {
    let requested = requested.map_or("-", TenantId::as_str);
    let roles = actor.roles.join(",");
    match outcome {
        Ok(Reason::PrivilegedBypass) => {
            info!(
                target: AUDIT_TARGET,
                actor = %actor.id,
                roles = %roles,
                check,
                requested_tenant = requested,
                decision = "allow",
                reason = Reason::PrivilegedBypass.as_str(),
                "privileged bypass"
            );
            count(check, "allow", Reason::PrivilegedBypass);
        }
        Ok(reason) => {
            debug!(
                target: AUDIT_TARGET,
                actor = %actor.id,
                roles = %roles,
                check,
                requested_tenant = requested,
                decision = "allow",
                reason = reason.as_str(),
                "access granted"
            );
            count(check, "allow", reason);
        }
        Err(err) => {
            let reason = Reason::Denied(err.kind());
            warn!(
                target: AUDIT_TARGET,
                actor = %actor.id,
                roles = %roles,
                check,
                requested_tenant = requested,
                decision = "deny",
                reason = reason.as_str(),
                integrity = err.is_integrity_violation(),
                error = %err,
                "access denied"
            );
            count(check, "deny", reason);
        }
    }
}

fn count(check: &'static str, decision: &'static str, reason: Reason) {
    metrics::counter!(
        "tenancy_access_decisions_total",
        "check" => check,
        "decision" => decision,
        "reason" => reason.as_str(),
    )
    .increment(1);
}
