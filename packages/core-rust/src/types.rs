use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a tenant.
///
/// An empty identifier carries no tenant restriction and is treated the same
/// as an absent one (see [`ResolvedTenant::from_identity`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Wraps a raw tenant identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty (or whitespace only).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque identifier of a branch, a sub-unit within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);

impl BranchId {
    /// Wraps a raw branch identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BranchId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BranchId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Tenant scope handed to the data-access layer for a single query or write.
///
/// `Root` means "do not filter by tenant" and is reserved for privileged and
/// system operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolvedTenant {
    /// Rows are restricted to this tenant.
    Tenant(TenantId),
    /// No tenant restriction.
    Root,
}

impl ResolvedTenant {
    /// Marker written in logs and exported wherever the root scope needs a name.
    pub const ROOT_SENTINEL: &'static str = "root";

    /// Maps an optional identity to a scope. Absent and empty identities
    /// both resolve to [`ResolvedTenant::Root`].
    #[must_use]
    pub fn from_identity(identity: Option<&TenantId>) -> Self {
        match identity {
            Some(id) if !id.is_empty() => Self::Tenant(id.clone()),
            _ => Self::Root,
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    /// The tenant to filter by, or `None` for root scope.
    #[must_use]
    pub fn tenant(&self) -> Option<&TenantId> {
        match self {
            Self::Tenant(id) => Some(id),
            Self::Root => None,
        }
    }
}

impl fmt::Display for ResolvedTenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tenant(id) => write!(f, "{id}"),
            Self::Root => f.write_str(Self::ROOT_SENTINEL),
        }
    }
}

/// Authenticated caller, produced by the authentication collaborator.
///
/// Ordinary actors carry the tenant they are affiliated with. Operator actors
/// are identified by role markers and may have no affiliation at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique identifier for the authenticated entity.
    pub id: String,
    /// Roles assigned to this actor for authorization checks.
    pub roles: Vec<String>,
    /// Tenant the actor belongs to. `None` for operators acting cross-tenant.
    pub tenant_id: Option<TenantId>,
}

impl Actor {
    /// Builds an actor affiliated with `tenant_id`.
    #[must_use]
    pub fn tenant_member(
        id: impl Into<String>,
        role: impl Into<String>,
        tenant_id: impl Into<TenantId>,
    ) -> Self {
        Self {
            id: id.into(),
            roles: vec![role.into()],
            tenant_id: Some(tenant_id.into()),
        }
    }

    /// Builds an actor without tenant affiliation.
    #[must_use]
    pub fn unaffiliated(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: vec![role.into()],
            tenant_id: None,
        }
    }

    /// Whether any of the actor's roles equals `role` (ASCII case-insensitive).
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}
