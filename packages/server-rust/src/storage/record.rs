//! Record types for the storage layer.
//!
//! Defines [`Record`], the tenant-scoped unit stored in a
//! [`StorageEngine`](super::StorageEngine), and its [`RecordMetadata`].

use serde::{Deserialize, Serialize};
use tenancy_core::{BranchId, TenantId, TenantScoped};

/// Metadata tracked for every record in the [`RecordStore`](super::RecordStore).
///
/// Server-internal, never serialized to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMetadata {
    /// Record version, incremented on every update.
    pub version: u32,
    /// Wall-clock time (millis since epoch) when this record was created.
    pub creation_time: i64,
    /// Wall-clock time of the last write.
    pub last_update_time: i64,
}

impl RecordMetadata {
    /// Creates metadata for a record written at `now`. Version starts at 1.
    #[must_use]
    pub fn new(now: i64) -> Self {
        Self {
            version: 1,
            creation_time: now,
            last_update_time: now,
        }
    }

    /// Records a write: increments `version` and updates `last_update_time`.
    pub fn on_update(&mut self, now: i64) {
        self.version = self.version.saturating_add(1);
        self.last_update_time = now;
    }
}

/// A stored business record: payload plus owning tenant and branch.
///
/// `tenant_id` is `None` until the write path stamps it. Once set, the write
/// path carries it over unchanged on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Owning tenant.
    pub tenant_id: Option<TenantId>,
    /// Owning branch within the tenant.
    pub branch_id: Option<BranchId>,
    /// Business payload.
    pub value: serde_json::Value,
    /// Server-internal metadata.
    #[serde(skip)]
    pub metadata: RecordMetadata,
}

impl Record {
    /// Creates an unstamped record written at `now`.
    #[must_use]
    pub fn new(value: serde_json::Value, now: i64) -> Self {
        Self {
            tenant_id: None,
            branch_id: None,
            value,
            metadata: RecordMetadata::new(now),
        }
    }

    /// Successor of `self` carrying `value`, with ownership preserved.
    #[must_use]
    pub fn updated(&self, value: serde_json::Value, now: i64) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.on_update(now);
        Self {
            tenant_id: self.tenant_id.clone(),
            branch_id: self.branch_id.clone(),
            value,
            metadata,
        }
    }

    /// Whether the record is visible to a unit of work scoped to `tenant`.
    /// `None` is root scope, which sees everything.
    #[must_use]
    pub fn is_visible_to(&self, tenant: Option<&TenantId>) -> bool {
        match tenant {
            None => true,
            Some(scope) => self.tenant_id.as_ref() == Some(scope),
        }
    }
}

impl TenantScoped for Record {
    fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    fn set_tenant_id(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    fn branch_id(&self) -> Option<&BranchId> {
        self.branch_id.as_ref()
    }

    fn set_branch_id(&mut self, branch_id: BranchId) {
        self.branch_id = Some(branch_id);
    }

    fn tracks_branch(&self) -> bool {
        true
    }
}
