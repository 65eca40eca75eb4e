//! Tenant-scoped record service.
//!
//! Business operations over named collections. Every operation asks the
//! [`AccessGate`] before touching a store; stores then scope the data to the
//! tenant bound for the unit of work.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tenancy_core::{Actor, IsolationError, TenantId};
use tower::Service;

use crate::context::ContextAccessor;
use crate::isolation::AccessGate;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::storage::{Record, RecordStore};

/// Record CRUD over a fixed set of collections.
pub struct RecordService {
    gate: Arc<AccessGate>,
    accessor: Arc<dyn ContextAccessor>,
    stores: HashMap<String, Arc<dyn RecordStore>>,
}

impl RecordService {
    #[must_use]
    pub fn new(gate: Arc<AccessGate>, accessor: Arc<dyn ContextAccessor>) -> Self {
        Self {
            gate,
            accessor,
            stores: HashMap::new(),
        }
    }

    /// Registers a store under its own name.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.stores.insert(store.name().to_string(), store);
        self
    }

    /// Names of the registered collections, sorted.
    #[must_use]
    pub fn collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Records per collection visible in the current scope, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns the first storage error.
    pub async fn counts(&self) -> Result<Vec<(String, usize)>, OperationError> {
        let mut counts = Vec::with_capacity(self.stores.len());
        for name in self.collections() {
            let count = self
                .store(name)?
                .count()
                .await
                .map_err(OperationError::from_storage)?;
            counts.push((name.to_string(), count));
        }
        Ok(counts)
    }

    fn store(&self, collection: &str) -> Result<&Arc<dyn RecordStore>, OperationError> {
        self.stores
            .get(collection)
            .ok_or_else(|| OperationError::UnknownCollection {
                name: collection.to_string(),
            })
    }

    /// Tenant the actor acts on in the current unit of work.
    ///
    /// `requested` defaults to the bound tenant. `None` is returned only for
    /// an operator working in root scope.
    fn authorize(
        &self,
        actor: &Actor,
        requested: Option<&TenantId>,
    ) -> Result<Option<TenantId>, IsolationError> {
        let requested = requested.cloned().or_else(|| self.accessor.tenant_id());
        match requested {
            Some(tenant) => {
                self.gate.validate_tenant_access(actor, &tenant)?;
                Ok(Some(tenant))
            }
            None if self.gate.has_privileged_role(actor) => {
                self.gate.validate_operator_access(actor)?;
                Ok(None)
            }
            None => self.accessor.require_tenant_id().map(Some),
        }
    }

    fn check_owner(
        &self,
        actor: &Actor,
        record: &Record,
        requested: Option<&TenantId>,
    ) -> Result<(), IsolationError> {
        match (record.tenant_id.as_ref(), requested) {
            (Some(owner), Some(requested)) => {
                self.gate.validate_resource_access(actor, owner, requested)
            }
            _ => Ok(()),
        }
    }

    /// Reads one record.
    ///
    /// # Errors
    ///
    /// Isolation failures from the gate, an unknown collection, or a storage error.
    pub async fn get(
        &self,
        actor: &Actor,
        requested: Option<&TenantId>,
        collection: &str,
        key: &str,
    ) -> Result<Option<Record>, OperationError> {
        let tenant = self.authorize(actor, requested)?;
        let store = self.store(collection)?;
        let record = store.get(key).await.map_err(OperationError::from_storage)?;
        if let Some(record) = &record {
            self.check_owner(actor, record, tenant.as_ref())?;
        }
        Ok(record)
    }

    /// Inserts or updates one record. Ownership is stamped by the store.
    ///
    /// # Errors
    ///
    /// Isolation failures from the gate or the store, an unknown collection,
    /// or a storage error.
    pub async fn put(
        &self,
        actor: &Actor,
        requested: Option<&TenantId>,
        collection: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, OperationError> {
        self.authorize(actor, requested)?;
        let store = self.store(collection)?;
        store
            .put(key, value)
            .await
            .map_err(OperationError::from_storage)
    }

    /// Removes one record.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn remove(
        &self,
        actor: &Actor,
        requested: Option<&TenantId>,
        collection: &str,
        key: &str,
    ) -> Result<Option<Record>, OperationError> {
        let tenant = self.authorize(actor, requested)?;
        let store = self.store(collection)?;
        let Some(existing) = store.get(key).await.map_err(OperationError::from_storage)? else {
            return Ok(None);
        };
        self.check_owner(actor, &existing, tenant.as_ref())?;
        store.remove(key).await.map_err(OperationError::from_storage)
    }

    /// Lists every record of the collection visible to the caller.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get). A row owned by another tenant in the
    /// result is reported as [`IsolationError::ResourceTenantMismatch`].
    pub async fn scan(
        &self,
        actor: &Actor,
        requested: Option<&TenantId>,
        collection: &str,
    ) -> Result<Vec<(String, Record)>, OperationError> {
        let tenant = self.authorize(actor, requested)?;
        let store = self.store(collection)?;
        let rows = store.scan().await.map_err(OperationError::from_storage)?;
        if let Some(tenant) = &tenant {
            let drifted = rows
                .iter()
                .find(|(_, record)| record.tenant_id.as_ref().is_some_and(|o| o != tenant));
            if let Some((_, record)) = drifted {
                self.check_owner(actor, record, Some(tenant))?;
            }
        }
        Ok(rows)
    }

    /// Removes every record of the collection in the current scope.
    ///
    /// # Errors
    ///
    /// [`IsolationError::InsufficientPrivilege`] unless the actor is an
    /// operator, an unknown collection, or a storage error.
    pub async fn purge(&self, actor: &Actor, collection: &str) -> Result<usize, OperationError> {
        self.gate.validate_operator_access(actor)?;
        let store = self.store(collection)?;
        let removed = store.purge().await.map_err(OperationError::from_storage)?;
        tracing::info!(
            actor = %actor.id,
            collection,
            removed,
            scope = %self.accessor.snapshot().resolved_tenant(),
            "collection purged"
        );
        Ok(removed)
    }

    async fn handle(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        let call_id = op.ctx().call_id;
        match op {
            Operation::GetRecord { ctx, collection, key } => {
                let record = self
                    .get(&ctx.actor, ctx.requested_tenant.as_ref(), &collection, &key)
                    .await?;
                Ok(OperationResponse::Record { call_id, record })
            }
            Operation::PutRecord {
                ctx,
                collection,
                key,
                value,
            } => {
                let previous = self
                    .put(&ctx.actor, ctx.requested_tenant.as_ref(), &collection, &key, value)
                    .await?;
                Ok(OperationResponse::Stored { call_id, previous })
            }
            Operation::RemoveRecord { ctx, collection, key } => {
                let record = self
                    .remove(&ctx.actor, ctx.requested_tenant.as_ref(), &collection, &key)
                    .await?;
                Ok(OperationResponse::Record { call_id, record })
            }
            Operation::ScanRecords { ctx, collection } => {
                let records = self
                    .scan(&ctx.actor, ctx.requested_tenant.as_ref(), &collection)
                    .await?;
                Ok(OperationResponse::Records { call_id, records })
            }
            Operation::PurgeCollection { ctx, collection } => {
                let removed = self.purge(&ctx.actor, &collection).await?;
                Ok(OperationResponse::Purged { call_id, removed })
            }
        }
    }
}

impl Service<Operation> for Arc<RecordService> {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let svc = Arc::clone(self);
        Box::pin(async move { svc.handle(op).await })
    }
}

#[cfg(test)]
mod tests {
    use tenancy_core::{ExecutionContext, TenantResolver};
    use tower::ServiceExt;

    use super::*;
    use crate::context::{self, TaskLocalAccessor};
    use crate::isolation::{ContextTenantResolver, TenantStamper};
    use crate::service::config::IsolationConfig;
    use crate::service::operation::{service_names, OperationContext};
    use crate::storage::{RecordStoreFactory, WriteInterceptor};

    fn service() -> Arc<RecordService> {
        let accessor: Arc<dyn ContextAccessor> = Arc::new(TaskLocalAccessor);
        let resolver: Arc<dyn TenantResolver> =
            Arc::new(ContextTenantResolver::new(Arc::clone(&accessor)));
        let stamper: Arc<dyn WriteInterceptor> = Arc::new(TenantStamper::new(
            Arc::clone(&resolver),
            Arc::clone(&accessor),
        ));
        let factory = RecordStoreFactory::new(resolver, vec![stamper]);
        let gate = Arc::new(AccessGate::new(
            Arc::clone(&accessor),
            &IsolationConfig::default(),
        ));
        Arc::new(RecordService::new(gate, accessor).with_store(factory.create("orders")))
    }

    fn client(tenant: &str) -> Actor {
        Actor::tenant_member(format!("client-{tenant}"), "CLIENT", tenant)
    }

    fn operator() -> Actor {
        Actor::unaffiliated("ops-1", "OPERATOR")
    }

    fn as_tenant(tenant: &str) -> ExecutionContext {
        ExecutionContext::for_tenant(tenant, None)
    }

    #[tokio::test]
    async fn client_reads_own_records_only() {
        let svc = service();
        let t1 = client("T1");
        context::run(as_tenant("T1"), async {
            svc.put(&t1, None, "orders", "o-1", serde_json::json!(1)).await
        })
        .await
        .unwrap();

        let own = context::run(as_tenant("T1"), svc.get(&t1, None, "orders", "o-1"))
            .await
            .unwrap();
        assert_eq!(own.unwrap().tenant_id, Some(TenantId::new("T1")));

        let t2 = client("T2");
        let foreign = context::run(as_tenant("T2"), svc.get(&t2, None, "orders", "o-1"))
            .await
            .unwrap();
        assert!(foreign.is_none());
    }

    #[tokio::test]
    async fn overwriting_foreign_key_is_an_integrity_failure() {
        let svc = service();
        context::run(
            as_tenant("T1"),
            svc.put(&client("T1"), None, "orders", "o-1", serde_json::json!(1)),
        )
        .await
        .unwrap();

        let err = context::run(
            as_tenant("T2"),
            svc.put(&client("T2"), None, "orders", "o-1", serde_json::json!(2)),
        )
        .await
        .unwrap_err();
        assert!(err
            .as_isolation()
            .is_some_and(IsolationError::is_integrity_violation));
    }

    #[tokio::test]
    async fn requesting_another_tenant_is_rejected() {
        let svc = service();
        let err = context::run(
            as_tenant("T1"),
            svc.scan(&client("T1"), Some(&TenantId::new("T2")), "orders"),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            OperationError::Isolation(IsolationError::TenantMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn client_without_context_is_rejected() {
        let svc = service();
        let err = svc.scan(&client("T1"), None, "orders").await.unwrap_err();
        assert!(matches!(
            err,
            OperationError::Isolation(IsolationError::MissingContext { .. })
        ));
    }

    #[tokio::test]
    async fn operator_in_system_scope_sees_every_tenant() {
        let svc = service();
        for tenant in ["T1", "T2"] {
            context::run(
                as_tenant(tenant),
                svc.put(&client(tenant), None, "orders", tenant, serde_json::json!(tenant)),
            )
            .await
            .unwrap();
        }
        let rows = context::run(
            ExecutionContext::system(),
            svc.scan(&operator(), None, "orders"),
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn purge_requires_operator() {
        let svc = service();
        context::run(
            as_tenant("T1"),
            svc.put(&client("T1"), None, "orders", "o-1", serde_json::json!(1)),
        )
        .await
        .unwrap();

        let err = context::run(as_tenant("T1"), svc.purge(&client("T1"), "orders"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::Isolation(IsolationError::InsufficientPrivilege { .. })
        ));

        let removed = context::run(as_tenant("T1"), svc.purge(&operator(), "orders"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn unknown_collection_is_reported() {
        let svc = service();
        let err = context::run(as_tenant("T1"), svc.scan(&client("T1"), None, "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::UnknownCollection { name } if name == "nope"));
    }

    #[tokio::test]
    async fn tower_service_dispatches_operations() {
        let svc = service();
        let ctx = OperationContext::new(9, service_names::RECORDS, client("T1"), 5000);
        let put = Operation::PutRecord {
            ctx: ctx.clone(),
            collection: "orders".to_string(),
            key: "o-1".to_string(),
            value: serde_json::json!({"total": 3}),
        };
        let resp = context::run(as_tenant("T1"), Arc::clone(&svc).oneshot(put))
            .await
            .unwrap();
        assert!(matches!(resp, OperationResponse::Stored { call_id: 9, previous: None }));

        let scan = Operation::ScanRecords {
            ctx,
            collection: "orders".to_string(),
        };
        let resp = context::run(as_tenant("T1"), svc.oneshot(scan)).await.unwrap();
        let OperationResponse::Records { records, .. } = resp else {
            panic!("expected records");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "o-1");
    }

    #[test]
    fn collections_are_listed_sorted() {
        assert_eq!(service().collections(), vec!["orders"]);
    }
}
