//! End-to-end isolation scenarios across the gate, the operation pipeline
//! and the HTTP front end.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use parking_lot::Mutex;
use tenancy_core::{Actor, ExecutionContext, IsolationError, TenantId};
use tenancy_server::context::{self, FixedAccessor};
use tenancy_server::network::identity::{ACTOR_ID_HEADER, ACTOR_ROLES_HEADER, ACTOR_TENANT_HEADER};
use tenancy_server::network::{NetworkConfig, NetworkModule};
use tenancy_server::service::{
    service_names, IsolationConfig, Operation, OperationError, OperationResponse, ServerConfig,
};
use tenancy_server::{AccessGate, TenancyModule};
use tower::ServiceExt;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

// ---------------------------------------------------------------------------
// Audit capture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct AuditEvent {
    level: Level,
    reason: String,
    integrity: Option<bool>,
}

#[derive(Default)]
struct AuditVisitor {
    reason: String,
    integrity: Option<bool>,
}

impl Visit for AuditVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "reason" {
            self.reason = value.to_string();
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "integrity" {
            self.integrity = Some(value);
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

#[derive(Clone, Default)]
struct AuditCapture(Arc<Mutex<Vec<AuditEvent>>>);

impl<S: Subscriber> Layer<S> for AuditCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != "tenancy::audit" {
            return;
        }
        let mut visitor = AuditVisitor::default();
        event.record(&mut visitor);
        self.0.lock().push(AuditEvent {
            level: *event.metadata().level(),
            reason: visitor.reason,
            integrity: visitor.integrity,
        });
    }
}

fn with_audit<R>(f: impl FnOnce() -> R) -> (R, Vec<AuditEvent>) {
    let capture = AuditCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    let events = capture.0.lock().clone();
    (result, events)
}

// ---------------------------------------------------------------------------
// Gate scenarios
// ---------------------------------------------------------------------------

fn gate(accessor: FixedAccessor) -> AccessGate {
    AccessGate::new(Arc::new(accessor), &IsolationConfig::default())
}

#[test]
fn client_with_matching_resource_is_allowed() {
    let gate = gate(FixedAccessor::for_tenant("T1"));
    let actor = Actor::tenant_member("c-1", "CLIENT", "T1");
    let (result, events) = with_audit(|| {
        gate.validate_resource_access(&actor, &TenantId::new("T1"), &TenantId::new("T1"))
    });
    assert!(result.is_ok());
    assert!(events
        .iter()
        .all(|e| e.level == Level::DEBUG && e.reason == "tenant_match"));
}

#[test]
fn client_with_foreign_resource_is_an_audited_integrity_failure() {
    let gate = gate(FixedAccessor::for_tenant("T1"));
    let actor = Actor::tenant_member("c-1", "CLIENT", "T1");
    let (result, events) = with_audit(|| {
        gate.validate_resource_access(&actor, &TenantId::new("T2"), &TenantId::new("T1"))
    });
    assert_eq!(
        result,
        Err(IsolationError::ResourceTenantMismatch {
            owner: TenantId::new("T2"),
            requested: TenantId::new("T1"),
        })
    );
    let denial = events.last().unwrap();
    assert_eq!(denial.level, Level::WARN);
    assert_eq!(denial.reason, "resource_tenant_mismatch");
    assert_eq!(denial.integrity, Some(true));
}

#[test]
fn operator_without_context_is_allowed_with_logged_bypass() {
    let gate = gate(FixedAccessor::default());
    let actor = Actor::unaffiliated("ops-1", "OPERATOR");
    let (result, events) =
        with_audit(|| gate.validate_tenant_access(&actor, &TenantId::new("T1")));
    assert!(result.is_ok());
    assert!(events
        .iter()
        .any(|e| e.level == Level::INFO && e.reason == "privileged_bypass"));
}

// ---------------------------------------------------------------------------
// Operation pipeline
// ---------------------------------------------------------------------------

async fn run_op(
    module: &TenancyModule,
    records: &Arc<tenancy_server::service::RecordService>,
    op: Operation,
) -> Result<OperationResponse, OperationError> {
    module.operation_pipeline(records).oneshot(op).await
}

#[tokio::test]
async fn pipeline_keeps_tenants_apart_and_lets_operators_purge() {
    let module = TenancyModule::new(ServerConfig::default());
    let records = module.record_service(["orders"]);

    for (call_id, tenant) in [(1, "T1"), (2, "T2")] {
        let put = Operation::PutRecord {
            ctx: module.operation_context(
                call_id,
                service_names::RECORDS,
                Actor::tenant_member("c", "CLIENT", tenant),
            ),
            collection: "orders".to_string(),
            key: format!("{tenant}-order"),
            value: serde_json::json!({ "tenant": tenant }),
        };
        run_op(&module, &records, put).await.unwrap();
    }

    let scan = Operation::ScanRecords {
        ctx: module.operation_context(3, service_names::RECORDS, Actor::tenant_member("c", "CLIENT", "T1")),
        collection: "orders".to_string(),
    };
    let OperationResponse::Records { records: rows, .. } =
        run_op(&module, &records, scan).await.unwrap()
    else {
        panic!("expected records");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1.tenant_id, Some(TenantId::new("T1")));

    let cross = Operation::GetRecord {
        ctx: module
            .operation_context(4, service_names::RECORDS, Actor::tenant_member("c", "CLIENT", "T1"))
            .with_tenant("T2"),
        collection: "orders".to_string(),
        key: "T2-order".to_string(),
    };
    let err = run_op(&module, &records, cross).await.unwrap_err();
    assert!(matches!(
        err,
        OperationError::Isolation(IsolationError::TenantMismatch { .. })
    ));

    let client_purge = Operation::PurgeCollection {
        ctx: module.operation_context(5, service_names::ADMIN, Actor::tenant_member("c", "CLIENT", "T1")),
        collection: "orders".to_string(),
    };
    let err = run_op(&module, &records, client_purge).await.unwrap_err();
    assert!(matches!(
        err,
        OperationError::Isolation(IsolationError::InsufficientPrivilege { .. })
    ));

    let operator_purge = Operation::PurgeCollection {
        ctx: module.operation_context(6, service_names::ADMIN, Actor::unaffiliated("ops", "OPERATOR")),
        collection: "orders".to_string(),
    };
    let resp = run_op(&module, &records, operator_purge).await.unwrap();
    assert!(matches!(resp, OperationResponse::Purged { removed: 2, .. }));
    assert!(context::current().is_none());
}

#[tokio::test]
async fn background_job_writes_are_stamped_with_the_job_tenant() {
    use async_trait::async_trait;
    use tenancy_server::service::{BackgroundRunnable, TenantJob};
    use tenancy_server::storage::RecordStore;

    struct ImportJob {
        store: Arc<dyn RecordStore>,
        done: tokio::sync::mpsc::Sender<()>,
    }

    #[async_trait]
    impl BackgroundRunnable for ImportJob {
        type Task = TenantJob<&'static str>;

        async fn run(&mut self, task: TenantJob<&'static str>) {
            self.store
                .put(task.payload, serde_json::json!(task.payload))
                .await
                .unwrap();
            self.done.send(()).await.unwrap();
        }
    }

    let module = TenancyModule::new(ServerConfig::default());
    let store = module.store_factory().create("imports");
    let (done_tx, mut done_rx) = tokio::sync::mpsc::channel(4);
    let mut worker = module.start_worker(ImportJob {
        store: Arc::clone(&store),
        done: done_tx,
    });

    worker
        .submit(TenantJob::for_tenant("T3", None, "row-1"))
        .await
        .unwrap();
    done_rx.recv().await.unwrap();
    worker.stop().await;

    let stored = context::run(ExecutionContext::system(), store.get("row-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.tenant_id, Some(TenantId::new("T3")));
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

fn http_app_with(config: ServerConfig) -> axum::Router {
    let module = TenancyModule::new(config);
    let records = module.record_service(["orders"]);
    let network = NetworkConfig {
        trust_identity_headers: true,
        ..NetworkConfig::default()
    };
    NetworkModule::new(network, &module, records).build_router()
}

fn http_app() -> axum::Router {
    http_app_with(ServerConfig::default())
}

fn request(method: &str, uri: &str, actor: Option<(&str, &str, Option<&str>)>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, roles, tenant)) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, id)
            .header(ACTOR_ROLES_HEADER, roles);
        if let Some(tenant) = tenant {
            builder = builder.header(ACTOR_TENANT_HEADER, tenant);
        }
    }
    let body = if method == "PUT" {
        builder = builder.header("content-type", "application/json");
        Body::from(r#"{"total":42}"#)
    } else {
        Body::empty()
    };
    builder.body(body).unwrap()
}

#[tokio::test]
async fn http_requests_are_scoped_to_the_caller_tenant() {
    let app = http_app();
    let t1 = Some(("c-1", "CLIENT", Some("T1")));
    let t2 = Some(("c-2", "CLIENT", Some("T2")));

    let resp = app
        .clone()
        .oneshot(request("PUT", "/records/orders/o-1", t1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(request("GET", "/records/orders/o-1", t1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 4096).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["tenant_id"], "T1");
    assert_eq!(json["value"]["total"], 42);

    let resp = app
        .clone()
        .oneshot(request("GET", "/records/orders/o-1", t2))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .clone()
        .oneshot(request("PUT", "/records/orders/o-1", t2))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn http_rejects_unauthenticated_and_foreign_tenant_requests() {
    let app = http_app();

    let resp = app
        .clone()
        .oneshot(request("GET", "/records/orders", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let mut foreign = request("GET", "/records/orders", Some(("c-1", "CLIENT", Some("T1"))));
    foreign
        .headers_mut()
        .insert("x-tenant-id", "T2".parse().unwrap());
    let resp = app.clone().oneshot(foreign).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .oneshot(request("GET", "/health/live", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn http_purge_is_operator_only() {
    let app = http_app();
    app.clone()
        .oneshot(request("PUT", "/records/orders/o-1", Some(("c-1", "CLIENT", Some("T1")))))
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/admin/collections/orders",
            Some(("c-1", "CLIENT", Some("T1"))),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .oneshot(request(
            "DELETE",
            "/admin/collections/orders",
            Some(("ops-1", "OPERATOR", None)),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["removed"], 1);
}

#[tokio::test]
async fn http_requests_are_shed_at_the_configured_concurrency_limit() {
    let app = http_app_with(ServerConfig {
        max_concurrent_operations: 0,
        ..ServerConfig::default()
    });

    let resp = app
        .clone()
        .oneshot(request("GET", "/records/orders", Some(("c-1", "CLIENT", Some("T1")))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let resp = app
        .oneshot(request("GET", "/health/live", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn http_operator_record_is_claimed_by_the_first_tenant_writer() {
    let app = http_app();
    let operator = Some(("ops-1", "OPERATOR", None));
    let t1 = Some(("c-1", "CLIENT", Some("T1")));
    let t2 = Some(("c-2", "CLIENT", Some("T2")));

    let resp = app
        .clone()
        .oneshot(request("PUT", "/records/orders/seed", operator))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(request("PUT", "/records/orders/seed", t1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(request("PUT", "/records/orders/seed", t1))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(request("PUT", "/records/orders/seed", t2))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
