//! Dispatch of operations to the domain service named in their context.
//!
//! The router runs inside the unit of work opened by the tenant context
//! layer. It never reads the tenant itself; the services it reaches do,
//! through a [`ContextAccessor`](crate::context::ContextAccessor).

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::util::BoxCloneSyncService;
use tower::Service;

use super::operation::{Operation, OperationError, OperationResponse};

type OperationFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

type DomainService = BoxCloneSyncService<Operation, OperationResponse, OperationError>;

/// Routes each [`Operation`] to the service registered under its
/// `service_name`.
///
/// Operations addressed to a name with no registration fail with
/// [`OperationError::UnknownService`]. Operations addressed to a service
/// that does not own them (a purge sent to `records`, say) fail with
/// [`OperationError::WrongService`] before any handler runs, so an
/// operator-only action cannot be smuggled through the record surface.
///
/// Cloning is cheap relative to a request: each clone owns its own handle
/// to every registered service, so a clone can be handed to each caller.
#[derive(Clone, Default)]
pub struct OperationRouter {
    services: BTreeMap<&'static str, DomainService>,
}

impl OperationRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under `name`, replacing any earlier registration.
    pub fn register<S>(&mut self, name: &'static str, service: S)
    where
        S: Service<Operation, Response = OperationResponse, Error = OperationError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        self.services.insert(name, BoxCloneSyncService::new(service));
    }

    /// Registered service names in sorted order.
    pub fn service_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.services.keys().copied()
    }

    fn reject(err: OperationError) -> OperationFuture {
        Box::pin(async move { Err(err) })
    }
}

impl Service<Operation> for OperationRouter {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = OperationFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        for svc in self.services.values_mut() {
            if svc.poll_ready(cx)?.is_pending() {
                return Poll::Pending;
            }
        }
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let addressed = op.ctx().service_name;
        let expected = op.owning_service();
        if addressed != expected {
            tracing::debug!(addressed, expected, "operation sent to the wrong service");
            return Self::reject(OperationError::WrongService { expected, addressed });
        }
        match self.services.get_mut(addressed) {
            Some(svc) => svc.call(op),
            None => {
                tracing::debug!(service = addressed, "no service registered");
                Self::reject(OperationError::UnknownService {
                    name: addressed.to_string(),
                })
            }
        }
    }
}
