//! Actor identity supplied by an authenticating proxy.
//!
//! Credential checks happen upstream. A trusted gateway forwards the result
//! as `x-actor-id`, `x-actor-roles` (comma separated) and `x-actor-tenant`;
//! this middleware turns them into an [`Actor`] request extension. Requests
//! without `x-actor-id` pass through unauthenticated.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tenancy_core::{Actor, TenantId};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLES_HEADER: &str = "x-actor-roles";
pub const ACTOR_TENANT_HEADER: &str = "x-actor-tenant";

fn header<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Builds the actor described by the trusted identity headers.
#[must_use]
pub fn actor_from_headers(req: &Request) -> Option<Actor> {
    let id = header(req, ACTOR_ID_HEADER)?;
    let roles = header(req, ACTOR_ROLES_HEADER)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some(Actor {
        id: id.to_string(),
        roles,
        tenant_id: header(req, ACTOR_TENANT_HEADER).map(TenantId::new),
    })
}

/// `axum::middleware::from_fn` adapter attaching the forwarded actor.
pub async fn trusted_identity(mut req: Request, next: Next) -> Response {
    if let Some(actor) = actor_from_headers(&req) {
        req.extensions_mut().insert(actor);
    }
    next.run(req).await
}
