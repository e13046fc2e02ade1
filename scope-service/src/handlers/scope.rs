//! Scope introspection: what the caller may act on, and what it may attempt.

use axum::extract::{Json, State};
use serde::Serialize;

use crate::middleware::Caller;
use crate::models::{AccessScope, Action, Resource};
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Serialize)]
pub struct Entitlement {
    pub resource: Resource,
    pub action: Action,
}

#[derive(Debug, Serialize)]
pub struct ScopeResponse {
    pub scope: AccessScope,
    pub entitlements: Vec<Entitlement>,
}

/// Resolved scope for the caller. No coarse gate.
///
/// GET /scope
pub async fn get_scope(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ScopeResponse>, AppError> {
    let resolver = state.enforcer.resolver();
    let scope = match caller.role {
        Some(role) => resolver.resolve(caller.user_id, role).await?,
        None => resolver.resolve_stored(caller.user_id).await?,
    };

    let entitlements = state
        .permissions
        .entitlements(scope.role())
        .iter()
        .map(|(resource, action)| Entitlement {
            resource: *resource,
            action: *action,
        })
        .collect();

    Ok(Json(ScopeResponse {
        scope,
        entitlements,
    }))
}
