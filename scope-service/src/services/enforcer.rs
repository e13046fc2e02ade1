//! Access enforcer - the coarse role gate plus fine-grained target checks
//! against a resolved [`AccessScope`].

use std::collections::BTreeSet;
use std::sync::Arc;

use super::directory::Directory;
use super::error::{AccessError, ForbiddenReason};
use super::filter::ScopeFilter;
use super::permissions::PermissionTable;
use super::resolver::ScopeResolver;
use crate::models::{AccessScope, Action, Resource, Role, TargetKind, TargetRule};

#[derive(Clone)]
pub struct AccessEnforcer {
    table: PermissionTable,
    directory: Arc<dyn Directory>,
    resolver: ScopeResolver,
}

impl AccessEnforcer {
    pub fn new(table: PermissionTable, directory: Arc<dyn Directory>) -> Self {
        Self {
            table,
            resolver: ScopeResolver::new(directory.clone()),
            directory,
        }
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    pub fn is_allowed(&self, role: Role, resource: Resource, action: Action) -> bool {
        self.table.is_allowed(role, resource, action)
    }

    /// Role-only gate. Never touches the directory.
    pub fn assert_coarse(
        &self,
        scope: &AccessScope,
        resource: Resource,
        action: Action,
    ) -> Result<(), AccessError> {
        let outcome = self.gate(scope.role(), resource, action);
        record_decision(scope.role(), outcome.as_ref().err());
        outcome
    }

    /// Coarse gate first, then scope resolution.
    ///
    /// With a role selector the gate runs before any directory lookup. Without
    /// one the stored role is loaded first, then gated, then resolved.
    pub async fn authorize(
        &self,
        user_id: i64,
        selector: Option<Role>,
        resource: Resource,
        action: Action,
    ) -> Result<AccessScope, AccessError> {
        match selector {
            Some(role) => {
                self.gate(role, resource, action)
                    .inspect_err(|err| record_decision(role, Some(err)))?;
                self.resolver
                    .resolve(user_id, role)
                    .await
                    .inspect_err(|err| {
                        if err.forbidden_reason().is_some() {
                            record_decision(role, Some(err));
                        }
                    })
            }
            None => {
                let role = self.resolver.stored_role(user_id).await?;
                self.gate(role, resource, action)
                    .inspect_err(|err| record_decision(role, Some(err)))?;
                self.resolver.build_scope(user_id, role).await
            }
        }
    }

    /// Fine-grained check of one target against `scope`.
    pub async fn assert_target_access(
        &self,
        scope: &AccessScope,
        kind: TargetKind,
        target_id: i64,
    ) -> Result<(), AccessError> {
        let outcome = self.check_target(scope, kind, target_id).await;
        if let Err(err) = &outcome {
            if let Some(reason) = err.forbidden_reason() {
                tracing::info!(
                    user_id = scope.user_id(),
                    role = %scope.role(),
                    target_kind = %kind,
                    target_id = target_id,
                    reason = %reason,
                    "Target access denied"
                );
            }
        }
        record_decision(scope.role(), outcome.as_ref().err());
        outcome
    }

    /// Constraint for collection reads of `kind` under `scope`.
    pub fn scope_filter(&self, scope: &AccessScope, kind: TargetKind) -> ScopeFilter {
        let filter = ScopeFilter::for_scope(scope, kind);
        if filter.is_nothing() {
            tracing::debug!(
                user_id = scope.user_id(),
                role = %scope.role(),
                target_kind = %kind,
                "Empty scope filters collection to nothing"
            );
        }
        filter
    }

    fn gate(&self, role: Role, resource: Resource, action: Action) -> Result<(), AccessError> {
        if self.table.is_allowed(role, resource, action) {
            return Ok(());
        }
        tracing::info!(
            role = %role,
            resource = %resource,
            action = %action,
            "Role not entitled"
        );
        Err(AccessError::Forbidden(ForbiddenReason::RoleNotEntitled))
    }

    async fn check_target(
        &self,
        scope: &AccessScope,
        kind: TargetKind,
        target_id: i64,
    ) -> Result<(), AccessError> {
        if scope.is_unrestricted() {
            return Ok(());
        }

        let rule = scope.role().target_rule();
        match rule {
            TargetRule::Unrestricted => return Ok(()),
            TargetRule::SelfOnly => return self.check_self(scope, kind, target_id).await,
            _ => {}
        }

        if lacks_required_scope(scope, rule, kind) {
            return Err(AccessError::Forbidden(ForbiddenReason::ScopeNotSatisfied));
        }

        let placement = self
            .directory
            .placement(kind, target_id)
            .await?
            .ok_or(AccessError::NotFound { kind, id: target_id })?;

        let allowed = match rule {
            TargetRule::CampusThenUnit => {
                if !scope.campuses().is_empty() {
                    scope.campuses().contains(&placement.campus_id)
                } else {
                    scope.units().contains(&placement.unit_id)
                }
            }
            TargetRule::Course | TargetRule::Discipline if kind == TargetKind::Unit => {
                scope.units().contains(&placement.unit_id)
            }
            TargetRule::Course => in_courses(scope, placement.course_id),
            TargetRule::Discipline => match kind {
                TargetKind::Student => {
                    self.directory
                        .is_enrolled_in_any(target_id, scope.disciplines())
                        .await?
                }
                TargetKind::Course => in_courses(scope, placement.course_id),
                TargetKind::Discipline => scope.disciplines().contains(&target_id),
                TargetKind::Unit => false,
            },
            TargetRule::Unrestricted | TargetRule::SelfOnly => true,
        };

        if allowed {
            Ok(())
        } else {
            Err(AccessError::Forbidden(ForbiddenReason::ScopeNotSatisfied))
        }
    }

    /// Student callers: identity before existence, so asking for foreign ids
    /// reveals nothing.
    async fn check_self(
        &self,
        scope: &AccessScope,
        kind: TargetKind,
        target_id: i64,
    ) -> Result<(), AccessError> {
        let own = scope.students();
        let denied = Err(AccessError::Forbidden(ForbiddenReason::SelfOnly));

        match kind {
            TargetKind::Student => {
                if !own.contains(&target_id) {
                    return denied;
                }
                self.directory
                    .placement(kind, target_id)
                    .await?
                    .ok_or(AccessError::NotFound { kind, id: target_id })?;
                Ok(())
            }
            TargetKind::Unit | TargetKind::Course => {
                for student_id in own {
                    let placement = self
                        .directory
                        .placement(TargetKind::Student, *student_id)
                        .await?;
                    let matches = placement.is_some_and(|p| match kind {
                        TargetKind::Unit => p.unit_id == target_id,
                        _ => p.course_id == Some(target_id),
                    });
                    if matches {
                        return Ok(());
                    }
                }
                denied
            }
            TargetKind::Discipline => {
                let wanted = BTreeSet::from([target_id]);
                for student_id in own {
                    if self
                        .directory
                        .is_enrolled_in_any(*student_id, &wanted)
                        .await?
                    {
                        return Ok(());
                    }
                }
                denied
            }
        }
    }
}

/// Cheap deny: the set a rule consults for `kind` is empty.
fn lacks_required_scope(scope: &AccessScope, rule: TargetRule, kind: TargetKind) -> bool {
    match rule {
        TargetRule::Unrestricted => false,
        TargetRule::SelfOnly => scope.students().is_empty(),
        TargetRule::CampusThenUnit => scope.campuses().is_empty() && scope.units().is_empty(),
        TargetRule::Course => match kind {
            TargetKind::Unit => scope.units().is_empty(),
            _ => scope.courses().is_empty(),
        },
        TargetRule::Discipline => match kind {
            TargetKind::Unit => scope.units().is_empty(),
            TargetKind::Course => scope.courses().is_empty(),
            TargetKind::Student | TargetKind::Discipline => scope.disciplines().is_empty(),
        },
    }
}

fn in_courses(scope: &AccessScope, course_id: Option<i64>) -> bool {
    course_id.is_some_and(|id| scope.courses().contains(&id))
}

fn decision_label(error: Option<&AccessError>) -> &'static str {
    match error {
        None => "allowed",
        Some(AccessError::Forbidden(_)) => "forbidden",
        Some(AccessError::NotFound { .. }) => "not_found",
        Some(_) => "error",
    }
}

fn record_decision(role: Role, error: Option<&AccessError>) {
    metrics::counter!(
        "access_decisions_total",
        "role" => role.as_str(),
        "outcome" => decision_label(error)
    )
    .increment(1);
}
