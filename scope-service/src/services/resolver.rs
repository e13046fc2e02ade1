//! Scope resolver.
//!
//! Turns a user id and role into an [`AccessScope`] by loading the role's
//! affiliation rows into its anchor levels and following at most one cascade
//! edge. Lookups per resolution: role code, affiliations, and one batched
//! expansion when the role cascades and the source set is non-empty.

use std::sync::Arc;

use super::directory::Directory;
use super::error::{AccessError, ForbiddenReason};
use crate::models::{
    AccessScope, AffiliationRow, Anchor, OrgLevel, Role, ScopeBuilder, ScopeRule,
};

#[derive(Clone)]
pub struct ScopeResolver {
    directory: Arc<dyn Directory>,
}

impl ScopeResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Load and validate the role stored for `user_id`.
    pub async fn stored_role(&self, user_id: i64) -> Result<Role, AccessError> {
        let code = self
            .directory
            .find_user_role_code(user_id)
            .await?
            .ok_or(AccessError::UserNotFound(user_id))?;

        Role::from_code(code).ok_or_else(|| {
            tracing::error!(
                user_id = user_id,
                role_code = code,
                "Stored role code outside the known ladder"
            );
            AccessError::UnknownRole(code)
        })
    }

    /// Resolve with an explicit role selector, which must match the stored role.
    pub async fn resolve(&self, user_id: i64, role: Role) -> Result<AccessScope, AccessError> {
        let stored = self.stored_role(user_id).await?;
        if stored != role {
            tracing::info!(
                user_id = user_id,
                requested = %role,
                stored = %stored,
                "Role selector does not match stored role"
            );
            return Err(AccessError::Forbidden(ForbiddenReason::RoleNotEntitled));
        }
        self.build_scope(user_id, role).await
    }

    /// Resolve with whatever role the directory holds for the user.
    pub async fn resolve_stored(&self, user_id: i64) -> Result<AccessScope, AccessError> {
        let role = self.stored_role(user_id).await?;
        self.build_scope(user_id, role).await
    }

    /// Build the scope for a role already validated against the directory.
    pub(crate) async fn build_scope(
        &self,
        user_id: i64,
        role: Role,
    ) -> Result<AccessScope, AccessError> {
        let (anchor, cascade) = match role.scope_rule() {
            ScopeRule::Unrestricted => {
                tracing::debug!(user_id = user_id, role = %role, "Resolved unrestricted scope");
                return Ok(AccessScope::unrestricted(user_id, role));
            }
            ScopeRule::Anchored { anchor, cascade } => (anchor, cascade),
        };

        let rows = self.directory.affiliations(user_id, role).await?;
        let mut builder = ScopeBuilder::new(user_id, role);
        load_anchor(&mut builder, anchor, &rows);

        if role == Role::Student && builder.ids(OrgLevel::Student).len() > 1 {
            tracing::warn!(
                user_id = user_id,
                student_anchors = builder.ids(OrgLevel::Student).len(),
                "Student user bound to more than one student record"
            );
        }

        if let Some(edge) = cascade {
            let sources = builder.ids(edge.from());
            if !sources.is_empty() {
                let reached = self.directory.expand(edge, sources).await?;
                builder.extend(edge.to(), reached);
            }
        }

        let scope = builder.build();
        if scope.is_empty() {
            tracing::debug!(user_id = user_id, role = %role, "Resolved empty scope");
        } else {
            tracing::debug!(
                user_id = user_id,
                role = %role,
                campuses = scope.campuses().len(),
                units = scope.units().len(),
                courses = scope.courses().len(),
                disciplines = scope.disciplines().len(),
                students = scope.students().len(),
                "Resolved scope"
            );
        }
        Ok(scope)
    }
}

fn load_anchor(builder: &mut ScopeBuilder, anchor: Anchor, rows: &[AffiliationRow]) {
    for row in rows {
        builder.insert(anchor.primary, row.primary_id);
        if let (Some(level), Some(id)) = (anchor.secondary, row.secondary_id) {
            builder.insert(level, id);
        }
    }
}
