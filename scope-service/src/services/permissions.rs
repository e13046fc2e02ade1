//! Permission table - the coarse, role-only gate checked before any scope work.

use crate::models::{Action, Resource, Role};

type Entitlement = (Resource, Action);

const STAFF: &[Entitlement] = &[
    (Resource::StudentRecord, Action::Read),
    (Resource::StudentList, Action::List),
    (Resource::Reports, Action::Read),
];

const PROFESSOR: &[Entitlement] = &[
    (Resource::StudentRecord, Action::Read),
    (Resource::StudentList, Action::List),
];

const STUDENT: &[Entitlement] = &[(Resource::StudentRecord, Action::Read)];

const ADMIN: &[Entitlement] = &[
    (Resource::StudentRecord, Action::Read),
    (Resource::StudentList, Action::List),
    (Resource::Reports, Action::Read),
    (Resource::UserManagement, Action::Manage),
];

/// Static role → entitlement mapping. Immutable, so concurrent reads need no
/// synchronisation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionTable;

impl PermissionTable {
    pub fn new() -> Self {
        Self
    }

    /// ADMIN is a wildcard; every other role is checked by exact membership.
    pub fn is_allowed(&self, role: Role, resource: Resource, action: Action) -> bool {
        if role == Role::Admin {
            return true;
        }
        self.entitlements(role).contains(&(resource, action))
    }

    /// The pairs a role is entitled to attempt. For ADMIN this lists the known
    /// pairs, though [`Self::is_allowed`] never consults it.
    pub fn entitlements(&self, role: Role) -> &'static [Entitlement] {
        match role {
            Role::Admin => ADMIN,
            Role::Rectory | Role::ProRectory | Role::Department | Role::Coordination => STAFF,
            Role::Professor => PROFESSOR,
            Role::Student => STUDENT,
        }
    }
}
