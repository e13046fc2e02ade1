//! Access scope - the resolved, per-request set of entity ids a caller may act on.

use serde::Serialize;
use std::collections::BTreeSet;

use super::org::OrgLevel;
use super::role::Role;

/// Read-only once built. Constructed fresh for every request and never cached
/// across requests, since affiliations can change between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessScope {
    role: Role,
    user_id: i64,
    unrestricted: bool,
    campuses: BTreeSet<i64>,
    pro_rectories: BTreeSet<i64>,
    units: BTreeSet<i64>,
    departments: BTreeSet<i64>,
    courses: BTreeSet<i64>,
    disciplines: BTreeSet<i64>,
    students: BTreeSet<i64>,
}

impl AccessScope {
    /// Scope that passes every fine-grained check.
    pub fn unrestricted(user_id: i64, role: Role) -> Self {
        Self {
            unrestricted: true,
            ..Self::empty(user_id, role)
        }
    }

    /// Scope that grants nothing beyond target-less coarse actions.
    pub fn empty(user_id: i64, role: Role) -> Self {
        Self {
            role,
            user_id,
            unrestricted: false,
            campuses: BTreeSet::new(),
            pro_rectories: BTreeSet::new(),
            units: BTreeSet::new(),
            departments: BTreeSet::new(),
            courses: BTreeSet::new(),
            disciplines: BTreeSet::new(),
            students: BTreeSet::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    /// True when no entity set holds anything and the scope is not unrestricted.
    pub fn is_empty(&self) -> bool {
        !self.unrestricted && OrgLevel::ALL.iter().all(|level| self.ids(*level).is_empty())
    }

    pub fn ids(&self, level: OrgLevel) -> &BTreeSet<i64> {
        match level {
            OrgLevel::Campus => &self.campuses,
            OrgLevel::ProRectory => &self.pro_rectories,
            OrgLevel::Unit => &self.units,
            OrgLevel::Department => &self.departments,
            OrgLevel::Course => &self.courses,
            OrgLevel::Discipline => &self.disciplines,
            OrgLevel::Student => &self.students,
        }
    }

    pub fn contains(&self, level: OrgLevel, id: i64) -> bool {
        self.ids(level).contains(&id)
    }

    pub fn campuses(&self) -> &BTreeSet<i64> {
        &self.campuses
    }

    pub fn units(&self) -> &BTreeSet<i64> {
        &self.units
    }

    pub fn courses(&self) -> &BTreeSet<i64> {
        &self.courses
    }

    pub fn disciplines(&self) -> &BTreeSet<i64> {
        &self.disciplines
    }

    pub fn students(&self) -> &BTreeSet<i64> {
        &self.students
    }

    fn ids_mut(&mut self, level: OrgLevel) -> &mut BTreeSet<i64> {
        match level {
            OrgLevel::Campus => &mut self.campuses,
            OrgLevel::ProRectory => &mut self.pro_rectories,
            OrgLevel::Unit => &mut self.units,
            OrgLevel::Department => &mut self.departments,
            OrgLevel::Course => &mut self.courses,
            OrgLevel::Discipline => &mut self.disciplines,
            OrgLevel::Student => &mut self.students,
        }
    }
}

/// Accumulates ids while the resolver walks affiliations and cascades, then
/// freezes them into an [`AccessScope`].
#[derive(Debug)]
pub struct ScopeBuilder {
    scope: AccessScope,
}

impl ScopeBuilder {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self {
            scope: AccessScope::empty(user_id, role),
        }
    }

    pub fn insert(&mut self, level: OrgLevel, id: i64) -> &mut Self {
        self.scope.ids_mut(level).insert(id);
        self
    }

    pub fn extend<I>(&mut self, level: OrgLevel, ids: I) -> &mut Self
    where
        I: IntoIterator<Item = i64>,
    {
        self.scope.ids_mut(level).extend(ids);
        self
    }

    pub fn ids(&self, level: OrgLevel) -> &BTreeSet<i64> {
        self.scope.ids(level)
    }

    pub fn build(self) -> AccessScope {
        self.scope
    }
}
