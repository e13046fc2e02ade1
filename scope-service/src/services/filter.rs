//! Scope filter - the collection-level counterpart of a target check.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::{AccessScope, OrgLevel, TargetKind, TargetRule};

/// Constraint a record store applies to a collection read.
///
/// Set-carrying variants are never empty; an empty required set collapses to
/// [`ScopeFilter::Nothing`] so a missing affiliation can never widen a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "by", content = "ids", rename_all = "snake_case")]
pub enum ScopeFilter {
    Unrestricted,
    Nothing,
    /// Records under one of these campuses.
    Campuses(BTreeSet<i64>),
    /// Records under one of these units.
    Units(BTreeSet<i64>),
    /// Records under (or equal to) one of these courses.
    Courses(BTreeSet<i64>),
    /// Records linked to one of these disciplines: enrolled students, owning
    /// courses, or the disciplines themselves.
    Disciplines(BTreeSet<i64>),
    /// Records linked to one of these students: the students themselves,
    /// their courses, or the disciplines they are enrolled in.
    Students(BTreeSet<i64>),
}

impl ScopeFilter {
    /// Build the filter for collection reads of `kind` under `scope`.
    ///
    /// The same per-role rule drives target checks, so a record appears in a
    /// list exactly when a target check on it would pass. `kind` picks the
    /// set a rule consults: unit collections are narrowed by units for
    /// course- and discipline-anchored roles, and a professor's course
    /// collections by the courses derived from its disciplines.
    pub fn for_scope(scope: &AccessScope, kind: TargetKind) -> Self {
        if scope.is_unrestricted() {
            return ScopeFilter::Unrestricted;
        }

        match (scope.role().target_rule(), kind) {
            (TargetRule::Unrestricted, _) => ScopeFilter::Unrestricted,
            (TargetRule::SelfOnly, _) => non_empty(scope, OrgLevel::Student, ScopeFilter::Students),
            (TargetRule::CampusThenUnit, _) => {
                if !scope.campuses().is_empty() {
                    ScopeFilter::Campuses(scope.campuses().clone())
                } else {
                    non_empty(scope, OrgLevel::Unit, ScopeFilter::Units)
                }
            }
            (TargetRule::Course | TargetRule::Discipline, TargetKind::Unit) => {
                non_empty(scope, OrgLevel::Unit, ScopeFilter::Units)
            }
            (TargetRule::Course, _) | (TargetRule::Discipline, TargetKind::Course) => {
                non_empty(scope, OrgLevel::Course, ScopeFilter::Courses)
            }
            (TargetRule::Discipline, TargetKind::Student | TargetKind::Discipline) => {
                non_empty(scope, OrgLevel::Discipline, ScopeFilter::Disciplines)
            }
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, ScopeFilter::Nothing)
    }
}

fn non_empty(
    scope: &AccessScope,
    level: OrgLevel,
    wrap: fn(BTreeSet<i64>) -> ScopeFilter,
) -> ScopeFilter {
    let ids = scope.ids(level);
    if ids.is_empty() {
        ScopeFilter::Nothing
    } else {
        wrap(ids.clone())
    }
}
