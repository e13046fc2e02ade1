//! Collaborator seams: the read-only organization directory and the record
//! store that serves scope-filtered collections.
//!
//! Both are owned by external administrative flows. Nothing here writes.

use async_trait::async_trait;
use std::collections::BTreeSet;

use super::error::AccessError;
use super::filter::ScopeFilter;
use crate::models::{
    AffiliationRow, CourseSummary, DisciplineSummary, Edge, Placement, Role, StudentRecord,
    StudentSummary, TargetKind, UnitSummary,
};

/// Hierarchy edges and affiliation bridge rows.
///
/// Implementations must not assume snapshot isolation across calls: the
/// resolver issues several lookups per request and tolerates data changing
/// in between.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn health_check(&self) -> Result<(), AccessError>;

    /// Stored role code for a user, `None` if the user has no row.
    async fn find_user_role_code(&self, user_id: i64) -> Result<Option<i32>, AccessError>;

    /// Every affiliation row binding `user_id` under `role`, in one query.
    async fn affiliations(
        &self,
        user_id: i64,
        role: Role,
    ) -> Result<Vec<AffiliationRow>, AccessError>;

    /// Follow `edge` one hop from all of `ids` in a single batched lookup.
    async fn expand(&self, edge: Edge, ids: &BTreeSet<i64>) -> Result<BTreeSet<i64>, AccessError>;

    /// Course, unit and campus a target hangs under; `None` if it does not exist.
    async fn placement(&self, kind: TargetKind, id: i64) -> Result<Option<Placement>, AccessError>;

    /// Whether the student is enrolled in at least one of the disciplines.
    async fn is_enrolled_in_any(
        &self,
        student_id: i64,
        discipline_ids: &BTreeSet<i64>,
    ) -> Result<bool, AccessError>;
}

/// Offset pagination for collection reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.max(1),
            offset: offset.max(0),
        }
    }
}

/// Record reads constrained by a [`ScopeFilter`]. A [`ScopeFilter::Nothing`]
/// must yield an empty collection without touching storage.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_student(&self, student_id: i64) -> Result<Option<StudentRecord>, AccessError>;

    async fn list_students(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<StudentSummary>, AccessError>;

    async fn list_units(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<UnitSummary>, AccessError>;

    async fn list_courses(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<CourseSummary>, AccessError>;

    /// Courses of any of `unit_ids` that also pass `filter`, ordered by unit
    /// then course. One query for the whole id set.
    async fn list_unit_courses(
        &self,
        unit_ids: &BTreeSet<i64>,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<CourseSummary>, AccessError>;

    async fn list_disciplines(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<DisciplineSummary>, AccessError>;

    /// Disciplines of one course, optionally narrowed to an id set.
    async fn list_course_disciplines(
        &self,
        course_id: i64,
        only: Option<&BTreeSet<i64>>,
        page: Page,
    ) -> Result<Vec<DisciplineSummary>, AccessError>;
}
