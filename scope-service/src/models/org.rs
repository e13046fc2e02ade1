//! Organization hierarchy vocabulary and the rows read from the directory.
//!
//! Campus ⊃ Unit ⊃ {Course, Department}; Course ⊃ {Discipline, Student}.
//! Pro-rectory types hang off campus affiliations only.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One dimension of an access scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgLevel {
    Campus,
    ProRectory,
    Unit,
    Department,
    Course,
    Discipline,
    Student,
}

impl OrgLevel {
    pub const ALL: [OrgLevel; 7] = [
        OrgLevel::Campus,
        OrgLevel::ProRectory,
        OrgLevel::Unit,
        OrgLevel::Department,
        OrgLevel::Course,
        OrgLevel::Discipline,
        OrgLevel::Student,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrgLevel::Campus => "campus",
            OrgLevel::ProRectory => "pro_rectory",
            OrgLevel::Unit => "unit",
            OrgLevel::Department => "department",
            OrgLevel::Course => "course",
            OrgLevel::Discipline => "discipline",
            OrgLevel::Student => "student",
        }
    }
}

/// Kinds of record the enforcer adjudicates and the filter constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Unit,
    Student,
    Course,
    Discipline,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Unit => "unit",
            TargetKind::Student => "student",
            TargetKind::Course => "course",
            TargetKind::Discipline => "discipline",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A one-hop cascade the resolver can follow with a single batched lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Campus ids → ids of the units they contain.
    CampusUnits,
    /// Unit ids → ids of the courses they contain.
    UnitCourses,
    /// Discipline ids → ids of the courses owning them.
    DisciplineCourses,
}

impl Edge {
    pub fn from(&self) -> OrgLevel {
        match self {
            Edge::CampusUnits => OrgLevel::Campus,
            Edge::UnitCourses => OrgLevel::Unit,
            Edge::DisciplineCourses => OrgLevel::Discipline,
        }
    }

    pub fn to(&self) -> OrgLevel {
        match self {
            Edge::CampusUnits => OrgLevel::Unit,
            Edge::UnitCourses | Edge::DisciplineCourses => OrgLevel::Course,
        }
    }
}

/// One affiliation bridge row. Which levels the ids belong to depends on the
/// role's anchor (e.g. unit + discipline for a professor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct AffiliationRow {
    pub primary_id: i64,
    pub secondary_id: Option<i64>,
}

impl AffiliationRow {
    pub fn new(primary_id: i64, secondary_id: Option<i64>) -> Self {
        Self {
            primary_id,
            secondary_id,
        }
    }
}

/// Where a target sits in the hierarchy. Units have no course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct Placement {
    pub course_id: Option<i64>,
    pub unit_id: i64,
    pub campus_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UnitSummary {
    pub unit_id: i64,
    pub campus_id: i64,
    pub unit_name: String,
    /// Visible courses of the unit, when requested.
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<CourseSummary>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StudentSummary {
    pub student_id: i64,
    pub course_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StudentRecord {
    pub student_id: i64,
    pub course_id: i64,
    pub unit_id: i64,
    pub campus_id: i64,
    pub classification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CourseSummary {
    pub course_id: i64,
    pub unit_id: i64,
    pub campus_id: i64,
    pub course_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DisciplineSummary {
    pub discipline_id: i64,
    pub course_id: i64,
    pub discipline_name: String,
}
