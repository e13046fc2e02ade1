//! Role model - the fixed academic authority ladder and its per-role rules.

use serde::{Deserialize, Serialize};

use super::org::{Edge, OrgLevel};

/// A caller's active role. Stored in the directory as an integer code 1..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Rectory,
    ProRectory,
    Department,
    Coordination,
    Professor,
    Student,
}

/// Where a role's affiliation rows anchor: the level filled by each row's
/// primary id and, optionally, the level filled by its secondary id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub primary: OrgLevel,
    pub secondary: Option<OrgLevel>,
}

/// How a role's scope is built from the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    /// No lookup at all; the scope is unrestricted.
    Unrestricted,
    /// Load affiliation rows into `anchor`, then expand one hop along `cascade`.
    Anchored {
        anchor: Anchor,
        cascade: Option<Edge>,
    },
}

/// How a role's scope is matched against a concrete target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRule {
    /// Every target passes.
    Unrestricted,
    /// Only the caller's own student record (and what it belongs to).
    SelfOnly,
    /// Target's campus must be in scope; unit set is the fallback when the
    /// scope carries no campuses.
    CampusThenUnit,
    /// Target's course must be in scope.
    Course,
    /// Target must be reachable through the caller's disciplines.
    Discipline,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Rectory,
        Role::ProRectory,
        Role::Department,
        Role::Coordination,
        Role::Professor,
        Role::Student,
    ];

    /// Stored directory code.
    pub fn code(self) -> i32 {
        match self {
            Role::Admin => 1,
            Role::Rectory => 2,
            Role::ProRectory => 3,
            Role::Department => 4,
            Role::Coordination => 5,
            Role::Professor => 6,
            Role::Student => 7,
        }
    }

    /// Parse a stored directory code. `None` means the code is outside the
    /// known ladder, which callers treat as data corruption.
    pub fn from_code(code: i32) -> Option<Self> {
        Role::ALL.into_iter().find(|r| r.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Rectory => "RECTORY",
            Role::ProRectory => "PRO_RECTORY",
            Role::Department => "DEPARTMENT",
            Role::Coordination => "COORDINATION",
            Role::Professor => "PROFESSOR",
            Role::Student => "STUDENT",
        }
    }

    pub fn scope_rule(self) -> ScopeRule {
        let anchored = |primary, secondary, cascade| ScopeRule::Anchored {
            anchor: Anchor { primary, secondary },
            cascade,
        };

        match self {
            Role::Admin => ScopeRule::Unrestricted,
            Role::Rectory => anchored(OrgLevel::Campus, None, Some(Edge::CampusUnits)),
            Role::ProRectory => anchored(
                OrgLevel::Campus,
                Some(OrgLevel::ProRectory),
                Some(Edge::CampusUnits),
            ),
            Role::Department => anchored(
                OrgLevel::Unit,
                Some(OrgLevel::Department),
                Some(Edge::UnitCourses),
            ),
            Role::Coordination => anchored(OrgLevel::Unit, Some(OrgLevel::Course), None),
            Role::Professor => anchored(
                OrgLevel::Unit,
                Some(OrgLevel::Discipline),
                Some(Edge::DisciplineCourses),
            ),
            Role::Student => anchored(OrgLevel::Unit, Some(OrgLevel::Student), None),
        }
    }

    pub fn target_rule(self) -> TargetRule {
        match self {
            Role::Admin => TargetRule::Unrestricted,
            Role::Rectory | Role::ProRectory => TargetRule::CampusThenUnit,
            Role::Department | Role::Coordination => TargetRule::Course,
            Role::Professor => TargetRule::Discipline,
            Role::Student => TargetRule::SelfOnly,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts either the numeric code or the role name, case-insensitively.
impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i32>() {
            return Role::from_code(code).ok_or_else(|| format!("Invalid role code: {}", code));
        }
        let upper = s.to_ascii_uppercase().replace('-', "_");
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == upper)
            .ok_or_else(|| format!("Invalid role: {}", s))
    }
}
