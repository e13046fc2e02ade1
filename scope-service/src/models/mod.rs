pub mod access_scope;
pub mod org;
pub mod permission;
pub mod role;

pub use access_scope::{AccessScope, ScopeBuilder};
pub use org::{
    AffiliationRow, CourseSummary, DisciplineSummary, Edge, OrgLevel, Placement, StudentRecord,
    StudentSummary, TargetKind, UnitSummary,
};
pub use permission::{Action, Resource};
pub use role::{Anchor, Role, ScopeRule, TargetRule};
