//! Unit handlers.

use axum::extract::{Json, Path, Query, State};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

use super::pagination::{ListQuery, ListResponse};
use crate::middleware::Caller;
use crate::models::{Action, CourseSummary, Resource, TargetKind, UnitSummary};
use crate::services::Page;
use crate::AppState;
use service_core::error::AppError;

/// `?limit=&offset=&include_courses=` on `GET /units`.
#[derive(Debug, Default, Deserialize)]
pub struct UnitListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Attach each unit's visible courses. Defaults to true.
    pub include_courses: Option<bool>,
}

impl UnitListQuery {
    fn list(&self) -> ListQuery {
        ListQuery {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Units within the caller's scope, optionally with their courses.
///
/// GET /units
pub async fn list_units(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<UnitListQuery>,
) -> Result<Json<ListResponse<UnitSummary>>, AppError> {
    let page = query.list().page(&state.config.lists)?;
    let scope = state
        .enforcer
        .authorize(caller.user_id, caller.role, Resource::Reports, Action::Read)
        .await?;

    let filter = state.enforcer.scope_filter(&scope, TargetKind::Unit);
    let mut units = state.records.list_units(&filter, page).await?;

    if query.include_courses.unwrap_or(true) && !units.is_empty() {
        let unit_ids: BTreeSet<i64> = units.iter().map(|u| u.unit_id).collect();
        let course_filter = state.enforcer.scope_filter(&scope, TargetKind::Course);
        let courses = state
            .records
            .list_unit_courses(
                &unit_ids,
                &course_filter,
                Page::new(state.config.lists.max_limit, 0),
            )
            .await?;

        let mut by_unit: BTreeMap<i64, Vec<CourseSummary>> = BTreeMap::new();
        for course in courses {
            by_unit.entry(course.unit_id).or_default().push(course);
        }
        for unit in &mut units {
            unit.courses = Some(by_unit.remove(&unit.unit_id).unwrap_or_default());
        }
    }

    Ok(Json(ListResponse::new(units, page, filter)))
}

/// Courses of one unit that the caller can see. The unit itself must lie
/// within the caller's scope.
///
/// GET /units/:id/courses
pub async fn list_unit_courses(
    State(state): State<AppState>,
    caller: Caller,
    Path(unit_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<CourseSummary>>, AppError> {
    let page = query.page(&state.config.lists)?;
    let scope = state
        .enforcer
        .authorize(caller.user_id, caller.role, Resource::Reports, Action::Read)
        .await?;

    state
        .enforcer
        .assert_target_access(&scope, TargetKind::Unit, unit_id)
        .await?;

    let filter = state.enforcer.scope_filter(&scope, TargetKind::Course);
    let items = state
        .records
        .list_unit_courses(&BTreeSet::from([unit_id]), &filter, page)
        .await?;

    Ok(Json(ListResponse::new(items, page, filter)))
}
