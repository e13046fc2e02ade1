use axum::extract::{Json, Path, Query, State};

use super::pagination::{ListQuery, ListResponse};
use crate::middleware::Caller;
use crate::models::{Action, CourseSummary, DisciplineSummary, Resource, TargetKind, TargetRule};
use crate::services::ScopeFilter;
use crate::AppState;
use service_core::error::AppError;

/// GET /courses
pub async fn list_courses(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<CourseSummary>>, AppError> {
    let page = query.page(&state.config.lists)?;
    let scope = state
        .enforcer
        .authorize(caller.user_id, caller.role, Resource::Reports, Action::Read)
        .await?;

    let filter = state.enforcer.scope_filter(&scope, TargetKind::Course);
    let items = state.records.list_courses(&filter, page).await?;

    Ok(Json(ListResponse::new(items, page, filter)))
}

/// Disciplines of one course. Professors only see the disciplines they are
/// affiliated with.
///
/// GET /courses/:id/disciplines
pub async fn list_course_disciplines(
    State(state): State<AppState>,
    caller: Caller,
    Path(course_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<DisciplineSummary>>, AppError> {
    let page = query.page(&state.config.lists)?;
    let scope = state
        .enforcer
        .authorize(
            caller.user_id,
            caller.role,
            Resource::StudentList,
            Action::List,
        )
        .await?;

    state
        .enforcer
        .assert_target_access(&scope, TargetKind::Course, course_id)
        .await?;

    let (only, filter) = match scope.role().target_rule() {
        TargetRule::Discipline => (
            Some(scope.disciplines()),
            ScopeFilter::Disciplines(scope.disciplines().clone()),
        ),
        _ => (None, ScopeFilter::Courses([course_id].into_iter().collect())),
    };
    let items = state
        .records
        .list_course_disciplines(course_id, only, page)
        .await?;

    Ok(Json(ListResponse::new(items, page, filter)))
}
