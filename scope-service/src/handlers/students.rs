//! Student record handlers.

use axum::extract::{Json, Path, Query, State};

use super::pagination::{ListQuery, ListResponse};
use crate::middleware::Caller;
use crate::models::{
    AccessScope, Action, Resource, Role, StudentRecord, StudentSummary, TargetKind,
};
use crate::services::{AccessError, ForbiddenReason};
use crate::AppState;
use service_core::error::AppError;

/// The caller's own student record. STUDENT role only.
///
/// GET /students/me
pub async fn get_me(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<StudentRecord>, AppError> {
    let scope = state
        .enforcer
        .authorize(
            caller.user_id,
            caller.role,
            Resource::StudentRecord,
            Action::Read,
        )
        .await?;

    if scope.role() != Role::Student {
        return Err(AccessError::Forbidden(ForbiddenReason::RoleNotEntitled).into());
    }
    let student_id = scope
        .students()
        .first()
        .copied()
        .ok_or(AccessError::Forbidden(ForbiddenReason::ScopeNotSatisfied))?;

    fetch_student(&state, &scope, student_id).await.map(Json)
}

/// One student record, if it lies within the caller's scope.
///
/// GET /students/:id
pub async fn get_student(
    State(state): State<AppState>,
    caller: Caller,
    Path(student_id): Path<i64>,
) -> Result<Json<StudentRecord>, AppError> {
    let scope = state
        .enforcer
        .authorize(
            caller.user_id,
            caller.role,
            Resource::StudentRecord,
            Action::Read,
        )
        .await?;

    fetch_student(&state, &scope, student_id).await.map(Json)
}

/// Students visible under the caller's scope.
///
/// GET /students
pub async fn list_students(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<StudentSummary>>, AppError> {
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

    let filter = state.enforcer.scope_filter(&scope, TargetKind::Student);
    let items = state.records.list_students(&filter, page).await?;

    Ok(Json(ListResponse::new(items, page, filter)))
}

async fn fetch_student(
    state: &AppState,
    scope: &AccessScope,
    student_id: i64,
) -> Result<StudentRecord, AppError> {
    state
        .enforcer
        .assert_target_access(scope, TargetKind::Student, student_id)
        .await?;

    let record = state
        .records
        .find_student(student_id)
        .await?
        .ok_or(AccessError::NotFound {
            kind: TargetKind::Student,
            id: student_id,
        })?;
    Ok(record)
}
