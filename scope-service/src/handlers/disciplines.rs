use axum::extract::{Json, Query, State};

use super::pagination::{ListQuery, ListResponse};
use crate::middleware::Caller;
use crate::models::{Action, DisciplineSummary, Resource, TargetKind};
use crate::AppState;
use service_core::error::AppError;

/// GET /disciplines
pub async fn list_disciplines(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<DisciplineSummary>>, AppError> {
    let page = query.page(&state.config.lists)?;
    let scope = state
        .enforcer
        .authorize(caller.user_id, caller.role, Resource::Reports, Action::Read)
        .await?;

    let filter = state.enforcer.scope_filter(&scope, TargetKind::Discipline);
    let items = state.records.list_disciplines(&filter, page).await?;

    Ok(Json(ListResponse::new(items, page, filter)))
}
