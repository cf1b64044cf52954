use super::common::{PaginatedResponse, PaginationParams};
use crate::{
    auth::CurrentUser,
    entities::activity_log,
    errors::{ErrorResponse, ServiceError},
    services::activity_log::ActivityLogFilter,
    AppState,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

/// Activity log, newest entries first
#[utoipa::path(
    get,
    path = "/api/cms/logs",
    tag = "activity",
    params(PaginationParams, ActivityLogFilter),
    responses(
        (status = 200, description = "Activity page", body = PaginatedResponse<activity_log::Model>),
        (status = 400, description = "Unknown action or entity type", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
pub async fn list_logs(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ActivityLogFilter>,
) -> Result<Json<PaginatedResponse<activity_log::Model>>, ServiceError> {
    let page = pagination.page_request(&state);
    let (entries, total) = state.services.activity_log.list(&filter, page).await?;
    Ok(Json(PaginatedResponse::new(entries, page, total)))
}

pub fn activity_log_routes() -> Router<AppState> {
    Router::new().route("/", get(list_logs))
}
