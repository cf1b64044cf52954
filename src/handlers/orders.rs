use super::common::{created_response, no_content_response, PaginatedResponse, PaginationParams};
use crate::{
    auth::CurrentUser,
    entities::{order, ActivityAction, EntityType},
    errors::{ErrorResponse, ServiceError},
    services::{
        activity_log::ActivityEntry,
        orders::{parse_status, CreateOrder, OrderDetail, OrderFilter, OrderSummary, UpdateOrderStatus},
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, put},
    Json, Router,
};
use sea_orm::ActiveEnum;
use serde_json::json;
use uuid::Uuid;

/// List orders, newest first
#[utoipa::path(
    get,
    path = "/api/cms/orders",
    tag = "orders",
    params(PaginationParams, OrderFilter),
    responses(
        (status = 200, description = "Orders page", body = PaginatedResponse<OrderSummary>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<PaginatedResponse<OrderSummary>>, ServiceError> {
    let page = pagination.page_request(&state);
    let (orders, total) = state.services.orders.list(&filter, page).await?;
    Ok(Json(PaginatedResponse::new(orders, page, total)))
}

/// Order with customer and line items
#[utoipa::path(
    get,
    path = "/api/cms/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail", body = OrderDetail),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, ServiceError> {
    Ok(Json(state.services.orders.get_detail(id).await?))
}

/// Create an order on behalf of an existing customer
#[utoipa::path(
    post,
    path = "/api/cms/orders",
    tag = "orders",
    request_body = CreateOrder,
    responses(
        (status = 201, description = "Order created", body = order::Model),
        (status = 400, description = "Invalid items", body = ErrorResponse),
        (status = 404, description = "Customer not found", body = ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(input): Json<CreateOrder>,
) -> Result<Response, ServiceError> {
    let created = state.services.orders.create(input).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Create, EntityType::Order)
                .entity(created.id)
                .details(json!({
                    "order_number": created.order_number,
                    "total_amount": created.total_amount.to_string(),
                })),
        )
        .await;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/cms/orders/{id}/status",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatus,
    responses(
        (status = 200, description = "Status updated", body = order::Model),
        (status = 400, description = "Unknown status or order already final", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOrderStatus>,
) -> Result<Json<order::Model>, ServiceError> {
    let status = parse_status(&input.status)?;
    let (updated, previous) = state.services.orders.update_status(id, status).await?;
    if previous != updated.status {
        state
            .services
            .activity_log
            .record(
                &current.actor(),
                ActivityEntry::new(ActivityAction::Update, EntityType::Order)
                    .entity(id)
                    .details(json!({
                        "from": previous.to_value(),
                        "to": updated.status.to_value(),
                    })),
            )
            .await;
    }
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/cms/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order and its items deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let deleted = state.services.orders.delete(id).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Delete, EntityType::Order)
                .entity(id)
                .details(json!({ "order_number": deleted.order_number })),
        )
        .await;
    Ok(no_content_response())
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/status", put(update_order_status))
}
