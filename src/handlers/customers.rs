use super::common::{created_response, no_content_response, OptionItem, PaginatedResponse, PaginationParams};
use crate::{
    auth::CurrentUser,
    entities::{customer, ActivityAction, BusinessType, EntityType},
    errors::{ErrorResponse, ServiceError},
    services::{
        activity_log::ActivityEntry,
        customers::{CreateCustomer, CustomerFilter, UpdateCustomer},
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

/// List customers with filters
#[utoipa::path(
    get,
    path = "/api/cms/customers",
    tag = "customers",
    params(PaginationParams, CustomerFilter),
    responses(
        (status = 200, description = "Customers page", body = PaginatedResponse<customer::Model>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
pub async fn list_customers(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<CustomerFilter>,
) -> Result<Json<PaginatedResponse<customer::Model>>, ServiceError> {
    let page = pagination.page_request(&state);
    let (customers, total) = state.services.customers.list(&filter, page).await?;
    Ok(Json(PaginatedResponse::new(customers, page, total)))
}

/// Business types offered in the customer form
#[utoipa::path(
    get,
    path = "/api/cms/customers/business-types",
    tag = "customers",
    responses((status = 200, description = "Business types", body = [OptionItem]))
)]
pub async fn business_types(_user: CurrentUser) -> Json<Vec<OptionItem>> {
    Json(business_type_options())
}

pub(crate) fn business_type_options() -> Vec<OptionItem> {
    BusinessType::all()
        .into_iter()
        .map(|t| OptionItem::new(t.code(), t.label()))
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/cms/customers/{id}",
    tag = "customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = customer::Model),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn get_customer(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<customer::Model>, ServiceError> {
    Ok(Json(state.services.customers.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/cms/customers",
    tag = "customers",
    request_body = CreateCustomer,
    responses(
        (status = 201, description = "Customer created", body = customer::Model),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn create_customer(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(input): Json<CreateCustomer>,
) -> Result<Response, ServiceError> {
    let created = state.services.customers.create(input).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Create, EntityType::Customer)
                .entity(created.id)
                .details(json!({ "business_name": created.business_name })),
        )
        .await;
    Ok(created_response(created))
}

/// Partial update; only provided fields change
#[utoipa::path(
    put,
    path = "/api/cms/customers/{id}",
    tag = "customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomer,
    responses(
        (status = 200, description = "Customer updated", body = customer::Model),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn update_customer(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCustomer>,
) -> Result<Json<customer::Model>, ServiceError> {
    let updated = state.services.customers.update(id, input).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Update, EntityType::Customer).entity(id),
        )
        .await;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/cms/customers/{id}",
    tag = "customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Customer still has orders", body = ErrorResponse),
    )
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let deleted = state.services.customers.delete(id).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Delete, EntityType::Customer)
                .entity(id)
                .details(json!({ "business_name": deleted.business_name })),
        )
        .await;
    Ok(no_content_response())
}

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/business-types", get(business_types))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}
