use super::common::{created_response, no_content_response, OptionItem, PaginatedResponse, PaginationParams};
use crate::{
    auth::CurrentUser,
    entities::{product, ActivityAction, EntityType, ProductCategory},
    errors::{ErrorResponse, ServiceError},
    services::{
        activity_log::ActivityEntry,
        products::{CreateProduct, ProductFilter, UpdateProduct},
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::ActiveEnum;
use serde_json::json;
use uuid::Uuid;

/// List catalog products with filters
#[utoipa::path(
    get,
    path = "/api/cms/products",
    tag = "products",
    params(PaginationParams, ProductFilter),
    responses(
        (status = 200, description = "Products page", body = PaginatedResponse<product::Model>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<PaginatedResponse<product::Model>>, ServiceError> {
    let page = pagination.page_request(&state);
    let (products, total) = state.services.products.list(&filter, page).await?;
    Ok(Json(PaginatedResponse::new(products, page, total)))
}

#[utoipa::path(
    get,
    path = "/api/cms/products/categories",
    tag = "products",
    responses((status = 200, description = "Product categories", body = [OptionItem]))
)]
pub async fn categories(_user: CurrentUser) -> Json<Vec<OptionItem>> {
    Json(
        ProductCategory::all()
            .into_iter()
            .map(|c| OptionItem::new(c.to_value(), c.label()))
            .collect(),
    )
}

#[utoipa::path(
    get,
    path = "/api/cms/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = product::Model),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<product::Model>, ServiceError> {
    Ok(Json(state.services.products.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/cms/products",
    tag = "products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created", body = product::Model),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "SKU already exists", body = ErrorResponse),
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(input): Json<CreateProduct>,
) -> Result<Response, ServiceError> {
    let created = state.services.products.create(input).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Create, EntityType::Product)
                .entity(created.id)
                .details(json!({ "sku": created.sku, "name": created.name })),
        )
        .await;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/cms/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated", body = product::Model),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "SKU already exists", body = ErrorResponse),
    )
)]
pub async fn update_product(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProduct>,
) -> Result<Json<product::Model>, ServiceError> {
    let updated = state.services.products.update(id, input).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Update, EntityType::Product).entity(id),
        )
        .await;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/cms/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Product is referenced by orders", body = ErrorResponse),
    )
)]
pub async fn delete_product(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let deleted = state.services.products.delete(id).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Delete, EntityType::Product)
                .entity(id)
                .details(json!({ "sku": deleted.sku })),
        )
        .await;
    Ok(no_content_response())
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/categories", get(categories))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}
