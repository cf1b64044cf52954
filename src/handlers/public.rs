//! Unauthenticated endpoints used by the marketing website.

use super::{common::OptionItem, customers::business_type_options};
use crate::{
    entities::{product, ActivityAction, EntityType},
    errors::{ErrorResponse, ServiceError},
    services::{
        activity_log::{ActivityEntry, Actor},
        orders::{OrderReceipt, PublicOrderRequest},
    },
    auth::ClientInfo,
    AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicProductQuery {
    /// Category code, e.g. `beer`
    pub category: Option<String>,
    /// Matches name, SKU or brand
    pub search: Option<String>,
}

/// Active products for the website catalog
#[utoipa::path(
    get,
    path = "/api/public/products",
    tag = "public",
    params(PublicProductQuery),
    responses(
        (status = 200, description = "Active products", body = [product::Model]),
        (status = 400, description = "Unknown category", body = ErrorResponse),
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PublicProductQuery>,
) -> Result<Json<Vec<product::Model>>, ServiceError> {
    let products = state
        .services
        .products
        .list_public(query.category.as_deref(), query.search.as_deref())
        .await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/public/business-types",
    tag = "public",
    responses((status = 200, description = "Business types for the request form", body = [OptionItem]))
)]
pub async fn business_types() -> Json<Vec<OptionItem>> {
    Json(business_type_options())
}

/// Submit an order request from the website
#[utoipa::path(
    post,
    path = "/api/public/requests",
    tag = "public",
    request_body = PublicOrderRequest,
    responses(
        (status = 201, description = "Request received", body = OrderReceipt),
        (status = 400, description = "Invalid business details or items", body = ErrorResponse),
    )
)]
pub async fn submit_request(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(request): Json<PublicOrderRequest>,
) -> Result<(StatusCode, Json<OrderReceipt>), ServiceError> {
    let email = request.email.clone();
    let (order, customer_created) = state.services.orders.submit_request(request).await?;

    let actor = Actor {
        user_id: None,
        email: Some(email),
        ip_address: client.ip_address,
    };
    state
        .services
        .activity_log
        .record(
            &actor,
            ActivityEntry::new(ActivityAction::Create, EntityType::Order)
                .entity(order.id)
                .details(json!({
                    "order_number": order.order_number,
                    "source": "website",
                    "customer_created": customer_created,
                })),
        )
        .await;
    info!(order_number = %order.order_number, customer_created, "website request received");

    Ok((
        StatusCode::CREATED,
        Json(OrderReceipt {
            order_number: order.order_number,
            status: order.status,
            total_amount: order.total_amount,
        }),
    ))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/business-types", get(business_types))
        .route("/requests", post(submit_request))
}
