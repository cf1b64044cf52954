use super::common::{document_response, ExportParams};
use crate::{
    auth::CurrentUser,
    entities::{ActivityAction, EntityType},
    errors::{ErrorResponse, ServiceError},
    reports::{render_report, ExportFormat, ReportDocument},
    services::{
        activity_log::ActivityEntry, customers::CustomerFilter, orders::OrderFilter,
        products::ProductFilter,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;
use uuid::Uuid;

/// Renders `doc`, logs the export and wraps the bytes in a download response.
#[allow(clippy::too_many_arguments)]
async fn deliver(
    state: &AppState,
    current: &CurrentUser,
    doc: ReportDocument,
    format: ExportFormat,
    detail: bool,
    rows: usize,
    stem: &str,
    entity_type: EntityType,
    entity_id: Option<Uuid>,
) -> Result<Response, ServiceError> {
    let report = render_report(doc, format, stem).await?;
    let mut entry = ActivityEntry::new(ActivityAction::Export, entity_type).details(json!({
        "format": format.to_string(),
        "detail": detail,
        "rows": rows,
    }));
    if let Some(id) = entity_id {
        entry = entry.entity(id);
    }
    state
        .services
        .activity_log
        .record(&current.actor(), entry)
        .await;
    tracing::info!(
        user_id = %current.id(),
        file = %report.filename,
        bytes = report.bytes.len(),
        "export generated"
    );
    Ok(document_response(report))
}

/// Export customers matching the list filters
#[utoipa::path(
    get,
    path = "/api/cms/export/customers",
    tag = "export",
    params(ExportParams, CustomerFilter),
    responses(
        (status = 200, description = "PDF or XLSX document", content_type = "application/octet-stream"),
        (status = 400, description = "Unsupported format or invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
pub async fn export_customers(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ExportParams>,
    Query(filter): Query<CustomerFilter>,
) -> Result<Response, ServiceError> {
    let format = ExportFormat::from_query(params.format.as_deref())?;
    let detail = params.detail.unwrap_or(false);
    let (doc, rows) = state.services.exports.customers(&filter, detail).await?;
    deliver(&state, &current, doc, format, detail, rows, "customers", EntityType::Customer, None).await
}

/// Export products matching the list filters
#[utoipa::path(
    get,
    path = "/api/cms/export/products",
    tag = "export",
    params(ExportParams, ProductFilter),
    responses(
        (status = 200, description = "PDF or XLSX document", content_type = "application/octet-stream"),
        (status = 400, description = "Unsupported format or invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
pub async fn export_products(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ExportParams>,
    Query(filter): Query<ProductFilter>,
) -> Result<Response, ServiceError> {
    let format = ExportFormat::from_query(params.format.as_deref())?;
    let detail = params.detail.unwrap_or(false);
    let (doc, rows) = state.services.exports.products(&filter, detail).await?;
    deliver(&state, &current, doc, format, detail, rows, "products", EntityType::Product, None).await
}

/// Export orders matching the list filters; `detail=true` lists every item
#[utoipa::path(
    get,
    path = "/api/cms/export/orders",
    tag = "export",
    params(ExportParams, OrderFilter),
    responses(
        (status = 200, description = "PDF or XLSX document", content_type = "application/octet-stream"),
        (status = 400, description = "Unsupported format or invalid filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
pub async fn export_orders(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ExportParams>,
    Query(filter): Query<OrderFilter>,
) -> Result<Response, ServiceError> {
    let format = ExportFormat::from_query(params.format.as_deref())?;
    let detail = params.detail.unwrap_or(false);
    let (doc, rows) = state.services.exports.orders(&filter, detail).await?;
    deliver(&state, &current, doc, format, detail, rows, "orders", EntityType::Order, None).await
}

/// Single order document with header fields, items and total
#[utoipa::path(
    get,
    path = "/api/cms/export/orders/{id}",
    tag = "export",
    params(("id" = Uuid, Path, description = "Order id"), ExportParams),
    responses(
        (status = 200, description = "PDF or XLSX document", content_type = "application/octet-stream"),
        (status = 400, description = "Unsupported format", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
    )
)]
pub async fn export_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ServiceError> {
    let format = ExportFormat::from_query(params.format.as_deref())?;
    let (doc, order_number) = state.services.exports.order(id).await?;
    let rows = doc.rows.len();
    let stem = format!("order-{}", order_number);
    deliver(&state, &current, doc, format, true, rows, &stem, EntityType::Order, Some(id)).await
}

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(export_customers))
        .route("/products", get(export_products))
        .route("/orders", get(export_orders))
        .route("/orders/:id", get(export_order))
}
