use crate::handlers;
use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Beverage CMS API",
        version = "0.1.0",
        description = r#"
Back-office and website API for a beverage distributor.

## Authentication

CMS endpoints under `/api/cms` require the session cookie issued by
`POST /api/auth/login`. The cookie is `HttpOnly`; browsers send it
automatically, other clients must echo it in the `Cookie` header.

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20, max 100)
and answer with `{ data, pagination: { page, per_page, total, total_pages } }`.

## Exports

`/api/cms/export/*` take the same filters as the list endpoints plus
`format=pdf|excel` and `detail=true|false`, and return a file download.
"#
    ),
    tags(
        (name = "auth", description = "Session login and logout"),
        (name = "customers", description = "Customer management"),
        (name = "products", description = "Product catalog management"),
        (name = "orders", description = "Order requests"),
        (name = "activity", description = "User activity log"),
        (name = "users", description = "Back-office accounts (admin only)"),
        (name = "export", description = "PDF and Excel documents"),
        (name = "public", description = "Website endpoints, no session required"),
        (name = "health", description = "Health check")
    ),
    paths(
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::session,

        handlers::customers::list_customers,
        handlers::customers::business_types,
        handlers::customers::get_customer,
        handlers::customers::create_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,

        handlers::products::list_products,
        handlers::products::categories,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,

        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::create_order,
        handlers::orders::update_order_status,
        handlers::orders::delete_order,

        handlers::activity_logs::list_logs,

        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,

        handlers::exports::export_customers,
        handlers::exports::export_products,
        handlers::exports::export_orders,
        handlers::exports::export_order,

        handlers::public::list_products,
        handlers::public::business_types,
        handlers::public::submit_request,

        handlers::health::health,
    ),
    components(
        schemas(
            handlers::common::PaginationMeta,
            handlers::common::OptionItem,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_cms_and_public_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/auth/login"));
        assert!(paths.contains_key("/api/cms/customers/{id}"));
        assert!(paths.contains_key("/api/cms/export/orders/{id}"));
        assert!(paths.contains_key("/api/public/requests"));
    }
}
