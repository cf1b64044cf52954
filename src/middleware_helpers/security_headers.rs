use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Baseline response headers for the JSON API and document downloads.
///
/// Responses from the back-office (`/api/cms`, `/api/auth`) carry customer data
/// and are marked `no-store`.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let private = {
        let path = req.uri().path();
        path.starts_with("/api/cms") || path.starts_with("/api/auth")
    };

    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if private && !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/api/cms/customers", get(|| async { "ok" }))
            .route("/api/public/products", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(security_headers_middleware))
    }

    #[tokio::test]
    async fn cms_responses_are_not_cached() {
        let res = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/cms/customers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert_eq!(res.headers().get("x-content-type-options").unwrap(), "nosniff");
    }

    #[tokio::test]
    async fn public_responses_keep_default_caching() {
        let res = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/public/products")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(res.headers().get(header::CACHE_CONTROL).is_none());
    }
}
