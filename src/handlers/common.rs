use crate::{reports::RenderedReport, services::PageRequest, AppState};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number, starting at 1
    pub page: Option<u64>,
    /// Items per page; capped by `api_max_page_size`
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Resolves the requested window against the configured page sizes
    pub fn page_request(&self, state: &AppState) -> PageRequest {
        PageRequest::new(
            self.page,
            self.per_page,
            state.config.api_default_page_size,
            state.config.api_max_page_size,
        )
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = if total == 0 || per_page == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: PageRequest, total: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(page.page, page.per_page, total),
        }
    }
}

/// Value/label pair for select inputs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OptionItem {
    pub value: String,
    pub label: String,
}

impl OptionItem {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Query flags shared by the export endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportParams {
    /// `pdf` (default), `excel` or `xlsx`
    pub format: Option<String>,
    /// Include the extended column set
    pub detail: Option<bool>,
}

/// File download response for a rendered report
pub fn document_response(report: RenderedReport) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", report.filename);
    let mut response = (StatusCode::OK, report.bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(report.content_type),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(PaginationMeta::new(1, 20, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(1, 20, 20).total_pages, 1);
        assert_eq!(PaginationMeta::new(2, 20, 41).total_pages, 3);
    }

    #[test]
    fn document_response_sets_download_headers() {
        let response = document_response(RenderedReport {
            bytes: b"%PDF-1.3".to_vec(),
            content_type: crate::reports::PDF_CONTENT_TYPE,
            filename: "orders-20240501-120000.pdf".to_string(),
        });
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"orders-20240501-120000.pdf\""
        );
    }
}
