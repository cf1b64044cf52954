mod common;

use axum::http::{header, Method};
use beverage_cms::entities::{activity_log, ActivityAction};
use common::{response_bytes, TestApp};
use rstest::rstest;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

async fn seeded_app() -> TestApp {
    let app = TestApp::new().await;
    let customer = app
        .seed_customer("Harbor Bar", "owner@harborbar.pt", "bar", "Lisbon")
        .await;
    let lager = app.seed_product("BEER-001", "Lager 33cl", "beer", "1.25", true).await;
    app.seed_product("WATER-001", "Still Water 1.5L", "water", "0.50", true).await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/cms/orders",
            Some(json!({
                "customer_id": customer.id,
                "items": [{ "product_id": lager.id, "quantity": 24 }]
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    app
}

fn header_str(response: &axum::response::Response, name: header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[rstest]
#[case("/api/cms/export/customers", "customers-")]
#[case("/api/cms/export/products?category=beer", "products-")]
#[case("/api/cms/export/orders?status=pending", "orders-")]
#[case("/api/cms/export/orders?detail=true", "orders-")]
#[tokio::test]
async fn pdf_is_the_default_format(#[case] uri: &str, #[case] stem: &str) {
    let app = seeded_app().await;
    let response = app.request_authenticated(Method::GET, uri, None).await;
    assert_eq!(response.status(), 200);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "application/pdf");

    let disposition = header_str(&response, header::CONTENT_DISPOSITION);
    assert!(disposition.starts_with(&format!("attachment; filename=\"{}", stem)));
    assert!(disposition.ends_with(".pdf\""));

    let bytes = response_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[rstest]
#[case("excel")]
#[case("xlsx")]
#[case("XLSX")]
#[tokio::test]
async fn excel_exports_are_xlsx_workbooks(#[case] format: &str) {
    let app = seeded_app().await;
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/cms/export/orders?format={}&detail=true", format),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert!(header_str(&response, header::CONTENT_DISPOSITION).ends_with(".xlsx\""));
    assert!(response_bytes(response).await.starts_with(b"PK"));
}

#[tokio::test]
async fn unsupported_format_is_rejected() {
    let app = seeded_app().await;
    let response = app
        .request_authenticated(Method::GET, "/api/cms/export/customers?format=csv", None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn exports_require_a_session() {
    let app = seeded_app().await;
    let response = app
        .request(Method::GET, "/api/cms/export/products", None, None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn empty_result_still_renders_a_document() {
    let app = seeded_app().await;
    let response = app
        .request_authenticated(Method::GET, "/api/cms/export/customers?city=Faro", None)
        .await;
    assert_eq!(response.status(), 200);
    assert!(response_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn single_order_export_is_named_after_the_order_and_logged() {
    let app = seeded_app().await;
    let list = common::response_json(
        app.request_authenticated(Method::GET, "/api/cms/orders", None)
            .await,
    )
    .await;
    let id = list["data"][0]["id"].as_str().unwrap().to_string();
    let number = list["data"][0]["order_number"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/cms/export/orders/{}?format=excel", id),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    assert!(header_str(&response, header::CONTENT_DISPOSITION)
        .starts_with(&format!("attachment; filename=\"order-{}-", number)));

    let exports = activity_log::Entity::find()
        .filter(activity_log::Column::Action.eq(ActivityAction::Export))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(exports.len(), 1);
    let entry = &exports[0];
    assert_eq!(entry.user_id, Some(app.admin.id));
    assert_eq!(entry.entity_id.as_deref(), Some(id.as_str()));
    let details = entry.details.as_ref().unwrap();
    assert_eq!(details["format"], "excel");

    let missing = app
        .request_authenticated(
            Method::GET,
            &format!("/api/cms/export/orders/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(missing.status(), 404);
}

fn has_limit_note(doc: &beverage_cms::reports::ReportDocument) -> bool {
    doc.summary
        .iter()
        .any(|(label, value)| label == "Note" && value.contains("Limited to the first"))
}

#[tokio::test]
async fn row_cap_notes_only_exports_that_dropped_rows() {
    let app = TestApp::with_config(|cfg| cfg.export_max_rows = 2).await;
    let exports = &app.state.services.exports;
    let filter = beverage_cms::services::customers::CustomerFilter::default();

    app.seed_customer("Harbor Bar", "owner@harborbar.pt", "bar", "Lisbon")
        .await;
    app.seed_customer("Grand Hotel", "purchasing@grandhotel.pt", "hotel", "Porto")
        .await;

    let (exact, rows) = exports.customers(&filter, false).await.unwrap();
    assert_eq!(rows, 2);
    assert_eq!(exact.rows.len(), 2);
    assert!(!has_limit_note(&exact));
    assert_eq!(exact.subtitle.as_deref(), Some("Test Beverages Ltd."));

    app.seed_customer("Corner Café", "orders@cornercafe.pt", "cafe", "Lisbon")
        .await;

    let (capped, rows) = exports.customers(&filter, false).await.unwrap();
    assert_eq!(rows, 2);
    assert_eq!(capped.rows.len(), 2);
    assert!(has_limit_note(&capped));
}

#[tokio::test]
async fn detailed_order_export_logs_item_rows() {
    let app = TestApp::new().await;
    let customer = app
        .seed_customer("Harbor Bar", "owner@harborbar.pt", "bar", "Lisbon")
        .await;
    let lager = app.seed_product("BEER-001", "Lager 33cl", "beer", "1.25", true).await;
    let water = app.seed_product("WATER-001", "Still Water 1.5L", "water", "0.50", true).await;
    let created = app
        .request_authenticated(
            Method::POST,
            "/api/cms/orders",
            Some(json!({
                "customer_id": customer.id,
                "items": [
                    { "product_id": lager.id, "quantity": 24 },
                    { "product_id": water.id, "quantity": 6 }
                ]
            })),
        )
        .await;
    assert_eq!(created.status(), 201);

    let response = app
        .request_authenticated(Method::GET, "/api/cms/export/orders?detail=true", None)
        .await;
    assert_eq!(response.status(), 200);

    let entry = activity_log::Entity::find()
        .filter(activity_log::Column::Action.eq(ActivityAction::Export))
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("export logged");
    let details = entry.details.unwrap();
    assert_eq!(details["detail"], true);
    assert_eq!(details["rows"], 2);
}
