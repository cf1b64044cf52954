mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use rstest::rstest;
use serde_json::{json, Value};

async fn seed(app: &TestApp) {
    app.seed_customer("Harbor Bar", "owner@harborbar.pt", "bar", "Lisbon")
        .await;
    app.seed_customer("Café Central", "hello@cafecentral.pt", "cafe", "Porto")
        .await;
    app.seed_customer("Grand Hotel Lisboa", "purchasing@grandhotel.pt", "hotel", "Lisbon")
        .await;
    app.seed_customer("Adega do Mar", "reservas@adegadomar.pt", "restaurant", "Faro")
        .await;
}

fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|c| c["business_name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn list_requires_session() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/cms/customers", None, None).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn list_is_sorted_and_paginated() {
    let app = TestApp::new().await;
    seed(&app).await;

    let response = app
        .request_authenticated(Method::GET, "/api/cms/customers?page=1&per_page=3", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(
        names(&body),
        vec!["Adega do Mar", "Café Central", "Grand Hotel Lisboa"]
    );
    assert_eq!(body["pagination"]["total"], 4);
    assert_eq!(body["pagination"]["total_pages"], 2);

    let page_two = response_json(
        app.request_authenticated(Method::GET, "/api/cms/customers?page=2&per_page=3", None)
            .await,
    )
    .await;
    assert_eq!(names(&page_two), vec!["Harbor Bar"]);
}

#[rstest]
#[case("business_type=hotel", vec!["Grand Hotel Lisboa"])]
#[case("business_type=Bar%20%2F%20Pub", vec!["Harbor Bar"])]
#[case("city=lisbon", vec!["Grand Hotel Lisboa", "Harbor Bar"])]
#[case("search=CAFECENTRAL", vec!["Café Central"])]
#[case("search=adega&city=Faro", vec!["Adega do Mar"])]
#[case("search=%25", vec![])]
#[case("search=_", vec![])]
#[tokio::test]
async fn filters_narrow_results(#[case] query: &str, #[case] expected: Vec<&str>) {
    let app = TestApp::new().await;
    seed(&app).await;

    let response = app
        .request_authenticated(Method::GET, &format!("/api/cms/customers?{}", query), None)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(names(&response_json(response).await), expected);
}

#[tokio::test]
async fn unknown_business_type_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(Method::GET, "/api/cms/customers?business_type=spaceport", None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn crud_roundtrip_with_conflicts() {
    let app = TestApp::new().await;

    let payload = json!({
        "business_name": "Quiosque Azul",
        "email": "Quiosque@Azul.pt",
        "business_type": "convenience_store",
        "city": "Cascais"
    });
    let created = app
        .request_authenticated(Method::POST, "/api/cms/customers", Some(payload.clone()))
        .await;
    assert_eq!(created.status(), 201);
    let created = response_json(created).await;
    assert_eq!(created["email"], "quiosque@azul.pt");
    assert_eq!(created["business_type"], "convenience_store");
    assert_eq!(created["is_active"], true);
    let id = created["id"].as_str().unwrap().to_string();

    let duplicate = app
        .request_authenticated(Method::POST, "/api/cms/customers", Some(payload))
        .await;
    assert_eq!(duplicate.status(), 409);

    let updated = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/cms/customers/{}", id),
            Some(json!({ "phone": "+351 911 111 111", "is_active": false })),
        )
        .await;
    assert_eq!(updated.status(), 200);
    let updated = response_json(updated).await;
    assert_eq!(updated["phone"], "+351 911 111 111");
    assert_eq!(updated["business_name"], "Quiosque Azul");
    assert_eq!(updated["is_active"], false);

    let deleted = app
        .request_authenticated(Method::DELETE, &format!("/api/cms/customers/{}", id), None)
        .await;
    assert_eq!(deleted.status(), 204);

    let missing = app
        .request_authenticated(Method::GET, &format!("/api/cms/customers/{}", id), None)
        .await;
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn invalid_payload_is_a_validation_error() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/cms/customers",
            Some(json!({
                "business_name": "",
                "email": "not-an-email",
                "business_type": "bar"
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn customers_with_orders_cannot_be_deleted() {
    let app = TestApp::new().await;
    let customer = app
        .seed_customer("Harbor Bar", "owner@harborbar.pt", "bar", "Lisbon")
        .await;
    let product = app.seed_product("BEER-001", "Lager 33cl", "beer", "1.25", true).await;

    let order = app
        .request_authenticated(
            Method::POST,
            "/api/cms/orders",
            Some(json!({
                "customer_id": customer.id,
                "items": [{ "product_id": product.id, "quantity": 4 }]
            })),
        )
        .await;
    assert_eq!(order.status(), 201);

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/cms/customers/{}", customer.id),
            None,
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn business_types_are_listed_with_labels() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(Method::GET, "/api/cms/customers/business-types", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 10);
    assert!(items
        .iter()
        .any(|i| i["value"] == "convenience_store" && i["label"] == "Convenience Store"));
}
