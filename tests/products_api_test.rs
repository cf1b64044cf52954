mod common;

use axum::http::Method;
use common::{decimal, response_json, TestApp};
use rstest::rstest;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

async fn seed(app: &TestApp) {
    app.seed_product("BEER-001", "Lager 33cl", "beer", "1.25", true).await;
    app.seed_product("BEER-002", "IPA 33cl", "beer", "2.50", false).await;
    app.seed_product("WATER-001", "Still Water 1.5L", "water", "0.75", true).await;
    app.seed_product("WINE-001", "Douro Red 75cl", "wine", "9.50", true).await;
}

fn skus(body: &Value) -> Vec<String> {
    let mut skus: Vec<String> = body["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|p| p["sku"].as_str().unwrap_or_default().to_string())
        .collect();
    skus.sort();
    skus
}

#[rstest]
#[case("category=beer", vec!["BEER-001", "BEER-002"])]
#[case("category=beer&is_active=true", vec!["BEER-001"])]
#[case("min_price=1&max_price=3", vec!["BEER-001", "BEER-002"])]
#[case("max_price=1", vec!["WATER-001"])]
#[case("search=douro", vec!["WINE-001"])]
#[case("search=water-001", vec!["WATER-001"])]
#[case("is_active=false", vec!["BEER-002"])]
#[tokio::test]
async fn filters_narrow_results(#[case] query: &str, #[case] expected: Vec<&str>) {
    let app = TestApp::new().await;
    seed(&app).await;

    let response = app
        .request_authenticated(Method::GET, &format!("/api/cms/products?{}", query), None)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(skus(&response_json(response).await), expected);
}

#[tokio::test]
async fn inverted_price_range_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(Method::GET, "/api/cms/products?min_price=10&max_price=1", None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn create_update_and_duplicate_sku() {
    let app = TestApp::new().await;
    let payload = json!({
        "sku": "JUICE-001",
        "name": "Orange Juice 1L",
        "category": "juice",
        "price": "2.25",
        "units_per_case": 12
    });

    let created = app
        .request_authenticated(Method::POST, "/api/cms/products", Some(payload.clone()))
        .await;
    assert_eq!(created.status(), 201);
    let created = response_json(created).await;
    assert_eq!(created["category"], "juice");
    assert_eq!(decimal(&created["price"]), Decimal::from_str("2.25").unwrap());
    assert_eq!(created["is_active"], true);

    let duplicate = app
        .request_authenticated(Method::POST, "/api/cms/products", Some(payload))
        .await;
    assert_eq!(duplicate.status(), 409);

    let id = created["id"].as_str().unwrap();
    let updated = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/cms/products/{}", id),
            Some(json!({ "price": "2.50", "is_active": false })),
        )
        .await;
    assert_eq!(updated.status(), 200);
    let updated = response_json(updated).await;
    assert_eq!(decimal(&updated["price"]), Decimal::from_str("2.5").unwrap());
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["name"], "Orange Juice 1L");
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/cms/products",
            Some(json!({
                "sku": "BAD-1",
                "name": "Broken",
                "category": "other",
                "price": "-1.00"
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn products_on_orders_cannot_be_deleted() {
    let app = TestApp::new().await;
    let customer = app
        .seed_customer("Harbor Bar", "owner@harborbar.pt", "bar", "Lisbon")
        .await;
    let ordered = app.seed_product("BEER-001", "Lager 33cl", "beer", "1.25", true).await;
    let unused = app.seed_product("BEER-009", "Stout 33cl", "beer", "2.25", true).await;

    let order = app
        .request_authenticated(
            Method::POST,
            "/api/cms/orders",
            Some(json!({
                "customer_id": customer.id,
                "items": [{ "product_id": ordered.id, "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(order.status(), 201);

    let blocked = app
        .request_authenticated(Method::DELETE, &format!("/api/cms/products/{}", ordered.id), None)
        .await;
    assert_eq!(blocked.status(), 409);

    let removed = app
        .request_authenticated(Method::DELETE, &format!("/api/cms/products/{}", unused.id), None)
        .await;
    assert_eq!(removed.status(), 204);
}

#[tokio::test]
async fn categories_are_listed() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(Method::GET, "/api/cms/products/categories", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["value"] == "soft_drink"));
}
