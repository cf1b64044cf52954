#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use beverage_cms::{
    config::AppConfig,
    db,
    entities::{customer, product, user},
    services::{customers::CreateCustomer, products::CreateProduct, users::CreateUser},
    AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password-1";

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub admin: user::Model,
    cookie: String,
}

impl TestApp {
    /// Construct a new test application with fresh database state and a logged-in admin.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestApp::new`], with a hook to adjust configuration first.
    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.company_name = "Test Beverages Ltd.".to_string();
        configure(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let admin = state
            .services
            .users
            .create(CreateUser {
                name: "Admin".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
                role: "admin".to_string(),
            })
            .await
            .expect("seed admin user");

        let router = beverage_cms::build_router(state.clone());
        let mut app = Self {
            router,
            state,
            admin,
            cookie: String::new(),
        };
        app.cookie = app.login_cookie(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        app
    }

    /// `name=token` pair of the seeded admin's session
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Send a request against the router with an optional session cookie.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for requests carrying the admin session.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.cookie())).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.request(
            Method::POST,
            "/api/auth/login",
            Some(serde_json::json!({ "email": email, "password": password })),
            None,
        )
        .await
    }

    /// Logs in and returns the `name=token` pair from `Set-Cookie`.
    pub async fn login_cookie(&self, email: &str, password: &str) -> String {
        let response = self.login(email, password).await;
        assert_eq!(response.status(), 200, "login failed for {}", email);
        cookie_pair(&set_cookie(&response))
    }

    pub async fn create_editor(&self, email: &str, password: &str) -> user::Model {
        self.state
            .services
            .users
            .create(CreateUser {
                name: "Editor".to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role: "editor".to_string(),
            })
            .await
            .expect("seed editor user")
    }

    pub async fn seed_customer(
        &self,
        business_name: &str,
        email: &str,
        business_type: &str,
        city: &str,
    ) -> customer::Model {
        self.state
            .services
            .customers
            .create(CreateCustomer {
                business_name: business_name.to_string(),
                contact_name: Some("Maria Silva".to_string()),
                email: email.to_string(),
                phone: Some("+351 210 000 000".to_string()),
                address: Some("Rua do Ouro 10".to_string()),
                city: Some(city.to_string()),
                business_type: business_type.to_string(),
                tax_id: None,
                notes: None,
                is_active: Some(true),
            })
            .await
            .expect("seed customer")
    }

    pub async fn seed_product(
        &self,
        sku: &str,
        name: &str,
        category: &str,
        price: &str,
        is_active: bool,
    ) -> product::Model {
        self.state
            .services
            .products
            .create(CreateProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                description: Some(format!("{} for tests", name)),
                category: category.to_string(),
                brand: Some("Test Brewery".to_string()),
                volume_ml: Some(330),
                units_per_case: Some(24),
                price: Decimal::from_str(price).expect("valid price"),
                is_active: Some(is_active),
                image_url: None,
            })
            .await
            .expect("seed product")
    }
}

pub fn set_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("Set-Cookie header")
        .to_string()
}

/// First `name=value` segment of a `Set-Cookie` header
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("response body bytes")
        .to_bytes()
        .to_vec()
}

pub async fn response_json(response: Response) -> Value {
    let bytes = response_bytes(response).await;
    serde_json::from_slice(&bytes).expect("json response")
}

/// Parses a decimal serialized as a JSON string
pub fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal encoded as string")).expect("valid decimal")
}
