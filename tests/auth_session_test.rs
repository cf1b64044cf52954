mod common;

use axum::http::Method;
use beverage_cms::entities::session;
use chrono::{Duration, Utc};
use common::{cookie_pair, response_json, set_cookie, TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

#[tokio::test]
async fn login_sets_http_only_session_cookie() {
    let app = TestApp::new().await;

    let response = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(response.status(), 200);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with(&format!("{}=", app.state.config.session_cookie_name)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age="));

    let body = response_json(response).await;
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn login_is_case_insensitive_on_email() {
    let app = TestApp::new().await;
    let response = app.login("  ADMIN@Example.com ", ADMIN_PASSWORD).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn bad_credentials_get_the_same_generic_401() {
    let app = TestApp::new().await;

    let wrong_password = app.login(ADMIN_EMAIL, "not-the-password").await;
    assert_eq!(wrong_password.status(), 401);
    let wrong_password = response_json(wrong_password).await;

    let unknown_user = app.login("nobody@example.com", "whatever-123").await;
    assert_eq!(unknown_user.status(), 401);
    let unknown_user = response_json(unknown_user).await;

    assert_eq!(wrong_password["error"], unknown_user["error"]);
}

#[tokio::test]
async fn session_endpoint_requires_cookie() {
    let app = TestApp::new().await;

    let anonymous = app.request(Method::GET, "/api/auth/session", None, None).await;
    assert_eq!(anonymous.status(), 401);

    let bogus = app
        .request(Method::GET, "/api/auth/session", None, Some("cms_session=deadbeef"))
        .await;
    assert_eq!(bogus.status(), 401);

    let current = app
        .request_authenticated(Method::GET, "/api/auth/session", None)
        .await;
    assert_eq!(current.status(), 200);
    let body = response_json(current).await;
    assert_eq!(body["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = TestApp::new().await;
    let cookie = app.login_cookie(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .request(Method::POST, "/api/auth/logout", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), 204);
    assert!(set_cookie(&response).contains("Max-Age=0"));

    let after = app
        .request(Method::GET, "/api/auth/session", None, Some(&cookie))
        .await;
    assert_eq!(after.status(), 401);

    let again = app
        .request(Method::POST, "/api/auth/logout", None, Some(&cookie))
        .await;
    assert_eq!(again.status(), 401);
}

#[tokio::test]
async fn expired_sessions_are_rejected_and_removed() {
    let app = TestApp::new().await;
    let (token, created) = app
        .state
        .services
        .sessions
        .create(&app.admin, None, None)
        .await
        .unwrap();

    let mut expired: session::ActiveModel = created.into();
    expired.expires_at = Set(Utc::now() - Duration::minutes(5));
    expired.update(&*app.state.db).await.unwrap();

    let cookie = format!("{}={}", app.state.config.session_cookie_name, token);
    let response = app
        .request(Method::GET, "/api/auth/session", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), 401);

    // Only the harness login session is left
    let remaining = session::Entity::find().count(&*app.state.db).await.unwrap();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn inactive_users_cannot_log_in() {
    let app = TestApp::new().await;
    let editor = app.create_editor("editor@example.com", "editor-pass-1").await;
    let editor_cookie = app.login_cookie("editor@example.com", "editor-pass-1").await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/cms/users/{}", editor.id),
            Some(serde_json::json!({ "is_active": false })),
        )
        .await;
    assert_eq!(response.status(), 200);

    // Deactivation ends existing sessions
    let session = app
        .request(Method::GET, "/api/auth/session", None, Some(&editor_cookie))
        .await;
    assert_eq!(session.status(), 401);

    let login = app.login("editor@example.com", "editor-pass-1").await;
    assert_eq!(login.status(), 401);
}

#[tokio::test]
async fn each_login_issues_a_distinct_token() {
    let app = TestApp::new().await;
    let first = cookie_pair(&set_cookie(&app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await));
    let second = cookie_pair(&set_cookie(&app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await));
    assert_ne!(first, second);
}
