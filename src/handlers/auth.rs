use crate::{
    auth::{ClientInfo, CurrentUser, UserProfile},
    entities::{ActivityAction, EntityType},
    errors::{ErrorResponse, ServiceError},
    services::{
        activity_log::{ActivityEntry, Actor},
        users::LoginRequest,
    },
    AppState,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserProfile,
    /// Session lifetime in seconds
    pub expires_in: u64,
}

/// Log in with email and password; sets the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = LoginResponse,
            headers(("Set-Cookie" = String, description = "HttpOnly session cookie"))
        ),
        (status = 400, description = "Missing credentials", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ServiceError> {
    request.validate()?;
    let services = &state.services;

    let user = services
        .users
        .authenticate(&request.email, &request.password)
        .await?;

    if let Err(e) = services.sessions.purge_expired().await {
        warn!(error = %e, "failed to purge expired sessions");
    }

    let (token, session) = services
        .sessions
        .create(&user, client.ip_address.clone(), client.user_agent.clone())
        .await?;
    let user = services.users.record_login(user).await?;

    let actor = Actor {
        user_id: Some(user.id),
        email: Some(user.email.clone()),
        ip_address: client.ip_address.clone(),
    };
    services
        .activity_log
        .record(
            &actor,
            ActivityEntry::new(ActivityAction::Login, EntityType::Session).entity(session.id),
        )
        .await;
    info!(user_id = %user.id, "user logged in");

    let settings = services.sessions.settings();
    let body = LoginResponse {
        user: UserProfile::from(user),
        expires_in: settings.ttl_secs,
    };
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, settings.session_cookie(&token))],
        Json(body),
    )
        .into_response())
}

/// End the current session and expire the cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Logged out; cookie cleared"),
        (status = 401, description = "No active session", body = ErrorResponse),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, ServiceError> {
    let services = &state.services;
    services.sessions.revoke(current.session_id).await?;
    services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Logout, EntityType::Session)
                .entity(current.session_id),
        )
        .await;
    info!(user_id = %current.id(), "user logged out");

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, services.sessions.settings().removal_cookie())],
    )
        .into_response())
}

/// Profile of the logged-in user
#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "auth",
    responses(
        (status = 200, description = "Current session", body = UserProfile),
        (status = 401, description = "Missing, unknown or expired session", body = ErrorResponse),
    )
)]
pub async fn session(current: CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(current.user))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
}
