use super::common::created_response;
use crate::{
    auth::{AdminUser, UserProfile},
    entities::{ActivityAction, EntityType},
    errors::{ErrorResponse, ServiceError},
    services::{
        activity_log::ActivityEntry,
        users::{CreateUser, UpdateUser},
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::ActiveEnum;
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/cms/users",
    tag = "users",
    responses(
        (status = 200, description = "Back-office users", body = [UserProfile]),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserProfile>>, ServiceError> {
    let users = state.services.users.list().await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/cms/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserProfile),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, ServiceError> {
    Ok(Json(state.services.users.get(id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/cms/users",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(current): AdminUser,
    Json(input): Json<CreateUser>,
) -> Result<Response, ServiceError> {
    let created = state.services.users.create(input).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Create, EntityType::User)
                .entity(created.id)
                .details(json!({ "email": created.email, "role": created.role.to_value() })),
        )
        .await;
    Ok(created_response(UserProfile::from(created)))
}

/// Admins cannot deactivate or demote their own account
#[utoipa::path(
    put,
    path = "/api/cms/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserProfile),
        (status = 400, description = "Self-deactivation or self-demotion", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(current): AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<UserProfile>, ServiceError> {
    let password_changed = input.password.is_some();
    let updated = state.services.users.update(current.id(), id, input).await?;
    state
        .services
        .activity_log
        .record(
            &current.actor(),
            ActivityEntry::new(ActivityAction::Update, EntityType::User)
                .entity(id)
                .details(json!({
                    "role": updated.role.to_value(),
                    "is_active": updated.is_active,
                    "password_changed": password_changed,
                })),
        )
        .await;
    Ok(Json(updated.into()))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user))
}
