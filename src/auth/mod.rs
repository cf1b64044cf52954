//! Session-cookie authentication for the back-office.
//!
//! Login issues a random token that travels in an HttpOnly cookie; the
//! database keeps only its SHA-256 digest (see [`session`]). Every CMS handler
//! takes a [`CurrentUser`], which rejects the request with 401 when the
//! cookie is missing, unknown or expired.

pub mod password;
pub mod session;

pub use password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
pub use session::{hash_token, SessionService, SessionSettings};

use crate::{
    entities::{user, UserRole},
    errors::ServiceError,
    services::activity_log::Actor,
    AppState,
};
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::net::SocketAddr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Client address and user agent of the current request
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_parts(parts: &Parts) -> Self {
        let forwarded = forwarded_ip(&parts.headers);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            ip_address: forwarded.or(peer),
            user_agent: parts
                .headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientInfo::from_parts(parts))
    }
}

/// Public profile of a back-office user
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Authenticated back-office user, resolved from the session cookie
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: user::Model,
    pub session_id: Uuid,
    pub client: ClientInfo,
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == UserRole::Admin
    }

    /// Fails with 403 unless the user is an admin
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Administrator role required".to_string(),
            ))
        }
    }

    /// Actor recorded in the activity log for this user's actions
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: Some(self.user.id),
            email: Some(self.user.email.clone()),
            ip_address: self.client.ip_address.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let sessions = &state.services.sessions;
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&sessions.settings().cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

        let (session, user) = sessions
            .resolve(&token)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Session expired or invalid".to_string()))?;

        Ok(CurrentUser {
            user,
            session_id: session.id,
            client: ClientInfo::from_parts(parts),
        })
    }
}

/// [`CurrentUser`] that must hold the admin role; 403 otherwise
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        current.require_admin()?;
        Ok(AdminUser(current))
    }
}
