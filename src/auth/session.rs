use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{session, user},
    errors::ServiceError,
};
use chrono::{Duration, Utc};
use rand::RngCore;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Raw token bytes before hex encoding
const TOKEN_BYTES: usize = 32;

/// Session cookie settings taken from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub ttl_secs: u64,
    pub secure: bool,
}

impl From<&AppConfig> for SessionSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            cookie_name: cfg.session_cookie_name.clone(),
            ttl_secs: cfg.session_ttl_secs,
            secure: cfg.session_cookie_secure,
        }
    }
}

impl SessionSettings {
    /// `Set-Cookie` value carrying a freshly issued token
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.cookie_name, token, self.ttl_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that makes the browser drop the session cookie
    pub fn removal_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
            self.cookie_name
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Hex SHA-256 of a session token; only this digest is persisted.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues, resolves and revokes cookie sessions
#[derive(Clone)]
pub struct SessionService {
    db_pool: Arc<DbPool>,
    settings: SessionSettings,
}

impl SessionService {
    pub fn new(db_pool: Arc<DbPool>, settings: SessionSettings) -> Self {
        Self { db_pool, settings }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Creates a session for `user` and returns the raw token for the cookie
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create(
        &self,
        user: &user::Model,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(String, session::Model), ServiceError> {
        let db = &*self.db_pool;
        let token = generate_token();
        let now = Utc::now();
        let ttl = Duration::seconds(i64::try_from(self.settings.ttl_secs).unwrap_or(i64::MAX / 1000));

        let model = session::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            token_hash: Set(hash_token(&token)),
            ip_address: Set(ip_address),
            user_agent: Set(user_agent.map(|ua| ua.chars().take(255).collect())),
            created_at: Set(now),
            expires_at: Set(now + ttl),
        }
        .insert(db)
        .await?;

        Ok((token, model))
    }

    /// Looks up the session and its user. Expired sessions are deleted on sight;
    /// inactive users resolve to `None`.
    #[instrument(skip(self, token))]
    pub async fn resolve(
        &self,
        token: &str,
    ) -> Result<Option<(session::Model, user::Model)>, ServiceError> {
        let db = &*self.db_pool;
        let found = session::Entity::find()
            .filter(session::Column::TokenHash.eq(hash_token(token)))
            .find_also_related(user::Entity)
            .one(db)
            .await?;

        let (session, user) = match found {
            Some((session, Some(user))) => (session, user),
            Some((session, None)) => {
                session.delete(db).await?;
                return Ok(None);
            }
            None => return Ok(None),
        };

        if session.is_expired(Utc::now()) {
            debug!(session_id = %session.id, "dropping expired session");
            session.delete(db).await?;
            return Ok(None);
        }
        if !user.is_active {
            return Ok(None);
        }

        Ok(Some((session, user)))
    }

    pub async fn revoke(&self, session_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        session::Entity::delete_by_id(session_id).exec(db).await?;
        Ok(())
    }

    /// Deletes all expired sessions
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(Utc::now()))
            .exec(db)
            .await?;
        if result.rows_affected > 0 {
            debug!(purged = result.rows_affected, "purged expired sessions");
        }
        Ok(result.rows_affected)
    }
}
