use crate::{
    auth::{hash_password, verify_password, MIN_PASSWORD_LENGTH},
    db::DbPool,
    entities::{parse_code, session, user, UserRole},
    errors::ServiceError,
    services::customers::normalize_email,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    /// `admin` or `editor`
    #[schema(example = "editor")]
    pub role: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

fn parse_role(raw: &str) -> Result<UserRole, ServiceError> {
    parse_code(raw).ok_or_else(|| ServiceError::ValidationError(format!("Unknown role '{}'", raw.trim())))
}

/// Back-office account management and credential checks
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    /// Hash verified against when the email is unknown, so both paths cost one Argon2 run
    dummy_hash: Arc<OnceCell<String>>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    async fn dummy_hash(&self) -> Result<&str, ServiceError> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| async { hash_password("unknown-account-placeholder") })
            .await?;
        Ok(hash.as_str())
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<user::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(user::Entity::find()
            .order_by_asc(user::Column::Name)
            .all(db)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;
        user::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(db)
            .await?)
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: CreateUser) -> Result<user::Model, ServiceError> {
        input.validate()?;
        let role = parse_role(&input.role)?;
        let email = normalize_email(&input.email);

        if self.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A user with email {} already exists",
                email
            )));
        }

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            role: Set(role),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let db = &*self.db_pool;
        let created = model.insert(db).await.map_err(|e| {
            ServiceError::from_db_with_conflict(e, format!("A user with email {} already exists", email))
        })?;
        info!(user_id = %created.id, role = ?created.role, "user created");
        Ok(created)
    }

    /// Updates a user on behalf of `acting_user_id`. Admins cannot demote or
    /// deactivate themselves; deactivation ends all sessions of the target.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        acting_user_id: Uuid,
        id: Uuid,
        input: UpdateUser,
    ) -> Result<user::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;
        let role = input.role.as_deref().map(parse_role).transpose()?;

        if acting_user_id == id {
            if input.is_active == Some(false) {
                return Err(ServiceError::InvalidOperation(
                    "You cannot deactivate your own account".into(),
                ));
            }
            if matches!(role, Some(r) if r != existing.role) {
                return Err(ServiceError::InvalidOperation(
                    "You cannot change your own role".into(),
                ));
            }
        }

        let deactivating = existing.is_active && input.is_active == Some(false);
        let mut model: user::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(role) = role {
            model.role = Set(role);
        }
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        if let Some(password) = input.password {
            model.password_hash = Set(hash_password(&password)?);
        }
        model.updated_at = Set(Utc::now());

        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let updated = model.update(&txn).await?;
        if deactivating {
            let removed = session::Entity::delete_many()
                .filter(session::Column::UserId.eq(id))
                .exec(&txn)
                .await?;
            info!(user_id = %id, sessions = removed.rows_affected, "user deactivated");
        }
        txn.commit().await?;

        Ok(updated)
    }

    /// Checks credentials. Unknown email, wrong password and inactive
    /// accounts all produce the same error.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid email or password".to_string());

        let Some(user) = self.find_by_email(email).await? else {
            let _ = verify_password(password, self.dummy_hash().await?);
            return Err(invalid());
        };
        if !verify_password(password, &user.password_hash) {
            warn!(user_id = %user.id, "failed login attempt");
            return Err(invalid());
        }
        if !user.is_active {
            warn!(user_id = %user.id, "login attempt on inactive account");
            return Err(invalid());
        }
        Ok(user)
    }

    pub async fn record_login(&self, user: user::Model) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;
        let mut model: user::ActiveModel = user.into();
        model.last_login_at = Set(Some(Utc::now()));
        Ok(model.update(db).await?)
    }

    /// Creates an admin account unless one with this email already exists.
    /// Returns `true` when a user was created.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, name: &str, password: &str) -> Result<bool, ServiceError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if self.find_by_email(email).await?.is_some() {
            return Ok(false);
        }
        self.create(CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: "admin".into(),
        })
        .await?;
        Ok(true)
    }
}
