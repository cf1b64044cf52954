use crate::{
    db::DbPool,
    entities::{activity_log, ActivityAction, EntityType},
    errors::ServiceError,
    services::{day_end_exclusive, day_start, PageRequest},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::IntoParams;
use uuid::Uuid;

/// Who performed an action, as recorded in the activity log
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub ip_address: Option<String>,
}

/// A single entry to be written to the activity log
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl ActivityEntry {
    pub fn new(action: ActivityAction, entity_type: EntityType) -> Self {
        Self {
            action,
            entity_type,
            entity_id: None,
            details: None,
        }
    }

    pub fn entity(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityLogFilter {
    pub user_id: Option<Uuid>,
    /// login, logout, create, update, delete or export
    pub action: Option<String>,
    /// customer, product, order, user or session
    pub entity_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl ActivityLogFilter {
    fn condition(&self) -> Result<Condition, ServiceError> {
        let mut cond = Condition::all();
        if let Some(user_id) = self.user_id {
            cond = cond.add(activity_log::Column::UserId.eq(user_id));
        }
        if let Some(raw) = crate::services::non_empty(self.action.as_deref()) {
            let action: ActivityAction = crate::entities::parse_code(raw)
                .ok_or_else(|| ServiceError::ValidationError(format!("Unknown action '{}'", raw)))?;
            cond = cond.add(activity_log::Column::Action.eq(action));
        }
        if let Some(raw) = crate::services::non_empty(self.entity_type.as_deref()) {
            let entity_type: EntityType = crate::entities::parse_code(raw).ok_or_else(|| {
                ServiceError::ValidationError(format!("Unknown entity type '{}'", raw))
            })?;
            cond = cond.add(activity_log::Column::EntityType.eq(entity_type));
        }
        if let Some(from) = self.date_from {
            cond = cond.add(activity_log::Column::CreatedAt.gte(day_start(from)));
        }
        if let Some(to) = self.date_to {
            cond = cond.add(activity_log::Column::CreatedAt.lt(day_end_exclusive(to)));
        }
        Ok(cond)
    }
}

/// Writes and queries the back-office audit trail
#[derive(Clone)]
pub struct ActivityLogService {
    db_pool: Arc<DbPool>,
}

impl ActivityLogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records an entry. Failures are logged and swallowed so that auditing
    /// never breaks the request that triggered it.
    #[instrument(skip(self, actor, entry), fields(action = ?entry.action, entity = ?entry.entity_type))]
    pub async fn record(&self, actor: &Actor, entry: ActivityEntry) {
        if let Err(e) = Self::insert(&*self.db_pool, actor, entry).await {
            warn!(error = %e, "failed to write activity log entry");
        }
    }

    /// Inserts an entry on the given connection, surfacing errors.
    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        actor: &Actor,
        entry: ActivityEntry,
    ) -> Result<activity_log::Model, ServiceError> {
        let model = activity_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(actor.user_id),
            user_email: Set(actor.email.clone()),
            action: Set(entry.action),
            entity_type: Set(entry.entity_type),
            entity_id: Set(entry.entity_id),
            details: Set(entry.details),
            ip_address: Set(actor.ip_address.clone()),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(db).await?)
    }

    /// Lists entries, newest first
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ActivityLogFilter,
        page: PageRequest,
    ) -> Result<(Vec<activity_log::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let paginator = activity_log::Entity::find()
            .filter(filter.condition()?)
            .order_by_desc(activity_log::Column::CreatedAt)
            .paginate(db, page.per_page);

        let total = paginator.num_items().await?;
        let entries = paginator.fetch_page(page.index()).await?;
        Ok((entries, total))
    }
}
