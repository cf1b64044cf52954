use crate::{
    db::DbPool,
    entities::{customer, order, BusinessType},
    errors::ServiceError,
    services::{clean, contains_ci, non_empty, PageRequest},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// List/export filters for customers
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerFilter {
    /// Matches business name, contact name, email or phone
    pub search: Option<String>,
    /// Business type code or label
    pub business_type: Option<String>,
    pub city: Option<String>,
    pub is_active: Option<bool>,
}

impl CustomerFilter {
    pub fn condition(&self) -> Result<Condition, ServiceError> {
        let mut cond = Condition::all();

        if let Some(term) = non_empty(self.search.as_deref()) {
            cond = cond.add(
                Condition::any()
                    .add(contains_ci(
                        (customer::Entity, customer::Column::BusinessName),
                        term,
                    ))
                    .add(contains_ci(
                        (customer::Entity, customer::Column::ContactName),
                        term,
                    ))
                    .add(contains_ci((customer::Entity, customer::Column::Email), term))
                    .add(contains_ci((customer::Entity, customer::Column::Phone), term)),
            );
        }
        if let Some(raw) = non_empty(self.business_type.as_deref()) {
            cond = cond.add(customer::Column::BusinessType.eq(parse_business_type(raw)?));
        }
        if let Some(city) = non_empty(self.city.as_deref()) {
            cond = cond.add(contains_ci((customer::Entity, customer::Column::City), city));
        }
        if let Some(active) = self.is_active {
            cond = cond.add(customer::Column::IsActive.eq(active));
        }

        Ok(cond)
    }
}

pub(crate) fn parse_business_type(raw: &str) -> Result<BusinessType, ServiceError> {
    BusinessType::parse(raw)
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown business type '{}'", raw.trim())))
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCustomer {
    #[validate(length(min = 1, max = 200, message = "Business name must be between 1 and 200 characters"))]
    pub business_name: String,
    #[validate(length(max = 200))]
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 120))]
    pub city: Option<String>,
    /// Code (`bar`) or label (`Bar / Pub`)
    #[schema(example = "restaurant")]
    pub business_type: String,
    #[validate(length(max = 64))]
    pub tax_id: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomer {
    #[validate(length(min = 1, max = 200, message = "Business name must be between 1 and 200 characters"))]
    pub business_name: Option<String>,
    #[validate(length(max = 200))]
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 120))]
    pub city: Option<String>,
    pub business_type: Option<String>,
    #[validate(length(max = 64))]
    pub tax_id: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

/// Service for managing customers
#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists customers ordered by business name
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &CustomerFilter,
        page: PageRequest,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let paginator = customer::Entity::find()
            .filter(filter.condition()?)
            .order_by_asc(customer::Column::BusinessName)
            .paginate(db, page.per_page);

        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page.index()).await?;
        Ok((customers, total))
    }

    /// All matching customers up to `limit`, for exports
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        filter: &CustomerFilter,
        limit: u64,
    ) -> Result<Vec<customer::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(customer::Entity::find()
            .filter(filter.condition()?)
            .order_by_asc(customer::Column::BusinessName)
            .limit(limit)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        let db = &*self.db_pool;
        customer::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    pub async fn find_by_email<C: ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<Option<customer::Model>, ServiceError> {
        Ok(customer::Entity::find()
            .filter(customer::Column::Email.eq(normalize_email(email)))
            .one(db)
            .await?)
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: CreateCustomer) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let created = Self::insert(db, input).await?;
        info!(customer_id = %created.id, "customer created");
        Ok(created)
    }

    /// Inserts a validated customer on the given connection
    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        input: CreateCustomer,
    ) -> Result<customer::Model, ServiceError> {
        let business_type = parse_business_type(&input.business_type)?;
        let email = normalize_email(&input.email);

        if Self::find_by_email(db, &email).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A customer with email {} already exists",
                email
            )));
        }

        let now = Utc::now();
        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_name: Set(input.business_name.trim().to_string()),
            contact_name: Set(clean(input.contact_name)),
            email: Set(email.clone()),
            phone: Set(clean(input.phone)),
            address: Set(clean(input.address)),
            city: Set(clean(input.city)),
            business_type: Set(business_type),
            tax_id: Set(clean(input.tax_id)),
            notes: Set(clean(input.notes)),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(db).await.map_err(|e| {
            ServiceError::from_db_with_conflict(
                e,
                format!("A customer with email {} already exists", email),
            )
        })
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCustomer,
    ) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let existing = self.get(id).await?;
        let mut model: customer::ActiveModel = existing.clone().into();

        if let Some(name) = input.business_name {
            model.business_name = Set(name.trim().to_string());
        }
        if let Some(email) = input.email {
            let email = normalize_email(&email);
            if email != existing.email {
                if let Some(other) = Self::find_by_email(db, &email).await? {
                    if other.id != id {
                        return Err(ServiceError::Conflict(format!(
                            "A customer with email {} already exists",
                            email
                        )));
                    }
                }
            }
            model.email = Set(email);
        }
        if let Some(raw) = input.business_type {
            model.business_type = Set(parse_business_type(&raw)?);
        }
        if input.contact_name.is_some() {
            model.contact_name = Set(clean(input.contact_name));
        }
        if input.phone.is_some() {
            model.phone = Set(clean(input.phone));
        }
        if input.address.is_some() {
            model.address = Set(clean(input.address));
        }
        if input.city.is_some() {
            model.city = Set(clean(input.city));
        }
        if input.tax_id.is_some() {
            model.tax_id = Set(clean(input.tax_id));
        }
        if input.notes.is_some() {
            model.notes = Set(clean(input.notes));
        }
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        model.updated_at = Set(Utc::now());

        let updated = model
            .update(db)
            .await
            .map_err(|e| ServiceError::from_db_with_conflict(e, "Customer email already in use"))?;
        info!(customer_id = %id, "customer updated");
        Ok(updated)
    }

    /// Deletes a customer that has no orders
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = self.get(id).await?;

        let order_count = order::Entity::find()
            .filter(order::Column::CustomerId.eq(id))
            .count(db)
            .await?;
        if order_count > 0 {
            return Err(ServiceError::Conflict(format!(
                "Customer has {} order(s) and cannot be deleted; deactivate it instead",
                order_count
            )));
        }

        customer::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(|e| ServiceError::from_db_with_conflict(e, "Customer is still referenced"))?;
        info!(customer_id = %id, "customer deleted");
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_rejects_unknown_business_type() {
        let filter = CustomerFilter {
            business_type: Some("spaceport".into()),
            ..Default::default()
        };
        assert!(matches!(
            filter.condition(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn filter_accepts_label_or_code() {
        for raw in ["Bar / Pub", "bar", " BAR "] {
            let filter = CustomerFilter {
                business_type: Some(raw.into()),
                ..Default::default()
            };
            assert!(filter.condition().is_ok(), "{raw} should be accepted");
        }
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Orders@Example.COM "), "orders@example.com");
    }
}
