use crate::{
    db::DbPool,
    entities::{order_item, parse_code, product, ProductCategory},
    errors::ServiceError,
    services::{clean, contains_ci, non_empty, PageRequest},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// List/export filters for products
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Matches name, SKU or brand
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub is_active: Option<bool>,
    #[param(value_type = Option<String>)]
    pub min_price: Option<Decimal>,
    #[param(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    pub fn condition(&self) -> Result<Condition, ServiceError> {
        let mut cond = Condition::all();

        if let Some(term) = non_empty(self.search.as_deref()) {
            cond = cond.add(
                Condition::any()
                    .add(contains_ci((product::Entity, product::Column::Name), term))
                    .add(contains_ci((product::Entity, product::Column::Sku), term))
                    .add(contains_ci((product::Entity, product::Column::Brand), term)),
            );
        }
        if let Some(raw) = non_empty(self.category.as_deref()) {
            cond = cond.add(product::Column::Category.eq(parse_category(raw)?));
        }
        if let Some(brand) = non_empty(self.brand.as_deref()) {
            cond = cond.add(contains_ci((product::Entity, product::Column::Brand), brand));
        }
        if let Some(active) = self.is_active {
            cond = cond.add(product::Column::IsActive.eq(active));
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(ServiceError::ValidationError(
                    "min_price cannot be greater than max_price".into(),
                ));
            }
        }
        if let Some(min) = self.min_price {
            cond = cond.add(product::Column::Price.gte(min));
        }
        if let Some(max) = self.max_price {
            cond = cond.add(product::Column::Price.lte(max));
        }

        Ok(cond)
    }
}

pub(crate) fn parse_category(raw: &str) -> Result<ProductCategory, ServiceError> {
    parse_code(raw)
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown product category '{}'", raw.trim())))
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = ValidationError::new("price");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 64, message = "SKU must be between 1 and 64 characters"))]
    pub sku: String,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "soft_drink")]
    pub category: String,
    #[validate(length(max = 120))]
    pub brand: Option<String>,
    #[validate(range(min = 1, message = "Volume must be positive"))]
    pub volume_ml: Option<i32>,
    #[validate(range(min = 1, message = "Units per case must be positive"))]
    pub units_per_case: Option<i32>,
    #[validate(custom = "validate_price")]
    #[schema(value_type = String, example = "18.50")]
    pub price: Decimal,
    pub is_active: Option<bool>,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 64, message = "SKU must be between 1 and 64 characters"))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(length(max = 120))]
    pub brand: Option<String>,
    #[validate(range(min = 1, message = "Volume must be positive"))]
    pub volume_ml: Option<i32>,
    #[validate(range(min = 1, message = "Units per case must be positive"))]
    pub units_per_case: Option<i32>,
    #[validate(custom = "validate_price")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Service for the product catalog
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists products ordered by name
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let paginator = product::Entity::find()
            .filter(filter.condition()?)
            .order_by_asc(product::Column::Name)
            .paginate(db, page.per_page);

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.index()).await?;
        Ok((products, total))
    }

    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        filter: &ProductFilter,
        limit: u64,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(product::Entity::find()
            .filter(filter.condition()?)
            .order_by_asc(product::Column::Name)
            .limit(limit)
            .all(db)
            .await?)
    }

    /// Active products for the public site, optionally narrowed by category and search
    #[instrument(skip(self))]
    pub async fn list_public(
        &self,
        category: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let filter = ProductFilter {
            search: search.map(str::to_string),
            category: category.map(str::to_string),
            is_active: Some(true),
            ..Default::default()
        };
        let db = &*self.db_pool;
        Ok(product::Entity::find()
            .filter(filter.condition()?)
            .order_by_asc(product::Column::Category)
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;
        product::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    async fn ensure_sku_free(&self, sku: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = product::Entity::find()
            .filter(product::Column::Sku.eq(sku))
            .one(db)
            .await?;
        match existing {
            Some(p) if Some(p.id) != except => Err(ServiceError::Conflict(format!(
                "A product with SKU {} already exists",
                sku
            ))),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create(&self, input: CreateProduct) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let category = parse_category(&input.category)?;
        let sku = input.sku.trim().to_string();
        self.ensure_sku_free(&sku, None).await?;

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.clone()),
            name: Set(input.name.trim().to_string()),
            description: Set(clean(input.description)),
            category: Set(category),
            brand: Set(clean(input.brand)),
            volume_ml: Set(input.volume_ml),
            units_per_case: Set(input.units_per_case.unwrap_or(1)),
            price: Set(input.price),
            is_active: Set(input.is_active.unwrap_or(true)),
            image_url: Set(clean(input.image_url)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let db = &*self.db_pool;
        let created = model.insert(db).await.map_err(|e| {
            ServiceError::from_db_with_conflict(e, format!("A product with SKU {} already exists", sku))
        })?;
        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateProduct) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;
        let mut model: product::ActiveModel = existing.into();

        if let Some(sku) = input.sku {
            let sku = sku.trim().to_string();
            self.ensure_sku_free(&sku, Some(id)).await?;
            model.sku = Set(sku);
        }
        if let Some(name) = input.name {
            model.name = Set(name.trim().to_string());
        }
        if input.description.is_some() {
            model.description = Set(clean(input.description));
        }
        if let Some(raw) = input.category {
            model.category = Set(parse_category(&raw)?);
        }
        if input.brand.is_some() {
            model.brand = Set(clean(input.brand));
        }
        if input.volume_ml.is_some() {
            model.volume_ml = Set(input.volume_ml);
        }
        if let Some(units) = input.units_per_case {
            model.units_per_case = Set(units);
        }
        if let Some(price) = input.price {
            model.price = Set(price);
        }
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        if input.image_url.is_some() {
            model.image_url = Set(clean(input.image_url));
        }
        model.updated_at = Set(Utc::now());

        let db = &*self.db_pool;
        let updated = model
            .update(db)
            .await
            .map_err(|e| ServiceError::from_db_with_conflict(e, "Product SKU already in use"))?;
        info!(product_id = %id, "product updated");
        Ok(updated)
    }

    /// Deletes a product that no order item references
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = self.get(id).await?;

        let references = order_item::Entity::find()
            .filter(order_item::Column::ProductId.eq(id))
            .count(db)
            .await?;
        if references > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product is used by {} order item(s) and cannot be deleted; deactivate it instead",
                references
            )));
        }

        product::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(|e| ServiceError::from_db_with_conflict(e, "Product is still referenced"))?;
        info!(product_id = %id, "product deleted");
        Ok(existing)
    }
}
