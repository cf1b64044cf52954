use crate::{
    db::DbPool,
    entities::{customer, order, order_item, parse_code, product, OrderSource, OrderStatus},
    errors::ServiceError,
    services::{
        clean, contains_ci, customers::CreateCustomer, customers::CustomerService, day_end_exclusive,
        day_start, non_empty, PageRequest,
    },
};
use chrono::{NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Largest quantity accepted for a single line
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// List/export filters for orders
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub customer_id: Option<Uuid>,
    /// Inclusive, compared against the creation date
    pub date_from: Option<NaiveDate>,
    /// Inclusive, compared against the creation date
    pub date_to: Option<NaiveDate>,
    /// Matches the order number or the customer's business name
    pub search: Option<String>,
}

impl OrderFilter {
    pub fn condition(&self) -> Result<Condition, ServiceError> {
        let mut cond = Condition::all();

        if let Some(raw) = non_empty(self.status.as_deref()) {
            cond = cond.add(order::Column::Status.eq(parse_status(raw)?));
        }
        if let Some(customer_id) = self.customer_id {
            cond = cond.add(order::Column::CustomerId.eq(customer_id));
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ServiceError::ValidationError(
                    "date_from cannot be after date_to".into(),
                ));
            }
        }
        if let Some(from) = self.date_from {
            cond = cond.add(order::Column::CreatedAt.gte(day_start(from)));
        }
        if let Some(to) = self.date_to {
            cond = cond.add(order::Column::CreatedAt.lt(day_end_exclusive(to)));
        }
        if let Some(term) = non_empty(self.search.as_deref()) {
            cond = cond.add(
                Condition::any()
                    .add(contains_ci((order::Entity, order::Column::OrderNumber), term))
                    .add(contains_ci(
                        (customer::Entity, customer::Column::BusinessName),
                        term,
                    )),
            );
        }

        Ok(cond)
    }
}

pub(crate) fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    parse_code(raw)
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown order status '{}'", raw.trim())))
}

/// Generates a `REQ-YYYYMMDD-XXXXXX` order number
pub fn generate_order_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect();
    format!("REQ-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

/// Order created by staff from the CMS
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrder {
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderLineInput>,
    pub notes: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
}

/// Request form submitted from the public website
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PublicOrderRequest {
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
    /// Code or label of the business type
    pub business_type: String,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderLineInput>,
    pub notes: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOrderStatus {
    #[schema(example = "confirmed")]
    pub status: String,
}

/// Response to the public order form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderReceipt {
    pub order_number: String,
    pub status: OrderStatus,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
}

/// Row of the order list
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub status: OrderStatus,
    pub source: OrderSource,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub item_count: u64,
    pub requested_delivery_date: Option<NaiveDate>,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub customer: customer::Model,
    pub items: Vec<OrderItemDetail>,
}

fn summarize(
    order: order::Model,
    customer: Option<customer::Model>,
    item_counts: &HashMap<Uuid, u64>,
) -> OrderSummary {
    OrderSummary {
        item_count: item_counts.get(&order.id).copied().unwrap_or(0),
        customer_name: customer.map(|c| c.business_name).unwrap_or_default(),
        id: order.id,
        order_number: order.order_number,
        customer_id: order.customer_id,
        status: order.status,
        source: order.source,
        total_amount: order.total_amount,
        requested_delivery_date: order.requested_delivery_date,
        created_at: order.created_at,
    }
}

fn item_detail(item: order_item::Model, product: Option<product::Model>) -> OrderItemDetail {
    let (product_name, sku) = product
        .map(|p| (p.name, p.sku))
        .unwrap_or_else(|| (String::from("(deleted product)"), String::new()));
    OrderItemDetail {
        id: item.id,
        product_id: item.product_id,
        product_name,
        sku,
        quantity: item.quantity,
        unit_price: item.unit_price,
        line_total: item.line_total,
    }
}

/// Service for order requests
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn item_counts(&self, order_ids: Vec<Uuid>) -> Result<HashMap<Uuid, u64>, ServiceError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let db = &*self.db_pool;
        let rows: Vec<(Uuid, i64)> = order_item::Entity::find()
            .select_only()
            .column(order_item::Column::OrderId)
            .column_as(order_item::Column::Id.count(), "item_count")
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .group_by(order_item::Column::OrderId)
            .into_tuple()
            .all(db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u64))
            .collect())
    }

    /// Lists orders, newest first, with customer name and item count
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<OrderSummary>, u64), ServiceError> {
        let db = &*self.db_pool;
        let paginator = order::Entity::find()
            .find_also_related(customer::Entity)
            .filter(filter.condition()?)
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, page.per_page);

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.index()).await?;
        let counts = self
            .item_counts(rows.iter().map(|(o, _)| o.id).collect())
            .await?;

        Ok((
            rows.into_iter()
                .map(|(o, c)| summarize(o, c, &counts))
                .collect(),
            total,
        ))
    }

    /// All matching orders up to `limit`, for exports
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        filter: &OrderFilter,
        limit: u64,
    ) -> Result<Vec<OrderSummary>, ServiceError> {
        let db = &*self.db_pool;
        let rows = order::Entity::find()
            .find_also_related(customer::Entity)
            .filter(filter.condition()?)
            .order_by_desc(order::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await?;
        let counts = self
            .item_counts(rows.iter().map(|(o, _)| o.id).collect())
            .await?;
        Ok(rows
            .into_iter()
            .map(|(o, c)| summarize(o, c, &counts))
            .collect())
    }

    /// Items of the given orders, grouped per order
    pub async fn items_for_orders(
        &self,
        order_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<OrderItemDetail>>, ServiceError> {
        let mut grouped: HashMap<Uuid, Vec<OrderItemDetail>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }
        let db = &*self.db_pool;
        let rows = order_item::Entity::find()
            .find_also_related(product::Entity)
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;
        for (item, product) in rows {
            grouped
                .entry(item.order_id)
                .or_default()
                .push(item_detail(item, product));
        }
        Ok(grouped)
    }

    /// Order with its customer and items
    #[instrument(skip(self))]
    pub async fn get_detail(&self, id: Uuid) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db_pool;
        let (order, customer) = order::Entity::find_by_id(id)
            .find_also_related(customer::Entity)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
        let customer = customer.ok_or_else(|| {
            ServiceError::InternalError(format!("Order {} has no customer", id))
        })?;
        let items = self
            .items_for_orders(vec![id])
            .await?
            .remove(&id)
            .unwrap_or_default();

        Ok(OrderDetail {
            order,
            customer,
            items,
        })
    }

    /// Writes an order and its lines on `db`, pricing each line from the
    /// current product price.
    async fn insert_order<C: ConnectionTrait>(
        db: &C,
        customer_id: Uuid,
        lines: &[OrderLineInput],
        notes: Option<String>,
        requested_delivery_date: Option<NaiveDate>,
        source: OrderSource,
    ) -> Result<order::Model, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one item is required".into(),
            ));
        }

        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut priced = Vec::with_capacity(lines.len());
        let mut total = Decimal::ZERO;
        for line in lines {
            if !(1..=MAX_LINE_QUANTITY).contains(&line.quantity) {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity must be between 1 and {}",
                    MAX_LINE_QUANTITY
                )));
            }
            let product = products.get(&line.product_id).ok_or_else(|| {
                ServiceError::ValidationError(format!("Unknown product {}", line.product_id))
            })?;
            if !product.is_active {
                return Err(ServiceError::ValidationError(format!(
                    "Product {} is not available",
                    product.name
                )));
            }
            let line_total = product.price * Decimal::from(line.quantity);
            total += line_total;
            priced.push((product.id, line.quantity, product.price, line_total));
        }

        let mut order_number = generate_order_number();
        for _ in 0..5 {
            let taken = order::Entity::find()
                .filter(order::Column::OrderNumber.eq(order_number.as_str()))
                .count(db)
                .await?;
            if taken == 0 {
                break;
            }
            order_number = generate_order_number();
        }

        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number),
            customer_id: Set(customer_id),
            status: Set(OrderStatus::Pending),
            source: Set(source),
            notes: Set(clean(notes)),
            requested_delivery_date: Set(requested_delivery_date),
            total_amount: Set(total),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| ServiceError::from_db_with_conflict(e, "Order number collision, please retry"))?;

        for (product_id, quantity, unit_price, line_total) in priced {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                line_total: Set(line_total),
            }
            .insert(db)
            .await?;
        }

        Ok(order)
    }

    /// Creates an order for an existing customer from the CMS
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create(&self, input: CreateOrder) -> Result<order::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        customer::Entity::find_by_id(input.customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", input.customer_id))
            })?;

        let txn = db.begin().await?;
        let order = Self::insert_order(
            &txn,
            input.customer_id,
            &input.items,
            input.notes,
            input.requested_delivery_date,
            OrderSource::Cms,
        )
        .await?;
        txn.commit().await?;

        info!(order_id = %order.id, order_number = %order.order_number, "order created");
        Ok(order)
    }

    /// Takes an order request from the public website. The customer is
    /// matched by email or created, all in one transaction.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn submit_request(
        &self,
        input: PublicOrderRequest,
    ) -> Result<(order::Model, bool), ServiceError> {
        input.validate()?;
        let business_type = crate::services::customers::parse_business_type(&input.business_type)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let (customer, created) = match CustomerService::find_by_email(&txn, &input.email).await? {
            Some(existing) => (existing, false),
            None => {
                let created = CustomerService::insert(
                    &txn,
                    CreateCustomer {
                        business_name: input.business_name.clone(),
                        contact_name: input.contact_name.clone(),
                        email: input.email.clone(),
                        phone: input.phone.clone(),
                        address: input.address.clone(),
                        city: input.city.clone(),
                        business_type: business_type.code().to_string(),
                        tax_id: None,
                        notes: None,
                        is_active: Some(true),
                    },
                )
                .await?;
                (created, true)
            }
        };

        let order = Self::insert_order(
            &txn,
            customer.id,
            &input.items,
            input.notes,
            input.requested_delivery_date,
            OrderSource::Website,
        )
        .await?;
        txn.commit().await?;

        info!(
            order_number = %order.order_number,
            customer_id = %customer.id,
            new_customer = created,
            "order request received"
        );
        Ok((order, created))
    }

    /// Moves an order to a new status. Final orders reject any change.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<(order::Model, OrderStatus), ServiceError> {
        let db = &*self.db_pool;
        let existing = order::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
        let previous = existing.status;

        if !previous.can_transition_to(status) {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is {} and can no longer change status",
                existing.order_number,
                previous.label().to_lowercase()
            )));
        }
        if previous == status {
            return Ok((existing, previous));
        }

        let mut model: order::ActiveModel = existing.into();
        model.status = Set(status);
        model.updated_at = Set(Utc::now());
        let updated = model.update(db).await?;
        info!(order_id = %id, from = ?previous, to = ?status, "order status changed");
        Ok((updated, previous))
    }

    /// Deletes an order; its items go with it
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = order::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

        let txn = db.begin().await?;
        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;
        order::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(order_id = %id, "order deleted");
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_follow_the_request_format() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "REQ");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn status_filter_rejects_unknown_values() {
        let filter = OrderFilter {
            status: Some("lost".into()),
            ..Default::default()
        };
        assert!(filter.condition().is_err());
        assert_eq!(parse_status(" Delivered ").unwrap(), OrderStatus::Delivered);
    }

    #[test]
    fn quantity_bounds_are_validated() {
        let line = OrderLineInput {
            product_id: Uuid::new_v4(),
            quantity: 10_001,
        };
        assert!(line.validate().is_err());
        let line = OrderLineInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(line.validate().is_err());
    }
}
