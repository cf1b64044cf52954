//! Builds report documents for the export endpoints from the same filters the
//! list endpoints use.

use crate::{
    entities::{customer, product},
    errors::ServiceError,
    reports::{ReportColumn, ReportDocument},
    services::{
        customers::{CustomerFilter, CustomerService},
        orders::{OrderDetail, OrderFilter, OrderItemDetail, OrderService, OrderSummary},
        products::{ProductFilter, ProductService},
    },
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

fn filter_lines(pairs: &[(&str, Option<String>)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter_map(|(label, value)| {
            crate::services::non_empty(value.as_deref())
                .map(|v| (label.to_string(), v.to_string()))
        })
        .collect()
}

fn customer_filter_lines(filter: &CustomerFilter) -> Vec<(String, String)> {
    filter_lines(&[
        ("Search", filter.search.clone()),
        ("Business type", filter.business_type.clone()),
        ("City", filter.city.clone()),
        ("Active", filter.is_active.map(yes_no)),
    ])
}

fn product_filter_lines(filter: &ProductFilter) -> Vec<(String, String)> {
    filter_lines(&[
        ("Search", filter.search.clone()),
        ("Category", filter.category.clone()),
        ("Brand", filter.brand.clone()),
        ("Active", filter.is_active.map(yes_no)),
        ("Min price", filter.min_price.map(money)),
        ("Max price", filter.max_price.map(money)),
    ])
}

fn order_filter_lines(filter: &OrderFilter) -> Vec<(String, String)> {
    filter_lines(&[
        ("Status", filter.status.clone()),
        ("Customer", filter.customer_id.map(|id| id.to_string())),
        ("From", filter.date_from.map(|d| d.to_string())),
        ("To", filter.date_to.map(|d| d.to_string())),
        ("Search", filter.search.clone()),
    ])
}

/// Customer table; the detailed variant adds contact and address columns.
pub fn customers_document(customers: &[customer::Model], detail: bool) -> ReportDocument {
    let mut columns = vec![
        ReportColumn::text("Business"),
        ReportColumn::text("Type"),
        ReportColumn::text("Email"),
        ReportColumn::text("City"),
        ReportColumn::text("Active"),
    ];
    if detail {
        columns.extend([
            ReportColumn::text("Contact"),
            ReportColumn::text("Phone"),
            ReportColumn::text("Address"),
            ReportColumn::text("Tax ID"),
            ReportColumn::text("Notes"),
        ]);
    }

    let mut doc = ReportDocument::new("Customers", columns);
    for c in customers {
        let mut row = vec![
            c.business_name.clone(),
            c.business_type.label().to_string(),
            c.email.clone(),
            opt(&c.city),
            yes_no(c.is_active),
        ];
        if detail {
            row.extend([
                opt(&c.contact_name),
                opt(&c.phone),
                opt(&c.address),
                opt(&c.tax_id),
                opt(&c.notes),
            ]);
        }
        doc.push_row(row);
    }
    doc.total_line("Customers", customers.len().to_string())
}

/// Product catalog table; the detailed variant adds description, volume, case size and image.
pub fn products_document(products: &[product::Model], detail: bool) -> ReportDocument {
    let mut columns = vec![
        ReportColumn::text("SKU"),
        ReportColumn::text("Name"),
        ReportColumn::text("Category"),
        ReportColumn::text("Brand"),
        ReportColumn::numeric("Price"),
        ReportColumn::text("Active"),
    ];
    if detail {
        columns.extend([
            ReportColumn::text("Description"),
            ReportColumn::numeric("Volume (ml)"),
            ReportColumn::numeric("Units/case"),
            ReportColumn::text("Image"),
        ]);
    }

    let mut doc = ReportDocument::new("Products", columns);
    for p in products {
        let mut row = vec![
            p.sku.clone(),
            p.name.clone(),
            p.category.label().to_string(),
            opt(&p.brand),
            money(p.price),
            yes_no(p.is_active),
        ];
        if detail {
            row.extend([
                opt(&p.description),
                p.volume_ml.map(|v| v.to_string()).unwrap_or_default(),
                p.units_per_case.to_string(),
                opt(&p.image_url),
            ]);
        }
        doc.push_row(row);
    }
    doc.total_line("Products", products.len().to_string())
}

/// Order table. With `detail` every order item gets its own row.
pub fn orders_document(
    orders: &[OrderSummary],
    items: &HashMap<Uuid, Vec<OrderItemDetail>>,
    detail: bool,
) -> ReportDocument {
    let columns = if detail {
        vec![
            ReportColumn::text("Order"),
            ReportColumn::text("Date"),
            ReportColumn::text("Customer"),
            ReportColumn::text("Status"),
            ReportColumn::text("Product"),
            ReportColumn::text("SKU"),
            ReportColumn::numeric("Qty"),
            ReportColumn::numeric("Unit price"),
            ReportColumn::numeric("Line total"),
        ]
    } else {
        vec![
            ReportColumn::text("Order"),
            ReportColumn::text("Date"),
            ReportColumn::text("Customer"),
            ReportColumn::text("Status"),
            ReportColumn::text("Source"),
            ReportColumn::numeric("Items"),
            ReportColumn::numeric("Total"),
        ]
    };

    let mut doc = ReportDocument::new("Orders", columns);
    let mut grand_total = Decimal::ZERO;
    for order in orders {
        grand_total += order.total_amount;
        let head = vec![
            order.order_number.clone(),
            order.created_at.format("%Y-%m-%d").to_string(),
            order.customer_name.clone(),
            order.status.label().to_string(),
        ];
        if !detail {
            let mut row = head;
            row.extend([
                match order.source {
                    crate::entities::OrderSource::Website => "Website".to_string(),
                    crate::entities::OrderSource::Cms => "CMS".to_string(),
                },
                order.item_count.to_string(),
                money(order.total_amount),
            ]);
            doc.push_row(row);
            continue;
        }
        for item in items.get(&order.id).map(Vec::as_slice).unwrap_or_default() {
            let mut row = head.clone();
            row.extend([
                item.product_name.clone(),
                item.sku.clone(),
                item.quantity.to_string(),
                money(item.unit_price),
                money(item.line_total),
            ]);
            doc.push_row(row);
        }
    }
    doc.total_line("Orders", orders.len().to_string())
        .total_line("Total amount", money(grand_total))
}

/// Single order: header block, item table and total.
pub fn order_document(detail: &OrderDetail) -> ReportDocument {
    let order = &detail.order;
    let customer = &detail.customer;
    let mut doc = ReportDocument::new(
        format!("Order {}", order.order_number),
        vec![
            ReportColumn::text("Product"),
            ReportColumn::text("SKU"),
            ReportColumn::numeric("Qty"),
            ReportColumn::numeric("Unit price"),
            ReportColumn::numeric("Line total"),
        ],
    )
    .summary_line("Order number", order.order_number.clone())
    .summary_line("Date", order.created_at.format("%Y-%m-%d %H:%M").to_string())
    .summary_line("Status", order.status.label())
    .summary_line("Customer", customer.business_name.clone())
    .summary_line("Contact", opt(&customer.contact_name))
    .summary_line("Email", customer.email.clone())
    .summary_line("Phone", opt(&customer.phone))
    .summary_line(
        "Address",
        [customer.address.clone(), customer.city.clone()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", "),
    );
    if let Some(date) = order.requested_delivery_date {
        doc = doc.summary_line("Requested delivery", date.to_string());
    }
    if let Some(notes) = crate::services::non_empty(order.notes.as_deref()) {
        doc = doc.summary_line("Notes", notes);
    }

    for item in &detail.items {
        doc.push_row(vec![
            item.product_name.clone(),
            item.sku.clone(),
            item.quantity.to_string(),
            money(item.unit_price),
            money(item.line_total),
        ]);
    }
    doc.total_line("Total", money(order.total_amount))
}

/// Assembles export documents. Row counts are capped at `max_rows`.
#[derive(Clone)]
pub struct ExportService {
    customers: CustomerService,
    products: ProductService,
    orders: OrderService,
    max_rows: u64,
    company_name: String,
}

impl ExportService {
    pub fn new(
        customers: CustomerService,
        products: ProductService,
        orders: OrderService,
        max_rows: u64,
        company_name: impl Into<String>,
    ) -> Self {
        Self {
            customers,
            products,
            orders,
            max_rows: max_rows.max(1),
            company_name: company_name.into(),
        }
    }

    /// Rows to fetch so that a dropped row can be detected
    fn fetch_limit(&self) -> u64 {
        self.max_rows.saturating_add(1)
    }

    /// Cuts `rows` to the cap and reports whether anything was dropped
    fn cap<T>(&self, mut rows: Vec<T>) -> (Vec<T>, bool) {
        let max = usize::try_from(self.max_rows).unwrap_or(usize::MAX);
        let truncated = rows.len() > max;
        rows.truncate(max);
        (rows, truncated)
    }

    fn finish(
        &self,
        doc: ReportDocument,
        filters: Vec<(String, String)>,
        truncated: bool,
    ) -> ReportDocument {
        let mut doc = doc.subtitle(self.company_name.clone());
        let mut summary = filters;
        if truncated {
            summary.push((
                "Note".to_string(),
                format!("Limited to the first {} records", self.max_rows),
            ));
        }
        summary.append(&mut doc.summary);
        doc.summary = summary;
        doc
    }

    #[instrument(skip(self))]
    pub async fn customers(
        &self,
        filter: &CustomerFilter,
        detail: bool,
    ) -> Result<(ReportDocument, usize), ServiceError> {
        let (rows, truncated) = self.cap(self.customers.list_all(filter, self.fetch_limit()).await?);
        let doc = customers_document(&rows, detail);
        info!(rows = rows.len(), detail, truncated, "customer export assembled");
        let exported = doc.rows.len();
        Ok((self.finish(doc, customer_filter_lines(filter), truncated), exported))
    }

    #[instrument(skip(self))]
    pub async fn products(
        &self,
        filter: &ProductFilter,
        detail: bool,
    ) -> Result<(ReportDocument, usize), ServiceError> {
        let (rows, truncated) = self.cap(self.products.list_all(filter, self.fetch_limit()).await?);
        let doc = products_document(&rows, detail);
        info!(rows = rows.len(), detail, truncated, "product export assembled");
        let exported = doc.rows.len();
        Ok((self.finish(doc, product_filter_lines(filter), truncated), exported))
    }

    #[instrument(skip(self))]
    pub async fn orders(
        &self,
        filter: &OrderFilter,
        detail: bool,
    ) -> Result<(ReportDocument, usize), ServiceError> {
        let (rows, truncated) = self.cap(self.orders.list_all(filter, self.fetch_limit()).await?);
        let items = if detail {
            self.orders
                .items_for_orders(rows.iter().map(|o| o.id).collect())
                .await?
        } else {
            HashMap::new()
        };
        let doc = orders_document(&rows, &items, detail);
        info!(orders = rows.len(), rows = doc.rows.len(), detail, truncated, "order export assembled");
        let exported = doc.rows.len();
        Ok((self.finish(doc, order_filter_lines(filter), truncated), exported))
    }

    /// Document for one order; returns the order number for the file name.
    #[instrument(skip(self))]
    pub async fn order(&self, id: Uuid) -> Result<(ReportDocument, String), ServiceError> {
        let detail = self.orders.get_detail(id).await?;
        let doc = order_document(&detail);
        Ok((
            self.finish(doc, Vec::new(), false),
            detail.order.order_number,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BusinessType, OrderSource, OrderStatus, ProductCategory};
    use chrono::Utc;
    use std::str::FromStr;

    fn customer(name: &str) -> customer::Model {
        customer::Model {
            id: Uuid::new_v4(),
            business_name: name.to_string(),
            contact_name: Some("Ana".into()),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
            address: Some("Rua Augusta 1".into()),
            city: Some("Lisbon".into()),
            business_type: BusinessType::Restaurant,
            tax_id: None,
            notes: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn summary(total: &str) -> OrderSummary {
        OrderSummary {
            id: Uuid::new_v4(),
            order_number: "REQ-20240501-ABC123".into(),
            customer_id: Uuid::new_v4(),
            customer_name: "Harbor Bar".into(),
            status: OrderStatus::Pending,
            source: OrderSource::Website,
            total_amount: Decimal::from_str(total).unwrap(),
            item_count: 1,
            requested_delivery_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn customer_detail_adds_columns() {
        let rows = vec![customer("Alpha"), customer("Beta")];
        let summary_doc = customers_document(&rows, false);
        let detail_doc = customers_document(&rows, true);
        assert_eq!(summary_doc.columns.len(), 5);
        assert_eq!(detail_doc.columns.len(), 10);
        assert_eq!(detail_doc.rows[0][5], "Ana");
        assert_eq!(summary_doc.rows[0][1], "Restaurant");
        assert_eq!(summary_doc.totals, vec![("Customers".to_string(), "2".to_string())]);
    }

    #[test]
    fn product_prices_are_right_aligned_money() {
        let product = product::Model {
            id: Uuid::new_v4(),
            sku: "BEER-001".into(),
            name: "Lager".into(),
            description: None,
            category: ProductCategory::Beer,
            brand: None,
            volume_ml: Some(330),
            units_per_case: 24,
            price: Decimal::from_str("12.5").unwrap(),
            is_active: true,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let doc = products_document(&[product], true);
        assert_eq!(doc.rows[0][4], "12.50");
        assert_eq!(doc.columns[4].align, crate::reports::Align::Right);
        assert_eq!(doc.rows[0][7], "330");
    }

    #[test]
    fn detailed_orders_have_one_row_per_item() {
        let orders = vec![summary("30.00"), summary("12.25")];
        let mut items = HashMap::new();
        items.insert(
            orders[0].id,
            vec![
                OrderItemDetail {
                    id: Uuid::new_v4(),
                    product_id: Uuid::new_v4(),
                    product_name: "Lager".into(),
                    sku: "BEER-001".into(),
                    quantity: 2,
                    unit_price: Decimal::from(10),
                    line_total: Decimal::from(20),
                },
                OrderItemDetail {
                    id: Uuid::new_v4(),
                    product_id: Uuid::new_v4(),
                    product_name: "Cola".into(),
                    sku: "SOFT-001".into(),
                    quantity: 1,
                    unit_price: Decimal::from(10),
                    line_total: Decimal::from(10),
                },
            ],
        );

        let detail = orders_document(&orders, &items, true);
        assert_eq!(detail.rows.len(), 2);
        assert_eq!(detail.rows[1][4], "Cola");

        let plain = orders_document(&orders, &items, false);
        assert_eq!(plain.rows.len(), 2);
        assert_eq!(
            plain.totals.last(),
            Some(&("Total amount".to_string(), "42.25".to_string()))
        );
    }

    #[test]
    fn only_set_filters_are_listed() {
        let filter = CustomerFilter {
            city: Some("Porto".into()),
            search: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(
            customer_filter_lines(&filter),
            vec![("City".to_string(), "Porto".to_string())]
        );
    }
}
