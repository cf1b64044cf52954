//! ORM entities, one module per table.

pub mod activity_log;
pub mod customer;
pub mod order;
pub mod order_item;
pub mod product;
pub mod session;
pub mod user;

pub use activity_log::{ActivityAction, EntityType};
pub use customer::BusinessType;
pub use order::{OrderSource, OrderStatus};
pub use product::ProductCategory;
pub use user::UserRole;

use sea_orm::ActiveEnum;

/// Parses the stored code of a string-backed enum, ignoring case and surrounding whitespace.
pub fn parse_code<E>(input: &str) -> Option<E>
where
    E: ActiveEnum<Value = String>,
{
    E::try_from_value(&input.trim().to_ascii_lowercase()).ok()
}
