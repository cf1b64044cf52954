use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Catalog entry, priced per case
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sku: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub category: ProductCategory,
    #[sea_orm(nullable)]
    pub brand: Option<String>,
    #[sea_orm(nullable)]
    pub volume_ml: Option<i32>,
    pub units_per_case: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    #[schema(value_type = String, example = "18.50")]
    pub price: Decimal,
    pub is_active: bool,
    #[sea_orm(nullable)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    #[sea_orm(string_value = "water")]
    Water,
    #[sea_orm(string_value = "soft_drink")]
    SoftDrink,
    #[sea_orm(string_value = "juice")]
    Juice,
    #[sea_orm(string_value = "energy_drink")]
    EnergyDrink,
    #[sea_orm(string_value = "beer")]
    Beer,
    #[sea_orm(string_value = "wine")]
    Wine,
    #[sea_orm(string_value = "spirits")]
    Spirits,
    #[sea_orm(string_value = "other")]
    Other,
}

impl ProductCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Water => "Water",
            Self::SoftDrink => "Soft Drink",
            Self::Juice => "Juice",
            Self::EnergyDrink => "Energy Drink",
            Self::Beer => "Beer",
            Self::Wine => "Wine",
            Self::Spirits => "Spirits",
            Self::Other => "Other",
        }
    }

    pub fn all() -> Vec<ProductCategory> {
        Self::iter().collect()
    }
}
