use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Business customer that places requests through the website or the CMS
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "customers")]
#[schema(as = Customer)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub business_name: String,
    #[sea_orm(nullable)]
    pub contact_name: Option<String>,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(nullable)]
    pub phone: Option<String>,
    #[sea_orm(nullable)]
    pub address: Option<String>,
    #[sea_orm(nullable)]
    pub city: Option<String>,
    pub business_type: BusinessType,
    #[sea_orm(nullable)]
    pub tax_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Kind of business a customer runs. Stored as the snake_case code, displayed with its label.
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
pub enum BusinessType {
    #[sea_orm(string_value = "restaurant")]
    Restaurant,
    #[sea_orm(string_value = "bar")]
    Bar,
    #[sea_orm(string_value = "hotel")]
    Hotel,
    #[sea_orm(string_value = "cafe")]
    Cafe,
    #[sea_orm(string_value = "supermarket")]
    Supermarket,
    #[sea_orm(string_value = "convenience_store")]
    ConvenienceStore,
    #[sea_orm(string_value = "event_venue")]
    EventVenue,
    #[sea_orm(string_value = "catering")]
    Catering,
    #[sea_orm(string_value = "wholesaler")]
    Wholesaler,
    #[sea_orm(string_value = "other")]
    Other,
}

impl BusinessType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Bar => "bar",
            Self::Hotel => "hotel",
            Self::Cafe => "cafe",
            Self::Supermarket => "supermarket",
            Self::ConvenienceStore => "convenience_store",
            Self::EventVenue => "event_venue",
            Self::Catering => "catering",
            Self::Wholesaler => "wholesaler",
            Self::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Restaurant => "Restaurant",
            Self::Bar => "Bar / Pub",
            Self::Hotel => "Hotel",
            Self::Cafe => "Café",
            Self::Supermarket => "Supermarket",
            Self::ConvenienceStore => "Convenience Store",
            Self::EventVenue => "Event Venue",
            Self::Catering => "Catering",
            Self::Wholesaler => "Wholesaler",
            Self::Other => "Other",
        }
    }

    pub fn all() -> Vec<BusinessType> {
        Self::iter().collect()
    }

    /// Accepts either the stored code or the display label, ignoring case and
    /// surrounding whitespace.
    pub fn parse(input: &str) -> Option<BusinessType> {
        let needle = input.trim();
        if needle.is_empty() {
            return None;
        }
        Self::iter().find(|bt| {
            bt.code().eq_ignore_ascii_case(needle)
                || bt.label().to_lowercase() == needle.to_lowercase()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn every_variant_round_trips_between_code_and_label() {
        for bt in BusinessType::all() {
            assert_eq!(BusinessType::parse(bt.code()), Some(bt));
            assert_eq!(BusinessType::parse(bt.label()), Some(bt));
            let via_label = BusinessType::parse(bt.label()).unwrap();
            assert_eq!(via_label.code(), bt.code());
        }
        assert_eq!(BusinessType::all().len(), 10);
    }

    #[rstest]
    #[case("bar", BusinessType::Bar)]
    #[case("Bar / Pub", BusinessType::Bar)]
    #[case("  bar / pub ", BusinessType::Bar)]
    #[case("CAFÉ", BusinessType::Cafe)]
    #[case("Convenience Store", BusinessType::ConvenienceStore)]
    #[case("EVENT_VENUE", BusinessType::EventVenue)]
    fn parses_codes_and_labels(#[case] input: &str, #[case] expected: BusinessType) {
        assert_eq!(BusinessType::parse(input), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("pub")]
    #[case("night club")]
    fn rejects_unknown_business_types(#[case] input: &str) {
        assert!(BusinessType::parse(input).is_none());
    }

    #[test]
    fn serializes_as_code() {
        let json = serde_json::to_string(&BusinessType::ConvenienceStore).unwrap();
        assert_eq!(json, "\"convenience_store\"");
        assert_eq!(BusinessType::Cafe.label(), "Café");
    }
}
