use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use validator::Validate;

/// Booking quota, used to gate quota-restricted discount codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Quota {
    General,
    Senior,
    Ladies,
    Tatkal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Percent,
    Flat,
}

/// A resolved discount rule. `value` is a percentage for `Percent`
/// and an amount in minor currency units for `Flat`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Discount {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub restricted_to: Option<Quota>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct FareQuoteRequest {
    /// Base fare per passenger for each travel class, in minor units.
    pub class_fares: HashMap<String, i64>,
    pub selected_class: String,
    #[validate(range(min = 1, max = 6))]
    pub passenger_count: u32,
    pub discount_code: Option<String>,
    pub quota: Quota,
}

/// Result of a fare computation. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FareQuote {
    pub base_fare_per_passenger: i64,
    pub passenger_count: u32,
    /// False both when no discount was supplied and when a
    /// quota-restricted code was rejected; `discount_amount`
    /// disambiguates for callers that care.
    pub discount_applied: bool,
    pub discount_amount: i64,
    pub service_charge: i64,
    pub final_amount: i64,
    /// True when `selected_class` was missing from the fare table and
    /// the default class price was used instead.
    pub class_fallback: bool,
}
