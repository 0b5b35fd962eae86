//! Product snapshot and discount models, plus the report DTOs built from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One store's observed price for a product on one day.
///
/// Identified by the composite key (productId, supermarket, observedOn).
/// Immutable once imported; new snapshots are appended per import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: String,
    pub supermarket: String,
    pub observed_on: NaiveDate,
    pub product_name: String,
    pub product_category: String,
    pub brand: String,
    pub package_quantity: f64,
    pub package_unit: String,
    pub price: f64,
    pub currency: String,
}

impl ProductSnapshot {
    /// Grouping key used by the price-history aggregation.
    pub fn group_key(&self) -> (String, String) {
        (self.product_id.clone(), self.supermarket.clone())
    }
}

/// A percentage-off offer valid over a date interval, tied to one snapshot.
///
/// Fetched joined with its product snapshot so the aggregations can read
/// product attributes without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRecord {
    pub id: String,
    pub product: ProductSnapshot,
    pub discount_percentage: f64,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Synthesized at import time: a random day within 5 days before
    /// `from_date`. A test-data artifact, not a freshness signal.
    pub created_at: NaiveDate,
}

impl DiscountRecord {
    /// True when the discount's validity interval contains `day`.
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.from_date <= day && day <= self.to_date
    }

    /// The snapshot price after applying this discount.
    pub fn discounted_price(&self) -> f64 {
        self.product.price * (1.0 - self.discount_percentage / 100.0)
    }
}

/// Best discount per (productName, brand) group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestDiscount {
    pub product_name: String,
    pub brand: String,
    pub supermarket: String,
    pub discount_percentage: f64,
}

/// A discount whose synthesized creation date falls around the day its
/// product's prices were captured. Both dates are included for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiscount {
    pub product_name: String,
    pub brand: String,
    pub supermarket: String,
    pub discount_percentage: f64,
    pub discount_created_at: NaiveDate,
    pub price_observed_on: NaiveDate,
}

/// One day's resolved price in a product's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub date: NaiveDate,
    pub original_price: f64,
    pub discount_percentage: f64,
    pub final_price: f64,
}

/// Price history for one (productId, supermarket) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistory {
    pub product_id: String,
    pub product_name: String,
    pub brand: String,
    pub supermarket: String,
    pub price_history: Vec<PricePoint>,
}

/// A store's cheapest-per-unit candidate for a searched product name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product_id: String,
    pub product_name: String,
    pub brand: String,
    pub store: String,
    pub date: NaiveDate,
    pub package_quantity: f64,
    pub package_unit: String,
    pub price: f64,
    /// Price normalized to kg / liter / count for cross-product comparison.
    pub value_per_unit: f64,
}

/// Query parameters for GET /api/products/price-history.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryQuery {
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Query parameters for GET /api/products/recommendations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationQuery {
    pub product_name: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}
