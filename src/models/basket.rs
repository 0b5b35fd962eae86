//! Shopping basket models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A basket row; one-to-one with a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Basket {
    pub id: String,
    pub user_id: String,
}

/// A basket line item, denormalized from its product snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketProduct {
    pub product_id: String,
    pub product_name: String,
    pub brand: String,
    pub supermarket: String,
    pub price_date: NaiveDate,
    pub price: f64,
}

/// Full basket contents, returned after add-to-basket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketContents {
    pub basket_id: String,
    pub user_id: String,
    pub products: Vec<BasketProduct>,
}

/// One supermarket's slice of an optimized basket, with its subtotal.
///
/// Subtotals sum listed prices; discounts are not applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreBasket {
    pub supermarket: String,
    pub products: Vec<BasketProduct>,
    pub total_cost: f64,
}
