//! Price alert models.

use serde::{Deserialize, Serialize};

/// A persisted price alert.
///
/// The triggered flag flips false→true exactly once, by the periodic
/// checker; alerts are never re-armed or deleted in-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub id: String,
    pub user_id: String,
    pub product_name: String,
    pub target_price: f64,
    pub triggered: bool,
    pub created_at: String,
}

/// Request body for POST /api/users/set-alert.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRequest {
    pub user_id: String,
    pub product_name: String,
    pub target_price: f64,
}

/// Alert representation returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlertResponse {
    pub id: String,
    pub user_email: String,
    pub product_name: String,
    pub target_price: f64,
    pub alert_triggered: bool,
}
