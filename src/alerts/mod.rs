//! Periodic price-alert checker.
//!
//! A background task scans untriggered alerts on a fixed interval and flips
//! any alert whose product can currently be had at or below its target
//! price. Notifications are log-based, fire-and-forget; an alert triggers at
//! most once and is never re-armed.

use std::sync::Arc;
use std::time::Duration;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{DiscountRecord, PriceAlert, ProductSnapshot};

/// Run the alert-checker loop on a fixed interval.
pub async fn run(repo: Arc<Repository>, interval: Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "Price-alert checker started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        match check_alerts(&repo).await {
            Ok(triggered) => {
                if triggered > 0 {
                    tracing::info!(triggered, "Price-alert pass triggered alerts");
                } else {
                    tracing::debug!("Price-alert pass found nothing to trigger");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Price-alert pass failed");
            }
        }
    }
}

/// One checker pass over all untriggered alerts.
///
/// Returns the number of alerts triggered. Each alert is processed
/// independently; the triggered flip is guarded in the store, so overlapping
/// passes cannot notify twice.
pub async fn check_alerts(repo: &Repository) -> Result<usize, AppError> {
    let alerts = repo.list_untriggered_alerts().await?;
    let mut triggered = 0usize;

    for alert in alerts {
        let products = repo.find_products_by_name(&alert.product_name).await?;
        let discounts = repo.find_discounts_by_product_name(&alert.product_name).await?;

        let matching_products: Vec<&ProductSnapshot> = products
            .iter()
            .filter(|p| p.price <= alert.target_price)
            .collect();
        let matching_discounts: Vec<&DiscountRecord> = discounts
            .iter()
            .filter(|d| d.discounted_price() <= alert.target_price)
            .collect();

        if matching_products.is_empty() && matching_discounts.is_empty() {
            continue;
        }

        if repo.mark_alert_triggered(&alert.id).await? {
            triggered += 1;
            notify(repo, &alert, &matching_products, &matching_discounts).await?;
        }
    }

    Ok(triggered)
}

/// Emit the notification for a triggered alert. Log-based; no delivery
/// guarantee and no retry.
async fn notify(
    repo: &Repository,
    alert: &PriceAlert,
    products: &[&ProductSnapshot],
    discounts: &[&DiscountRecord],
) -> Result<(), AppError> {
    let email = repo
        .get_user(&alert.user_id)
        .await?
        .map(|u| u.email)
        .unwrap_or_else(|| alert.user_id.clone());

    tracing::info!(
        alert_id = %alert.id,
        user = %email,
        product = %alert.product_name,
        target_price = alert.target_price,
        "Price alert triggered"
    );

    for product in products {
        tracing::info!(
            product = %product.product_name,
            store = %product.supermarket,
            price = product.price,
            date = %product.observed_on,
            "Matching offer"
        );
    }

    for discount in discounts {
        tracing::info!(
            product = %discount.product.product_name,
            store = %discount.product.supermarket,
            discounted_price = discount.discounted_price(),
            valid_from = %discount.from_date,
            valid_to = %discount.to_date,
            "Matching discounted offer"
        );
    }

    Ok(())
}
