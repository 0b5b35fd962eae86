//! Reporting aggregations.
//!
//! All queries here are stateless passes over in-memory collections fetched
//! wholesale from the store: best discounts, recently-added discounts,
//! carry-forward price history, and unit-price recommendation ranking.
//!
//! Tie-breaking is deliberately stable: where two entries compare equal, the
//! first one in fetch order wins.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use crate::errors::AppError;
use crate::models::{
    BestDiscount, DiscountRecord, NewDiscount, PriceHistory, PricePoint, ProductSnapshot,
    Recommendation, RecommendationQuery,
};

/// Optional filters plus the mandatory closed date range for price history.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub store: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
}

/// Best discount per (productName, brand) group.
///
/// Within a group the maximum percentage wins; equal percentages keep the
/// first discount encountered.
pub fn best_discounts(discounts: &[DiscountRecord]) -> Vec<BestDiscount> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut winners: Vec<&DiscountRecord> = Vec::new();

    for discount in discounts {
        let key = (
            discount.product.product_name.as_str(),
            discount.product.brand.as_str(),
        );
        match index.get(&key) {
            Some(&i) => {
                if discount.discount_percentage > winners[i].discount_percentage {
                    winners[i] = discount;
                }
            }
            None => {
                index.insert(key, winners.len());
                winners.push(discount);
            }
        }
    }

    winners
        .into_iter()
        .map(|d| BestDiscount {
            product_name: d.product.product_name.clone(),
            brand: d.product.brand.clone(),
            supermarket: d.product.supermarket.clone(),
            discount_percentage: d.discount_percentage,
        })
        .collect()
}

/// Discounts whose synthesized creation date falls within one day before the
/// product's observation date, inclusive on both ends.
pub fn recent_discounts(discounts: &[DiscountRecord]) -> Vec<NewDiscount> {
    discounts
        .iter()
        .filter(|d| {
            let observed = d.product.observed_on;
            let day_before = observed.checked_sub_days(Days::new(1)).unwrap_or(observed);
            day_before <= d.created_at && d.created_at <= observed
        })
        .map(|d| NewDiscount {
            product_name: d.product.product_name.clone(),
            brand: d.product.brand.clone(),
            supermarket: d.product.supermarket.clone(),
            discount_percentage: d.discount_percentage,
            discount_created_at: d.created_at,
            price_observed_on: d.product.observed_on,
        })
        .collect()
}

/// Price history per (productId, supermarket) pair over a closed date range.
///
/// For each day in the range the latest snapshot observed on or before that
/// day carries forward; days before the first snapshot emit no point. The
/// first discount whose validity interval contains the day applies. An
/// inverted range yields empty histories, not an error.
pub fn price_history(
    products: &[ProductSnapshot],
    discounts: &[DiscountRecord],
    filter: &HistoryFilter,
    from_date: NaiveDate,
    to_date: NaiveDate,
) -> Vec<PriceHistory> {
    let filtered: Vec<&ProductSnapshot> = products
        .iter()
        .filter(|p| match &filter.store {
            Some(store) => &p.supermarket == store,
            None => true,
        })
        .filter(|p| match &filter.category {
            Some(category) => &p.product_category == category,
            None => true,
        })
        .filter(|p| match &filter.brand {
            Some(brand) => &p.brand == brand,
            None => true,
        })
        .collect();

    // Group snapshots by (productId, supermarket), preserving fetch order of
    // first appearance.
    let mut group_index: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<Vec<&ProductSnapshot>> = Vec::new();
    for product in filtered {
        let key = product.group_key();
        match group_index.get(&key) {
            Some(&i) => groups[i].push(product),
            None => {
                group_index.insert(key, groups.len());
                groups.push(vec![product]);
            }
        }
    }

    let mut discount_groups: HashMap<(String, String), Vec<&DiscountRecord>> = HashMap::new();
    for discount in discounts {
        discount_groups
            .entry(discount.product.group_key())
            .or_default()
            .push(discount);
    }

    let mut histories = Vec::with_capacity(groups.len());

    for mut snapshots in groups {
        snapshots.sort_by_key(|p| p.observed_on);
        let first = snapshots[0];
        let group_discounts = discount_groups
            .get(&first.group_key())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut points = Vec::new();
        for day in from_date.iter_days().take_while(|d| *d <= to_date) {
            // Carry-forward: latest snapshot observed on or before this day.
            let Some(latest) = snapshots.iter().rev().find(|p| p.observed_on <= day) else {
                continue;
            };

            let active = group_discounts.iter().find(|d| d.is_active_on(day));
            let discount_percentage = active.map(|d| d.discount_percentage).unwrap_or(0.0);
            let final_price = if discount_percentage > 0.0 {
                latest.price * (1.0 - discount_percentage / 100.0)
            } else {
                latest.price
            };

            points.push(PricePoint {
                date: day,
                original_price: latest.price,
                discount_percentage,
                final_price,
            });
        }

        histories.push(PriceHistory {
            product_id: first.product_id.clone(),
            product_name: first.product_name.clone(),
            brand: first.brand.clone(),
            supermarket: first.supermarket.clone(),
            price_history: points,
        });
    }

    histories
}

/// Unit-price recommendation ranking.
///
/// Case-insensitive substring match on product name and a closed range on
/// the observation date. Each supermarket keeps only its cheapest-per-unit
/// snapshot (first seen wins ties); the result is sorted ascending by unit
/// price. An unrecognized package unit is a fatal input error.
pub fn recommendations(
    products: &[ProductSnapshot],
    query: &RecommendationQuery,
) -> Result<Vec<Recommendation>, AppError> {
    let needle = query.product_name.to_lowercase();

    let candidates: Vec<&ProductSnapshot> = products
        .iter()
        .filter(|p| p.product_name.to_lowercase().contains(&needle))
        .filter(|p| query.from_date <= p.observed_on && p.observed_on <= query.to_date)
        .collect();

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut best: Vec<Recommendation> = Vec::new();

    for product in candidates {
        let value_per_unit = unit_price(product)?;
        let rec = Recommendation {
            product_id: product.product_id.clone(),
            product_name: product.product_name.clone(),
            brand: product.brand.clone(),
            store: product.supermarket.clone(),
            date: product.observed_on,
            package_quantity: product.package_quantity,
            package_unit: product.package_unit.clone(),
            price: product.price,
            value_per_unit,
        };

        match index.get(&rec.store) {
            Some(&i) => {
                if rec.value_per_unit < best[i].value_per_unit {
                    best[i] = rec;
                }
            }
            None => {
                index.insert(rec.store.clone(), best.len());
                best.push(rec);
            }
        }
    }

    best.sort_by(|a, b| a.value_per_unit.total_cmp(&b.value_per_unit));
    Ok(best)
}

/// Price normalized to a standard unit (kg, liter, or count).
pub fn unit_price(product: &ProductSnapshot) -> Result<f64, AppError> {
    if product.package_quantity <= 0.0 {
        return Err(AppError::Validation(
            "Package quantity must be greater than zero".to_string(),
        ));
    }
    if product.price < 0.0 {
        return Err(AppError::Validation(
            "Price must be zero or positive".to_string(),
        ));
    }

    let quantity_in_standard_unit = product.package_quantity * unit_multiplier(&product.package_unit)?;
    Ok(product.price / quantity_in_standard_unit)
}

/// Multiplier mapping a package unit to its standard unit.
fn unit_multiplier(unit: &str) -> Result<f64, AppError> {
    match unit.to_lowercase().as_str() {
        "g" | "ml" => Ok(0.001),
        "kg" | "l" => Ok(1.0),
        // Count-style units
        "buc" | "role" => Ok(1.0),
        other => Err(AppError::Validation(format!("Unsupported unit: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn snapshot(
        product_id: &str,
        supermarket: &str,
        observed_on: &str,
        name: &str,
        brand: &str,
        price: f64,
    ) -> ProductSnapshot {
        ProductSnapshot {
            product_id: product_id.to_string(),
            supermarket: supermarket.to_string(),
            observed_on: date(observed_on),
            product_name: name.to_string(),
            product_category: "lactate".to_string(),
            brand: brand.to_string(),
            package_quantity: 500.0,
            package_unit: "g".to_string(),
            price,
            currency: "RON".to_string(),
        }
    }

    fn discount(
        product: ProductSnapshot,
        percentage: f64,
        from: &str,
        to: &str,
        created: &str,
    ) -> DiscountRecord {
        DiscountRecord {
            id: uuid::Uuid::new_v4().to_string(),
            product,
            discount_percentage: percentage,
            from_date: date(from),
            to_date: date(to),
            created_at: date(created),
        }
    }

    #[test]
    fn test_best_discounts_one_entry_per_group_with_true_max() {
        let base = snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0);
        let other_store = snapshot("P1", "kaufland", "2025-05-01", "iaurt", "Olympus", 11.0);
        let discounts = vec![
            discount(base.clone(), 10.0, "2025-05-01", "2025-05-07", "2025-04-30"),
            discount(other_store, 25.0, "2025-05-01", "2025-05-07", "2025-04-30"),
            discount(base, 15.0, "2025-05-01", "2025-05-07", "2025-04-30"),
        ];

        let best = best_discounts(&discounts);

        assert_eq!(best.len(), 1);
        assert_eq!(best[0].product_name, "iaurt");
        assert_eq!(best[0].brand, "Olympus");
        assert_eq!(best[0].discount_percentage, 25.0);
        assert_eq!(best[0].supermarket, "kaufland");
    }

    #[test]
    fn test_best_discounts_tie_keeps_first_seen() {
        let a = snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0);
        let b = snapshot("P1", "kaufland", "2025-05-01", "iaurt", "Olympus", 11.0);
        let discounts = vec![
            discount(a, 20.0, "2025-05-01", "2025-05-07", "2025-04-30"),
            discount(b, 20.0, "2025-05-01", "2025-05-07", "2025-04-30"),
        ];

        let best = best_discounts(&discounts);

        assert_eq!(best.len(), 1);
        assert_eq!(best[0].supermarket, "lidl");
    }

    #[test]
    fn test_best_discounts_groups_split_by_brand() {
        let a = snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0);
        let b = snapshot("P2", "lidl", "2025-05-01", "iaurt", "Danone", 9.0);
        let discounts = vec![
            discount(a, 10.0, "2025-05-01", "2025-05-07", "2025-04-30"),
            discount(b, 5.0, "2025-05-01", "2025-05-07", "2025-04-30"),
        ];

        let best = best_discounts(&discounts);
        assert_eq!(best.len(), 2);
    }

    #[test]
    fn test_recent_discounts_inclusive_window() {
        let p = snapshot("P1", "lidl", "2025-05-10", "iaurt", "Olympus", 10.0);
        let discounts = vec![
            // Same day: recent
            discount(p.clone(), 10.0, "2025-05-10", "2025-05-15", "2025-05-10"),
            // Day before: recent
            discount(p.clone(), 10.0, "2025-05-10", "2025-05-15", "2025-05-09"),
            // Two days before: not recent
            discount(p.clone(), 10.0, "2025-05-10", "2025-05-15", "2025-05-08"),
            // After observation: not recent
            discount(p, 10.0, "2025-05-12", "2025-05-15", "2025-05-11"),
        ];

        let recent = recent_discounts(&discounts);

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].discount_created_at, date("2025-05-10"));
        assert_eq!(recent[1].discount_created_at, date("2025-05-09"));
        assert_eq!(recent[0].price_observed_on, date("2025-05-10"));
    }

    #[test]
    fn test_price_history_carry_forward() {
        let products = vec![
            snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0),
            snapshot("P1", "lidl", "2025-05-05", "iaurt", "Olympus", 12.0),
        ];

        let histories = price_history(
            &products,
            &[],
            &HistoryFilter::default(),
            date("2025-05-01"),
            date("2025-05-10"),
        );

        assert_eq!(histories.len(), 1);
        let points = &histories[0].price_history;
        assert_eq!(points.len(), 10);
        for point in &points[..4] {
            assert_eq!(point.original_price, 10.0);
        }
        for point in &points[4..] {
            assert_eq!(point.original_price, 12.0);
        }
        assert_eq!(points.first().unwrap().date, date("2025-05-01"));
        assert_eq!(points.last().unwrap().date, date("2025-05-10"));
    }

    #[test]
    fn test_price_history_gap_before_first_snapshot() {
        let products = vec![snapshot("P1", "lidl", "2025-05-05", "iaurt", "Olympus", 10.0)];

        let histories = price_history(
            &products,
            &[],
            &HistoryFilter::default(),
            date("2025-05-01"),
            date("2025-05-07"),
        );

        let points = &histories[0].price_history;
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, date("2025-05-05"));
    }

    #[test]
    fn test_price_history_applies_active_discount() {
        let p = snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0);
        let products = vec![p.clone()];
        let discounts = vec![discount(p, 20.0, "2025-05-03", "2025-05-04", "2025-05-01")];

        let histories = price_history(
            &products,
            &discounts,
            &HistoryFilter::default(),
            date("2025-05-01"),
            date("2025-05-05"),
        );

        let points = &histories[0].price_history;
        assert_eq!(points[0].discount_percentage, 0.0);
        assert_eq!(points[0].final_price, 10.0);
        assert_eq!(points[2].discount_percentage, 20.0);
        assert!((points[2].final_price - 8.0).abs() < 1e-9);
        assert_eq!(points[4].discount_percentage, 0.0);
    }

    #[test]
    fn test_price_history_filters() {
        let products = vec![
            snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0),
            snapshot("P2", "kaufland", "2025-05-01", "lapte", "Zuzu", 8.0),
        ];

        let filter = HistoryFilter {
            store: Some("lidl".to_string()),
            ..Default::default()
        };
        let histories = price_history(&products, &[], &filter, date("2025-05-01"), date("2025-05-02"));

        assert_eq!(histories.len(), 1);
        assert_eq!(histories[0].supermarket, "lidl");
    }

    #[test]
    fn test_price_history_groups_per_store() {
        let products = vec![
            snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0),
            snapshot("P1", "kaufland", "2025-05-01", "iaurt", "Olympus", 11.0),
        ];

        let histories = price_history(
            &products,
            &[],
            &HistoryFilter::default(),
            date("2025-05-01"),
            date("2025-05-02"),
        );

        assert_eq!(histories.len(), 2);
    }

    #[test]
    fn test_price_history_inverted_range_is_empty() {
        let products = vec![snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0)];

        let histories = price_history(
            &products,
            &[],
            &HistoryFilter::default(),
            date("2025-05-10"),
            date("2025-05-01"),
        );

        assert_eq!(histories.len(), 1);
        assert!(histories[0].price_history.is_empty());
    }

    #[test]
    fn test_unit_price_grams_to_kg() {
        let p = snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0);
        // price=10, quantity=500 g => 10 / 0.5 kg = 20 per kg
        assert_eq!(unit_price(&p).unwrap(), 20.0);
    }

    #[test]
    fn test_unit_price_count_units() {
        let mut p = snapshot("P1", "lidl", "2025-05-01", "hartie", "Zewa", 12.0);
        p.package_quantity = 4.0;
        p.package_unit = "role".to_string();
        assert_eq!(unit_price(&p).unwrap(), 3.0);
    }

    #[test]
    fn test_unit_price_rejects_unknown_unit() {
        let mut p = snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0);
        p.package_unit = "oz".to_string();
        let err = unit_price(&p).unwrap_err();
        assert!(err.message().contains("Unsupported unit"));
    }

    #[test]
    fn test_unit_price_rejects_non_positive_quantity() {
        let mut p = snapshot("P1", "lidl", "2025-05-01", "iaurt", "Olympus", 10.0);
        p.package_quantity = 0.0;
        assert!(unit_price(&p).is_err());
    }

    #[test]
    fn test_recommendations_per_store_minimum_sorted() {
        let mut cheap_lidl = snapshot("P1", "lidl", "2025-05-02", "iaurt grecesc", "Olympus", 10.0);
        cheap_lidl.package_quantity = 1000.0; // 10 per kg
        let pricey_lidl = snapshot("P2", "lidl", "2025-05-02", "iaurt bio", "Danone", 10.0); // 20 per kg
        let mut kaufland = snapshot("P3", "kaufland", "2025-05-03", "iaurt", "Zuzu", 7.5);
        kaufland.package_quantity = 500.0; // 15 per kg

        let products = vec![pricey_lidl, cheap_lidl, kaufland];
        let query = RecommendationQuery {
            product_name: "IAURT".to_string(),
            from_date: date("2025-05-01"),
            to_date: date("2025-05-15"),
        };

        let recs = recommendations(&products, &query).unwrap();

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].store, "lidl");
        assert_eq!(recs[0].product_id, "P1");
        assert_eq!(recs[0].value_per_unit, 10.0);
        assert_eq!(recs[1].store, "kaufland");
        assert_eq!(recs[1].value_per_unit, 15.0);
    }

    #[test]
    fn test_recommendations_tie_keeps_first_seen() {
        let a = snapshot("P1", "lidl", "2025-05-02", "iaurt", "Olympus", 10.0);
        let b = snapshot("P2", "lidl", "2025-05-03", "iaurt", "Danone", 10.0);

        let query = RecommendationQuery {
            product_name: "iaurt".to_string(),
            from_date: date("2025-05-01"),
            to_date: date("2025-05-15"),
        };
        let recs = recommendations(&[a, b], &query).unwrap();

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].product_id, "P1");
    }

    #[test]
    fn test_recommendations_date_range_excludes() {
        let p = snapshot("P1", "lidl", "2025-05-20", "iaurt", "Olympus", 10.0);
        let query = RecommendationQuery {
            product_name: "iaurt".to_string(),
            from_date: date("2025-05-01"),
            to_date: date("2025-05-15"),
        };
        let recs = recommendations(&[p], &query).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_recommendations_unknown_unit_is_fatal() {
        let mut p = snapshot("P1", "lidl", "2025-05-02", "iaurt", "Olympus", 10.0);
        p.package_unit = "oz".to_string();
        let query = RecommendationQuery {
            product_name: "iaurt".to_string(),
            from_date: date("2025-05-01"),
            to_date: date("2025-05-15"),
        };
        assert!(recommendations(&[p], &query).is_err());
    }
}
