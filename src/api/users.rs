//! User, basket, and price-alert endpoints.

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    Json,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{success, ApiResult};
use crate::auth;
use crate::errors::AppError;
use crate::models::{
    AlertRequest, BasketContents, BasketProduct, PriceAlertResponse, ProductSnapshot,
    RegisterUserRequest, StoreBasket, User,
};
use crate::AppState;

/// POST /api/users/register - Register a new user.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> ApiResult<User> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    if state.repo.email_exists(&request.email).await? {
        return Err(AppError::Conflict("Email already taken".to_string()));
    }

    let password_hash = auth::hash_password(&request.password)?;
    let user = state.repo.create_user(&request, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Registered user");
    success(user)
}

/// POST /api/users/set-alert - Create a price alert.
pub async fn set_alert(
    State(state): State<AppState>,
    Json(request): Json<AlertRequest>,
) -> ApiResult<PriceAlertResponse> {
    let user = state
        .repo
        .get_user(&request.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if request.target_price <= 0.0 {
        return Err(AppError::Validation(
            "Target price must be greater than 0".to_string(),
        ));
    }
    if !state.repo.product_name_exists(&request.product_name).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let alert = state
        .repo
        .create_alert(&request.user_id, &request.product_name, request.target_price)
        .await?;

    success(PriceAlertResponse {
        id: alert.id,
        user_email: user.email,
        product_name: alert.product_name,
        target_price: alert.target_price,
        alert_triggered: alert.triggered,
    })
}

/// POST /api/users/add-products/{userId} - Add random products to the basket.
pub async fn add_products_to_basket(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<BasketContents> {
    let user = state
        .repo
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let basket = state.repo.get_or_create_basket(&user.id).await?;

    let all_products = state.repo.list_products().await?;
    if all_products.is_empty() {
        return Err(AppError::State(
            "No products available in the database".to_string(),
        ));
    }

    let existing_ids: HashSet<String> = state
        .repo
        .basket_product_ids(&basket.id)
        .await?
        .into_iter()
        .collect();

    let mut available: Vec<ProductSnapshot> = all_products
        .into_iter()
        .filter(|p| !existing_ids.contains(&p.product_id))
        .collect();

    if available.is_empty() {
        return Err(AppError::State(
            "No new products available to add to the basket".to_string(),
        ));
    }

    let mut rng = StdRng::from_entropy();
    available.shuffle(&mut rng);

    // One snapshot per product id; the basket key forbids duplicates.
    let mut seen: HashSet<String> = HashSet::new();
    let to_add: Vec<ProductSnapshot> = available
        .into_iter()
        .filter(|p| seen.insert(p.product_id.clone()))
        .take(state.config.basket_sample_size)
        .collect();

    state.repo.add_products_to_basket(&basket.id, &to_add).await?;

    let products = state.repo.list_basket_products(&basket.id).await?;
    tracing::info!(user_id = %user.id, added = to_add.len(), "Added products to basket");

    success(BasketContents {
        basket_id: basket.id,
        user_id: user.id,
        products,
    })
}

/// GET /api/users/optimize-basket/{userId} - Group basket contents by store.
///
/// Subtotals sum the listed prices; discounts are not applied. An empty
/// basket yields an empty list, not an error.
pub async fn optimize_basket(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<StoreBasket>> {
    let user = state
        .repo
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let basket = state
        .repo
        .get_basket(&user.id)
        .await?
        .ok_or_else(|| AppError::State("Basket not found".to_string()))?;

    let products = state.repo.list_basket_products(&basket.id).await?;

    success(group_by_supermarket(products))
}

/// Group basket products by supermarket, preserving first-seen store order.
fn group_by_supermarket(products: Vec<BasketProduct>) -> Vec<StoreBasket> {
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut groups: Vec<StoreBasket> = Vec::new();

    for product in products {
        match index.get(&product.supermarket) {
            Some(&i) => {
                groups[i].total_cost += product.price;
                groups[i].products.push(product);
            }
            None => {
                index.insert(product.supermarket.clone(), groups.len());
                groups.push(StoreBasket {
                    supermarket: product.supermarket.clone(),
                    total_cost: product.price,
                    products: vec![product],
                });
            }
        }
    }

    groups
}
