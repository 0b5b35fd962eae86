//! Product report endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{success, ApiResponse, ApiResult};
use crate::errors::AppError;
use crate::models::{BestDiscount, NewDiscount, PriceHistoryQuery, RecommendationQuery};
use crate::reports::{self, HistoryFilter};
use crate::AppState;

/// GET /api/products/best-discounts - Best discount per (productName, brand).
pub async fn best_discounts(State(state): State<AppState>) -> ApiResult<Vec<BestDiscount>> {
    let discounts = state.repo.list_discounts().await?;
    success(reports::best_discounts(&discounts))
}

/// GET /api/products/new-discounts - Discounts added around price capture time.
pub async fn new_discounts(State(state): State<AppState>) -> ApiResult<Vec<NewDiscount>> {
    let discounts = state.repo.list_discounts().await?;
    success(reports::recent_discounts(&discounts))
}

/// GET /api/products/price-history - Carry-forward price history with discounts.
///
/// Answers 204 when no product matches the filters.
pub async fn price_history(
    State(state): State<AppState>,
    Query(query): Query<PriceHistoryQuery>,
) -> Result<Response, AppError> {
    let products = state.repo.list_products().await?;
    let discounts = state.repo.list_discounts().await?;

    let filter = HistoryFilter {
        store: query.store,
        category: query.category,
        brand: query.brand,
    };
    let histories = reports::price_history(
        &products,
        &discounts,
        &filter,
        query.start_date,
        query.end_date,
    );

    if histories.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(ApiResponse::new(histories).into_response())
}

/// GET /api/products/recommendations - Cheapest-per-unit candidate per store.
///
/// Answers 204 when no product matches; an unsupported package unit is a 400.
pub async fn recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Response, AppError> {
    let products = state.repo.list_products().await?;
    let recommendations = reports::recommendations(&products, &query)?;

    if recommendations.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(ApiResponse::new(recommendations).into_response())
}
