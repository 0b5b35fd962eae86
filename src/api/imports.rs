//! Feed import endpoints.

use axum::extract::State;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use super::{success, ApiResult};
use crate::importer;
use crate::AppState;

/// Filenames processed by an import run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported_files: Vec<String>,
}

/// GET /api/import/products - Import all product feeds from the data directory.
pub async fn import_products(State(state): State<AppState>) -> ApiResult<ImportSummary> {
    let imported_files =
        importer::import_product_feeds(&state.repo, &state.config.data_dir).await?;

    tracing::info!(files = imported_files.len(), "Product import finished");
    success(ImportSummary { imported_files })
}

/// GET /api/import/discounts - Import all discount feeds from the data directory.
pub async fn import_discounts(State(state): State<AppState>) -> ApiResult<ImportSummary> {
    let mut rng = StdRng::from_entropy();
    let imported_files =
        importer::import_discount_feeds(&state.repo, &state.config.data_dir, &mut rng).await?;

    tracing::info!(files = imported_files.len(), "Discount import finished");
    success(ImportSummary { imported_files })
}
