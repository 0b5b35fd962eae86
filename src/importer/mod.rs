//! CSV feed importer.
//!
//! Reads per-store price and discount feeds from the data directory. The
//! filename encodes the supermarket and the observation date:
//!
//! - products:  `<supermarket>_<yyyy-mm-dd>.csv`
//! - discounts: `<supermarket>_discounts_<yyyy-mm-dd>.csv`
//!
//! Rows are semicolon-delimited with a header line. Short rows are logged
//! and skipped; rows that fail to parse abort the whole file's import. Files
//! already imported in the same batch stay committed.

use std::path::Path;

use chrono::{Days, NaiveDate};
use csv::StringRecord;
use rand::Rng;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{DiscountRecord, ProductSnapshot};

/// Minimum field count for a product row.
const PRODUCT_FIELDS: usize = 8;
/// Minimum field count for a discount row.
const DISCOUNT_FIELDS: usize = 9;

/// Import every product feed in `data_dir`, skipping discount feeds.
///
/// Returns the filenames successfully processed, in directory order.
pub async fn import_product_feeds(
    repo: &Repository,
    data_dir: &Path,
) -> Result<Vec<String>, AppError> {
    let mut imported = Vec::new();

    for filename in list_feed_files(data_dir)? {
        if filename.contains("discounts") {
            continue;
        }
        import_products_file(repo, data_dir, &filename).await?;
        imported.push(filename);
    }

    Ok(imported)
}

/// Import every discount feed in `data_dir`.
///
/// Files whose name does not signal a discounts feed are skipped. The RNG is
/// used to synthesize each discount's creation date.
pub async fn import_discount_feeds<R: Rng + Send>(
    repo: &Repository,
    data_dir: &Path,
    rng: &mut R,
) -> Result<Vec<String>, AppError> {
    let mut imported = Vec::new();

    for filename in list_feed_files(data_dir)? {
        if !filename.contains("discounts") {
            continue;
        }
        import_discounts_file(repo, data_dir, &filename, rng).await?;
        imported.push(filename);
    }

    Ok(imported)
}

/// List `*.csv` filenames in the data directory, sorted for a stable batch order.
fn list_feed_files(data_dir: &Path) -> Result<Vec<String>, AppError> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".csv") {
            files.push(name);
        }
    }

    files.sort();
    Ok(files)
}

async fn import_products_file(
    repo: &Repository,
    data_dir: &Path,
    filename: &str,
) -> Result<(), AppError> {
    let supermarket = extract_supermarket(filename)?;
    let observed_on = extract_date(filename, 1)?;

    let mut row_count = 0usize;
    let mut inserted = 0usize;

    for (i, record) in read_feed(data_dir, filename)?.iter().enumerate() {
        row_count += 1;
        if record.len() < PRODUCT_FIELDS {
            tracing::warn!("Row {} in file {} has insufficient columns", i, filename);
            continue;
        }

        let product = snapshot_from_record(record, &supermarket, observed_on)
            .map_err(|e| import_row_error(i, filename, &e))?;

        if repo
            .product_exists(&product.product_id, &product.supermarket, product.observed_on)
            .await?
        {
            continue; // Skip duplicate
        }

        repo.insert_product(&product).await?;
        inserted += 1;
    }

    tracing::info!(
        file = filename,
        rows = row_count,
        inserted,
        "Imported product feed"
    );
    Ok(())
}

async fn import_discounts_file<R: Rng + Send>(
    repo: &Repository,
    data_dir: &Path,
    filename: &str,
    rng: &mut R,
) -> Result<(), AppError> {
    let supermarket = extract_supermarket(filename)?;
    let observed_on = extract_date(filename, 2)?;

    let mut inserted = 0usize;
    let mut dropped = 0usize;

    for (i, record) in read_feed(data_dir, filename)?.iter().enumerate() {
        if record.len() < DISCOUNT_FIELDS {
            tracing::warn!("Row {} in file {} has insufficient columns", i, filename);
            continue;
        }

        let fields = discount_fields_from_record(record)
            .map_err(|e| import_row_error(i, filename, &e))?;

        // A discount without a resolvable snapshot is dropped, not an error.
        let Some(product) = repo
            .get_product(&fields.product_id, &supermarket, observed_on)
            .await?
        else {
            dropped += 1;
            continue;
        };

        let created_at = backdate_created_at(fields.from_date, rng);
        let discount = DiscountRecord {
            id: uuid::Uuid::new_v4().to_string(),
            product,
            discount_percentage: fields.percentage,
            from_date: fields.from_date,
            to_date: fields.to_date,
            created_at,
        };
        repo.insert_discount(&discount).await?;
        inserted += 1;
    }

    tracing::info!(
        file = filename,
        inserted,
        dropped,
        "Imported discount feed"
    );
    Ok(())
}

/// Read a feed file into records. The header line is skipped; records may
/// have varying field counts, which the row loops validate themselves.
fn read_feed(data_dir: &Path, filename: &str) -> Result<Vec<StringRecord>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_path(data_dir.join(filename))?;

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }
    Ok(records)
}

fn import_row_error(index: usize, filename: &str, cause: &str) -> AppError {
    AppError::Import(format!(
        "Failed to import row {} in file {}: {}",
        index, filename, cause
    ))
}

/// Map a product row: id;name;category;brand;quantity;unit;price;currency
fn snapshot_from_record(
    record: &StringRecord,
    supermarket: &str,
    observed_on: NaiveDate,
) -> Result<ProductSnapshot, String> {
    let package_quantity: f64 = record[4]
        .trim()
        .parse()
        .map_err(|_| format!("invalid package quantity '{}'", &record[4]))?;
    let price: f64 = record[6]
        .trim()
        .parse()
        .map_err(|_| format!("invalid price '{}'", &record[6]))?;

    Ok(ProductSnapshot {
        product_id: record[0].to_string(),
        supermarket: supermarket.to_string(),
        observed_on,
        product_name: record[1].to_string(),
        product_category: record[2].to_string(),
        brand: record[3].to_string(),
        package_quantity,
        package_unit: record[5].to_string(),
        price,
        currency: record[7].to_string(),
    })
}

#[derive(Debug)]
struct DiscountFields {
    product_id: String,
    from_date: NaiveDate,
    to_date: NaiveDate,
    percentage: f64,
}

/// Map a discount row; the validity interval sits in columns 6..7 and the
/// percentage in column 8 of the shared feed layout.
///
/// The importer is the sole writer of discounts, so the row invariants are
/// enforced here: percentage in (0, 100] and fromDate <= toDate.
fn discount_fields_from_record(record: &StringRecord) -> Result<DiscountFields, String> {
    let from_date: NaiveDate = record[6]
        .trim()
        .parse()
        .map_err(|_| format!("invalid from date '{}'", &record[6]))?;
    let to_date: NaiveDate = record[7]
        .trim()
        .parse()
        .map_err(|_| format!("invalid to date '{}'", &record[7]))?;
    let percentage: f64 = record[8]
        .trim()
        .parse()
        .map_err(|_| format!("invalid discount percentage '{}'", &record[8]))?;

    if !(percentage > 0.0 && percentage <= 100.0) {
        return Err(format!(
            "discount percentage {} outside (0, 100]",
            percentage
        ));
    }
    if from_date > to_date {
        return Err(format!(
            "discount interval inverted: {} > {}",
            from_date, to_date
        ));
    }

    Ok(DiscountFields {
        product_id: record[0].to_string(),
        from_date,
        to_date,
        percentage,
    })
}

/// Synthesize a discount creation date: a random day within 5 days before
/// the discount's start. A test-data generation artifact carried over from
/// the feed tooling; not a real freshness signal.
fn backdate_created_at<R: Rng>(from_date: NaiveDate, rng: &mut R) -> NaiveDate {
    let offset = rng.gen_range(0..=5u64);
    from_date
        .checked_sub_days(Days::new(offset))
        .unwrap_or(from_date)
}

/// Extract the supermarket name (first `_`-separated token) from a feed filename.
fn extract_supermarket(filename: &str) -> Result<String, AppError> {
    Ok(filename_parts(filename)?[0].to_string())
}

/// Extract the observation date from a feed filename at the given token index.
fn extract_date(filename: &str, index: usize) -> Result<NaiveDate, AppError> {
    let parts = filename_parts(filename)?;
    let part = parts
        .get(index)
        .ok_or_else(|| AppError::Import(format!("Filename does not contain date: {}", filename)))?;

    part.parse()
        .map_err(|_| AppError::Import(format!("Invalid date format in filename: {}", filename)))
}

fn filename_parts(filename: &str) -> Result<Vec<&str>, AppError> {
    let Some(stem) = filename.strip_suffix(".csv") else {
        return Err(AppError::Import(format!("Invalid filename: {}", filename)));
    };
    Ok(stem.split('_').collect())
}
