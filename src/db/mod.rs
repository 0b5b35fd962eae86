//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Product snapshots are append-only; the composite key makes re-imports
    // of the same feed file idempotent.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            product_id TEXT NOT NULL,
            supermarket TEXT NOT NULL,
            observed_on TEXT NOT NULL,
            product_name TEXT NOT NULL,
            product_category TEXT NOT NULL,
            brand TEXT NOT NULL,
            package_quantity REAL NOT NULL,
            package_unit TEXT NOT NULL,
            price REAL NOT NULL,
            currency TEXT NOT NULL,
            PRIMARY KEY (product_id, supermarket, observed_on)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_discounts (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL,
            supermarket TEXT NOT NULL,
            observed_on TEXT NOT NULL,
            discount_percentage REAL NOT NULL,
            from_date TEXT NOT NULL,
            to_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (product_id, supermarket, observed_on)
                REFERENCES products (product_id, supermarket, observed_on)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS baskets (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            FOREIGN KEY (user_id) REFERENCES users (id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // PRIMARY KEY (basket_id, product_id) enforces "no duplicate product ids
    // within a basket" regardless of supermarket or observation date.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS basket_products (
            basket_id TEXT NOT NULL,
            product_id TEXT NOT NULL,
            supermarket TEXT NOT NULL,
            observed_on TEXT NOT NULL,
            PRIMARY KEY (basket_id, product_id),
            FOREIGN KEY (basket_id) REFERENCES baskets (id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS price_alerts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            product_name TEXT NOT NULL,
            target_price REAL NOT NULL,
            triggered INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_name ON products(product_name);")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_discounts_product ON product_discounts(product_id, supermarket, observed_on);",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_alerts_triggered ON price_alerts(triggered);")
        .execute(pool)
        .await?;

    Ok(())
}
