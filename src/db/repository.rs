//! Database repository for all data operations.
//!
//! Uses prepared statements and transactions for data integrity. Read
//! operations fetch whole tables; the aggregations filter in memory.

use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Basket, BasketProduct, DiscountRecord, PriceAlert, ProductSnapshot, RegisterUserRequest, User,
};

/// Columns of the discount-with-product join, shared by all discount reads.
const DISCOUNT_SELECT: &str = r#"
    SELECT d.id, d.discount_percentage, d.from_date, d.to_date, d.created_at,
           p.product_id, p.supermarket, p.observed_on, p.product_name,
           p.product_category, p.brand, p.package_quantity, p.package_unit,
           p.price, p.currency
    FROM product_discounts d
    JOIN products p
      ON p.product_id = d.product_id
     AND p.supermarket = d.supermarket
     AND p.observed_on = d.observed_on
"#;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== PRODUCT OPERATIONS ====================

    /// List all product snapshots, oldest observation first.
    pub async fn list_products(&self) -> Result<Vec<ProductSnapshot>, AppError> {
        let rows = sqlx::query(
            r#"SELECT product_id, supermarket, observed_on, product_name, product_category,
                      brand, package_quantity, package_unit, price, currency
               FROM products ORDER BY observed_on, product_id, supermarket"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(product_from_row).collect())
    }

    /// Check whether a snapshot with the given composite key exists.
    pub async fn product_exists(
        &self,
        product_id: &str,
        supermarket: &str,
        observed_on: NaiveDate,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT 1 FROM products WHERE product_id = ? AND supermarket = ? AND observed_on = ?",
        )
        .bind(product_id)
        .bind(supermarket)
        .bind(observed_on)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Fetch a snapshot by composite key.
    pub async fn get_product(
        &self,
        product_id: &str,
        supermarket: &str,
        observed_on: NaiveDate,
    ) -> Result<Option<ProductSnapshot>, AppError> {
        let row = sqlx::query(
            r#"SELECT product_id, supermarket, observed_on, product_name, product_category,
                      brand, package_quantity, package_unit, price, currency
               FROM products WHERE product_id = ? AND supermarket = ? AND observed_on = ?"#,
        )
        .bind(product_id)
        .bind(supermarket)
        .bind(observed_on)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(product_from_row))
    }

    /// Insert a product snapshot.
    pub async fn insert_product(&self, product: &ProductSnapshot) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO products (
                product_id, supermarket, observed_on, product_name, product_category,
                brand, package_quantity, package_unit, price, currency
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&product.product_id)
        .bind(&product.supermarket)
        .bind(product.observed_on)
        .bind(&product.product_name)
        .bind(&product.product_category)
        .bind(&product.brand)
        .bind(product.package_quantity)
        .bind(&product.package_unit)
        .bind(product.price)
        .bind(&product.currency)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Check whether any snapshot carries the given product name (exact match).
    pub async fn product_name_exists(&self, product_name: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM products WHERE product_name = ? LIMIT 1")
            .bind(product_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// List all snapshots with the given product name (exact match).
    pub async fn find_products_by_name(
        &self,
        product_name: &str,
    ) -> Result<Vec<ProductSnapshot>, AppError> {
        let rows = sqlx::query(
            r#"SELECT product_id, supermarket, observed_on, product_name, product_category,
                      brand, package_quantity, package_unit, price, currency
               FROM products WHERE product_name = ?"#,
        )
        .bind(product_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(product_from_row).collect())
    }

    // ==================== DISCOUNT OPERATIONS ====================

    /// List all discounts joined with their product snapshots.
    pub async fn list_discounts(&self) -> Result<Vec<DiscountRecord>, AppError> {
        let sql = format!("{DISCOUNT_SELECT} ORDER BY d.created_at, d.id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(discount_from_row).collect())
    }

    /// List discounts whose product carries the given name (exact match).
    pub async fn find_discounts_by_product_name(
        &self,
        product_name: &str,
    ) -> Result<Vec<DiscountRecord>, AppError> {
        let sql = format!("{DISCOUNT_SELECT} WHERE p.product_name = ?");
        let rows = sqlx::query(&sql)
            .bind(product_name)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(discount_from_row).collect())
    }

    /// Insert a discount row.
    pub async fn insert_discount(&self, discount: &DiscountRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO product_discounts (
                id, product_id, supermarket, observed_on,
                discount_percentage, from_date, to_date, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&discount.id)
        .bind(&discount.product.product_id)
        .bind(&discount.product.supermarket)
        .bind(discount.product.observed_on)
        .bind(discount.discount_percentage)
        .bind(discount.from_date)
        .bind(discount.to_date)
        .bind(discount.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== USER OPERATIONS ====================

    /// Check whether a user with the given email already exists.
    pub async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Create a new user from a registration request and a pre-hashed password.
    pub async fn create_user(
        &self,
        request: &RegisterUserRequest,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, first_name, last_name, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    // ==================== BASKET OPERATIONS ====================

    /// Get a user's basket.
    pub async fn get_basket(&self, user_id: &str) -> Result<Option<Basket>, AppError> {
        let row = sqlx::query("SELECT id, user_id FROM baskets WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Basket {
            id: r.get("id"),
            user_id: r.get("user_id"),
        }))
    }

    /// Get a user's basket, creating it if it does not exist yet.
    pub async fn get_or_create_basket(&self, user_id: &str) -> Result<Basket, AppError> {
        if let Some(basket) = self.get_basket(user_id).await? {
            return Ok(basket);
        }

        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO baskets (id, user_id) VALUES (?, ?)")
            .bind(&id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(Basket {
            id,
            user_id: user_id.to_string(),
        })
    }

    /// List a basket's products, denormalized from their snapshots.
    pub async fn list_basket_products(
        &self,
        basket_id: &str,
    ) -> Result<Vec<BasketProduct>, AppError> {
        let rows = sqlx::query(
            r#"SELECT p.product_id, p.product_name, p.brand, p.supermarket, p.observed_on, p.price
               FROM basket_products b
               JOIN products p
                 ON p.product_id = b.product_id
                AND p.supermarket = b.supermarket
                AND p.observed_on = b.observed_on
               WHERE b.basket_id = ?"#,
        )
        .bind(basket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| BasketProduct {
                product_id: row.get("product_id"),
                product_name: row.get("product_name"),
                brand: row.get("brand"),
                supermarket: row.get("supermarket"),
                price_date: row.get("observed_on"),
                price: row.get("price"),
            })
            .collect())
    }

    /// Product ids already present in a basket.
    pub async fn basket_product_ids(&self, basket_id: &str) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT product_id FROM basket_products WHERE basket_id = ?")
            .bind(basket_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|r| r.get("product_id")).collect())
    }

    /// Append snapshots to a basket atomically (single transaction).
    pub async fn add_products_to_basket(
        &self,
        basket_id: &str,
        products: &[ProductSnapshot],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for product in products {
            sqlx::query(
                "INSERT INTO basket_products (basket_id, product_id, supermarket, observed_on) VALUES (?, ?, ?, ?)",
            )
            .bind(basket_id)
            .bind(&product.product_id)
            .bind(&product.supermarket)
            .bind(product.observed_on)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ==================== PRICE ALERT OPERATIONS ====================

    /// Persist a new, untriggered price alert.
    pub async fn create_alert(
        &self,
        user_id: &str,
        product_name: &str,
        target_price: f64,
    ) -> Result<PriceAlert, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO price_alerts (id, user_id, product_name, target_price, triggered, created_at) VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(product_name)
        .bind(target_price)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(PriceAlert {
            id,
            user_id: user_id.to_string(),
            product_name: product_name.to_string(),
            target_price,
            triggered: false,
            created_at: now,
        })
    }

    /// List all alerts that have not fired yet.
    pub async fn list_untriggered_alerts(&self) -> Result<Vec<PriceAlert>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, product_name, target_price, triggered, created_at FROM price_alerts WHERE triggered = 0",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(alert_from_row).collect())
    }

    /// Flip an alert to triggered. Returns false if it had already fired,
    /// which makes the trigger at-most-once even under overlapping passes.
    pub async fn mark_alert_triggered(&self, alert_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE price_alerts SET triggered = 1 WHERE id = ? AND triggered = 0")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Get an alert by ID.
    pub async fn get_alert(&self, id: &str) -> Result<Option<PriceAlert>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, product_name, target_price, triggered, created_at FROM price_alerts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(alert_from_row))
    }
}

// Helper functions for row conversion

fn product_from_row(row: &sqlx::sqlite::SqliteRow) -> ProductSnapshot {
    ProductSnapshot {
        product_id: row.get("product_id"),
        supermarket: row.get("supermarket"),
        observed_on: row.get("observed_on"),
        product_name: row.get("product_name"),
        product_category: row.get("product_category"),
        brand: row.get("brand"),
        package_quantity: row.get("package_quantity"),
        package_unit: row.get("package_unit"),
        price: row.get("price"),
        currency: row.get("currency"),
    }
}

fn discount_from_row(row: &sqlx::sqlite::SqliteRow) -> DiscountRecord {
    DiscountRecord {
        id: row.get("id"),
        product: product_from_row(row),
        discount_percentage: row.get("discount_percentage"),
        from_date: row.get("from_date"),
        to_date: row.get("to_date"),
        created_at: row.get("created_at"),
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

fn alert_from_row(row: &sqlx::sqlite::SqliteRow) -> PriceAlert {
    let triggered: i32 = row.get("triggered");
    PriceAlert {
        id: row.get("id"),
        user_id: row.get("user_id"),
        product_name: row.get("product_name"),
        target_price: row.get("target_price"),
        triggered: triggered != 0,
        created_at: row.get("created_at"),
    }
}
