//! # Product Repository
//!
//! Store operations for products, including the conditional stock adjuster
//! used by the sale and reversal orchestrators.
//!
//! ## Conditional Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     adjust_stock(id, delta)                             │
//! │                                                                         │
//! │  1. SELECT current stock                                                │
//! │  2. new = current + delta                                               │
//! │  3. delta < 0 and new < 0 ──► OutOfStock (nothing written)              │
//! │  4. UPDATE stock_quantity = new                                         │
//! │                                                                         │
//! │  This is read-modify-write, NOT a single atomic statement. Two          │
//! │  concurrent decrements can race; the schema CHECK constraint is the     │
//! │  last line that keeps stock from going negative, and a violation        │
//! │  surfaces as an honest QueryFailed to the caller.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use tally_core::Product;

/// Repository for product store operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, sale_price_cents, vat_rate_bps,
                   stock_quantity, critical_stock_level, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID, failing with NotFound when absent.
    pub async fn require(&self, id: &str) -> StoreResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> StoreResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, sale_price_cents, vat_rate_bps,
                stock_quantity, critical_stock_level, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.sale_price_cents)
        .bind(product.vat_rate_bps)
        .bind(product.stock_quantity)
        .bind(product.critical_stock_level)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Adjusts the stock level by `delta` (negative for sales, positive for
    /// restocking), returning the updated product.
    ///
    /// ## Errors
    /// - `NotFound` when the product doesn't exist
    /// - `OutOfStock` when a decrement would drive the quantity below zero;
    ///   nothing is written in that case
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> StoreResult<Product> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let mut product = self.require(id).await?;

        let new_quantity = product.stock_quantity + delta;
        if delta < 0 && new_quantity < 0 {
            return Err(StoreError::OutOfStock {
                name: product.name,
                available: product.stock_quantity,
                requested: -delta,
            });
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(new_quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        product.stock_quantity = new_quantity;
        product.updated_at = now;
        Ok(product)
    }

    /// Lists products at or below their critical stock level.
    pub async fn list_below_critical(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, sale_price_cents, vat_rate_bps,
                   stock_quantity, critical_stock_level, created_at, updated_at
            FROM products
            WHERE stock_quantity <= critical_stock_level
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::LedgerStore;
    use uuid::Uuid;

    fn sample_product(stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            sku: format!("SKU-{}", Uuid::new_v4()),
            name: "Test Widget".to_string(),
            sale_price_cents: 1_000,
            vat_rate_bps: 1800,
            stock_quantity: stock,
            critical_stock_level: 2,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = LedgerStore::in_memory().await.unwrap();
        let product = sample_product(10);
        store.products().insert(&product).await.unwrap();

        let found = store.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(found.unwrap().stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_adjust_stock_decrement() {
        let store = LedgerStore::in_memory().await.unwrap();
        let product = sample_product(10);
        store.products().insert(&product).await.unwrap();

        let updated = store.products().adjust_stock(&product.id, -4).await.unwrap();
        assert_eq!(updated.stock_quantity, 6);
    }

    #[tokio::test]
    async fn test_adjust_stock_out_of_stock() {
        let store = LedgerStore::in_memory().await.unwrap();
        let product = sample_product(3);
        store.products().insert(&product).await.unwrap();

        let err = store.products().adjust_stock(&product.id, -5).await;
        assert!(matches!(
            err,
            Err(StoreError::OutOfStock {
                available: 3,
                requested: 5,
                ..
            })
        ));

        // Nothing was written
        let found = store.products().require(&product.id).await.unwrap();
        assert_eq!(found.stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_adjust_stock_missing_product() {
        let store = LedgerStore::in_memory().await.unwrap();
        let err = store.products().adjust_stock("missing", -1).await;
        assert!(matches!(err, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_below_critical() {
        let store = LedgerStore::in_memory().await.unwrap();
        let mut low = sample_product(1);
        low.critical_stock_level = 5;
        let high = sample_product(50);
        store.products().insert(&low).await.unwrap();
        store.products().insert(&high).await.unwrap();

        let below = store.products().list_below_critical().await.unwrap();
        assert_eq!(below.len(), 1);
        assert_eq!(below[0].id, low.id);
    }
}
