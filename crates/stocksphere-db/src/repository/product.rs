//! # Product Repository
//!
//! Database operations for the product ledger.
//!
//! ## Key Operations
//! - CRUD operations
//! - Absolute quantity overwrite (restock / correction)
//! - Low-stock listing
//!
//! ## Quantity Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways Quantity Changes                            │
//! │                                                                         │
//! │  1. set_quantity(id, qty)   ← Absolute overwrite (restock, stocktake)  │
//! │     UPDATE products SET quantity = ?                                   │
//! │                                                                         │
//! │  2. Bill creation           ← Conditional decrement (BillRepository)   │
//! │     UPDATE products SET quantity = quantity - ?                        │
//! │     WHERE id = ? AND quantity >= ?                                     │
//! │                                                                         │
//! │  Both paths preserve the invariant: quantity never goes below zero.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stocksphere_core::validation::{
    validate_absolute_quantity, validate_category, validate_min_stock_level, validate_price_cents,
    validate_product_name,
};
use stocksphere_core::{CoreError, NewProduct, Product};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.insert(&new_product).await?;
/// let low = repo.list_low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists all products, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, description, price_cents, quantity,
                category, min_stock_level, created_at, updated_at
            FROM products
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, description, price_cents, quantity,
                category, min_stock_level, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// Identity and timestamps are generated here; the caller supplies only
    /// the descriptive fields.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated id and timestamps
    /// * `Err(DbError::Domain)` - A field failed validation
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_product_name(&new.name).map_err(CoreError::from)?;
        validate_category(&new.category).map_err(CoreError::from)?;
        validate_price_cents(new.price_cents).map_err(CoreError::from)?;
        validate_absolute_quantity(new.quantity).map_err(CoreError::from)?;
        validate_min_stock_level(new.min_stock_level).map_err(CoreError::from)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: new.description.clone(),
            price_cents: new.price_cents,
            quantity: new.quantity,
            category: new.category.trim().to_string(),
            min_stock_level: new.min_stock_level,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_cents, quantity,
                category, min_stock_level, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.quantity)
        .bind(&product.category)
        .bind(product.min_stock_level)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Updates an existing product's descriptive fields and quantity.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_product_name(&product.name).map_err(CoreError::from)?;
        validate_category(&product.category).map_err(CoreError::from)?;
        validate_price_cents(product.price_cents).map_err(CoreError::from)?;
        validate_absolute_quantity(product.quantity).map_err(CoreError::from)?;
        validate_min_stock_level(product.min_stock_level).map_err(CoreError::from)?;

        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                quantity = ?5,
                category = ?6,
                min_stock_level = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.quantity)
        .bind(&product.category)
        .bind(product.min_stock_level)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Overwrites a product's quantity on hand.
    ///
    /// Used for restocking and stocktake corrections. This is an absolute
    /// write; sale decrements go through the bill workflow instead.
    ///
    /// ## Returns
    /// The product with its new quantity.
    pub async fn set_quantity(&self, id: &str, quantity: i64) -> DbResult<Product> {
        validate_absolute_quantity(quantity).map_err(CoreError::from)?;

        debug!(id = %id, quantity = %quantity, "Setting product quantity");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                quantity = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Lists products at or below their minimum stock threshold.
    ///
    /// A product with `quantity == min_stock_level` counts as low stock.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, description, price_cents, quantity,
                category, min_stock_level, created_at, updated_at
            FROM products
            WHERE quantity <= min_stock_level
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Low-stock products listed");
        Ok(products)
    }

    /// Deletes a product.
    ///
    /// ## Returns
    /// * `Ok(())` - Delete successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    /// * `Err(DbError::ForeignKeyViolation)` - Product referenced by history
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
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
    use crate::pool::{Database, DbConfig};

    fn new_product(name: &str, quantity: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price_cents: 1000,
            quantity,
            category: "Grocery".to_string(),
            min_stock_level: 5,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let inserted = repo.insert(&new_product("Rice 5kg", 10)).await.unwrap();
        let fetched = repo.get_by_id(&inserted.id).await.unwrap().unwrap();

        assert_eq!(fetched.name, "Rice 5kg");
        assert_eq!(fetched.quantity, 10);
        assert_eq!(fetched.price_cents, 1000);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_fields() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut p = new_product("", 10);
        assert!(repo.insert(&p).await.is_err());

        p = new_product("Tea", -1);
        assert!(repo.insert(&p).await.is_err());

        p = new_product("Tea", 1);
        p.price_cents = -50;
        assert!(repo.insert(&p).await.is_err());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&new_product("Zucchini", 1)).await.unwrap();
        repo.insert(&new_product("Apple", 1)).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Apple");
        assert_eq!(listed[1].name, "Zucchini");
    }

    #[tokio::test]
    async fn test_set_quantity() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = repo.insert(&new_product("Tea", 10)).await.unwrap();
        let updated = repo.set_quantity(&product.id, 42).await.unwrap();

        assert_eq!(updated.quantity, 42);
        assert!(repo.set_quantity(&product.id, -1).await.is_err());
        assert!(repo.set_quantity("missing", 5).await.is_err());
    }

    #[tokio::test]
    async fn test_set_quantity_zero_allowed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = repo.insert(&new_product("Tea", 10)).await.unwrap();
        let updated = repo.set_quantity(&product.id, 0).await.unwrap();
        assert_eq!(updated.quantity, 0);
    }

    #[tokio::test]
    async fn test_list_low_stock_boundary() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        // min_stock_level is 5 in the fixture: 5 is low, 6 is not.
        repo.insert(&new_product("At threshold", 5)).await.unwrap();
        repo.insert(&new_product("Above threshold", 6)).await.unwrap();
        repo.insert(&new_product("Below threshold", 2)).await.unwrap();

        let low = repo.list_low_stock().await.unwrap();
        let names: Vec<&str> = low.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["At threshold", "Below threshold"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = repo.insert(&new_product("Tea", 10)).await.unwrap();
        repo.delete(&product.id).await.unwrap();

        assert!(repo.get_by_id(&product.id).await.unwrap().is_none());
        assert!(repo.delete(&product.id).await.is_err());
    }

    #[tokio::test]
    async fn test_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        assert_eq!(repo.count().await.unwrap(), 0);
        repo.insert(&new_product("Tea", 10)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
