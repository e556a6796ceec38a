//! # Bill Repository
//!
//! Transactional bill creation and sale history listings.
//!
//! ## Bill Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Bill Creation (one SQLite transaction)                  │
//! │                                                                         │
//! │  create_bill(lines, generated_by, customer)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. VALIDATE (read-only)                                               │
//! │     ├── cart shape: non-empty, qty > 0, price >= 0                     │
//! │     ├── every product id resolves                                      │
//! │     └── every requested qty is available                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. DECREMENT stock per line, conditionally:                           │
//! │     UPDATE products SET quantity = quantity - ?                        │
//! │     WHERE id = ? AND quantity >= ?                                     │
//! │     (0 rows affected = a concurrent sale won the stock → abort)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. INSERT bill + bill_lines (price captured verbatim)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. COMMIT — any earlier failure rolls everything back; a bill         │
//! │     either exists with all its stock decrements or not at all          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bills are immutable: this repository has no update or delete.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stocksphere_core::{cart, CartLine, CoreError, Product};

/// A persisted bill hydrated with the cashier's name and its line items.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BillDetail {
    pub id: String,
    pub total_cents: i64,
    pub generated_by: String,
    pub generated_by_name: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<BillLineDetail>,
}

/// A bill line hydrated with the product's current display name.
///
/// `unit_price_cents` is the price captured at time of sale, not the
/// product's live price.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct BillLineDetail {
    pub id: String,
    pub bill_id: String,
    pub position: i64,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Bill header row with the cashier's name joined in.
#[derive(Debug, Clone, sqlx::FromRow)]
struct BillHeader {
    id: String,
    total_cents: i64,
    generated_by: String,
    generated_by_name: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    created_at: DateTime<Utc>,
}

/// Repository for bill operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Creates a bill: validates the cart, decrements stock, and persists
    /// the bill with its lines, all inside one transaction.
    ///
    /// The caller-supplied unit price on each line is authoritative: it is
    /// captured into the bill verbatim and the total is computed from it,
    /// ignoring the product's live price.
    ///
    /// ## Returns
    /// * `Ok(BillDetail)` - The committed bill
    /// * `Err(DbError::Domain(ProductNotFound))` - A line's id doesn't resolve
    /// * `Err(DbError::Domain(InsufficientStock))` - A line requests more
    ///   than is on hand; nothing is written
    pub async fn create_bill(
        &self,
        lines: &[CartLine],
        generated_by: &str,
        customer_name: Option<String>,
        customer_phone: Option<String>,
    ) -> DbResult<BillDetail> {
        cart::validate_lines(lines).map_err(DbError::Domain)?;

        let mut tx = self.pool.begin().await?;

        // Read-only validation pass against the products as of this
        // transaction.
        let products = resolve_products(&mut tx, lines).await?;
        cart::validate_cart(lines, &products).map_err(DbError::Domain)?;
        let total = cart::cart_total(lines).map_err(DbError::Domain)?;

        let now = Utc::now();

        // Conditional decrement per line. The WHERE guard re-checks
        // availability at write time, so a concurrent sale between the
        // validation pass and this write cannot push stock negative.
        for line in lines {
            let result = sqlx::query(
                r#"
                UPDATE products SET
                    quantity = quantity - ?2,
                    updated_at = ?3
                WHERE id = ?1 AND quantity >= ?2
                "#,
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available: i64 =
                    sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
                        .bind(&line.product_id)
                        .fetch_one(&mut *tx)
                        .await?;

                let name = products
                    .get(&line.product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| line.product_id.clone());

                debug!(product_id = %line.product_id, available, requested = line.quantity,
                    "Stock decrement refused, aborting bill");

                // Dropping the transaction rolls back earlier decrements.
                return Err(CoreError::InsufficientStock {
                    name,
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }

        let bill_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, total_cents, generated_by, customer_name, customer_phone,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&bill_id)
        .bind(total.cents())
        .bind(generated_by)
        .bind(&customer_name)
        .bind(&customer_phone)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bill_lines (
                    id, bill_id, position, product_id, quantity, unit_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&bill_id)
            .bind(position as i64)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(bill_id = %bill_id, total_cents = total.cents(), line_count = lines.len(),
            "Bill committed");

        self.get_by_id(&bill_id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", &bill_id))
    }

    /// Gets a bill by ID with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<BillDetail>> {
        let header = sqlx::query_as::<_, BillHeader>(
            r#"
            SELECT
                b.id, b.total_cents, b.generated_by,
                u.name AS generated_by_name,
                b.customer_name, b.customer_phone, b.created_at
            FROM bills b
            INNER JOIN users u ON u.id = b.generated_by
            WHERE b.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let header = match header {
            Some(h) => h,
            None => return Ok(None),
        };

        let lines = self.lines_for(&header.id).await?;
        Ok(Some(assemble(header, lines)))
    }

    /// Lists all bills newest-first, each with its lines.
    pub async fn list(&self) -> DbResult<Vec<BillDetail>> {
        let headers = sqlx::query_as::<_, BillHeader>(
            r#"
            SELECT
                b.id, b.total_cents, b.generated_by,
                u.name AS generated_by_name,
                b.customer_name, b.customer_phone, b.created_at
            FROM bills b
            INNER JOIN users u ON u.id = b.generated_by
            ORDER BY b.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut bills = Vec::with_capacity(headers.len());
        for header in headers {
            let lines = self.lines_for(&header.id).await?;
            bills.push(assemble(header, lines));
        }

        Ok(bills)
    }

    /// Lists bills created within `[start, end]` (inclusive), newest-first.
    pub async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<BillDetail>> {
        let headers = sqlx::query_as::<_, BillHeader>(
            r#"
            SELECT
                b.id, b.total_cents, b.generated_by,
                u.name AS generated_by_name,
                b.customer_name, b.customer_phone, b.created_at
            FROM bills b
            INNER JOIN users u ON u.id = b.generated_by
            WHERE b.created_at >= ?1 AND b.created_at <= ?2
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut bills = Vec::with_capacity(headers.len());
        for header in headers {
            let lines = self.lines_for(&header.id).await?;
            bills.push(assemble(header, lines));
        }

        Ok(bills)
    }

    /// Counts total bills (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn lines_for(&self, bill_id: &str) -> DbResult<Vec<BillLineDetail>> {
        let lines = sqlx::query_as::<_, BillLineDetail>(
            r#"
            SELECT
                l.id, l.bill_id, l.position, l.product_id,
                p.name AS product_name,
                l.quantity, l.unit_price_cents
            FROM bill_lines l
            INNER JOIN products p ON p.id = l.product_id
            WHERE l.bill_id = ?1
            ORDER BY l.position
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}

/// Resolves every product referenced by the cart inside the transaction.
///
/// Unknown ids fail here with the offending id, before any write.
async fn resolve_products(
    tx: &mut Transaction<'_, Sqlite>,
    lines: &[CartLine],
) -> DbResult<HashMap<String, Product>> {
    let mut products = HashMap::new();

    for line in lines {
        if products.contains_key(&line.product_id) {
            continue;
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, description, price_cents, quantity,
                category, min_stock_level, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(&line.product_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        products.insert(line.product_id.clone(), product);
    }

    Ok(products)
}

fn assemble(header: BillHeader, lines: Vec<BillLineDetail>) -> BillDetail {
    BillDetail {
        id: header.id,
        total_cents: header.total_cents,
        generated_by: header.generated_by,
        generated_by_name: header.generated_by_name,
        customer_name: header.customer_name,
        customer_phone: header.customer_phone,
        created_at: header.created_at,
        lines,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stocksphere_core::{NewProduct, Role, User};

    async fn seed_user(db: &Database) -> User {
        db.users()
            .create("Cashier", "cashier@stocksphere.com", "secret123", Role::Staff)
            .await
            .unwrap()
    }

    async fn seed_product(db: &Database, name: &str, quantity: i64, price_cents: i64) -> Product {
        db.products()
            .insert(&NewProduct {
                name: name.to_string(),
                description: None,
                price_cents,
                quantity,
                category: "Grocery".to_string(),
                min_stock_level: 0,
            })
            .await
            .unwrap()
    }

    fn line(product: &Product, quantity: i64, price: i64) -> CartLine {
        CartLine {
            product_id: product.id.clone(),
            quantity,
            unit_price_cents: price,
        }
    }

    #[tokio::test]
    async fn test_bill_decrements_stock_and_totals() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;
        let product = seed_product(&db, "Rice 5kg", 10, 999).await;

        // Captured price 10 wins over the live price 999.
        let bill = db
            .bills()
            .create_bill(&[line(&product, 3, 10)], &user.id, None, None)
            .await
            .unwrap();

        assert_eq!(bill.total_cents, 30);
        assert_eq!(bill.lines.len(), 1);
        assert_eq!(bill.lines[0].unit_price_cents, 10);
        assert_eq!(bill.generated_by_name, "Cashier");

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 7);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;
        let product = seed_product(&db, "Rice 5kg", 10, 1000).await;

        let err = db
            .bills()
            .create_bill(&[line(&product, 20, 1000)], &user.id, None, None)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Insufficient stock for Rice 5kg: available 10, requested 20"
        );

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 10);
        assert_eq!(db.bills().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failing_line_rolls_back_earlier_decrements() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;
        let plenty = seed_product(&db, "Tea", 100, 200).await;
        let scarce = seed_product(&db, "Saffron", 1, 5000).await;

        let err = db
            .bills()
            .create_bill(
                &[line(&plenty, 5, 200), line(&scarce, 2, 5000)],
                &user.id,
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        // The first line's decrement was rolled back with the rest.
        let tea = db.products().get_by_id(&plenty.id).await.unwrap().unwrap();
        assert_eq!(tea.quantity, 100);
        assert_eq!(db.bills().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_itemized_by_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;

        let err = db
            .bills()
            .create_bill(
                &[CartLine {
                    product_id: "missing".to_string(),
                    quantity: 1,
                    unit_price_cents: 100,
                }],
                &user.id,
                None,
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Product not found: missing");
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;

        let err = db
            .bills()
            .create_bill(&[], &user.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_lines_checked_against_combined_demand() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;
        let product = seed_product(&db, "Tea", 10, 100).await;

        // Two lines of 6 each: individually fine, combined they exceed 10.
        // The second conditional decrement refuses and the whole bill aborts.
        let err = db
            .bills()
            .create_bill(
                &[line(&product, 6, 100), line(&product, 6, 100)],
                &user.id,
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 10);
    }

    #[tokio::test]
    async fn test_exact_stock_sells_out() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;
        let product = seed_product(&db, "Tea", 10, 100).await;

        db.bills()
            .create_bill(&[line(&product, 10, 100)], &user.id, None, None)
            .await
            .unwrap();

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 0);
    }

    #[tokio::test]
    async fn test_customer_fields_are_optional_and_stored() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;
        let product = seed_product(&db, "Tea", 10, 100).await;

        let bill = db
            .bills()
            .create_bill(
                &[line(&product, 1, 100)],
                &user.id,
                Some("Walk-in".to_string()),
                Some("0300-0000000".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(bill.customer_name.as_deref(), Some("Walk-in"));
        assert_eq!(bill.customer_phone.as_deref(), Some("0300-0000000"));
    }

    #[tokio::test]
    async fn test_list_and_date_range() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;
        let product = seed_product(&db, "Tea", 10, 100).await;

        db.bills()
            .create_bill(&[line(&product, 1, 100)], &user.id, None, None)
            .await
            .unwrap();
        db.bills()
            .create_bill(&[line(&product, 2, 100)], &user.id, None, None)
            .await
            .unwrap();

        let all = db.bills().list().await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert!(all[0].created_at >= all[1].created_at);

        let window = db
            .bills()
            .list_by_date_range(
                Utc::now() - chrono::Duration::hours(1),
                Utc::now() + chrono::Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(window.len(), 2);

        let empty = db
            .bills()
            .list_by_date_range(
                Utc::now() - chrono::Duration::hours(3),
                Utc::now() - chrono::Duration::hours(2),
            )
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_multi_line_total() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = seed_user(&db).await;
        let tea = seed_product(&db, "Tea", 10, 1000).await;
        let rice = seed_product(&db, "Rice", 10, 250).await;

        let bill = db
            .bills()
            .create_bill(
                &[line(&tea, 3, 1000), line(&rice, 2, 250)],
                &user.id,
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(bill.total_cents, 3500);
        assert_eq!(bill.lines.len(), 2);
        assert_eq!(bill.lines[0].position, 0);
        assert_eq!(bill.lines[1].position, 1);
    }
}
