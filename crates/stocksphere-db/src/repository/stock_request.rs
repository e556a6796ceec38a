//! # Stock Request Repository
//!
//! Replenishment request lifecycle.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Request Lifecycle                              │
//! │                                                                         │
//! │  Staff notices low stock                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  create() → StockRequest { status: Pending }                           │
//! │       │                                                                 │
//! │       ├── update(status: Approved)  ─┐                                 │
//! │       └── update(status: Rejected)  ─┤                                 │
//! │                                      ▼                                  │
//! │                                  TERMINAL (remarks still editable)     │
//! │                                                                         │
//! │  Approving a request does NOT change the product ledger. Restocking    │
//! │  is recorded separately via ProductRepository::set_quantity.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stocksphere_core::validation::validate_requested_quantity;
use stocksphere_core::{CoreError, RequestStatus, StockRequest};

/// A stock request hydrated with display names for its references.
///
/// The stored row carries ids only; listings resolve the product and
/// requester names with JOINs.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct StockRequestDetail {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub requested_by: String,
    pub requested_by_name: String,
    pub requested_by_email: String,
    pub quantity: i64,
    pub status: RequestStatus,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for stock request operations.
#[derive(Debug, Clone)]
pub struct StockRequestRepository {
    pool: SqlitePool,
}

impl StockRequestRepository {
    /// Creates a new StockRequestRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRequestRepository { pool }
    }

    /// Creates a pending replenishment request.
    ///
    /// ## Returns
    /// * `Ok(StockRequest)` - Created request with status Pending
    /// * `Err(DbError::Domain)` - Quantity not positive
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown product or user id
    pub async fn create(
        &self,
        product_id: &str,
        requested_by: &str,
        quantity: i64,
        remarks: Option<String>,
    ) -> DbResult<StockRequest> {
        validate_requested_quantity(quantity).map_err(CoreError::from)?;

        let now = Utc::now();
        let request = StockRequest {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            requested_by: requested_by.to_string(),
            quantity,
            status: RequestStatus::Pending,
            remarks,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %request.id, product_id = %product_id, quantity = %quantity, "Creating stock request");

        sqlx::query(
            r#"
            INSERT INTO stock_requests (
                id, product_id, requested_by, quantity, status, remarks,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&request.id)
        .bind(&request.product_id)
        .bind(&request.requested_by)
        .bind(request.quantity)
        .bind(request.status)
        .bind(&request.remarks)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(request)
    }

    /// Lists all requests newest-first, hydrated with product and
    /// requester names.
    pub async fn list(&self) -> DbResult<Vec<StockRequestDetail>> {
        let requests = sqlx::query_as::<_, StockRequestDetail>(
            r#"
            SELECT
                r.id,
                r.product_id,
                p.name AS product_name,
                r.requested_by,
                u.name AS requested_by_name,
                u.email AS requested_by_email,
                r.quantity,
                r.status,
                r.remarks,
                r.created_at,
                r.updated_at
            FROM stock_requests r
            INNER JOIN products p ON p.id = r.product_id
            INNER JOIN users u ON u.id = r.requested_by
            ORDER BY r.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// Gets a request by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockRequest>> {
        let request = sqlx::query_as::<_, StockRequest>(
            r#"
            SELECT id, product_id, requested_by, quantity, status, remarks,
                   created_at, updated_at
            FROM stock_requests
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Updates a request's status and/or remarks.
    ///
    /// Status changes follow the one-way lifecycle: a request leaves
    /// `Pending` exactly once, into `Approved` or `Rejected`. Any other
    /// status change is refused. Remarks may be edited at any time,
    /// including on settled requests.
    ///
    /// Approving a request does **not** touch the product ledger.
    ///
    /// ## Returns
    /// The request after the update.
    pub async fn update(
        &self,
        id: &str,
        status: Option<RequestStatus>,
        remarks: Option<String>,
    ) -> DbResult<StockRequest> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock request", id))?;

        if let Some(next) = status {
            if !current.status.can_transition_to(next) {
                return Err(CoreError::InvalidStatusTransition {
                    from: current.status,
                    to: next,
                }
                .into());
            }
        }

        let new_status = status.unwrap_or(current.status);
        let new_remarks = remarks.or(current.remarks);
        let now = Utc::now();

        debug!(id = %id, status = ?new_status, "Updating stock request");

        sqlx::query(
            r#"
            UPDATE stock_requests SET
                status = ?2,
                remarks = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(new_status)
        .bind(&new_remarks)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock request", id))
    }

    /// Counts pending requests (for dashboards).
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_requests WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
