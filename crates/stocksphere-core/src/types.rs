//! # Domain Types
//!
//! Core domain types used throughout StockSphere.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Bill       │   │  StockRequest   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  total_cents    │   │  product_id     │       │
//! │  │  price_cents    │   │  generated_by   │   │  status         │       │
//! │  │  quantity       │   │  lines (Bill-   │   │  requested_by   │       │
//! │  │  min_stock_level│   │   Line records) │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     User        │   │      Role       │   │  RequestStatus  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  Admin          │   │  Pending        │       │
//! │  │  email (unique) │   │  Staff          │   │  Approved       │       │
//! │  │  role           │   │                 │   │  Rejected       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Note that `User` carries no credential material: the password hash lives
//! only inside the storage layer and is never serialized outward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product tracked by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Unit price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Quantity on hand. Never negative.
    pub quantity: i64,

    /// Category label.
    pub category: String,

    /// Minimum stock threshold; at or below this the product is "low stock".
    pub min_stock_level: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the requested quantity is available.
    #[inline]
    pub fn can_fulfil(&self, requested: i64) -> bool {
        self.quantity >= requested
    }

    /// Checks whether the product is at or below its minimum stock threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock_level
    }
}

/// Fields for creating a new product. Identity and timestamps are
/// generated by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub quantity: i64,
    pub category: String,
    pub min_stock_level: i64,
}

// =============================================================================
// Role
// =============================================================================

/// Coarse permission tag attached to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user management and bill listings.
    Admin,
    /// Day-to-day operations: selling, requesting stock.
    Staff,
}

impl Role {
    /// Returns true for administrative accounts.
    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

// =============================================================================
// User
// =============================================================================

/// A user account, as visible outside the storage layer.
///
/// The password hash is deliberately absent from this type. It stays in the
/// database crate and is compared, never read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique login email.
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Request
// =============================================================================

/// Lifecycle status of a replenishment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting an admin decision.
    Pending,
    /// Admin accepted the request.
    Approved,
    /// Admin declined the request.
    Rejected,
}

impl RequestStatus {
    /// Checks whether a status transition is allowed.
    ///
    /// Transitions are one-way: a request leaves `Pending` exactly once.
    /// Approved and rejected requests stay that way (remarks may still be
    /// edited, but not the status).
    pub const fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }

    /// Returns the status as its stored string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Pending
    }
}

/// A stock replenishment request.
///
/// Approving a request does **not** adjust the product ledger; restocking is
/// recorded separately through an explicit quantity overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockRequest {
    pub id: String,
    /// Product the request refers to.
    pub product_id: String,
    /// User who raised the request.
    pub requested_by: String,
    /// Requested quantity (positive).
    pub quantity: i64,
    pub status: RequestStatus,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Bill
// =============================================================================

/// One (product, quantity, price-at-sale) tuple submitted as part of a bill.
///
/// The unit price is supplied by the caller and captured verbatim; it is
/// decoupled from the product's live price so historical bills stay accurate
/// when prices change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl CartLine {
    /// Line total: quantity × captured unit price.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.quantity * self.unit_price_cents)
    }
}

/// A completed sale transaction. Immutable once created: no update or
/// delete operation exists anywhere in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bill {
    pub id: String,
    /// Sum of quantity × captured price across all lines.
    pub total_cents: i64,
    /// User who generated the bill.
    pub generated_by: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Returns the bill total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A persisted line item of a bill.
/// Uses the snapshot pattern: the price at time of sale is frozen here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillLine {
    pub id: String,
    pub bill_id: String,
    /// Order of the line within the bill.
    pub position: i64,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_status_transitions() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Approved));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Rejected));

        assert!(!RequestStatus::Approved.can_transition_to(RequestStatus::Pending));
        assert!(!RequestStatus::Approved.can_transition_to(RequestStatus::Rejected));
        assert!(!RequestStatus::Rejected.can_transition_to(RequestStatus::Approved));
        assert!(!RequestStatus::Pending.can_transition_to(RequestStatus::Pending));
    }

    #[test]
    fn test_request_status_default() {
        assert_eq!(RequestStatus::default(), RequestStatus::Pending);
    }

    #[test]
    fn test_product_low_stock() {
        let mut product = sample_product();
        product.quantity = 5;
        product.min_stock_level = 5;
        assert!(product.is_low_stock());

        product.quantity = 6;
        assert!(!product.is_low_stock());
    }

    #[test]
    fn test_product_can_fulfil() {
        let product = sample_product();
        assert!(product.can_fulfil(10));
        assert!(product.can_fulfil(3));
        assert!(!product.can_fulfil(11));
    }

    #[test]
    fn test_cart_line_total() {
        let line = CartLine {
            product_id: "p-1".to_string(),
            quantity: 3,
            unit_price_cents: 1000,
        };
        assert_eq!(line.line_total().cents(), 3000);
    }

    fn sample_product() -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            name: "Rice 5kg".to_string(),
            description: None,
            price_cents: 1299,
            quantity: 10,
            category: "Grocery".to_string(),
            min_stock_level: 5,
            created_at: now,
            updated_at: now,
        }
    }
}
