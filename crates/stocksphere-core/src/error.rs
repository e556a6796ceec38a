//! # Error Types
//!
//! Domain-specific error types for stocksphere-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stocksphere-core errors (this file)                                   │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stocksphere-db errors (separate crate)                                │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → API boundary            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, available stock, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::types::RequestStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are surfaced to the
/// caller as structured messages; none are silently swallowed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cart line references a product id that does not resolve.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity exceeds availability.
    ///
    /// Carries the product name and the available amount for display:
    /// "Insufficient stock for Rice 5kg: available 3, requested 20".
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Credential verification failed.
    ///
    /// Deliberately a single variant with a single message: callers must not
    /// be able to distinguish "no such email" from "wrong password".
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// A stock request status change that the lifecycle does not allow.
    ///
    /// Requests leave `Pending` exactly once; approved and rejected are
    /// terminal.
    #[error("Cannot change request status from {from:?} to {to:?}")]
    InvalidStatusTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// An admin attempted to delete their own account.
    #[error("Cannot delete your own account")]
    SelfDeletion,

    /// Bill total would overflow i64 cents.
    #[error("Bill total overflows")]
    TotalOverflow,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
