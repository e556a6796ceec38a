//! # stocksphere-core: Pure Business Logic for StockSphere
//!
//! This crate is the **heart** of StockSphere. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      StockSphere Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   API Collaborator (external)                   │   │
//! │  │    HTTP routing, session tokens, CORS — out of this repo       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stocksphere-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ validate  │  │   rules   │  │   │
//! │  │   │  Bill ... │  │  (cents)  │  │  + total  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stocksphere-db (Database Layer)                 │   │
//! │  │           SQLite queries, migrations, repositories              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Bill, StockRequest, User, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart validation and bill total computation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use stocksphere_core::Money` instead of
// `use stocksphere_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum password length accepted at registration and password change.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Email domain used when an admin creates a staff account by name only.
pub const STAFF_EMAIL_DOMAIN: &str = "stocksphere.com";

/// Starter password assigned to admin-created staff accounts.
///
/// Staff are expected to change it on first login; the password-change flow
/// enforces the minimum length policy from then on.
pub const DEFAULT_STAFF_PASSWORD: &str = "staff123";

/// Builds the generated login email for an admin-created staff account:
/// lowercased name with whitespace stripped, at the staff domain.
///
/// ## Example
/// ```rust
/// assert_eq!(
///     stocksphere_core::staff_email("Jane Doe"),
///     "janedoe@stocksphere.com"
/// );
/// ```
pub fn staff_email(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    format!("{}@{}", sanitized, STAFF_EMAIL_DOMAIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_email() {
        assert_eq!(staff_email("Jane Doe"), "janedoe@stocksphere.com");
        assert_eq!(staff_email("  Bob "), "bob@stocksphere.com");
        assert_eq!(staff_email("ALICE"), "alice@stocksphere.com");
    }
}
