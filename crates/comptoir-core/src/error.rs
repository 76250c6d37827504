//! # Error Types
//!
//! Domain error taxonomy for the ledger engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  comptoir-core errors (this file)                                      │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  comptoir-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures, LockTimeout,                 │
//! │                         NoActiveTransaction, Domain(CoreError)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Carry structured fields (available vs requested), never only text
//! 3. Errors are enum variants, never String

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// Every variant aborts the enclosing unit of work. None of them is worth
/// retrying: the same input hits the same rule again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product cannot be found in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A stock movement would take the position below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 30 bottles
    ///      │
    ///      ▼
    /// Lock position: quantity=22
    ///      │
    ///      ▼
    /// InsufficientStock { available: 22, requested: 30 }
    ///      │
    ///      ▼
    /// UI shows: "Only 22 left in this store"
    /// ```
    #[error(
        "Insufficient stock for product {product_id} in store {store_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        store_id: String,
        available: i64,
        requested: i64,
    },

    /// A cash movement would take the store's balance below zero.
    #[error("Insufficient cash in store {store_id}: available {available}, requested {requested}")]
    InsufficientCash {
        store_id: String,
        available: Money,
        requested: Money,
    },

    /// Cash amount is zero, negative or otherwise unusable.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// The operation needs a store and none was given.
    #[error("Store id is required")]
    MissingStoreId,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidAmount error.
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any ledger write so a bad request never opens a lock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Invalid format or combination of values.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: "heineken".to_string(),
            store_id: "bar".to_string(),
            available: 22,
            requested: 30,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product heineken in store bar: available 22, requested 30"
        );
    }

    #[test]
    fn test_insufficient_cash_message() {
        let err = CoreError::InsufficientCash {
            store_id: "bar".to_string(),
            available: Money::from_cents(1050),
            requested: Money::from_cents(2000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient cash in store bar: available 10.50, requested 20.00"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
