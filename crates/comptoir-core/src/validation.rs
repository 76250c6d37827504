//! # Validation Module
//!
//! Input rules checked before a workflow opens its unit of work.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP controller, CLI)                                │
//! │  └── Deserialization, auth, formatting                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Store id present, quantities in range                             │
//! │  └── Reasons allowed for the operation                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger (inside the unit of work)                             │
//! │  ├── quantity >= 0, balance >= 0                                       │
//! │  └── CHECK constraints in SQLite                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use comptoir_core::validation::{validate_quantity, validate_store_id};
//!
//! assert!(validate_store_id("bar").is_ok());
//! assert!(validate_quantity(2).is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::StockReason;
use crate::{MAX_ITEM_QUANTITY, MAX_LINE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifiers & Text
// =============================================================================

/// Every ledger operation is scoped to a store.
///
/// Fails with [`CoreError::MissingStoreId`] rather than a validation error so
/// callers can tell "no store chosen" apart from malformed input.
pub fn validate_store_id(store_id: &str) -> CoreResult<()> {
    if store_id.trim().is_empty() {
        return Err(CoreError::MissingStoreId);
    }
    Ok(())
}

/// Validates a non-empty identifier field.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a required free-text field with a length cap.
///
/// ## Example
/// ```rust
/// use comptoir_core::validation::validate_text;
///
/// assert!(validate_text("description", "Ice delivery", 500).is_ok());
/// assert!(validate_text("description", "   ", 500).is_err());
/// ```
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name (1-200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 200)
}

// =============================================================================
// Quantities
// =============================================================================

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// A movement must change something, by an amount that can be negated.
pub fn validate_quantity_change(change: i64) -> ValidationResult<()> {
    if change == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "quantity_change".to_string(),
        });
    }

    if change == i64::MIN {
        return Err(ValidationError::OutOfRange {
            field: "quantity_change".to_string(),
            min: -i64::MAX,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the number of line items in a sale or purchase.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    Ok(())
}

/// Base units per purchase unit must be at least 1.
pub fn validate_units_per_box(units: i64) -> ValidationResult<()> {
    if units < 1 {
        return Err(ValidationError::MustBePositive {
            field: "units_per_box".to_string(),
        });
    }
    Ok(())
}

/// Recipe quantities are positive rationals.
pub fn validate_quantity_per_unit(qpu: Decimal) -> ValidationResult<()> {
    if qpu <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "quantity_per_unit".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Money
// =============================================================================

/// A cash movement amount must be strictly positive.
///
/// ## Example
/// ```rust
/// use comptoir_core::money::Money;
/// use comptoir_core::validation::validate_amount;
///
/// assert!(validate_amount(Money::from_cents(1)).is_ok());
/// assert!(validate_amount(Money::zero()).is_err());
/// ```
pub fn validate_amount(amount: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(CoreError::invalid_amount(format!(
            "amount must be greater than zero, got {amount}"
        )));
    }
    Ok(())
}

/// Validates a price. Zero is allowed (free items).
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Workflow Rules
// =============================================================================

/// Manual adjustments only accept LOSS, FREE, ADJUSTMENT or TRANSFER.
pub fn validate_adjust_reason(reason: StockReason) -> ValidationResult<()> {
    if !reason.is_manual() {
        return Err(ValidationError::NotAllowed {
            field: "reason".to_string(),
            allowed: StockReason::MANUAL
                .iter()
                .map(|r| r.as_str().to_string())
                .collect(),
        });
    }
    Ok(())
}

/// Source and destination of a transfer must be two different stores.
pub fn validate_transfer_stores(from_store_id: &str, to_store_id: &str) -> CoreResult<()> {
    validate_store_id(from_store_id)?;
    validate_store_id(to_store_id)?;

    if from_store_id == to_store_id {
        return Err(ValidationError::InvalidFormat {
            field: "to_store_id".to_string(),
            reason: "must differ from from_store_id".to_string(),
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
