//! # Validation Module
//!
//! Input validation helpers shared by the aggregates.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (outside this workspace)                           │
//! │  ├── Deserialization, type checks                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required identifiers, positive quantities, non-negative amounts   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Aggregate invariants (Cart, Inventory, Sale)                 │
//! │  └── State-dependent business rules                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vesta_core::validation::{validate_quantity, validate_required};
//!
//! validate_required("product_id", "p-001").unwrap();
//! validate_quantity("quantity", 5).unwrap();
//! assert!(validate_quantity("quantity", 0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a string field is present and not blank.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Validates an optional string: `None` is fine, `Some("  ")` is not.
pub fn validate_optional(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(v) => validate_required(field, v),
        None => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity that must be strictly positive.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       └── OK → Proceed with add_item                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive(field));
    }
    Ok(())
}

/// Validates a stock level or threshold (zero allowed).
pub fn validate_stock_level(field: &str, qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::must_not_be_negative(field));
    }
    Ok(())
}

/// Validates a money amount that may be zero but never negative.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::must_not_be_negative(field));
    }
    Ok(())
}

/// Validates a money amount that must be strictly positive.
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative_or_zero() {
        return Err(ValidationError::must_be_positive(field));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
