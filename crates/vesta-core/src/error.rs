//! # Error Types
//!
//! Domain-specific error types for vesta-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vesta-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Malformed caller input                         │
//! │                                                                         │
//! │  vesta-checkout errors (separate crate)                                │
//! │  └── CheckoutError    - Orchestration failures + ErrorCode mapping     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → transport layer   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Contract
//! Every validating method fails BEFORE it mutates anything. A caller that
//! receives an `Err` can rely on the aggregate being exactly as it was.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Operation not permitted in the current state.
    ///
    /// ## When This Occurs
    /// - Mutating a cart that is on hold, completed or abandoned
    /// - Activating a cart that is not on hold
    /// - Transferring stock between different products or to the same outlet
    /// - Checking out a cart whose total is zero or negative
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Checkout or hold attempted on an empty cart.
    #[error("Cart is empty")]
    CartEmpty,

    /// Stock level cannot cover the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// subtract_stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: "p-1", available: 3, required: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 in stock"
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, required {required}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        required: i64,
    },

    /// Payment does not reconcile with the sale total.
    #[error("Invalid payment: {reason}")]
    InvalidPayment { reason: String },

    /// Discount percentage outside `[0, 100]`.
    #[error("Invalid discount: {percentage}% is outside 0-100")]
    InvalidDiscount { percentage: String },

    /// Pricing argument outside its domain (negative margin, negative tax rate).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Money divided by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidOperation`].
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        CoreError::InvalidOperation(reason.into())
    }

    /// Shorthand for [`CoreError::InvalidPayment`].
    pub fn invalid_payment(reason: impl Into<String>) -> Self {
        CoreError::InvalidPayment {
            reason: reason.into(),
        }
    }

    /// Classifies the error for callers that map failures to responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidOperation(_) => ErrorKind::BusinessInvalidOperation,
            CoreError::CartEmpty => ErrorKind::BusinessCartEmpty,
            CoreError::InsufficientStock { .. } => ErrorKind::BusinessInsufficientStock,
            CoreError::InvalidPayment { .. } => ErrorKind::BusinessInvalidPayment,
            CoreError::InvalidDiscount { .. } => ErrorKind::ValidationInvalidInput,
            CoreError::InvalidArgument(_) | CoreError::DivisionByZero => {
                ErrorKind::InvalidArgument
            }
            CoreError::Validation(ValidationError::Required { .. }) => {
                ErrorKind::ValidationRequiredField
            }
            CoreError::Validation(_) => ErrorKind::ValidationInvalidInput,
        }
    }
}

/// Coarse error taxonomy shared with the orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field was missing or blank.
    ValidationRequiredField,
    /// Input was present but malformed or out of range.
    ValidationInvalidInput,
    /// Not permitted in the current state.
    BusinessInvalidOperation,
    /// Cart has no items.
    BusinessCartEmpty,
    /// Stock cannot cover the request.
    BusinessInsufficientStock,
    /// Payment does not reconcile.
    BusinessInvalidPayment,
    /// Calculation argument outside its domain.
    InvalidArgument,
}

impl ErrorKind {
    /// True for caller-correctable input problems.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorKind::ValidationRequiredField
                | ErrorKind::ValidationInvalidInput
                | ErrorKind::InvalidArgument
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., malformed sale number, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn must_not_be_negative(field: impl Into<String>) -> Self {
        ValidationError::MustNotBeNegative {
            field: field.into(),
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-330".to_string(),
            available: 3,
            required: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for p-330: available 3, required 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("product_id").to_string(),
            "product_id is required"
        );
        assert_eq!(
            ValidationError::must_be_positive("quantity").to_string(),
            "quantity must be positive"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::ValidationRequiredField);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CoreError::CartEmpty.kind(), ErrorKind::BusinessCartEmpty);
        assert_eq!(
            CoreError::invalid_payment("short").kind(),
            ErrorKind::BusinessInvalidPayment
        );
        assert_eq!(
            CoreError::invalid_operation("cart on hold").kind(),
            ErrorKind::BusinessInvalidOperation
        );
        let kind = CoreError::from(ValidationError::must_be_positive("quantity")).kind();
        assert_eq!(kind, ErrorKind::ValidationInvalidInput);
        assert!(kind.is_validation());
        assert!(!ErrorKind::BusinessCartEmpty.is_validation());
    }
}
