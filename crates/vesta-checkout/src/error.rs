//! # Checkout Error Types
//!
//! Error types for checkout orchestration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Domain         │  │   Lookup        │  │   Configuration         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Core(CoreError)│  │  InventoryNot-  │  │  Config                 │ │
//! │  │                 │  │  Found          │  │  Io / TomlParse         │ │
//! │  │                 │  │  CartNotFound   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Every variant maps to one ErrorCode for the transport layer.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use vesta_core::{CoreError, ErrorKind};

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[derive(Debug, Error)]
pub enum CheckoutError {
    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// A business rule in vesta-core rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// The ledger has no inventory for this product at this outlet.
    #[error("No inventory for product {product_id} at outlet {outlet_id}")]
    InventoryNotFound {
        product_id: String,
        outlet_id: String,
    },

    #[error("Cart not found: {0}")]
    CartNotFound(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid checkout configuration: {0}")]
    Config(String),

    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    TomlParse(#[from] toml::de::Error),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// A thread panicked while holding a ledger lock.
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<toml::ser::Error> for CheckoutError {
    fn from(err: toml::ser::Error) -> Self {
        CheckoutError::Config(format!("cannot serialize config: {}", err))
    }
}

impl CheckoutError {
    /// Machine-readable code for the transport layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            CheckoutError::Core(err) => match err.kind() {
                ErrorKind::ValidationRequiredField
                | ErrorKind::ValidationInvalidInput
                | ErrorKind::InvalidArgument => ErrorCode::ValidationError,
                ErrorKind::BusinessInvalidOperation => ErrorCode::BusinessLogic,
                ErrorKind::BusinessCartEmpty => ErrorCode::CartError,
                ErrorKind::BusinessInsufficientStock => ErrorCode::InsufficientStock,
                ErrorKind::BusinessInvalidPayment => ErrorCode::PaymentError,
            },
            CheckoutError::InventoryNotFound { .. } | CheckoutError::CartNotFound(_) => {
                ErrorCode::NotFound
            }
            CheckoutError::Config(_) | CheckoutError::Io(_) | CheckoutError::TomlParse(_) => {
                ErrorCode::ConfigError
            }
            CheckoutError::LockPoisoned(_) => ErrorCode::Internal,
        }
    }

    /// True when retrying with different input could succeed.
    pub fn is_client_error(&self) -> bool {
        !matches!(self.code(), ErrorCode::Internal | ErrorCode::ConfigError)
    }
}

// =============================================================================
// Transport Mapping
// =============================================================================

/// Error codes for API responses.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (e.code) {
///   case 'INSUFFICIENT_STOCK': showStockDialog(e.message); break;
///   case 'PAYMENT_ERROR':      reopenTender(e.message);    break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,
    /// Input validation failed (400)
    ValidationError,
    /// Business rule rejected the operation (422)
    BusinessLogic,
    /// Cart cannot be checked out
    CartError,
    InsufficientStock,
    PaymentError,
    /// Configuration missing or malformed
    ConfigError,
    /// Internal error (500)
    Internal,
}

/// What a failed call returns to the caller of the transport layer.
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for p-1: available 3, required 5" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&CheckoutError> for ErrorResponse {
    fn from(err: &CheckoutError) -> Self {
        let message = match err {
            // Internal details stay in the logs.
            CheckoutError::LockPoisoned(detail) => {
                tracing::error!(%detail, "checkout lock poisoned");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };
        ErrorResponse {
            code: err.code(),
            message,
        }
    }
}

impl From<CheckoutError> for ErrorResponse {
    fn from(err: CheckoutError) -> Self {
        ErrorResponse::from(&err)
    }
}
