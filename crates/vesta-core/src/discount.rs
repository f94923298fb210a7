//! # Discount Module
//!
//! Percentage discount value object.
//!
//! ## Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Discount::from_percentage(10).apply($100.00) = $10.00                  │
//! │                                                    ▲                    │
//! │                     the DISCOUNT AMOUNT, not the reduced price          │
//! │                                                                         │
//! │  Cart total = subtotal - discount.apply(subtotal)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// A percentage discount in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Discount(Decimal);

impl Discount {
    /// No discount. `apply` always returns zero.
    #[inline]
    pub const fn none() -> Self {
        Discount(Decimal::ZERO)
    }

    /// Creates a discount from a percentage.
    ///
    /// ## Errors
    /// `CoreError::InvalidDiscount` if `percentage` is below 0 or above 100.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use vesta_core::{Discount, Money};
    ///
    /// let ten = Discount::from_percentage(Decimal::TEN).unwrap();
    /// assert_eq!(ten.apply(Money::from(100)), Money::from(10));
    /// assert!(Discount::from_percentage(Decimal::from(101)).is_err());
    /// ```
    pub fn from_percentage(percentage: Decimal) -> CoreResult<Self> {
        if percentage < Decimal::ZERO || percentage > HUNDRED {
            return Err(CoreError::InvalidDiscount {
                percentage: percentage.to_string(),
            });
        }
        Ok(Discount(percentage))
    }

    /// Returns the discount amount for `amount`.
    pub fn apply(&self, amount: Money) -> Money {
        if self.is_none() {
            return Money::zero();
        }
        amount.multiply(self.0 / HUNDRED)
    }

    /// Returns `amount` with the discount taken off.
    pub fn apply_to_price(&self, amount: Money) -> Money {
        amount - self.apply(amount)
    }

    #[inline]
    pub const fn percentage(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::none()
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}
