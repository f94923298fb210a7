//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Payment reconciliation compares amounts EXACTLY:                       │
//! │    change == cash_received - total                                      │
//! │  A single epsilon of drift rejects a valid sale (or accepts a bad one). │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal::Decimal                                    │
//! │    Base-10 mantissa + scale, 28 significant digits                      │
//! │    0.10 added ten times is exactly 1.00                                 │
//! │    Percentages (x * p / 100) stay exact                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vesta_core::money::Money;
//!
//! // Create from cents or from a decimal literal
//! let price = Money::from_cents(1099); // $10.99
//! let fee: Money = "0.50".parse().unwrap();
//!
//! // Arithmetic operations
//! let doubled = price * 2;            // $21.98
//! let total = price + fee;            // $11.49
//! assert_eq!(total, Money::from_cents(1149));
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Money Type
// =============================================================================

/// An exact, signed monetary amount.
///
/// ## Design Decisions
/// - **Decimal (signed)**: negative values appear as intermediate results
///   (an over-discounted total), validation decides whether they are allowed
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **Equality is by value**: `1.0 == 1.00`
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  CartItem.unit_price ──► CartItem.subtotal ──► Cart.subtotal           │
/// │                                                                         │
/// │  Cart.subtotal ──► Discount.apply ──► Cart.total ──► Payment checks    │
/// │                                                                         │
/// │  Inventory valuation, volume tiers, tax, margins                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn from_decimal(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use vesta_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.to_string(), "$10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    pub fn add(&self, other: Money) -> Money {
        Money(self.0 + other.0)
    }

    pub fn subtract(&self, other: Money) -> Money {
        Money(self.0 - other.0)
    }

    /// Scales the amount by an arbitrary decimal factor.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use vesta_core::money::Money;
    ///
    /// let half = Money::from_cents(1000).multiply(Decimal::new(5, 1));
    /// assert_eq!(half, Money::from_cents(500));
    /// ```
    pub fn multiply(&self, factor: Decimal) -> Money {
        Money(self.0 * factor)
    }

    /// `self + other`, or `None` if the sum does not fit in a `Decimal`.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// `self × quantity`, or `None` on overflow.
    ///
    /// Line totals go through this; the `*` operator panics on overflow like
    /// `Decimal`'s own.
    pub fn checked_times(&self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(Decimal::from(quantity)).map(Money)
    }

    /// Divides the amount.
    ///
    /// ## Errors
    /// - `CoreError::DivisionByZero` when `divisor` is zero
    /// - `CoreError::InvalidArgument` if the quotient overflows `Decimal`
    pub fn divide(&self, divisor: Decimal) -> CoreResult<Money> {
        if divisor.is_zero() {
            return Err(CoreError::DivisionByZero);
        }
        self.0
            .checked_div(divisor)
            .map(Money)
            .ok_or_else(|| CoreError::InvalidArgument(format!("{} / {} overflows", self.0, divisor)))
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    #[inline]
    pub fn is_negative_or_zero(&self) -> bool {
        self.0 <= Decimal::ZERO
    }

    #[inline]
    pub fn is_less_than(&self, other: &Money) -> bool {
        self.0 < other.0
    }

    #[inline]
    pub fn is_greater_than(&self, other: &Money) -> bool {
        self.0 > other.0
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Money {
        Money(self.0.abs())
    }

    /// Rounds half away from zero to `dp` decimal places.
    ///
    /// Arithmetic never rounds on its own; callers round once, at the edge
    /// (receipt printing, card terminal amounts).
    pub fn round_dp(&self, dp: u32) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money with two decimals, e.g. `$10.99` or `-$5.50`.
///
/// ## Note
/// This is for logs and debugging. Localized display belongs to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let rounded = self
            .0
            .abs()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{}${:.2}", sign, rounded)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Whole currency units: `Money::from(100)` is one hundred, not one dollar.
impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Money(Decimal::from(units))
    }
}

impl From<i32> for Money {
    fn from(units: i32) -> Self {
        Money(Decimal::from(units))
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl FromStr for Money {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<Decimal>().map(Money).map_err(|e| {
            ValidationError::invalid_format("amount", format!("'{}': {}", s, e)).into()
        })
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by quantity.
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * Decimal::from(qty))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * Decimal::from(qty))
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Decimal) -> Self {
        Money(self.0 * factor)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
