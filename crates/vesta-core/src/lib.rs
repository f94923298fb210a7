//! # vesta-core: Pure Transaction Logic for Vesta POS
//!
//! This crate is the **heart** of Vesta POS. It decides whether a cart can be
//! sold, what it costs, whether the payment settles it and whether the stock
//! exists. It never touches a disk, a socket or a clock beyond timestamps.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vesta POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Transport (HTTP / IPC, outside workspace)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          vesta-checkout (config, ledger, checkout)              │   │
//! │  │    locks (product, outlet) keys, decrements, assigns numbers    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vesta-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐ │   │
//! │  │   │  money   │ │   cart   │ │   sale   │ │ stock / inventory│ │   │
//! │  │   │ discount │ │ CartItem │ │ Payment  │ │  pricing         │ │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ │  sale_number     │ │   │
//! │  │                                           └──────────────────┘ │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO GLOBAL STATE         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Exact decimal Money
//! - [`discount`] - Percentage discounts in `[0, 100]`
//! - [`cart`] - Cart state machine (active / hold / completed / abandoned)
//! - [`inventory`] - Per-(product, outlet) stock counter
//! - [`stock`] - Cross-outlet availability and restock urgency
//! - [`pricing`] - Volume tiers, tax, margins, rounding
//! - [`sale`] - Payment reconciliation and the immutable Sale
//! - [`sale_number`] - Receipt number generation and parsing
//! - [`error`] / [`validation`] - Typed errors and input checks
//!
//! ## Design Principles
//!
//! 1. **Decimal Money**: amounts are `rust_decimal::Decimal`, never floats
//! 2. **Validate, then mutate**: a method that returns `Err` changed nothing
//! 3. **No locking**: check-then-act sequences are serialized by the caller
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use vesta_core::{Cart, Discount, Money, Payment, Sale};
//!
//! let mut cart = Cart::new("cashier-1", "outlet-1", "tenant-1").unwrap();
//! cart.add_item("p-coffee", "Coffee", Money::from(50), 2, false).unwrap();
//! cart.apply_discount(Discount::from_percentage(Decimal::TEN).unwrap()).unwrap();
//!
//! let payment = Payment::cash(Money::from(100), Some(Money::from(10))).unwrap();
//! let sale = Sale::from_cart(&cart, "20250101-OUTLET-00001", payment).unwrap();
//! assert_eq!(sale.total(), Money::from(90));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod discount;
pub mod error;
pub mod inventory;
pub mod money;
pub mod pricing;
pub mod sale;
pub mod sale_number;
pub mod stock;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use vesta_core::Money` instead of
// `use vesta_core::money::Money`

pub use cart::{Cart, CartItem, CartItemRecord, CartRecord, CartStatus};
pub use discount::Discount;
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use inventory::{Inventory, InventoryRecord};
pub use money::Money;
pub use pricing::{RoundingRule, TaxConfig, VolumeTier};
pub use sale::{
    Payment, PaymentMethod, PaymentRecord, Sale, SaleHeader, SaleItem, SaleItemRecord, SaleRecord,
};
pub use sale_number::{ParsedSaleNumber, SaleNumberFormat};
pub use stock::{RestockUrgency, StockStatus, StockValidationResult};
