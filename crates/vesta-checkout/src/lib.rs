//! # vesta-checkout: Checkout Orchestration for Vesta POS
//!
//! Wires the pure transaction rules of `vesta-core` to shared, mutable
//! state: stock per outlet, sale number sequences and open carts.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Architecture                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 CheckoutService (orchestrator)                   │  │
//! │  │                                                                  │  │
//! │  │  cart registry · checkout · price quotes · availability          │  │
//! │  └───────────┬──────────────────────┬───────────────────────┬──────┘  │
//! │              ▼                      ▼                       ▼          │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌──────────────────┐ │
//! │  │   StockLedger      │  │   SaleSequence     │  │  CheckoutConfig  │ │
//! │  │                    │  │                    │  │                  │ │
//! │  │ Mutex per          │  │ counter per        │  │ TOML + VESTA_*   │ │
//! │  │ (product, outlet)  │  │ (outlet, day)      │  │ env overrides    │ │
//! │  └────────────────────┘  └────────────────────┘  └──────────────────┘ │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  vesta-core: Cart, Inventory, Sale, pricing, stock, sale_number  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`checkout`] - `CheckoutService`
//! - [`config`] - Store, sale number, pricing and inventory settings
//! - [`error`] - Checkout error types and transport error codes
//! - [`ledger`] - In-memory stock with per-key locking
//! - [`sequence`] - Gap-free sale number sequences
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vesta_checkout::{CheckoutConfig, CheckoutService, StockLedger};
//! use vesta_core::{Money, Payment};
//!
//! vesta_checkout::init_tracing();
//! let config = CheckoutConfig::load_or_default(None);
//! let service = CheckoutService::new(config, Arc::new(StockLedger::new()))?;
//! service.register_inventory("p-1", 20, None)?;
//!
//! let cart_id = service.open_cart("cashier-1")?;
//! service.update_cart(&cart_id, |cart| cart.add_item("p-1", "Tea", Money::from(3), 2, false))?;
//! let sale = service.checkout_cart(&cart_id, Payment::cash(Money::from(10), None)?)?;
//! println!("{} change {}", sale.sale_number(), sale.change_due());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod ledger;
pub mod sequence;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::CheckoutService;
pub use config::{CheckoutConfig, InventorySettings, PricingSettings, StoreConfig};
pub use error::{CheckoutError, CheckoutResult, ErrorCode, ErrorResponse};
pub use ledger::{LockedInventories, StockLedger};
pub use sequence::SaleSequence;
pub use telemetry::init_tracing;
