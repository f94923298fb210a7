//! # Checkout Service
//!
//! Turns an active cart plus a payment into a completed sale, decrementing
//! stock in the same critical section.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         checkout(cart, payment)                         │
//! │                                                                         │
//! │  1. cart.validate_for_checkout()      CartEmpty / not active / total≤0  │
//! │             │                                                           │
//! │             ▼                                                           │
//! │  2. ledger.with_locked(line keys)     sorted lock order                 │
//! │     ├── validate_stock_for_sale       InsufficientStock                 │
//! │     ├── sequence.issue_with           number consumed only on success   │
//! │     │      └── Sale::from_cart        payment reconciled here           │
//! │     └── subtract_stock per line                                         │
//! │             │                                                           │
//! │             ▼                                                           │
//! │  3. cart.mark_completed()                                               │
//! │                                                                         │
//! │  Any failure before step 3 leaves cart, stock and sequence untouched.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Custom products (items not tracked in inventory) skip the stock checks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};
use vesta_core::pricing::{self, FinalPrice};
use vesta_core::sale_number;
use vesta_core::stock::{self, StockValidationResult};
use vesta_core::{Cart, CartStatus, CoreError, CoreResult, Inventory, Payment, Sale};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::ledger::{inventory_key, StockLedger};
use crate::sequence::SaleSequence;

pub struct CheckoutService {
    config: CheckoutConfig,
    ledger: Arc<StockLedger>,
    sequence: SaleSequence,
    carts: Mutex<HashMap<String, Cart>>,
}

impl CheckoutService {
    /// Creates a service for the configured outlet.
    ///
    /// The ledger is shared so stock can be managed from outside the service
    /// (receiving, transfers) while checkouts run.
    pub fn new(config: CheckoutConfig, ledger: Arc<StockLedger>) -> CheckoutResult<Self> {
        config.validate()?;
        info!(
            tenant_id = %config.store.tenant_id,
            outlet_id = %config.store.outlet_id,
            "Checkout service ready"
        );

        Ok(CheckoutService {
            config,
            ledger,
            sequence: SaleSequence::new(),
            carts: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<StockLedger> {
        &self.ledger
    }

    pub fn sequence(&self) -> &SaleSequence {
        &self.sequence
    }

    /// Registers stock for `product_id` at this outlet.
    ///
    /// `min_stock` falls back to `inventory.default_min_stock`.
    pub fn register_inventory(
        &self,
        product_id: &str,
        quantity: i64,
        min_stock: Option<i64>,
    ) -> CheckoutResult<()> {
        let inventory = Inventory::new(
            product_id,
            self.config.store.outlet_id.as_str(),
            self.config.store.tenant_id.as_str(),
            quantity,
            min_stock.unwrap_or(self.config.inventory.default_min_stock),
        )?;
        self.ledger.register(inventory)?;
        Ok(())
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Completes `cart` as a sale paid with `payment`.
    ///
    /// On success the cart is `Completed` and stock at this outlet has been
    /// decremented. On failure nothing has changed.
    ///
    /// Carts opened for another outlet or tenant are rejected with
    /// `InvalidOperation`: sale numbers carry this outlet's code, so selling
    /// them here would reuse another outlet's sequence.
    pub fn checkout(&self, cart: &mut Cart, payment: Payment) -> CheckoutResult<Sale> {
        debug!(cart_id = %cart.id(), items = cart.item_count(), "checkout");

        match self.complete(cart, payment) {
            Ok(sale) => {
                cart.mark_completed()?;
                info!(
                    sale_id = %sale.id(),
                    sale_number = %sale.sale_number(),
                    total = %sale.total(),
                    items = sale.item_count(),
                    "Sale completed"
                );
                Ok(sale)
            }
            Err(e) => {
                warn!(cart_id = %cart.id(), error = %e, "Checkout rejected");
                Err(e)
            }
        }
    }

    fn complete(&self, cart: &Cart, payment: Payment) -> CheckoutResult<Sale> {
        self.ensure_same_store(cart)?;
        cart.validate_for_checkout()?;

        let outlet_id = cart.outlet_id();
        let lines: Vec<(&str, i64)> = cart
            .items()
            .filter(|item| !item.is_custom_product())
            .map(|item| (item.product_id(), item.quantity()))
            .collect();
        let keys: Vec<_> = lines
            .iter()
            .map(|(product_id, _)| inventory_key(product_id, outlet_id))
            .collect();
        let today = Utc::now().date_naive();

        self.ledger.with_locked(&keys, |locked| {
            for &(product_id, quantity) in &lines {
                let inventory = locked.get(product_id, outlet_id);
                let check = stock::validate_stock_for_sale(inventory, quantity)?;
                if !check.is_valid {
                    return Err(CoreError::InsufficientStock {
                        product_id: product_id.to_string(),
                        available: check.available_stock,
                        required: quantity,
                    }
                    .into());
                }
            }

            let sale = self.sequence.issue_with(outlet_id, today, |sequence| {
                let number = sale_number::generate_with(
                    &self.config.sale_number,
                    &self.config.store.outlet_name,
                    sequence,
                    today,
                )?;
                Ok(Sale::from_cart(cart, number, payment)?)
            })?;

            // Every line was checked above while holding the same locks.
            for &(product_id, quantity) in &lines {
                if let Some(inventory) = locked.get_mut(product_id, outlet_id) {
                    inventory.subtract_stock(quantity)?;
                }
            }
            Ok(sale)
        })
    }

    // =========================================================================
    // Quotes
    // =========================================================================

    /// Subtotal, discount, tax and total for `cart` under the configured tax
    /// and rounding rules.
    ///
    /// The sale itself records pre-tax amounts; this is the figure shown to
    /// the customer.
    pub fn price_cart(&self, cart: &Cart) -> CheckoutResult<FinalPrice> {
        let tax = self.config.tax_config();
        let price =
            pricing::calculate_final_price(cart.calculate_subtotal(), cart.discount(), Some(&tax))?;

        let rule = self.config.pricing.rounding;
        Ok(FinalPrice {
            subtotal: pricing::round_price(price.subtotal, rule),
            discount_amount: pricing::round_price(price.discount_amount, rule),
            discounted: pricing::round_price(price.discounted, rule),
            tax_amount: pricing::round_price(price.tax_amount, rule),
            total: pricing::round_price(price.total, rule),
        })
    }

    /// Where `quantity` units of `product_id` can come from, preferring this
    /// outlet.
    pub fn availability(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> CheckoutResult<StockValidationResult> {
        let inventories = self.ledger.snapshots_for_product(product_id)?;
        Ok(stock::validate_stock_across_outlets(
            product_id,
            quantity,
            Some(self.config.store.outlet_id.as_str()),
            &inventories,
        )?)
    }

    // =========================================================================
    // Cart Registry
    // =========================================================================

    /// Opens an empty cart for `user_id` at this outlet and returns its id.
    pub fn open_cart(&self, user_id: &str) -> CheckoutResult<String> {
        let cart = Cart::new(
            user_id,
            self.config.store.outlet_id.as_str(),
            self.config.store.tenant_id.as_str(),
        )?;
        let id = cart.id().to_string();

        self.carts_lock()?.insert(id.clone(), cart);
        debug!(cart_id = %id, user_id, "Cart opened");
        Ok(id)
    }

    /// Applies `f` to a registered cart.
    ///
    /// ```ignore
    /// service.update_cart(&id, |cart| cart.add_item("p-1", "Tea", price, 2, false))?;
    /// ```
    pub fn update_cart<T, F>(&self, cart_id: &str, f: F) -> CheckoutResult<T>
    where
        F: FnOnce(&mut Cart) -> CoreResult<T>,
    {
        let mut carts = self.carts_lock()?;
        let cart = carts
            .get_mut(cart_id)
            .ok_or_else(|| CheckoutError::CartNotFound(cart_id.to_string()))?;
        Ok(f(cart)?)
    }

    /// Copy of a registered cart.
    pub fn cart(&self, cart_id: &str) -> CheckoutResult<Cart> {
        self.carts_lock()?
            .get(cart_id)
            .cloned()
            .ok_or_else(|| CheckoutError::CartNotFound(cart_id.to_string()))
    }

    /// Parked carts, oldest first.
    pub fn held_carts(&self) -> CheckoutResult<Vec<Cart>> {
        let mut held: Vec<Cart> = self
            .carts_lock()?
            .values()
            .filter(|cart| cart.status() == CartStatus::Hold)
            .cloned()
            .collect();
        held.sort_by_key(|cart| cart.updated_at());
        Ok(held)
    }

    /// Abandons a cart and drops it from the registry.
    pub fn abandon_cart(&self, cart_id: &str) -> CheckoutResult<Cart> {
        let mut carts = self.carts_lock()?;
        let cart = carts
            .get_mut(cart_id)
            .ok_or_else(|| CheckoutError::CartNotFound(cart_id.to_string()))?;
        cart.mark_abandoned()?;

        debug!(cart_id, "Cart abandoned");
        carts
            .remove(cart_id)
            .ok_or_else(|| CheckoutError::CartNotFound(cart_id.to_string()))
    }

    /// Checks out a registered cart. A completed cart leaves the registry;
    /// a rejected one stays as it was.
    pub fn checkout_cart(&self, cart_id: &str, payment: Payment) -> CheckoutResult<Sale> {
        let mut cart = self
            .carts_lock()?
            .remove(cart_id)
            .ok_or_else(|| CheckoutError::CartNotFound(cart_id.to_string()))?;

        match self.checkout(&mut cart, payment) {
            Ok(sale) => Ok(sale),
            Err(e) => {
                self.carts_lock()?.insert(cart_id.to_string(), cart);
                Err(e)
            }
        }
    }

    fn ensure_same_store(&self, cart: &Cart) -> CoreResult<()> {
        let store = &self.config.store;
        if cart.outlet_id() != store.outlet_id || cart.tenant_id() != store.tenant_id {
            return Err(CoreError::invalid_operation(format!(
                "cart {} belongs to outlet {} of tenant {}, this register sells for outlet {} of tenant {}",
                cart.id(),
                cart.outlet_id(),
                cart.tenant_id(),
                store.outlet_id,
                store.tenant_id
            )));
        }
        Ok(())
    }

    fn carts_lock(&self) -> CheckoutResult<std::sync::MutexGuard<'_, HashMap<String, Cart>>> {
        self.carts
            .lock()
            .map_err(|e| CheckoutError::LockPoisoned(e.to_string()))
    }
}
