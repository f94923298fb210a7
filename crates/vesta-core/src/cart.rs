//! # Cart Module
//!
//! The in-progress, per-cashier collection of items that becomes a Sale.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart State Machine                               │
//! │                                                                         │
//! │               hold(name)                                                │
//! │   ┌────────┐ ──────────────► ┌────────┐                                │
//! │   │ ACTIVE │                 │  HOLD  │   (queue another customer)     │
//! │   └────────┘ ◄────────────── └────────┘                                │
//! │     │    │     activate()                                               │
//! │     │    │                                                              │
//! │     │    └── mark_abandoned() ──► ABANDONED  (terminal)                │
//! │     │                                                                   │
//! │     └─────── mark_completed() ──► COMPLETED  (terminal, after a Sale)  │
//! │                                                                         │
//! │  Content mutations (add/remove/update/discount/clear) need ACTIVE.     │
//! │  There is no HOLD → COMPLETED edge: a held cart is activated first.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Items are unique by `product_id` (adding the same product increases quantity)
//! - Every item quantity is > 0
//! - Every mutator validates first and only then touches state

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::discount::Discount;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{validate_amount, validate_optional, validate_quantity, validate_required};

// =============================================================================
// Cart Status
// =============================================================================

/// The lifecycle state of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Accepting items. The only state in which content can change.
    #[default]
    Active,
    /// Parked under a name while the cashier serves someone else.
    Hold,
    /// Converted into a Sale.
    Completed,
    /// Discarded without a sale.
    Abandoned,
}

impl CartStatus {
    /// Completed and abandoned carts never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CartStatus::Completed | CartStatus::Abandoned)
    }
}

impl fmt::Display for CartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartStatus::Active => write!(f, "active"),
            CartStatus::Hold => write!(f, "hold"),
            CartStatus::Completed => write!(f, "completed"),
            CartStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the cart.
///
/// ## Price Freezing
/// `unit_price` is captured when the line is created. Adding the same product
/// again only increases the quantity; it never re-prices or renames the line.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    product_id: String,
    product_name: String,
    unit_price: Money,
    quantity: i64,
    is_custom_product: bool,
}

impl CartItem {
    /// Creates a validated cart line.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
        is_custom_product: bool,
    ) -> CoreResult<Self> {
        let product_id = product_id.into();
        let product_name = product_name.into();

        validate_required("product_id", &product_id)?;
        validate_required("product_name", &product_name)?;
        validate_amount("unit_price", unit_price)?;
        validate_quantity("quantity", quantity)?;
        line_total(unit_price, quantity)?;

        Ok(CartItem {
            product_id,
            product_name,
            unit_price,
            quantity,
            is_custom_product,
        })
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// True for ad-hoc lines keyed in by the cashier (no catalog product).
    pub fn is_custom_product(&self) -> bool {
        self.is_custom_product
    }

    /// Line subtotal (unit price × quantity).
    ///
    /// Every constructor and mutator rejects quantities whose line total
    /// would overflow, so this cannot fail.
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }

    pub fn increase_quantity(&mut self, amount: i64) -> CoreResult<()> {
        validate_quantity("quantity", amount)?;
        let new_qty = self
            .quantity
            .checked_add(amount)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: i64::MAX,
            })?;
        line_total(self.unit_price, new_qty)?;
        self.quantity = new_qty;
        Ok(())
    }

    /// Decreases the quantity; the line must keep at least one unit.
    pub fn decrease_quantity(&mut self, amount: i64) -> CoreResult<()> {
        validate_quantity("quantity", amount)?;
        let new_qty = self.quantity - amount;
        validate_quantity("quantity", new_qty)?;
        self.quantity = new_qty;
        Ok(())
    }

    pub fn update_quantity(&mut self, quantity: i64) -> CoreResult<()> {
        validate_quantity("quantity", quantity)?;
        line_total(self.unit_price, quantity)?;
        self.quantity = quantity;
        Ok(())
    }

    pub fn to_persistence(&self) -> CartItemRecord {
        CartItemRecord {
            product_id: self.product_id.clone(),
            product_name: self.product_name.clone(),
            unit_price: self.unit_price.value(),
            quantity: self.quantity,
            is_custom_product: self.is_custom_product,
        }
    }

    pub fn from_persistence(record: CartItemRecord) -> CoreResult<Self> {
        CartItem::new(
            record.product_id,
            record.product_name,
            Money::from_decimal(record.unit_price),
            record.quantity,
            record.is_custom_product,
        )
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart aggregate.
///
/// All fields are private; state only changes through methods that validate
/// first. Cart instances share nothing, so carts of different cashiers can be
/// mutated in parallel without coordination.
#[derive(Debug, Clone)]
pub struct Cart {
    id: String,
    user_id: String,
    outlet_id: String,
    tenant_id: String,
    items: HashMap<String, CartItem>,
    discount: Discount,
    customer_id: Option<String>,
    name: Option<String>,
    status: CartStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty, active cart with a fresh UUID.
    pub fn new(
        user_id: impl Into<String>,
        outlet_id: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> CoreResult<Self> {
        Cart::with_id(Uuid::new_v4().to_string(), user_id, outlet_id, tenant_id)
    }

    /// Creates a new empty, active cart with a caller-supplied id.
    pub fn with_id(
        id: impl Into<String>,
        user_id: impl Into<String>,
        outlet_id: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> CoreResult<Self> {
        let (id, user_id, outlet_id, tenant_id) =
            (id.into(), user_id.into(), outlet_id.into(), tenant_id.into());

        validate_required("id", &id)?;
        validate_required("user_id", &user_id)?;
        validate_required("outlet_id", &outlet_id)?;
        validate_required("tenant_id", &tenant_id)?;

        let now = Utc::now();
        Ok(Cart {
            id,
            user_id,
            outlet_id,
            tenant_id,
            items: HashMap::new(),
            discount: Discount::none(),
            customer_id: None,
            name: None,
            status: CartStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn outlet_id(&self) -> &str {
        &self.outlet_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn discount(&self) -> Discount {
        self.discount
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    /// Label given when the cart was put on hold.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn item(&self, product_id: &str) -> Option<&CartItem> {
        self.items.get(product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.items.contains_key(product_id)
    }

    /// Iterates the lines in no particular order.
    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.values()
    }

    /// Lines sorted by product id, for stable snapshots and records.
    pub fn sorted_items(&self) -> Vec<&CartItem> {
        let mut items: Vec<&CartItem> = self.items.values().collect();
        items.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        items
    }

    /// Number of distinct products.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        // Bounded by check_totals on every mutation.
        self.items.values().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // =========================================================================
    // Content Mutations (ACTIVE only)
    // =========================================================================

    /// Adds a product or increases its quantity if already present.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity += `quantity`, price and name kept
    /// - Product not in cart: new line
    pub fn add_item(
        &mut self,
        product_id: &str,
        product_name: &str,
        unit_price: Money,
        quantity: i64,
        is_custom_product: bool,
    ) -> CoreResult<()> {
        self.ensure_active("add items")?;

        let line = match self.items.get(product_id) {
            Some(existing) => {
                let mut merged = existing.clone();
                merged.increase_quantity(quantity)?;
                merged
            }
            None => CartItem::new(
                product_id,
                product_name,
                unit_price,
                quantity,
                is_custom_product,
            )?,
        };
        self.check_totals_with(&line)?;
        self.items.insert(line.product_id.clone(), line);

        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<CartItem> {
        self.ensure_active("remove items")?;

        let removed = self
            .items
            .remove(product_id)
            .ok_or_else(|| not_in_cart(product_id))?;
        self.touch();
        Ok(removed)
    }

    /// Sets the quantity of an existing line.
    ///
    /// The new quantity is validated before the map is touched, so a rejected
    /// update leaves the line exactly as it was.
    pub fn update_item_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        self.ensure_active("update quantities")?;
        validate_quantity("quantity", quantity)?;

        let mut line = self
            .items
            .get(product_id)
            .cloned()
            .ok_or_else(|| not_in_cart(product_id))?;
        line.update_quantity(quantity)?;
        self.check_totals_with(&line)?;
        self.items.insert(line.product_id.clone(), line);
        self.touch();
        Ok(())
    }

    pub fn apply_discount(&mut self, discount: Discount) -> CoreResult<()> {
        self.ensure_active("apply a discount")?;
        self.discount = discount;
        self.touch();
        Ok(())
    }

    pub fn remove_discount(&mut self) -> CoreResult<()> {
        self.ensure_active("remove the discount")?;
        self.discount = Discount::none();
        self.touch();
        Ok(())
    }

    /// Attaches (or detaches, with `None`) a customer.
    pub fn set_customer(&mut self, customer_id: Option<String>) -> CoreResult<()> {
        self.ensure_active("change the customer")?;
        validate_optional("customer_id", customer_id.as_deref())?;
        self.customer_id = customer_id;
        self.touch();
        Ok(())
    }

    /// Removes every line and resets the discount.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.ensure_active("clear")?;
        self.items.clear();
        self.discount = Discount::none();
        self.touch();
        Ok(())
    }

    // =========================================================================
    // Lifecycle Transitions
    // =========================================================================

    /// Parks the cart under `name`.
    pub fn hold(&mut self, name: &str) -> CoreResult<()> {
        self.ensure_active("be put on hold")?;
        if self.is_empty() {
            return Err(CoreError::CartEmpty);
        }
        validate_required("name", name)?;

        self.name = Some(name.trim().to_string());
        self.status = CartStatus::Hold;
        self.touch();
        Ok(())
    }

    /// Resumes a held cart.
    pub fn activate(&mut self) -> CoreResult<()> {
        if self.status != CartStatus::Hold {
            return Err(CoreError::invalid_operation(format!(
                "cart {} is {}, only held carts can be activated",
                self.id, self.status
            )));
        }
        self.status = CartStatus::Active;
        self.touch();
        Ok(())
    }

    /// Marks the cart as converted into a sale. Called by the orchestrator.
    pub fn mark_completed(&mut self) -> CoreResult<()> {
        self.ensure_active("be completed")?;
        self.status = CartStatus::Completed;
        self.touch();
        Ok(())
    }

    /// Marks the cart as discarded. Called by the orchestrator.
    pub fn mark_abandoned(&mut self) -> CoreResult<()> {
        self.ensure_active("be abandoned")?;
        self.status = CartStatus::Abandoned;
        self.touch();
        Ok(())
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Σ unit_price × quantity.
    pub fn calculate_subtotal(&self) -> Money {
        self.items.values().map(CartItem::subtotal).sum()
    }

    pub fn calculate_discount_amount(&self) -> Money {
        self.discount.apply(self.calculate_subtotal())
    }

    pub fn calculate_total(&self) -> Money {
        let subtotal = self.calculate_subtotal();
        subtotal - self.discount.apply(subtotal)
    }

    /// Precondition gate for checkout.
    ///
    /// ## Checks (in order)
    /// 1. Cart has items → else `CartEmpty`
    /// 2. Cart is active → else `InvalidOperation`
    /// 3. Total > 0 → else `InvalidOperation`
    pub fn validate_for_checkout(&self) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::CartEmpty);
        }
        self.ensure_active("be checked out")?;

        let total = self.calculate_total();
        if total.is_negative_or_zero() {
            return Err(CoreError::invalid_operation(format!(
                "cart total must be greater than zero, got {}",
                total
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn to_persistence(&self) -> CartRecord {
        CartRecord {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            outlet_id: self.outlet_id.clone(),
            tenant_id: self.tenant_id.clone(),
            items: self
                .sorted_items()
                .into_iter()
                .map(CartItem::to_persistence)
                .collect(),
            discount_percentage: self.discount.percentage(),
            customer_id: self.customer_id.clone(),
            name: self.name.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuilds a cart from a stored record.
    ///
    /// ## Errors
    /// Fails loudly on a corrupted record (duplicate lines, invalid quantity,
    /// out-of-range discount) instead of coercing it.
    pub fn from_persistence(record: CartRecord) -> CoreResult<Self> {
        validate_required("id", &record.id)?;
        validate_required("user_id", &record.user_id)?;
        validate_required("outlet_id", &record.outlet_id)?;
        validate_required("tenant_id", &record.tenant_id)?;

        let mut items = HashMap::with_capacity(record.items.len());
        for item_record in record.items {
            let item = CartItem::from_persistence(item_record)?;
            if items.contains_key(&item.product_id) {
                return Err(ValidationError::invalid_format(
                    "items",
                    format!("duplicate product {}", item.product_id),
                )
                .into());
            }
            items.insert(item.product_id.clone(), item);
        }
        check_totals(items.values())?;

        Ok(Cart {
            id: record.id,
            user_id: record.user_id,
            outlet_id: record.outlet_id,
            tenant_id: record.tenant_id,
            items,
            discount: Discount::from_percentage(record.discount_percentage)?,
            customer_id: record.customer_id,
            name: record.name,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn ensure_active(&self, action: &str) -> CoreResult<()> {
        if self.status != CartStatus::Active {
            return Err(CoreError::invalid_operation(format!(
                "cart {} is {}, cannot {}",
                self.id, self.status, action
            )));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Totals check for the cart as it would be with `line` inserted.
    fn check_totals_with(&self, line: &CartItem) -> CoreResult<()> {
        let others = self
            .items
            .values()
            .filter(|item| item.product_id != line.product_id);
        check_totals(others.chain(std::iter::once(line)))
    }
}

fn not_in_cart(product_id: &str) -> CoreError {
    CoreError::invalid_operation(format!("product {} not in cart", product_id))
}

fn line_total(unit_price: Money, quantity: i64) -> CoreResult<Money> {
    unit_price.checked_times(quantity).ok_or_else(|| {
        CoreError::InvalidArgument(format!("line total {} × {} overflows", unit_price, quantity))
    })
}

/// Keeps the subtotal and unit count of a set of lines representable.
fn check_totals<'a, I>(lines: I) -> CoreResult<()>
where
    I: IntoIterator<Item = &'a CartItem>,
{
    let mut subtotal = Money::zero();
    let mut units: i64 = 0;
    for line in lines {
        subtotal = subtotal
            .checked_add(line_total(line.unit_price, line.quantity)?)
            .ok_or_else(|| CoreError::InvalidArgument("cart subtotal overflows".to_string()))?;
        units = units
            .checked_add(line.quantity)
            .ok_or_else(|| CoreError::InvalidArgument("cart quantity overflows".to_string()))?;
    }
    Ok(())
}

// =============================================================================
// Persistence Records
// =============================================================================

/// Flat, storable form of a [`CartItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItemRecord {
    pub product_id: String,
    pub product_name: String,
    #[ts(as = "String")]
    pub unit_price: Decimal,
    pub quantity: i64,
    pub is_custom_product: bool,
}

/// Flat, storable form of a [`Cart`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartRecord {
    pub id: String,
    pub user_id: String,
    pub outlet_id: String,
    pub tenant_id: String,
    pub items: Vec<CartItemRecord>,
    #[ts(as = "String")]
    pub discount_percentage: Decimal,
    pub customer_id: Option<String>,
    pub name: Option<String>,
    pub status: CartStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
