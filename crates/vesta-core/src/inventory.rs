//! # Inventory Module
//!
//! Stock counter for one product at one outlet.
//!
//! ## Stock Thresholds
//! ```text
//! quantity:   0 ─────────── min_stock ───────────────────────►
//!             │                 │
//!             │  LOW STOCK      │  healthy
//!             │  (≤ min_stock)  │
//!             ▼
//!         OUT OF STOCK
//! ```
//!
//! Transfers between outlets mutate two inventories. Both are checked
//! first, so a rejected transfer leaves both untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{validate_quantity, validate_required, validate_stock_level};

/// Stock level of one product at one outlet.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    id: String,
    product_id: String,
    outlet_id: String,
    tenant_id: String,
    quantity: i64,
    min_stock: i64,
    updated_at: DateTime<Utc>,
}

impl Inventory {
    /// Creates an inventory with a fresh UUID.
    pub fn new(
        product_id: impl Into<String>,
        outlet_id: impl Into<String>,
        tenant_id: impl Into<String>,
        quantity: i64,
        min_stock: i64,
    ) -> CoreResult<Self> {
        Inventory::with_id(
            Uuid::new_v4().to_string(),
            product_id,
            outlet_id,
            tenant_id,
            quantity,
            min_stock,
        )
    }

    pub fn with_id(
        id: impl Into<String>,
        product_id: impl Into<String>,
        outlet_id: impl Into<String>,
        tenant_id: impl Into<String>,
        quantity: i64,
        min_stock: i64,
    ) -> CoreResult<Self> {
        let (id, product_id, outlet_id, tenant_id) =
            (id.into(), product_id.into(), outlet_id.into(), tenant_id.into());

        validate_required("id", &id)?;
        validate_required("product_id", &product_id)?;
        validate_required("outlet_id", &outlet_id)?;
        validate_required("tenant_id", &tenant_id)?;
        validate_stock_level("quantity", quantity)?;
        validate_stock_level("min_stock", min_stock)?;

        Ok(Inventory {
            id,
            product_id,
            outlet_id,
            tenant_id,
            quantity,
            min_stock,
            updated_at: Utc::now(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn outlet_id(&self) -> &str {
        &self.outlet_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn add_stock(&mut self, quantity: i64) -> CoreResult<()> {
        validate_quantity("quantity", quantity)?;
        self.quantity = self
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| CoreError::InvalidArgument("stock quantity overflow".to_string()))?;
        self.touch();
        Ok(())
    }

    /// Removes `quantity` units.
    ///
    /// ## Errors
    /// `InsufficientStock` when fewer than `quantity` units are on hand.
    pub fn subtract_stock(&mut self, quantity: i64) -> CoreResult<()> {
        validate_quantity("quantity", quantity)?;
        self.ensure_available(quantity)?;
        self.quantity -= quantity;
        self.touch();
        Ok(())
    }

    /// Overwrites the quantity (stock count correction).
    pub fn set_stock(&mut self, quantity: i64) -> CoreResult<()> {
        validate_stock_level("quantity", quantity)?;
        self.quantity = quantity;
        self.touch();
        Ok(())
    }

    pub fn set_min_stock(&mut self, min_stock: i64) -> CoreResult<()> {
        validate_stock_level("min_stock", min_stock)?;
        self.min_stock = min_stock;
        self.touch();
        Ok(())
    }

    /// Overwrites quantity and threshold together; neither changes on error.
    pub fn update_stock(&mut self, quantity: i64, min_stock: i64) -> CoreResult<()> {
        validate_stock_level("quantity", quantity)?;
        validate_stock_level("min_stock", min_stock)?;
        self.quantity = quantity;
        self.min_stock = min_stock;
        self.touch();
        Ok(())
    }

    /// Moves `quantity` units of the same product to another outlet.
    ///
    /// ```text
    /// source (outlet A, qty 10) ──── 4 ────► target (outlet B, qty 2)
    ///          qty 6                                   qty 6
    /// ```
    pub fn transfer_to(&mut self, target: &mut Inventory, quantity: i64) -> CoreResult<()> {
        self.check_transfer(target, quantity)?;

        // Checked above: source has the units, target cannot overflow.
        self.quantity -= quantity;
        target.quantity += quantity;
        self.touch();
        target.touch();
        Ok(())
    }

    /// All transfer guards, without mutating either side.
    pub(crate) fn check_transfer(&self, target: &Inventory, quantity: i64) -> CoreResult<()> {
        validate_quantity("quantity", quantity)?;
        if self.product_id != target.product_id {
            return Err(CoreError::invalid_operation(format!(
                "cannot transfer {} stock into {} inventory",
                self.product_id, target.product_id
            )));
        }
        if self.outlet_id == target.outlet_id {
            return Err(CoreError::invalid_operation(format!(
                "cannot transfer stock within the same outlet {}",
                self.outlet_id
            )));
        }
        self.ensure_available(quantity)?;
        if target.quantity.checked_add(quantity).is_none() {
            return Err(CoreError::InvalidArgument("stock quantity overflow".to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Probes
    // =========================================================================

    pub fn has_stock(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }

    /// Sellable means a positive request that stock can cover.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity > 0 && self.has_stock(quantity)
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }

    pub fn needs_restock(&self) -> bool {
        self.is_low_stock()
    }

    /// Units needed to get back to `min_stock` (zero when at or above it).
    pub fn restock_quantity(&self) -> i64 {
        (self.min_stock - self.quantity).max(0)
    }

    /// Stock valuation at `unit_cost`.
    pub fn calculate_value(&self, unit_cost: Money) -> Money {
        unit_cost * self.quantity
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn to_persistence(&self) -> InventoryRecord {
        InventoryRecord {
            id: self.id.clone(),
            product_id: self.product_id.clone(),
            outlet_id: self.outlet_id.clone(),
            tenant_id: self.tenant_id.clone(),
            quantity: self.quantity,
            min_stock: self.min_stock,
            updated_at: self.updated_at,
        }
    }

    pub fn from_persistence(record: InventoryRecord) -> CoreResult<Self> {
        let mut inventory = Inventory::with_id(
            record.id,
            record.product_id,
            record.outlet_id,
            record.tenant_id,
            record.quantity,
            record.min_stock,
        )?;
        inventory.updated_at = record.updated_at;
        Ok(inventory)
    }

    fn ensure_available(&self, quantity: i64) -> CoreResult<()> {
        if !self.has_stock(quantity) {
            return Err(CoreError::InsufficientStock {
                product_id: self.product_id.clone(),
                available: self.quantity,
                required: quantity,
            });
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Flat, storable form of an [`Inventory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryRecord {
    pub id: String,
    pub product_id: String,
    pub outlet_id: String,
    pub tenant_id: String,
    pub quantity: i64,
    pub min_stock: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Valuation of several inventories at one unit cost.
pub fn total_value<'a, I>(inventories: I, unit_cost: Money) -> Money
where
    I: IntoIterator<Item = &'a Inventory>,
{
    inventories
        .into_iter()
        .map(|inv| inv.calculate_value(unit_cost))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(outlet: &str, qty: i64, min: i64) -> Inventory {
        Inventory::with_id(format!("inv-{outlet}"), "p-1", outlet, "t-1", qty, min).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert!(Inventory::new("p-1", "o-1", "t-1", 0, 0).is_ok());
        assert!(Inventory::new("p-1", "o-1", "t-1", -1, 0).is_err());
        assert!(Inventory::new("p-1", "o-1", "t-1", 5, -2).is_err());
        assert!(Inventory::new("", "o-1", "t-1", 5, 2).is_err());
    }

    #[test]
    fn test_subtract_stock_insufficient() {
        let mut inventory = inv("o-1", 3, 1);
        let err = inventory.subtract_stock(5).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product_id: "p-1".to_string(),
                available: 3,
                required: 5,
            }
        );
        assert_eq!(inventory.quantity(), 3);

        inventory.subtract_stock(3).unwrap();
        assert!(inventory.is_out_of_stock());
    }

    #[test]
    fn test_add_and_set_stock() {
        let mut inventory = inv("o-1", 3, 1);
        inventory.add_stock(7).unwrap();
        assert_eq!(inventory.quantity(), 10);
        assert!(inventory.add_stock(0).is_err());

        inventory.set_stock(0).unwrap();
        assert!(inventory.set_stock(-1).is_err());
        assert!(inventory.set_min_stock(-1).is_err());

        assert!(inventory.update_stock(5, -1).is_err());
        assert_eq!((inventory.quantity(), inventory.min_stock()), (0, 1));
        inventory.update_stock(5, 2).unwrap();
        assert_eq!((inventory.quantity(), inventory.min_stock()), (5, 2));
    }

    #[test]
    fn test_low_stock_and_restock() {
        let inventory = inv("o-1", 4, 10);
        assert!(inventory.is_low_stock());
        assert!(inventory.needs_restock());
        assert_eq!(inventory.restock_quantity(), 6);

        let healthy = inv("o-1", 12, 10);
        assert!(!healthy.is_low_stock());
        assert_eq!(healthy.restock_quantity(), 0);

        let boundary = inv("o-1", 10, 10);
        assert!(boundary.is_low_stock());
    }

    #[test]
    fn test_can_sell() {
        let inventory = inv("o-1", 4, 0);
        assert!(inventory.can_sell(4));
        assert!(!inventory.can_sell(5));
        assert!(!inventory.can_sell(0));
        assert!(inventory.has_stock(0));
    }

    #[test]
    fn test_transfer() {
        let mut source = inv("o-1", 10, 0);
        let mut target = inv("o-2", 2, 0);
        source.transfer_to(&mut target, 4).unwrap();
        assert_eq!((source.quantity(), target.quantity()), (6, 6));

        let err = source.transfer_to(&mut target, 7).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert_eq!((source.quantity(), target.quantity()), (6, 6));
    }

    #[test]
    fn test_transfer_guards() {
        let mut source = inv("o-1", 10, 0);
        let mut same_outlet = inv("o-1", 0, 0);
        assert!(matches!(
            source.transfer_to(&mut same_outlet, 1),
            Err(CoreError::InvalidOperation(_))
        ));

        let mut other_product =
            Inventory::with_id("inv-x", "p-2", "o-2", "t-1", 0, 0).unwrap();
        assert!(matches!(
            source.transfer_to(&mut other_product, 1),
            Err(CoreError::InvalidOperation(_))
        ));
        assert_eq!(source.quantity(), 10);
    }

    #[test]
    fn test_valuation() {
        let a = inv("o-1", 3, 0);
        let b = inv("o-2", 2, 0);
        assert_eq!(a.calculate_value(Money::from_cents(250)), Money::from_cents(750));
        assert_eq!(total_value([&a, &b], Money::from(2)), Money::from(10));
    }

    #[test]
    fn test_persistence_round_trip() {
        let inventory = inv("o-1", 7, 3);
        let record = inventory.to_persistence();
        let json = serde_json::to_string(&record).unwrap();
        let back: InventoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(Inventory::from_persistence(back).unwrap(), inventory);

        let mut corrupt = inventory.to_persistence();
        corrupt.quantity = -5;
        assert!(Inventory::from_persistence(corrupt).is_err());
    }

    #[test]
    fn test_overflow_is_invalid_argument() {
        let mut full = Inventory::new("p-1", "o-1", "t-1", i64::MAX, 0).unwrap();
        assert!(matches!(
            full.add_stock(1),
            Err(CoreError::InvalidArgument(_))
        ));

        let mut source = Inventory::new("p-1", "o-2", "t-1", 1, 0).unwrap();
        assert!(matches!(
            source.transfer_to(&mut full, 1),
            Err(CoreError::InvalidArgument(_))
        ));
        assert_eq!(source.quantity(), 1);
        assert_eq!(full.quantity(), i64::MAX);
    }
}
