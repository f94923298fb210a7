//! # Stock Ledger
//!
//! In-memory inventory store with one lock per `(product, outlet)` key.
//!
//! ## Locking Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RwLock<HashMap<(product, outlet), Mutex<Inventory>>>                  │
//! │     │                                                                   │
//! │     ├── read  lock: every stock operation (many at once)               │
//! │     └── write lock: register / remove inventories only                 │
//! │                                                                         │
//! │  Multi-key operations lock their Mutexes in sorted key order:          │
//! │                                                                         │
//! │  checkout A: (p1,o1) → (p2,o1)        both wait on (p1,o1) first,      │
//! │  checkout B: (p1,o1) → (p2,o1)        so no lock cycle can form        │
//! │                                                                         │
//! │  Checkouts touching disjoint products never wait on each other.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use tracing::{debug, info};
use vesta_core::stock::{self, LowStockAlert};
use vesta_core::Inventory;

use crate::error::{CheckoutError, CheckoutResult};

/// `(product_id, outlet_id)`.
pub type InventoryKey = (String, String);

pub fn inventory_key(product_id: &str, outlet_id: &str) -> InventoryKey {
    (product_id.to_string(), outlet_id.to_string())
}

#[derive(Debug, Default)]
pub struct StockLedger {
    inventories: RwLock<HashMap<InventoryKey, Mutex<Inventory>>>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Adds an inventory, replacing any existing one for the same key.
    ///
    /// Returns the replaced inventory.
    pub fn register(&self, inventory: Inventory) -> CheckoutResult<Option<Inventory>> {
        let key = inventory_key(inventory.product_id(), inventory.outlet_id());
        debug!(
            product_id = %key.0,
            outlet_id = %key.1,
            quantity = inventory.quantity(),
            "Registering inventory"
        );

        let mut map = self.inventories.write().map_err(poisoned)?;
        map.insert(key, Mutex::new(inventory))
            .map(|old| old.into_inner().map_err(poisoned))
            .transpose()
    }

    pub fn remove(&self, product_id: &str, outlet_id: &str) -> CheckoutResult<Inventory> {
        let mut map = self.inventories.write().map_err(poisoned)?;
        let slot = map
            .remove(&inventory_key(product_id, outlet_id))
            .ok_or_else(|| not_found(product_id, outlet_id))?;
        slot.into_inner().map_err(poisoned)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Copy of one inventory at this instant.
    pub fn snapshot(&self, product_id: &str, outlet_id: &str) -> CheckoutResult<Inventory> {
        self.with_locked(&[inventory_key(product_id, outlet_id)], |locked| {
            locked
                .get(product_id, outlet_id)
                .cloned()
                .ok_or_else(|| not_found(product_id, outlet_id))
        })
    }

    pub fn quantity(&self, product_id: &str, outlet_id: &str) -> CheckoutResult<i64> {
        Ok(self.snapshot(product_id, outlet_id)?.quantity())
    }

    /// Copies of every outlet's inventory for `product_id`, ordered by outlet.
    pub fn snapshots_for_product(&self, product_id: &str) -> CheckoutResult<Vec<Inventory>> {
        let map = self.inventories.read().map_err(poisoned)?;
        let mut snapshots = Vec::new();
        for ((product, _), slot) in map.iter() {
            if product == product_id {
                snapshots.push(slot.lock().map_err(poisoned)?.clone());
            }
        }
        snapshots.sort_by(|a, b| a.outlet_id().cmp(b.outlet_id()));
        Ok(snapshots)
    }

    /// Every inventory at or below its minimum, most urgent first.
    pub fn low_stock_alerts(&self) -> CheckoutResult<Vec<LowStockAlert>> {
        let map = self.inventories.read().map_err(poisoned)?;
        let mut snapshots = Vec::with_capacity(map.len());
        for slot in map.values() {
            snapshots.push(slot.lock().map_err(poisoned)?.clone());
        }
        Ok(stock::low_stock_alerts(&snapshots))
    }

    /// Number of registered inventories.
    pub fn len(&self) -> CheckoutResult<usize> {
        Ok(self.inventories.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> CheckoutResult<bool> {
        Ok(self.len()? == 0)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn add_stock(&self, product_id: &str, outlet_id: &str, quantity: i64) -> CheckoutResult<i64> {
        self.update(product_id, outlet_id, |inv| inv.add_stock(quantity))
    }

    pub fn set_stock(&self, product_id: &str, outlet_id: &str, quantity: i64) -> CheckoutResult<i64> {
        self.update(product_id, outlet_id, |inv| inv.set_stock(quantity))
    }

    /// Moves stock between two outlets as one step.
    ///
    /// Both keys are locked (in sorted order) before anything is checked, so
    /// no concurrent sale can observe or cause a half-done transfer.
    pub fn transfer(
        &self,
        product_id: &str,
        from_outlet: &str,
        to_outlet: &str,
        quantity: i64,
    ) -> CheckoutResult<()> {
        let from = inventory_key(product_id, from_outlet);
        let to = inventory_key(product_id, to_outlet);

        self.with_locked(&[from.clone(), to.clone()], |locked| {
            if from == to {
                let inventory = locked
                    .get(product_id, from_outlet)
                    .ok_or_else(|| not_found(product_id, from_outlet))?;
                stock::validate_transfer(inventory, inventory, quantity)?;
            }
            let (source, target) = locked
                .pair_mut(&from, &to)
                .ok_or_else(|| not_found(product_id, to_outlet))?;
            source.transfer_to(target, quantity)?;
            Ok(())
        })?;

        info!(product_id, from_outlet, to_outlet, quantity, "Stock transferred");
        Ok(())
    }

    /// Locks `keys` in sorted order and runs `f` while holding all of them.
    ///
    /// Duplicate keys are locked once. Fails with `InventoryNotFound` if any
    /// key is missing, before `f` runs.
    pub fn with_locked<T, F>(&self, keys: &[InventoryKey], f: F) -> CheckoutResult<T>
    where
        F: FnOnce(&mut LockedInventories<'_>) -> CheckoutResult<T>,
    {
        let map = self.inventories.read().map_err(poisoned)?;

        let mut sorted: Vec<&InventoryKey> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            let slot = map.get(key).ok_or_else(|| not_found(&key.0, &key.1))?;
            guards.push((key.clone(), slot.lock().map_err(poisoned)?));
        }

        let mut locked = LockedInventories { guards };
        f(&mut locked)
    }

    fn update<F>(&self, product_id: &str, outlet_id: &str, f: F) -> CheckoutResult<i64>
    where
        F: FnOnce(&mut Inventory) -> vesta_core::CoreResult<()>,
    {
        self.with_locked(&[inventory_key(product_id, outlet_id)], |locked| {
            let inventory = locked
                .get_mut(product_id, outlet_id)
                .ok_or_else(|| not_found(product_id, outlet_id))?;
            f(inventory)?;
            debug!(product_id, outlet_id, quantity = inventory.quantity(), "Stock updated");
            Ok(inventory.quantity())
        })
    }
}

// =============================================================================
// Locked View
// =============================================================================

/// The inventories held by one [`StockLedger::with_locked`] call.
pub struct LockedInventories<'a> {
    guards: Vec<(InventoryKey, MutexGuard<'a, Inventory>)>,
}

impl LockedInventories<'_> {
    pub fn get(&self, product_id: &str, outlet_id: &str) -> Option<&Inventory> {
        self.position(product_id, outlet_id)
            .map(|i| &*self.guards[i].1)
    }

    pub fn get_mut(&mut self, product_id: &str, outlet_id: &str) -> Option<&mut Inventory> {
        self.position(product_id, outlet_id)
            .map(|i| &mut *self.guards[i].1)
    }

    /// Two distinct inventories, mutably. `None` if either is missing or
    /// both keys are the same.
    pub fn pair_mut(
        &mut self,
        a: &InventoryKey,
        b: &InventoryKey,
    ) -> Option<(&mut Inventory, &mut Inventory)> {
        let i = self.position(&a.0, &a.1)?;
        let j = self.position(&b.0, &b.1)?;
        if i == j {
            return None;
        }

        let (lo, hi) = (i.min(j), i.max(j));
        let (left, right) = self.guards.split_at_mut(hi);
        let first = &mut *left[lo].1;
        let second = &mut *right[0].1;
        Some(if i < j { (first, second) } else { (second, first) })
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    fn position(&self, product_id: &str, outlet_id: &str) -> Option<usize> {
        self.guards
            .iter()
            .position(|((p, o), _)| p == product_id && o == outlet_id)
    }
}

fn not_found(product_id: &str, outlet_id: &str) -> CheckoutError {
    CheckoutError::InventoryNotFound {
        product_id: product_id.to_string(),
        outlet_id: outlet_id.to_string(),
    }
}

fn poisoned<E: std::fmt::Display>(err: E) -> CheckoutError {
    CheckoutError::LockPoisoned(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesta_core::CoreError;

    fn ledger() -> StockLedger {
        let ledger = StockLedger::new();
        for (outlet, qty) in [("o-1", 10), ("o-2", 2)] {
            ledger
                .register(Inventory::new("p-1", outlet, "t-1", qty, 3).unwrap())
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_register_and_snapshot() {
        let ledger = ledger();
        assert_eq!(ledger.len().unwrap(), 2);
        assert_eq!(ledger.quantity("p-1", "o-1").unwrap(), 10);

        let replaced = ledger
            .register(Inventory::new("p-1", "o-1", "t-1", 4, 3).unwrap())
            .unwrap();
        assert_eq!(replaced.map(|i| i.quantity()), Some(10));
        assert_eq!(ledger.quantity("p-1", "o-1").unwrap(), 4);
    }

    #[test]
    fn test_missing_inventory() {
        let ledger = ledger();
        assert!(matches!(
            ledger.snapshot("p-9", "o-1"),
            Err(CheckoutError::InventoryNotFound { .. })
        ));
        assert!(matches!(
            ledger.add_stock("p-1", "o-9", 1),
            Err(CheckoutError::InventoryNotFound { .. })
        ));
    }

    #[test]
    fn test_stock_updates() {
        let ledger = ledger();
        assert_eq!(ledger.add_stock("p-1", "o-1", 5).unwrap(), 15);
        assert_eq!(ledger.set_stock("p-1", "o-1", 1).unwrap(), 1);
        assert!(matches!(
            ledger.set_stock("p-1", "o-1", -1),
            Err(CheckoutError::Core(CoreError::Validation(_)))
        ));
        assert_eq!(ledger.quantity("p-1", "o-1").unwrap(), 1);
    }

    #[test]
    fn test_transfer() {
        let ledger = ledger();
        ledger.transfer("p-1", "o-2", "o-1", 2).unwrap();
        assert_eq!(ledger.quantity("p-1", "o-1").unwrap(), 12);
        assert_eq!(ledger.quantity("p-1", "o-2").unwrap(), 0);

        assert!(matches!(
            ledger.transfer("p-1", "o-2", "o-1", 1),
            Err(CheckoutError::Core(CoreError::InsufficientStock { .. }))
        ));
        assert!(matches!(
            ledger.transfer("p-1", "o-1", "o-1", 1),
            Err(CheckoutError::Core(CoreError::InvalidOperation(_)))
        ));
        assert_eq!(ledger.quantity("p-1", "o-1").unwrap(), 12);
    }

    #[test]
    fn test_with_locked_dedups_keys() {
        let ledger = ledger();
        let key = inventory_key("p-1", "o-1");
        let count = ledger
            .with_locked(&[key.clone(), key], |locked| Ok(locked.len()))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_snapshots_and_alerts() {
        let ledger = ledger();
        let outlets: Vec<String> = ledger
            .snapshots_for_product("p-1")
            .unwrap()
            .iter()
            .map(|i| i.outlet_id().to_string())
            .collect();
        assert_eq!(outlets, vec!["o-1", "o-2"]);

        let alerts = ledger.low_stock_alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].outlet_id, "o-2");
    }

    #[test]
    fn test_remove() {
        let ledger = ledger();
        assert_eq!(ledger.remove("p-1", "o-2").unwrap().quantity(), 2);
        assert!(ledger.remove("p-1", "o-2").is_err());
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn test_poisoned_ledger_reports_error() {
        let ledger = ledger();
        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = ledger.inventories.write().unwrap();
                panic!("register panicked mid-write");
            })
            .join()
        });

        assert!(matches!(ledger.len(), Err(CheckoutError::LockPoisoned(_))));
        assert!(matches!(ledger.is_empty(), Err(CheckoutError::LockPoisoned(_))));
        assert!(matches!(
            ledger.quantity("p-1", "o-1"),
            Err(CheckoutError::LockPoisoned(_))
        ));
    }
}
