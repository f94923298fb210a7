//! # Stock Validation
//!
//! Cross-outlet availability reasoning over [`Inventory`] snapshots.
//!
//! Nothing here mutates stock. The functions answer questions the checkout
//! orchestrator asks before it takes its locks and decrements.
//!
//! ## Across-Outlet Decision
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_stock_across_outlets(product, qty, preferred, inventories)    │
//! │                                                                         │
//! │  preferred outlet covers qty? ──yes──► FULFILLABLE                     │
//! │          │ no                                                           │
//! │          ▼                                                              │
//! │  any single outlet covers qty? ──yes──► AVAILABLE_ELSEWHERE            │
//! │          │ no                             (those outlets suggested)     │
//! │          ▼                                                              │
//! │  sum of all outlets covers qty? ──yes──► SPLIT_REQUIRED                │
//! │          │ no                             (every nonzero outlet)        │
//! │          ▼                                                              │
//! │  INSUFFICIENT (total vs required)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! User-facing messages are in Spanish, matching the storefront locale.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::inventory::Inventory;
use crate::validation::validate_quantity;

// =============================================================================
// Result Types
// =============================================================================

/// Typed outcome of a stock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// The requested (or preferred) outlet covers the quantity.
    Fulfillable,
    /// The preferred outlet falls short but another outlet covers it alone.
    AvailableElsewhere,
    /// No single outlet covers it, the outlets together do.
    SplitRequired,
    /// Not enough stock anywhere.
    Insufficient,
}

/// An outlet that could serve (part of) the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OutletSuggestion {
    pub outlet_id: String,
    pub available: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockValidationResult {
    pub is_valid: bool,
    pub status: StockStatus,
    /// Stock at the checked outlet, or the cross-outlet total when splitting.
    pub available_stock: i64,
    pub message: Option<String>,
    pub suggestions: Vec<OutletSuggestion>,
}

impl StockValidationResult {
    fn fulfillable(available_stock: i64, suggestions: Vec<OutletSuggestion>) -> Self {
        StockValidationResult {
            is_valid: true,
            status: StockStatus::Fulfillable,
            available_stock,
            message: None,
            suggestions,
        }
    }

    fn rejected(
        status: StockStatus,
        available_stock: i64,
        message: String,
        suggestions: Vec<OutletSuggestion>,
    ) -> Self {
        StockValidationResult {
            is_valid: false,
            status,
            available_stock,
            message: Some(message),
            suggestions,
        }
    }
}

// =============================================================================
// Single Outlet
// =============================================================================

/// Can this outlet's inventory cover `quantity`?
///
/// `None` means the product has no inventory row at the outlet, which is
/// reported as zero stock rather than an error.
pub fn validate_stock_for_sale(
    inventory: Option<&Inventory>,
    quantity: i64,
) -> CoreResult<StockValidationResult> {
    validate_quantity("quantity", quantity)?;

    let Some(inventory) = inventory else {
        return Ok(StockValidationResult::rejected(
            StockStatus::Insufficient,
            0,
            "Producto sin inventario en este outlet".to_string(),
            Vec::new(),
        ));
    };

    let available = inventory.quantity();
    if inventory.can_sell(quantity) {
        return Ok(StockValidationResult::fulfillable(available, Vec::new()));
    }

    Ok(StockValidationResult::rejected(
        StockStatus::Insufficient,
        available,
        format!(
            "Stock insuficiente. Disponible: {}, requerido: {}",
            available, quantity
        ),
        Vec::new(),
    ))
}

/// Boolean check over [`validate_stock_for_sale`].
pub fn can_fulfill(inventory: Option<&Inventory>, quantity: i64) -> bool {
    inventory.is_some_and(|inv| inv.can_sell(quantity))
}

// =============================================================================
// Across Outlets
// =============================================================================

/// Decides where an order for `product_id` can be served from.
///
/// Inventories for other products are ignored. Suggestions keep the order
/// in which the inventories were supplied.
///
/// ## Without a preferred outlet
/// Any outlet that covers the quantity alone makes the result valid
/// (`Fulfillable`), with those outlets as suggestions.
pub fn validate_stock_across_outlets<'a, I>(
    product_id: &str,
    quantity: i64,
    preferred_outlet: Option<&str>,
    inventories: I,
) -> CoreResult<StockValidationResult>
where
    I: IntoIterator<Item = &'a Inventory>,
{
    validate_quantity("quantity", quantity)?;

    let candidates: Vec<&Inventory> = inventories
        .into_iter()
        .filter(|inv| inv.product_id() == product_id)
        .collect();

    let mut preferred_available = 0;
    if let Some(outlet) = preferred_outlet {
        if let Some(inv) = candidates.iter().find(|inv| inv.outlet_id() == outlet) {
            preferred_available = inv.quantity();
            if inv.can_sell(quantity) {
                return Ok(StockValidationResult::fulfillable(
                    preferred_available,
                    vec![suggest(inv)],
                ));
            }
        }
    }

    let alternatives: Vec<OutletSuggestion> = candidates
        .iter()
        .filter(|inv| preferred_outlet != Some(inv.outlet_id()) && inv.can_sell(quantity))
        .map(|inv| suggest(inv))
        .collect();

    if !alternatives.is_empty() {
        if preferred_outlet.is_none() {
            let best = alternatives.iter().map(|s| s.available).max().unwrap_or(0);
            return Ok(StockValidationResult::fulfillable(best, alternatives));
        }
        return Ok(StockValidationResult::rejected(
            StockStatus::AvailableElsewhere,
            preferred_available,
            "Stock insuficiente en el outlet seleccionado. Disponible en otros outlets"
                .to_string(),
            alternatives,
        ));
    }

    let total = total_stock(product_id, candidates.iter().copied());
    if total >= quantity {
        let suggestions = candidates
            .iter()
            .filter(|inv| !inv.is_out_of_stock())
            .map(|inv| suggest(inv))
            .collect();
        return Ok(StockValidationResult::rejected(
            StockStatus::SplitRequired,
            total,
            "Stock insuficiente en un solo outlet. Se puede completar dividiendo el pedido entre outlets"
                .to_string(),
            suggestions,
        ));
    }

    Ok(StockValidationResult::rejected(
        StockStatus::Insufficient,
        total,
        format!(
            "Stock insuficiente en todos los outlets. Disponible: {}, requerido: {}",
            total, quantity
        ),
        Vec::new(),
    ))
}

/// Sum of stock for `product_id` across every supplied inventory.
pub fn total_stock<'a, I>(product_id: &str, inventories: I) -> i64
where
    I: IntoIterator<Item = &'a Inventory>,
{
    inventories
        .into_iter()
        .filter(|inv| inv.product_id() == product_id)
        .fold(0i64, |acc, inv| acc.saturating_add(inv.quantity()))
}

fn suggest(inventory: &Inventory) -> OutletSuggestion {
    OutletSuggestion {
        outlet_id: inventory.outlet_id().to_string(),
        available: inventory.quantity(),
    }
}

// =============================================================================
// Transfers
// =============================================================================

/// Runs every guard of [`Inventory::transfer_to`] without moving stock.
pub fn validate_transfer(source: &Inventory, target: &Inventory, quantity: i64) -> CoreResult<()> {
    source.check_transfer(target, quantity)
}

// =============================================================================
// Restock Estimation
// =============================================================================

/// How soon an inventory needs replenishing. Ordered from calm to urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RestockUrgency {
    None,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RestockEstimate {
    pub needs_restock: bool,
    pub urgency: RestockUrgency,
    /// Days until the restock should land; `None` when no restock is needed.
    pub estimated_days: Option<u32>,
    /// Units needed to get back to the minimum.
    pub suggested_quantity: i64,
}

/// Classifies restock urgency from the quantity / min_stock ratio.
///
/// ```text
/// quantity == 0            → critical, 3 days
/// quantity ≤ 25% of min    → high,     5 days
/// quantity ≤ 50% of min    → medium,   7 days
/// quantity ≤ min           → low,      7 days
/// quantity > min           → no restock
/// ```
pub fn estimate_restock_time(inventory: &Inventory) -> RestockEstimate {
    let qty = i128::from(inventory.quantity());
    let min = i128::from(inventory.min_stock());

    let (urgency, days) = if qty == 0 {
        (RestockUrgency::Critical, Some(3))
    } else if qty > min {
        (RestockUrgency::None, None)
    } else if qty * 4 <= min {
        (RestockUrgency::High, Some(5))
    } else if qty * 2 <= min {
        (RestockUrgency::Medium, Some(7))
    } else {
        (RestockUrgency::Low, Some(7))
    };

    RestockEstimate {
        needs_restock: urgency != RestockUrgency::None,
        urgency,
        estimated_days: days,
        suggested_quantity: inventory.restock_quantity(),
    }
}

/// One inventory at or below its minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LowStockAlert {
    pub product_id: String,
    pub outlet_id: String,
    pub quantity: i64,
    pub min_stock: i64,
    pub urgency: RestockUrgency,
    pub restock_quantity: i64,
}

/// Every inventory that needs restocking, most urgent first.
///
/// Ties are broken by product then outlet so the report is stable.
pub fn low_stock_alerts<'a, I>(inventories: I) -> Vec<LowStockAlert>
where
    I: IntoIterator<Item = &'a Inventory>,
{
    let mut alerts: Vec<LowStockAlert> = inventories
        .into_iter()
        .filter_map(|inv| {
            let estimate = estimate_restock_time(inv);
            estimate.needs_restock.then(|| LowStockAlert {
                product_id: inv.product_id().to_string(),
                outlet_id: inv.outlet_id().to_string(),
                quantity: inv.quantity(),
                min_stock: inv.min_stock(),
                urgency: estimate.urgency,
                restock_quantity: estimate.suggested_quantity,
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        b.urgency
            .cmp(&a.urgency)
            .then_with(|| a.product_id.cmp(&b.product_id))
            .then_with(|| a.outlet_id.cmp(&b.outlet_id))
    });
    alerts
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn inv(product: &str, outlet: &str, qty: i64, min: i64) -> Inventory {
        Inventory::with_id(format!("{product}-{outlet}"), product, outlet, "t-1", qty, min)
            .unwrap()
    }

    fn three_outlets() -> Vec<Inventory> {
        vec![
            inv("p-1", "o-1", 10, 5),
            inv("p-1", "o-2", 10, 5),
            inv("p-1", "o-3", 10, 5),
        ]
    }

    #[test]
    fn test_validate_stock_for_sale() {
        let inventory = inv("p-1", "o-1", 5, 1);
        let ok = validate_stock_for_sale(Some(&inventory), 5).unwrap();
        assert!(ok.is_valid);
        assert_eq!(ok.available_stock, 5);

        let short = validate_stock_for_sale(Some(&inventory), 6).unwrap();
        assert!(!short.is_valid);
        assert_eq!(short.status, StockStatus::Insufficient);
        assert!(short.message.unwrap().contains("Disponible: 5"));

        let missing = validate_stock_for_sale(None, 1).unwrap();
        assert!(!missing.is_valid);
        assert_eq!(missing.available_stock, 0);

        assert!(matches!(
            validate_stock_for_sale(Some(&inventory), 0),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_can_fulfill() {
        let inventory = inv("p-1", "o-1", 5, 1);
        assert!(can_fulfill(Some(&inventory), 5));
        assert!(!can_fulfill(Some(&inventory), 6));
        assert!(!can_fulfill(None, 1));
    }

    #[test]
    fn test_preferred_outlet_fulfills() {
        let outlets = three_outlets();
        let result = validate_stock_across_outlets("p-1", 8, Some("o-2"), &outlets).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.status, StockStatus::Fulfillable);
        assert_eq!(result.suggestions[0].outlet_id, "o-2");
    }

    #[test]
    fn test_available_elsewhere() {
        let outlets = vec![
            inv("p-1", "o-1", 2, 5),
            inv("p-1", "o-2", 9, 5),
            inv("p-1", "o-3", 20, 5),
        ];
        let result = validate_stock_across_outlets("p-1", 8, Some("o-1"), &outlets).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.status, StockStatus::AvailableElsewhere);
        assert_eq!(result.available_stock, 2);
        let ids: Vec<&str> = result.suggestions.iter().map(|s| s.outlet_id.as_str()).collect();
        assert_eq!(ids, vec!["o-2", "o-3"]);
    }

    #[test]
    fn test_no_preferred_outlet() {
        let outlets = three_outlets();
        let result = validate_stock_across_outlets("p-1", 10, None, &outlets).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.suggestions.len(), 3);
    }

    #[test]
    fn test_split_required() {
        let outlets = three_outlets();
        let result = validate_stock_across_outlets("p-1", 25, Some("o-1"), &outlets).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.status, StockStatus::SplitRequired);
        assert!(result
            .message
            .as_deref()
            .unwrap()
            .contains("Stock insuficiente en un solo outlet"));
        assert_eq!(result.available_stock, 30);
        assert_eq!(result.suggestions.len(), 3);
    }

    #[test]
    fn test_split_skips_empty_outlets_and_other_products() {
        let outlets = vec![
            inv("p-1", "o-1", 4, 0),
            inv("p-1", "o-2", 0, 0),
            inv("p-1", "o-3", 4, 0),
            inv("p-2", "o-1", 100, 0),
        ];
        let result = validate_stock_across_outlets("p-1", 8, None, &outlets).unwrap();
        assert_eq!(result.status, StockStatus::SplitRequired);
        assert_eq!(result.suggestions.len(), 2);
        assert_eq!(total_stock("p-1", &outlets), 8);
    }

    #[test]
    fn test_insufficient_everywhere() {
        let outlets = three_outlets();
        let result = validate_stock_across_outlets("p-1", 31, Some("o-1"), &outlets).unwrap();
        assert_eq!(result.status, StockStatus::Insufficient);
        assert_eq!(result.available_stock, 30);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_validate_transfer_does_not_mutate() {
        let source = inv("p-1", "o-1", 5, 0);
        let target = inv("p-1", "o-2", 0, 0);
        assert!(validate_transfer(&source, &target, 5).is_ok());
        assert!(matches!(
            validate_transfer(&source, &target, 6),
            Err(CoreError::InsufficientStock { .. })
        ));
        assert!(matches!(
            validate_transfer(&source, &source, 1),
            Err(CoreError::InvalidOperation(_))
        ));
        assert_eq!(source.quantity(), 5);
    }

    #[test]
    fn test_estimate_restock_time() {
        let cases = [
            (0, 10, RestockUrgency::Critical, Some(3)),
            (2, 10, RestockUrgency::High, Some(5)),
            (5, 10, RestockUrgency::Medium, Some(7)),
            (8, 10, RestockUrgency::Low, Some(7)),
            (10, 10, RestockUrgency::Low, Some(7)),
            (11, 10, RestockUrgency::None, None),
        ];
        for (qty, min, urgency, days) in cases {
            let estimate = estimate_restock_time(&inv("p-1", "o-1", qty, min));
            assert_eq!(estimate.urgency, urgency, "qty {qty}");
            assert_eq!(estimate.estimated_days, days, "qty {qty}");
            assert_eq!(estimate.needs_restock, urgency != RestockUrgency::None);
        }
    }

    #[test]
    fn test_low_stock_alerts_sorted_by_urgency() {
        let outlets = vec![
            inv("p-1", "o-1", 8, 10),
            inv("p-2", "o-1", 50, 10),
            inv("p-3", "o-1", 0, 10),
            inv("p-4", "o-1", 2, 10),
        ];
        let alerts = low_stock_alerts(&outlets);
        let ids: Vec<&str> = alerts.iter().map(|a| a.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p-3", "p-4", "p-1"]);
        assert_eq!(alerts[0].restock_quantity, 10);
    }
}
