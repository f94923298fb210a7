//! # Sale Module
//!
//! The immutable record of a completed transaction, and the payment it was
//! settled with.
//!
//! ## Payment Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total = subtotal - discount.apply(subtotal)     (must be > 0)          │
//! │                                                                         │
//! │  CASH   cash_received ≥ total                                          │
//! │         change given? → change == cash_received - total  (exact)       │
//! │                                                                         │
//! │  MIXED  change given? → cash + card - change == total    (exact)       │
//! │         otherwise     → cash + card          == total    (exact)       │
//! │                                                                         │
//! │  CARD   settled by the terminal, no amount checks                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Equality is exact Decimal equality. There is no tolerance band.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::{Cart, CartItem};
use crate::discount::Discount;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_amount, validate_optional, validate_positive_amount, validate_quantity,
    validate_required,
};

// =============================================================================
// Payment
// =============================================================================

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Mixed,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Mixed => write!(f, "mixed"),
        }
    }
}

/// Tender details. Construction checks that the method's fields exist;
/// whether they cover the total is checked when the Sale is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payment {
    method: PaymentMethod,
    cash_received: Option<Money>,
    card_amount: Option<Money>,
    change: Option<Money>,
}

impl Payment {
    /// Validates method-specific required fields and that no amount is negative.
    pub fn new(
        method: PaymentMethod,
        cash_received: Option<Money>,
        card_amount: Option<Money>,
        change: Option<Money>,
    ) -> CoreResult<Self> {
        for (field, amount) in [
            ("cash_received", cash_received),
            ("card_amount", card_amount),
            ("change", change),
        ] {
            if let Some(amount) = amount {
                validate_amount(field, amount)?;
            }
        }

        match method {
            PaymentMethod::Cash if cash_received.is_none() => {
                return Err(ValidationError::required("cash_received").into());
            }
            PaymentMethod::Mixed if cash_received.is_none() => {
                return Err(ValidationError::required("cash_received").into());
            }
            PaymentMethod::Mixed if card_amount.is_none() => {
                return Err(ValidationError::required("card_amount").into());
            }
            _ => {}
        }

        Ok(Payment {
            method,
            cash_received,
            card_amount,
            change,
        })
    }

    pub fn cash(cash_received: Money, change: Option<Money>) -> CoreResult<Self> {
        Payment::new(PaymentMethod::Cash, Some(cash_received), None, change)
    }

    pub fn card() -> Self {
        Payment {
            method: PaymentMethod::Card,
            cash_received: None,
            card_amount: None,
            change: None,
        }
    }

    pub fn mixed(cash_received: Money, card_amount: Money, change: Option<Money>) -> CoreResult<Self> {
        Payment::new(
            PaymentMethod::Mixed,
            Some(cash_received),
            Some(card_amount),
            change,
        )
    }

    /// Change owed when `received` is tendered against `total`.
    pub fn calculate_change(received: Money, total: Money) -> CoreResult<Money> {
        if received < total {
            return Err(CoreError::invalid_payment(format!(
                "received {} is less than total {}",
                received, total
            )));
        }
        Ok(received - total)
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn cash_received(&self) -> Option<Money> {
        self.cash_received
    }

    pub fn card_amount(&self) -> Option<Money> {
        self.card_amount
    }

    pub fn change(&self) -> Option<Money> {
        self.change
    }

    /// Checks that this payment settles `total` exactly.
    pub fn reconcile(&self, total: Money) -> CoreResult<()> {
        match self.method {
            PaymentMethod::Cash => {
                let received = self.cash_received.unwrap_or_default();
                let expected_change = Payment::calculate_change(received, total)?;
                if let Some(change) = self.change {
                    if change != expected_change {
                        return Err(CoreError::invalid_payment(format!(
                            "change {} does not match expected {}",
                            change, expected_change
                        )));
                    }
                }
                Ok(())
            }
            PaymentMethod::Mixed => {
                let tendered =
                    self.cash_received.unwrap_or_default() + self.card_amount.unwrap_or_default();
                let settled = tendered - self.change.unwrap_or_default();
                if settled != total {
                    return Err(CoreError::invalid_payment(format!(
                        "mixed payment settles {} but total is {}",
                        settled, total
                    )));
                }
                Ok(())
            }
            PaymentMethod::Card => Ok(()),
        }
    }

    pub fn to_persistence(&self) -> PaymentRecord {
        PaymentRecord {
            method: self.method,
            cash_received: self.cash_received.map(|m| m.value()),
            card_amount: self.card_amount.map(|m| m.value()),
            change: self.change.map(|m| m.value()),
        }
    }

    pub fn from_persistence(record: PaymentRecord) -> CoreResult<Self> {
        Payment::new(
            record.method,
            record.cash_received.map(Money::from_decimal),
            record.card_amount.map(Money::from_decimal),
            record.change.map(Money::from_decimal),
        )
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// Frozen copy of a cart line at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleItem {
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price: Money,
    total_price: Money,
}

impl SaleItem {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> CoreResult<Self> {
        let product_id = product_id.into();
        let product_name = product_name.into();

        validate_required("product_id", &product_id)?;
        validate_required("product_name", &product_name)?;
        validate_quantity("quantity", quantity)?;
        validate_positive_amount("unit_price", unit_price)?;
        let total_price = unit_price.checked_times(quantity).ok_or_else(|| {
            CoreError::InvalidArgument(format!(
                "line total {} × {} overflows",
                unit_price, quantity
            ))
        })?;

        Ok(SaleItem {
            product_id,
            product_name,
            quantity,
            unit_price,
            total_price,
        })
    }

    pub fn from_cart_item(item: &CartItem) -> CoreResult<Self> {
        SaleItem::new(
            item.product_id(),
            item.product_name(),
            item.quantity(),
            item.unit_price(),
        )
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn to_persistence(&self) -> SaleItemRecord {
        SaleItemRecord {
            product_id: self.product_id.clone(),
            product_name: self.product_name.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price.value(),
            total_price: self.total_price.value(),
        }
    }

    /// The stored `total_price` must agree with `unit_price × quantity`.
    pub fn from_persistence(record: SaleItemRecord) -> CoreResult<Self> {
        let item = SaleItem::new(
            record.product_id,
            record.product_name,
            record.quantity,
            Money::from_decimal(record.unit_price),
        )?;
        if item.total_price.value() != record.total_price {
            return Err(ValidationError::invalid_format(
                "total_price",
                format!(
                    "{} does not equal {} x {}",
                    record.total_price, item.unit_price, item.quantity
                ),
            )
            .into());
        }
        Ok(item)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Identity and ownership fields of a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleHeader {
    pub id: String,
    pub tenant_id: String,
    pub outlet_id: String,
    pub user_id: String,
    pub sale_number: String,
    pub customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A completed transaction. Terminal: no method changes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    id: String,
    tenant_id: String,
    outlet_id: String,
    user_id: String,
    sale_number: String,
    items: Vec<SaleItem>,
    discount: Discount,
    payment: Payment,
    customer_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl Sale {
    /// Builds a sale and enforces every business rule.
    ///
    /// ## Checks (in order)
    /// 1. Identity fields present
    /// 2. Items non-empty → else `CartEmpty`
    /// 3. Total > 0 → else `InvalidOperation`
    /// 4. Payment reconciles with the total → else `InvalidPayment`
    pub fn new(
        header: SaleHeader,
        items: Vec<SaleItem>,
        discount: Discount,
        payment: Payment,
    ) -> CoreResult<Self> {
        validate_required("id", &header.id)?;
        validate_required("tenant_id", &header.tenant_id)?;
        validate_required("outlet_id", &header.outlet_id)?;
        validate_required("user_id", &header.user_id)?;
        validate_required("sale_number", &header.sale_number)?;
        validate_optional("customer_id", header.customer_id.as_deref())?;

        if items.is_empty() {
            return Err(CoreError::CartEmpty);
        }

        let mut subtotal = Money::zero();
        let mut units: i64 = 0;
        for item in &items {
            subtotal = subtotal
                .checked_add(item.total_price)
                .ok_or_else(|| CoreError::InvalidArgument("sale subtotal overflows".to_string()))?;
            units = units
                .checked_add(item.quantity)
                .ok_or_else(|| CoreError::InvalidArgument("sale quantity overflows".to_string()))?;
        }
        let total = subtotal - discount.apply(subtotal);
        if total.is_negative_or_zero() {
            return Err(CoreError::invalid_operation(format!(
                "sale total must be greater than zero, got {}",
                total
            )));
        }

        payment.reconcile(total)?;

        Ok(Sale {
            id: header.id,
            tenant_id: header.tenant_id,
            outlet_id: header.outlet_id,
            user_id: header.user_id,
            sale_number: header.sale_number,
            items,
            discount,
            payment,
            customer_id: header.customer_id,
            created_at: header.created_at,
        })
    }

    /// Snapshots an active cart into a sale.
    ///
    /// The cart is not modified; the orchestrator marks it completed once the
    /// sale and the stock decrement have both succeeded.
    pub fn from_cart(
        cart: &Cart,
        sale_number: impl Into<String>,
        payment: Payment,
    ) -> CoreResult<Self> {
        cart.validate_for_checkout()?;

        let items = cart
            .sorted_items()
            .into_iter()
            .map(SaleItem::from_cart_item)
            .collect::<CoreResult<Vec<_>>>()?;

        let header = SaleHeader {
            id: Uuid::new_v4().to_string(),
            tenant_id: cart.tenant_id().to_string(),
            outlet_id: cart.outlet_id().to_string(),
            user_id: cart.user_id().to_string(),
            sale_number: sale_number.into(),
            customer_id: cart.customer_id().map(str::to_string),
            created_at: Utc::now(),
        };

        Sale::new(header, items, cart.discount(), payment)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn outlet_id(&self) -> &str {
        &self.outlet_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn sale_number(&self) -> &str {
        &self.sale_number
    }

    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    pub fn discount(&self) -> Discount {
        self.discount
    }

    pub fn payment(&self) -> &Payment {
        &self.payment
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // =========================================================================
    // Totals
    // =========================================================================

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(SaleItem::total_price).sum()
    }

    pub fn discount_amount(&self) -> Money {
        self.discount.apply(self.subtotal())
    }

    pub fn total(&self) -> Money {
        self.subtotal() - self.discount_amount()
    }

    /// Change handed back: the explicit change if one was recorded,
    /// otherwise derived from the cash tendered.
    pub fn change_due(&self) -> Money {
        if let Some(change) = self.payment.change() {
            return change;
        }
        match self.payment.method() {
            PaymentMethod::Cash => {
                self.payment.cash_received().unwrap_or_default() - self.total()
            }
            PaymentMethod::Mixed | PaymentMethod::Card => Money::zero(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total units sold. `Sale::new` rejects sales whose count overflows.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(SaleItem::quantity).sum()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn to_persistence(&self) -> SaleRecord {
        SaleRecord {
            id: self.id.clone(),
            tenant_id: self.tenant_id.clone(),
            outlet_id: self.outlet_id.clone(),
            user_id: self.user_id.clone(),
            sale_number: self.sale_number.clone(),
            items: self.items.iter().map(SaleItem::to_persistence).collect(),
            discount_percentage: self.discount.percentage(),
            payment: self.payment.to_persistence(),
            customer_id: self.customer_id.clone(),
            created_at: self.created_at,
        }
    }

    /// Rebuilds a sale through [`Sale::new`]. A record that was valid when
    /// written always loads; a corrupted one fails.
    pub fn from_persistence(record: SaleRecord) -> CoreResult<Self> {
        let items = record
            .items
            .into_iter()
            .map(SaleItem::from_persistence)
            .collect::<CoreResult<Vec<_>>>()?;

        let header = SaleHeader {
            id: record.id,
            tenant_id: record.tenant_id,
            outlet_id: record.outlet_id,
            user_id: record.user_id,
            sale_number: record.sale_number,
            customer_id: record.customer_id,
            created_at: record.created_at,
        };

        Sale::new(
            header,
            items,
            Discount::from_percentage(record.discount_percentage)?,
            Payment::from_persistence(record.payment)?,
        )
    }
}

// =============================================================================
// Persistence Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRecord {
    pub method: PaymentMethod,
    #[ts(as = "Option<String>")]
    pub cash_received: Option<Decimal>,
    #[ts(as = "Option<String>")]
    pub card_amount: Option<Decimal>,
    #[ts(as = "Option<String>")]
    pub change: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItemRecord {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub unit_price: Decimal,
    #[ts(as = "String")]
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRecord {
    pub id: String,
    pub tenant_id: String,
    pub outlet_id: String,
    pub user_id: String,
    pub sale_number: String,
    pub items: Vec<SaleItemRecord>,
    #[ts(as = "String")]
    pub discount_percentage: Decimal,
    pub payment: PaymentRecord,
    pub customer_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Subtotal 100, 10% off, total 90.
    fn discounted_cart() -> Cart {
        let mut cart = Cart::with_id("cart-1", "user-1", "outlet-1", "tenant-1").unwrap();
        cart.add_item("p-1", "Tea", Money::from(25), 2, false).unwrap();
        cart.add_item("p-2", "Cake", Money::from(50), 1, false).unwrap();
        cart.apply_discount(Discount::from_percentage(dec!(10)).unwrap())
            .unwrap();
        cart
    }

    #[test]
    fn test_payment_required_fields() {
        assert!(Payment::new(PaymentMethod::Cash, None, None, None).is_err());
        assert!(Payment::new(PaymentMethod::Mixed, Some(Money::from(5)), None, None).is_err());
        assert!(Payment::new(PaymentMethod::Card, None, None, None).is_ok());
        assert!(matches!(
            Payment::cash(Money::from(-5), None),
            Err(CoreError::Validation(ValidationError::MustNotBeNegative { .. }))
        ));
    }

    #[test]
    fn test_calculate_change() {
        assert_eq!(
            Payment::calculate_change(Money::from(100), Money::from(90)).unwrap(),
            Money::from(10)
        );
        assert!(matches!(
            Payment::calculate_change(Money::from(80), Money::from(90)),
            Err(CoreError::InvalidPayment { .. })
        ));
    }

    #[test]
    fn test_cash_change_must_match_exactly() {
        let cart = discounted_cart();
        let ok = Sale::from_cart(
            &cart,
            "S-1",
            Payment::cash(Money::from(100), Some(Money::from(10))).unwrap(),
        )
        .unwrap();
        assert_eq!(ok.total(), Money::from(90));
        assert_eq!(ok.change_due(), Money::from(10));

        let err = Sale::from_cart(
            &cart,
            "S-1",
            Payment::cash(Money::from(100), Some(Money::from(5))).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayment { .. }));
    }

    #[test]
    fn test_cash_short_and_derived_change() {
        let cart = discounted_cart();
        let short = Sale::from_cart(&cart, "S-1", Payment::cash(Money::from(89), None).unwrap());
        assert!(matches!(short, Err(CoreError::InvalidPayment { .. })));

        let sale =
            Sale::from_cart(&cart, "S-1", Payment::cash(Money::from(95), None).unwrap()).unwrap();
        assert_eq!(sale.change_due(), Money::from(5));
    }

    #[test]
    fn test_mixed_payment() {
        let cart = discounted_cart();
        let exact = Payment::mixed(Money::from(40), Money::from(50), None).unwrap();
        assert!(Sale::from_cart(&cart, "S-1", exact).is_ok());

        let with_change =
            Payment::mixed(Money::from(50), Money::from(50), Some(Money::from(10))).unwrap();
        assert!(Sale::from_cart(&cart, "S-1", with_change).is_ok());

        let over = Payment::mixed(Money::from(50), Money::from(50), None).unwrap();
        assert!(matches!(
            Sale::from_cart(&cart, "S-1", over),
            Err(CoreError::InvalidPayment { .. })
        ));
    }

    #[test]
    fn test_card_payment_has_no_amount_checks() {
        let sale = Sale::from_cart(&discounted_cart(), "S-1", Payment::card()).unwrap();
        assert_eq!(sale.change_due(), Money::zero());
        assert_eq!(sale.item_count(), 2);
        assert_eq!(sale.total_quantity(), 3);
        assert_eq!(sale.subtotal(), Money::from(100));
        assert_eq!(sale.discount_amount(), Money::from(10));
    }

    #[test]
    fn test_from_cart_requires_checkout_ready_cart() {
        let empty = Cart::with_id("cart-1", "user-1", "outlet-1", "tenant-1").unwrap();
        assert_eq!(
            Sale::from_cart(&empty, "S-1", Payment::card()).unwrap_err(),
            CoreError::CartEmpty
        );

        let mut held = discounted_cart();
        held.hold("Table 2").unwrap();
        assert!(matches!(
            Sale::from_cart(&held, "S-1", Payment::card()),
            Err(CoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_sale_items_are_copies() {
        let mut cart = discounted_cart();
        let sale = Sale::from_cart(&cart, "S-1", Payment::card()).unwrap();
        cart.update_item_quantity("p-1", 9).unwrap();

        let tea = &sale.items()[0];
        assert_eq!(tea.product_id(), "p-1");
        assert_eq!(tea.quantity(), 2);
        assert_eq!(tea.total_price(), Money::from(50));
    }

    #[test]
    fn test_new_rejects_empty_items() {
        let header = SaleHeader {
            id: "sale-1".to_string(),
            tenant_id: "t-1".to_string(),
            outlet_id: "o-1".to_string(),
            user_id: "u-1".to_string(),
            sale_number: "S-1".to_string(),
            customer_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(
            Sale::new(header, Vec::new(), Discount::none(), Payment::card()).unwrap_err(),
            CoreError::CartEmpty
        );
    }

    #[test]
    fn test_sale_item_requires_positive_price() {
        assert!(SaleItem::new("p-1", "Gift", 1, Money::zero()).is_err());
        assert!(SaleItem::new("p-1", "Gift", 0, Money::from(1)).is_err());
    }

    #[test]
    fn test_persistence_round_trip() {
        let sale = Sale::from_cart(
            &discounted_cart(),
            "20250101-OUTLET-00001",
            Payment::cash(Money::from(100), Some(Money::from(10))).unwrap(),
        )
        .unwrap();

        let json = serde_json::to_string(&sale.to_persistence()).unwrap();
        assert!(json.contains("\"unit_price\":\"25\""));
        let record: SaleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(Sale::from_persistence(record).unwrap(), sale);
    }

    #[test]
    fn test_from_persistence_rejects_corruption() {
        let sale = Sale::from_cart(&discounted_cart(), "S-1", Payment::card()).unwrap();

        let mut record = sale.to_persistence();
        record.items[0].total_price = dec!(1);
        assert!(Sale::from_persistence(record).is_err());

        let mut record = sale.to_persistence();
        record.payment = Payment::cash(Money::from(1), None).unwrap().to_persistence();
        assert!(matches!(
            Sale::from_persistence(record),
            Err(CoreError::InvalidPayment { .. })
        ));
    }

    #[test]
    fn test_overflowing_amounts_are_rejected() {
        let huge = Money::from(100_000_000_000i64);
        assert!(matches!(
            SaleItem::new("p-1", "Gold", i64::MAX / 2, huge),
            Err(CoreError::InvalidArgument(_))
        ));

        let items = vec![
            SaleItem::new("p-1", "Pin", i64::MAX, Money::from_cents(1)).unwrap(),
            SaleItem::new("p-2", "Pin", 1, Money::from_cents(1)).unwrap(),
        ];
        let header = SaleHeader {
            id: "s-1".into(),
            tenant_id: "t-1".into(),
            outlet_id: "o-1".into(),
            user_id: "u-1".into(),
            sale_number: "S-1".into(),
            customer_id: None,
            created_at: Utc::now(),
        };
        assert!(matches!(
            Sale::new(header, items, Discount::none(), Payment::card()),
            Err(CoreError::InvalidArgument(_))
        ));
    }
}
