//! End-to-end properties of the transaction core: money exactness, discount
//! bounds, cart merging, payment reconciliation, stock decisions and
//! sale number round trips.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use vesta_core::pricing::{calculate_volume_discount, VolumeTier};
use vesta_core::sale_number::{self, SaleNumberFormat};
use vesta_core::stock::validate_stock_across_outlets;
use vesta_core::{
    Cart, CartStatus, CoreError, Discount, Inventory, Money, Payment, Sale, StockStatus,
};

fn cents() -> impl Strategy<Value = Money> {
    (-10_000_000i64..10_000_000).prop_map(Money::from_cents)
}

fn cart() -> Cart {
    Cart::new("cashier-1", "outlet-1", "tenant-1").unwrap()
}

proptest! {
    #[test]
    fn money_add_then_subtract_is_identity(a in cents(), b in cents()) {
        prop_assert_eq!(a + b - b, a);
    }

    #[test]
    fn discount_of_one_hundred_equals_percentage(basis in 0u32..=10_000) {
        let p = Decimal::new(i64::from(basis), 2);
        let discount = Discount::from_percentage(p).unwrap();
        prop_assert_eq!(discount.apply(Money::from(100)), Money::from_decimal(p));
    }

    #[test]
    fn discount_outside_bounds_is_rejected(basis in 10_001u32..1_000_000) {
        let p = Decimal::new(i64::from(basis), 2);
        let is_invalid = matches!(
            Discount::from_percentage(p),
            Err(CoreError::InvalidDiscount { .. })
        );
        prop_assert!(is_invalid);
        let is_invalid = matches!(
            Discount::from_percentage(-p),
            Err(CoreError::InvalidDiscount { .. })
        );
        prop_assert!(is_invalid);
    }

    #[test]
    fn cash_sale_change_is_exact(price in 1i64..100_000, qty in 1i64..50, extra in 0i64..10_000) {
        let mut cart = cart();
        cart.add_item("p-1", "Item", Money::from_cents(price), qty, false).unwrap();
        let total = cart.calculate_total();
        let received = total + Money::from_cents(extra);

        let exact = Payment::cash(received, Some(Money::from_cents(extra))).unwrap();
        prop_assert!(Sale::from_cart(&cart, "S-1", exact).is_ok());

        let off_by_a_cent = Payment::cash(received, Some(Money::from_cents(extra + 1))).unwrap();
        let is_invalid_payment = matches!(
            Sale::from_cart(&cart, "S-1", off_by_a_cent),
            Err(CoreError::InvalidPayment { .. })
        );
        prop_assert!(is_invalid_payment);
    }

    #[test]
    fn checksum_detects_last_char_change(outlet in "[a-z]{1,12}", seq in 1u32..=99_999) {
        let format = SaleNumberFormat { prefix: None, checksum: true, short: false };
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let number = sale_number::generate_with(&format, &outlet, seq, date).unwrap();
        prop_assert!(sale_number::verify_checksum(&number));
        prop_assert_eq!(sale_number::extract_sequence(&number), Some(seq));

        let mut flipped = number.clone();
        let last = flipped.pop().unwrap();
        flipped.push(if last == 'Z' { 'Y' } else { 'Z' });
        prop_assert!(!sale_number::verify_checksum(&flipped));
    }
}

#[test]
fn ten_dimes_make_a_dollar() {
    let dime = Money::from_decimal(dec!(0.10));
    let total: Money = std::iter::repeat(dime).take(10).sum();
    assert_eq!(total, Money::from_decimal(dec!(1.00)));
}

#[test]
fn same_product_twice_merges_into_one_line() {
    let mut cart = cart();
    cart.add_item("p-1", "Tea", Money::from(3), 2, false).unwrap();
    cart.add_item("p-1", "Tea", Money::from(3), 3, false).unwrap();
    assert_eq!(cart.item_count(), 1);
    assert_eq!(cart.item("p-1").unwrap().quantity(), 5);
}

#[test]
fn hold_and_activate_guards() {
    let mut empty = cart();
    assert_eq!(empty.hold("A"), Err(CoreError::CartEmpty));
    assert!(matches!(empty.activate(), Err(CoreError::InvalidOperation(_))));

    let mut cart = cart();
    cart.add_item("p-1", "Tea", Money::from(3), 1, false).unwrap();
    cart.mark_abandoned().unwrap();
    assert_eq!(cart.status(), CartStatus::Abandoned);
    assert!(matches!(cart.hold("A"), Err(CoreError::InvalidOperation(_))));
}

#[test]
fn discounted_cash_sale_reconciles() {
    let mut cart = cart();
    cart.add_item("p-1", "Basket", Money::from(100), 1, false).unwrap();
    cart.apply_discount(Discount::from_percentage(dec!(10)).unwrap())
        .unwrap();

    let ok = Payment::cash(Money::from(100), Some(Money::from(10))).unwrap();
    assert!(Sale::from_cart(&cart, "S-1", ok).is_ok());

    let bad = Payment::cash(Money::from(100), Some(Money::from(5))).unwrap();
    assert!(matches!(
        Sale::from_cart(&cart, "S-1", bad),
        Err(CoreError::InvalidPayment { .. })
    ));
}

#[test]
fn volume_tier_boundary_is_inclusive() {
    let tiers = [
        VolumeTier::new(10, dec!(5)),
        VolumeTier::new(50, dec!(10)),
        VolumeTier::new(100, dec!(15)),
    ];
    let result = calculate_volume_discount(Money::from(10), 100, &tiers).unwrap();
    assert_eq!(result.applied_discount, dec!(15));
    assert_eq!(result.final_price, Money::from(850));
}

#[test]
fn split_across_three_outlets() {
    let inventories: Vec<Inventory> = ["o-1", "o-2", "o-3"]
        .iter()
        .map(|outlet| Inventory::new("p-1", *outlet, "tenant-1", 10, 5).unwrap())
        .collect();

    let result = validate_stock_across_outlets("p-1", 25, Some("o-1"), &inventories).unwrap();
    assert!(!result.is_valid);
    assert_eq!(result.status, StockStatus::SplitRequired);
    assert!(result
        .message
        .as_deref()
        .unwrap_or_default()
        .contains("Stock insuficiente en un solo outlet"));
    assert_eq!(result.available_stock, 30);
    assert_eq!(result.suggestions.len(), 3);
}

#[test]
fn generated_sale_number_shape() {
    let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let number = sale_number::generate("outlet-main", 1, date).unwrap();

    let parts: Vec<&str> = number.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert!(parts[0].len() == 8 && parts[0].bytes().all(|b| b.is_ascii_digit()));
    assert!(parts[1].len() == 6
        && parts[1]
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));
    assert!(parts[2].len() == 5 && parts[2].bytes().all(|b| b.is_ascii_digit()));

    assert!(number.contains("OUTLET"));
    assert!(number.contains("-00001"));
    assert_eq!(sale_number::extract_sequence(&number), Some(1));
}
