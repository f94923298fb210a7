//! # Price Calculation
//!
//! Stateless pricing algorithms over [`Money`] and [`Discount`].
//!
//! ## Order of Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal                                                              │
//! │     │                                                                  │
//! │     ▼  discount first                                                  │
//! │  discounted = subtotal - discount.apply(subtotal)                      │
//! │     │                                                                  │
//! │     ▼  tax second, on the discounted amount                            │
//! │  tax included in price?                                                │
//! │     ├── yes: tax = discounted - discounted / (1 + rate/100)            │
//! │     │        total = discounted                                        │
//! │     └── no:  tax = discounted × rate/100                               │
//! │              total = discounted + tax                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No function here rounds implicitly. Call [`round_price`] at the edge
//! where a price is shown or charged.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::discount::Discount;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{validate_amount, validate_quantity, validate_stock_level};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// =============================================================================
// Volume Discounts
// =============================================================================

/// Minimum quantity mapped to a discount percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VolumeTier {
    pub min_quantity: i64,
    #[ts(as = "String")]
    pub discount_percentage: Decimal,
}

impl VolumeTier {
    pub fn new(min_quantity: i64, discount_percentage: Decimal) -> Self {
        VolumeTier {
            min_quantity,
            discount_percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDiscountResult {
    pub original_price: Money,
    /// Percentage of the selected tier, zero when no tier qualifies.
    pub applied_discount: Decimal,
    pub discount_amount: Money,
    pub final_price: Money,
    pub tier: Option<VolumeTier>,
}

/// Picks the highest tier whose `min_quantity ≤ quantity` (inclusive).
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use vesta_core::pricing::{calculate_volume_discount, VolumeTier};
/// use vesta_core::Money;
///
/// let tiers = [
///     VolumeTier::new(10, Decimal::from(5)),
///     VolumeTier::new(50, Decimal::from(10)),
///     VolumeTier::new(100, Decimal::from(15)),
/// ];
/// let result = calculate_volume_discount(Money::from(10), 100, &tiers).unwrap();
/// assert_eq!(result.applied_discount, Decimal::from(15));
/// assert_eq!(result.final_price, Money::from(850));
/// ```
pub fn calculate_volume_discount(
    unit_price: Money,
    quantity: i64,
    tiers: &[VolumeTier],
) -> CoreResult<VolumeDiscountResult> {
    validate_amount("unit_price", unit_price)?;
    validate_quantity("quantity", quantity)?;

    let mut sorted: Vec<VolumeTier> = tiers.to_vec();
    sorted.sort_by(|a, b| b.min_quantity.cmp(&a.min_quantity));
    let tier = sorted.into_iter().find(|t| t.min_quantity <= quantity);

    let discount = match tier {
        Some(t) => Discount::from_percentage(t.discount_percentage)?,
        None => Discount::none(),
    };

    let original_price = unit_price
        .checked_times(quantity)
        .ok_or_else(|| CoreError::InvalidArgument("volume price overflows".to_string()))?;
    let discount_amount = discount.apply(original_price);

    Ok(VolumeDiscountResult {
        original_price,
        applied_discount: discount.percentage(),
        discount_amount,
        final_price: original_price - discount_amount,
        tier,
    })
}

// =============================================================================
// Tax
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxConfig {
    /// Percentage, e.g. `16` for 16%.
    #[ts(as = "String")]
    pub rate: Decimal,
    /// Prices already contain the tax.
    pub include_in_price: bool,
}

impl TaxConfig {
    pub fn new(rate: Decimal, include_in_price: bool) -> Self {
        TaxConfig {
            rate,
            include_in_price,
        }
    }
}

/// Tax component of `amount`.
///
/// Included tax is backed out of the amount; excluded tax is the additive
/// amount still to be charged.
pub fn calculate_tax(amount: Money, config: &TaxConfig) -> CoreResult<Money> {
    if config.rate.is_sign_negative() && !config.rate.is_zero() {
        return Err(CoreError::InvalidArgument(format!(
            "tax rate must not be negative, got {}",
            config.rate
        )));
    }

    let factor = config.rate / HUNDRED;
    if config.include_in_price {
        let net = amount.divide(Decimal::ONE + factor)?;
        Ok(amount - net)
    } else {
        Ok(amount.multiply(factor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalPrice {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub discounted: Money,
    pub tax_amount: Money,
    pub total: Money,
}

/// Discount first, tax second (see module docs).
pub fn calculate_final_price(
    subtotal: Money,
    discount: Discount,
    tax: Option<&TaxConfig>,
) -> CoreResult<FinalPrice> {
    let discount_amount = discount.apply(subtotal);
    let discounted = subtotal - discount_amount;

    let (tax_amount, total) = match tax {
        Some(config) => {
            let tax_amount = calculate_tax(discounted, config)?;
            let total = if config.include_in_price {
                discounted
            } else {
                discounted + tax_amount
            };
            (tax_amount, total)
        }
        None => (Money::zero(), discounted),
    };

    Ok(FinalPrice {
        subtotal,
        discount_amount,
        discounted,
        tax_amount,
        total,
    })
}

// =============================================================================
// Cumulative Discounts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeDiscountResult {
    pub original_price: Money,
    pub final_price: Money,
    pub total_discount: Money,
    /// Single percentage equivalent to the whole chain.
    pub effective_percentage: Decimal,
}

/// Applies discounts in input order, each against the running price.
///
/// `10%` then `20%` on 100 gives 72, an effective 28% (not 30%).
pub fn calculate_cumulative_discounts(
    price: Money,
    discounts: &[Discount],
) -> CumulativeDiscountResult {
    let mut running = price;
    let mut remaining_factor = Decimal::ONE;

    for discount in discounts {
        running = running - discount.apply(running);
        remaining_factor *= Decimal::ONE - discount.percentage() / HUNDRED;
    }

    CumulativeDiscountResult {
        original_price: price,
        final_price: running,
        total_discount: price - running,
        effective_percentage: (Decimal::ONE - remaining_factor) * HUNDRED,
    }
}

// =============================================================================
// Rounding
// =============================================================================

/// Direction used when rounding a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum RoundingRule {
    /// Half away from zero.
    #[default]
    Nearest,
    /// Towards positive infinity.
    Up,
    /// Towards negative infinity.
    Down,
}

impl RoundingRule {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingRule::Nearest => RoundingStrategy::MidpointAwayFromZero,
            RoundingRule::Up => RoundingStrategy::ToPositiveInfinity,
            RoundingRule::Down => RoundingStrategy::ToNegativeInfinity,
        }
    }
}

/// Rounds to cents.
pub fn round_price(price: Money, rule: RoundingRule) -> Money {
    round_price_dp(price, 2, rule)
}

/// Rounds to `dp` decimal places (`0` for whole units).
pub fn round_price_dp(price: Money, dp: u32, rule: RoundingRule) -> Money {
    Money::from_decimal(price.value().round_dp_with_strategy(dp, rule.strategy()))
}

// =============================================================================
// Averages & Margins
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedPrice {
    pub price: Money,
    pub quantity: i64,
}

/// `Σ(price × qty) / Σqty`, zero when the quantities add up to zero.
pub fn calculate_weighted_average_price(items: &[WeightedPrice]) -> CoreResult<Money> {
    let mut total_value = Money::zero();
    let mut total_quantity: i64 = 0;

    for item in items {
        validate_stock_level("quantity", item.quantity)?;
        total_value = item
            .price
            .checked_times(item.quantity)
            .and_then(|line| total_value.checked_add(line))
            .ok_or_else(|| CoreError::InvalidArgument("total value overflow".to_string()))?;
        total_quantity = total_quantity
            .checked_add(item.quantity)
            .ok_or_else(|| CoreError::InvalidArgument("total quantity overflow".to_string()))?;
    }

    if total_quantity == 0 {
        return Ok(Money::zero());
    }
    total_value.divide(Decimal::from(total_quantity))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitMargin {
    pub profit: Money,
    /// Markup on cost, as a percentage.
    pub margin_percentage: Decimal,
}

/// Profit and markup of selling at `selling_price` something that cost `cost`.
///
/// A zero cost is reported as a 100% margin with the whole price as profit.
pub fn calculate_profit_margin(selling_price: Money, cost: Money) -> CoreResult<ProfitMargin> {
    validate_amount("selling_price", selling_price)?;
    validate_amount("cost", cost)?;

    if cost.is_zero() {
        return Ok(ProfitMargin {
            profit: selling_price,
            margin_percentage: HUNDRED,
        });
    }

    let profit = selling_price - cost;
    let margin_percentage = percentage_of(profit, cost)?;
    Ok(ProfitMargin {
        profit,
        margin_percentage,
    })
}

/// `cost × (1 + margin/100)`.
pub fn calculate_selling_price(cost: Money, margin_percentage: Decimal) -> CoreResult<Money> {
    validate_amount("cost", cost)?;
    if margin_percentage.is_sign_negative() && !margin_percentage.is_zero() {
        return Err(CoreError::InvalidArgument(format!(
            "margin must not be negative, got {}",
            margin_percentage
        )));
    }
    Ok(cost.multiply(Decimal::ONE + margin_percentage / HUNDRED))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxDiscount {
    /// Lowest price that still keeps the minimum margin.
    pub min_selling_price: Money,
    pub max_discount_amount: Money,
    /// `max_discount_amount` as a percentage of the selling price.
    pub max_discount_percentage: Decimal,
}

/// How far `selling_price` can be discounted before the margin drops below
/// `min_margin_percentage`. Never negative.
pub fn calculate_max_discount_for_margin(
    selling_price: Money,
    cost: Money,
    min_margin_percentage: Decimal,
) -> CoreResult<MaxDiscount> {
    validate_amount("selling_price", selling_price)?;
    let min_selling_price = calculate_selling_price(cost, min_margin_percentage)?;

    let gap = selling_price - min_selling_price;
    let max_discount_amount = if gap.is_negative() { Money::zero() } else { gap };
    let max_discount_percentage = if selling_price.is_zero() {
        Decimal::ZERO
    } else {
        percentage_of(max_discount_amount, selling_price)?
    };

    Ok(MaxDiscount {
        min_selling_price,
        max_discount_amount,
        max_discount_percentage,
    })
}

/// `part / whole × 100`; `whole` must be nonzero.
fn percentage_of(part: Money, whole: Money) -> CoreResult<Decimal> {
    part.value()
        .checked_div(whole.value())
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .ok_or(CoreError::DivisionByZero)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pct(p: Decimal) -> Discount {
        Discount::from_percentage(p).unwrap()
    }

    fn tiers() -> Vec<VolumeTier> {
        vec![
            VolumeTier::new(10, dec!(5)),
            VolumeTier::new(50, dec!(10)),
            VolumeTier::new(100, dec!(15)),
        ]
    }

    #[test]
    fn test_volume_discount_boundaries() {
        let result = calculate_volume_discount(Money::from(10), 100, &tiers()).unwrap();
        assert_eq!(result.applied_discount, dec!(15));
        assert_eq!(result.final_price, Money::from(850));

        let result = calculate_volume_discount(Money::from(10), 99, &tiers()).unwrap();
        assert_eq!(result.applied_discount, dec!(10));

        let result = calculate_volume_discount(Money::from(10), 9, &tiers()).unwrap();
        assert_eq!(result.applied_discount, Decimal::ZERO);
        assert_eq!(result.final_price, Money::from(90));
        assert!(result.tier.is_none());
    }

    #[test]
    fn test_volume_discount_rejects_bad_tier() {
        let bad = [VolumeTier::new(1, dec!(120))];
        assert!(matches!(
            calculate_volume_discount(Money::from(1), 5, &bad),
            Err(CoreError::InvalidDiscount { .. })
        ));
    }

    #[test]
    fn test_tax_excluded_and_included() {
        let excluded = TaxConfig::new(dec!(16), false);
        assert_eq!(
            calculate_tax(Money::from(100), &excluded).unwrap(),
            Money::from(16)
        );

        let included = TaxConfig::new(dec!(16), true);
        let tax = calculate_tax(Money::from(116), &included).unwrap();
        assert_eq!(round_price(tax, RoundingRule::Nearest), Money::from(16));

        let negative = TaxConfig::new(dec!(-1), false);
        assert!(matches!(
            calculate_tax(Money::from(100), &negative),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_final_price_discount_then_tax() {
        let tax = TaxConfig::new(dec!(10), false);
        let price = calculate_final_price(Money::from(200), pct(dec!(25)), Some(&tax)).unwrap();
        assert_eq!(price.discounted, Money::from(150));
        assert_eq!(price.tax_amount, Money::from(15));
        assert_eq!(price.total, Money::from(165));

        let included = TaxConfig::new(dec!(10), true);
        let price =
            calculate_final_price(Money::from(110), Discount::none(), Some(&included)).unwrap();
        assert_eq!(price.total, Money::from(110));
        assert_eq!(round_price(price.tax_amount, RoundingRule::Nearest), Money::from(10));

        let price = calculate_final_price(Money::from(50), Discount::none(), None).unwrap();
        assert_eq!(price.total, Money::from(50));
    }

    #[test]
    fn test_cumulative_discounts_compound() {
        let result =
            calculate_cumulative_discounts(Money::from(100), &[pct(dec!(10)), pct(dec!(20))]);
        assert_eq!(result.final_price, Money::from(72));
        assert_eq!(result.total_discount, Money::from(28));
        assert_eq!(result.effective_percentage, dec!(28));

        let empty = calculate_cumulative_discounts(Money::from(100), &[]);
        assert_eq!(empty.final_price, Money::from(100));
        assert_eq!(empty.effective_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_round_price() {
        let price = Money::from_decimal(dec!(10.005));
        assert_eq!(round_price(price, RoundingRule::Nearest), Money::from_cents(1001));
        assert_eq!(round_price(price, RoundingRule::Up), Money::from_cents(1001));
        assert_eq!(round_price(price, RoundingRule::Down), Money::from_cents(1000));
        assert_eq!(
            round_price_dp(Money::from_decimal(dec!(10.4)), 0, RoundingRule::Up),
            Money::from(11)
        );
    }

    #[test]
    fn test_weighted_average_price() {
        let items = [
            WeightedPrice {
                price: Money::from(10),
                quantity: 3,
            },
            WeightedPrice {
                price: Money::from(20),
                quantity: 1,
            },
        ];
        assert_eq!(
            calculate_weighted_average_price(&items).unwrap(),
            Money::from_cents(1250)
        );
        assert_eq!(calculate_weighted_average_price(&[]).unwrap(), Money::zero());
    }

    #[test]
    fn test_profit_margin() {
        let margin = calculate_profit_margin(Money::from(150), Money::from(100)).unwrap();
        assert_eq!(margin.profit, Money::from(50));
        assert_eq!(margin.margin_percentage, dec!(50));

        let free = calculate_profit_margin(Money::from(30), Money::zero()).unwrap();
        assert_eq!(free.margin_percentage, dec!(100));
        assert_eq!(free.profit, Money::from(30));
    }

    #[test]
    fn test_selling_price() {
        assert_eq!(
            calculate_selling_price(Money::from(80), dec!(25)).unwrap(),
            Money::from(100)
        );
        assert!(matches!(
            calculate_selling_price(Money::from(80), dec!(-5)),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_max_discount_for_margin() {
        let max =
            calculate_max_discount_for_margin(Money::from(200), Money::from(100), dec!(50))
                .unwrap();
        assert_eq!(max.min_selling_price, Money::from(150));
        assert_eq!(max.max_discount_amount, Money::from(50));
        assert_eq!(max.max_discount_percentage, dec!(25));

        let underwater =
            calculate_max_discount_for_margin(Money::from(100), Money::from(100), dec!(20))
                .unwrap();
        assert_eq!(underwater.max_discount_amount, Money::zero());
        assert_eq!(underwater.max_discount_percentage, Decimal::ZERO);
    }
}
