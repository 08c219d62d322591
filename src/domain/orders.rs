//! Order numbering and checkout pricing.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::loyalty;

/// VIP customers get 20 % off the subtotal.
pub const VIP_DISCOUNT_RATE: f64 = 0.20;

/// Orders generated by subscription renewal get 15 % off. Does not stack
/// with the VIP discount; the larger one wins.
pub const SUBSCRIPTION_DISCOUNT_RATE: f64 = 0.15;

/// Human-facing order number: `ORD-YYYYMMDD-XXXXXX`.
pub fn generate_order_number(date: NaiveDate) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{}-{}",
        date.format("%Y%m%d"),
        uuid[..6].to_uppercase()
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricingBreakdown {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub discount_amount: f64,
    pub loyalty_points_used: i32,
    pub total_amount: f64,
}

/// Prices an order from its subtotal. Percentage discounts apply to the
/// subtotal only; the delivery fee is never discounted.
pub fn price_order(
    subtotal: f64,
    delivery_fee: f64,
    is_vip: bool,
    from_subscription: bool,
    requested_points: i32,
    points_balance: i32,
) -> PricingBreakdown {
    let rate = if is_vip {
        VIP_DISCOUNT_RATE
    } else if from_subscription {
        SUBSCRIPTION_DISCOUNT_RATE
    } else {
        0.0
    };
    let percent_discount = subtotal * rate;

    let (loyalty_points_used, loyalty_discount) =
        loyalty::redemption(requested_points, points_balance, subtotal);

    let discount_amount = percent_discount + loyalty_discount;
    let total_amount = (subtotal + delivery_fee - discount_amount).max(0.0);

    PricingBreakdown {
        subtotal,
        delivery_fee,
        discount_amount,
        loyalty_points_used,
        total_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_carry_the_date_and_a_hex_suffix() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let number = generate_order_number(date);
        assert!(number.starts_with("ORD-20250714-"), "got {number}");
        let suffix = number.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn order_numbers_are_effectively_unique() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let first = generate_order_number(date);
        let second = generate_order_number(date);
        assert_ne!(first, second);
    }

    #[test]
    fn plain_order_pays_full_price() {
        let pricing = price_order(100_000.0, 5_000.0, false, false, 0, 0);
        assert_eq!(pricing.discount_amount, 0.0);
        assert_eq!(pricing.total_amount, 105_000.0);
    }

    #[test]
    fn vip_discount_applies_to_subtotal_only() {
        let pricing = price_order(100_000.0, 5_000.0, true, false, 0, 0);
        assert_eq!(pricing.discount_amount, 20_000.0);
        assert_eq!(pricing.total_amount, 85_000.0);
    }

    #[test]
    fn subscription_discount_does_not_stack_with_vip() {
        let renewal = price_order(100_000.0, 0.0, false, true, 0, 0);
        assert_eq!(renewal.discount_amount, 15_000.0);

        let vip_renewal = price_order(100_000.0, 0.0, true, true, 0, 0);
        assert_eq!(vip_renewal.discount_amount, 20_000.0);
    }

    #[test]
    fn loyalty_redemption_joins_the_discount() {
        let pricing = price_order(100_000.0, 5_000.0, false, false, 250, 1_000);
        assert_eq!(pricing.loyalty_points_used, 200);
        assert_eq!(pricing.discount_amount, 2_000.0);
        assert_eq!(pricing.total_amount, 103_000.0);
    }

    #[test]
    fn total_never_goes_negative() {
        let pricing = price_order(1_000.0, 0.0, true, false, 100, 100);
        assert!(pricing.total_amount >= 0.0);
    }
}
