//! Loyalty accounting. Points are earned when an order is delivered and can
//! be redeemed at checkout in fixed blocks.

/// One point per 1 000 UZS of the delivered order total.
pub const EARN_DIVISOR: f64 = 1_000.0;

/// Points are redeemed in blocks of 100.
pub const REDEEM_BLOCK_POINTS: i32 = 100;

/// Each redeemed block is worth 1 000 UZS.
pub const REDEEM_BLOCK_VALUE: f64 = 1_000.0;

pub fn points_earned(total_amount: f64) -> i32 {
    if total_amount <= 0.0 {
        return 0;
    }
    (total_amount / EARN_DIVISOR).floor() as i32
}

/// Resolves a redemption request into `(points_spent, discount)`. The spend
/// is capped by the caller's balance and the discount never exceeds the
/// order subtotal.
pub fn redemption(requested_points: i32, balance: i32, subtotal: f64) -> (i32, f64) {
    let usable = requested_points.clamp(0, balance.max(0));
    let mut blocks = usable / REDEEM_BLOCK_POINTS;

    let max_blocks_by_subtotal = (subtotal.max(0.0) / REDEEM_BLOCK_VALUE).floor() as i32;
    blocks = blocks.min(max_blocks_by_subtotal);

    (
        blocks * REDEEM_BLOCK_POINTS,
        f64::from(blocks) * REDEEM_BLOCK_VALUE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earns_one_point_per_thousand() {
        assert_eq!(points_earned(0.0), 0);
        assert_eq!(points_earned(999.0), 0);
        assert_eq!(points_earned(1_000.0), 1);
        assert_eq!(points_earned(105_000.0), 105);
        assert_eq!(points_earned(-500.0), 0);
    }

    #[test]
    fn redeems_in_blocks_of_one_hundred() {
        assert_eq!(redemption(250, 1_000, 100_000.0), (200, 2_000.0));
        assert_eq!(redemption(99, 1_000, 100_000.0), (0, 0.0));
        assert_eq!(redemption(100, 1_000, 100_000.0), (100, 1_000.0));
    }

    #[test]
    fn redemption_is_capped_by_balance() {
        assert_eq!(redemption(500, 150, 100_000.0), (100, 1_000.0));
        assert_eq!(redemption(500, 0, 100_000.0), (0, 0.0));
    }

    #[test]
    fn redemption_never_exceeds_subtotal() {
        assert_eq!(redemption(1_000, 1_000, 2_500.0), (200, 2_000.0));
        assert_eq!(redemption(1_000, 1_000, 500.0), (0, 0.0));
    }

    #[test]
    fn hostile_inputs_redeem_nothing() {
        assert_eq!(redemption(-100, 1_000, 100_000.0), (0, 0.0));
        assert_eq!(redemption(100, -50, 100_000.0), (0, 0.0));
        assert_eq!(redemption(100, 100, -10.0), (0, 0.0));
    }
}
