//! Status domains for orders, payments, subscriptions and deliveries.
//! Columns store the lowercase string form; transitions are validated here
//! before any status update is written.

use crate::app_error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "preparing" => Ok(OrderStatus::Preparing),
            "out_for_delivery" => Ok(OrderStatus::OutForDelivery),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(AppError::BadRequest(format!(
                "{raw} is not a valid order status"
            ))),
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Preparing)
                | (Confirmed, Cancelled)
                | (Preparing, OutForDelivery)
                | (OutForDelivery, Delivered)
        )
    }

    /// Customers may cancel an order until it leaves the warehouse.
    pub fn cancellable_by_customer(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(AppError::BadRequest(format!(
                "{raw} is not a valid payment status"
            ))),
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Failed) | (Paid, Refunded)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "active" => Ok(SubscriptionStatus::Active),
            "paused" => Ok(SubscriptionStatus::Paused),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            _ => Err(AppError::BadRequest(format!(
                "{raw} is not a valid subscription status"
            ))),
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, next),
            (Active, Paused) | (Active, Cancelled) | (Paused, Active) | (Paused, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Scheduled,
    OutForDelivery,
    Delivered,
    Failed,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Scheduled => "scheduled",
            DeliveryStatus::OutForDelivery => "out_for_delivery",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "scheduled" => Ok(DeliveryStatus::Scheduled),
            "out_for_delivery" => Ok(DeliveryStatus::OutForDelivery),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "failed" => Ok(DeliveryStatus::Failed),
            "cancelled" => Ok(DeliveryStatus::Cancelled),
            _ => Err(AppError::BadRequest(format!(
                "{raw} is not a valid delivery status"
            ))),
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, next),
            (Scheduled, OutForDelivery)
                | (Scheduled, Cancelled)
                | (OutForDelivery, Delivered)
                | (OutForDelivery, Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_statuses_follow_the_delivery_pipeline() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::OutForDelivery));
        assert!(OrderStatus::OutForDelivery.can_transition_to(OrderStatus::Delivered));

        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn customers_can_cancel_until_preparation_starts() {
        assert!(OrderStatus::Pending.cancellable_by_customer());
        assert!(OrderStatus::Confirmed.cancellable_by_customer());
        assert!(!OrderStatus::Preparing.cancellable_by_customer());
        assert!(!OrderStatus::OutForDelivery.cancellable_by_customer());
        assert!(!OrderStatus::Delivered.cancellable_by_customer());
    }

    #[test]
    fn payments_settle_once() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Paid));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(PaymentStatus::Paid.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Paid));
    }

    #[test]
    fn subscriptions_pause_and_resume() {
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Paused));
        assert!(SubscriptionStatus::Paused.can_transition_to(SubscriptionStatus::Active));
        assert!(SubscriptionStatus::Paused.can_transition_to(SubscriptionStatus::Cancelled));
        assert!(!SubscriptionStatus::Cancelled.can_transition_to(SubscriptionStatus::Active));
    }

    #[test]
    fn failed_deliveries_do_not_resurrect() {
        assert!(DeliveryStatus::Scheduled.can_transition_to(DeliveryStatus::OutForDelivery));
        assert!(DeliveryStatus::OutForDelivery.can_transition_to(DeliveryStatus::Failed));
        assert!(!DeliveryStatus::Failed.can_transition_to(DeliveryStatus::Delivered));
        assert!(!DeliveryStatus::Delivered.can_transition_to(DeliveryStatus::Scheduled));
    }

    #[test]
    fn statuses_round_trip_through_their_string_form() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::parse("shipped").is_err());
        assert!(PaymentStatus::parse("charged").is_err());
        assert!(DeliveryStatus::parse("on_the_way").is_err());
    }
}
