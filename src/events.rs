//! Domain events persisted through the outbox and handled by the consumers
//! registered at bootstrap.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug)]
pub struct OrderCreatedEvent {
    pub order_id: i32,
    pub user_id: i32,
    pub order_number: String,
    pub total_amount: f64,
    pub placed_on: NaiveDate,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OrderPaidEvent {
    pub order_id: i32,
    pub user_id: i32,
    pub payment_id: Uuid,
    pub order_number: String,
    pub amount: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeliveryScheduledEvent {
    pub delivery_id: i32,
    pub order_id: i32,
    pub user_id: i32,
    pub order_number: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_window: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OrderDeliveredEvent {
    pub order_id: i32,
    pub user_id: i32,
    pub order_number: String,
    pub total_amount: f64,
    pub delivered_on: NaiveDate,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OrderCancelledEvent {
    pub order_id: i32,
    pub user_id: i32,
    pub order_number: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeliveryReminderEvent {
    pub delivery_id: i32,
    pub order_id: i32,
    pub user_id: i32,
    pub order_number: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_window: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SubscriptionRenewedEvent {
    pub subscription_id: i32,
    pub user_id: i32,
    pub order_id: i32,
    pub order_number: String,
    pub placed_on: NaiveDate,
    pub next_delivery_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_payloads_round_trip() {
        let event = OrderCreatedEvent {
            order_id: 7,
            user_id: 3,
            order_number: "ORD-20250714-1A2B3C".into(),
            total_amount: 105_000.0,
            placed_on: NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
        };
        let raw = serde_json::to_string(&event).unwrap();
        assert!(raw.contains("\"order_number\":\"ORD-20250714-1A2B3C\""));
        let parsed: OrderCreatedEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.order_id, 7);
        assert_eq!(parsed.placed_on, event.placed_on);
    }
}
