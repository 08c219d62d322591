use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    Selectable,
    prelude::{Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Users

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i32,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub language_code: String,
    pub role: String,
    pub is_admin: bool,
    pub is_vip: bool,
    pub loyalty_points: i32,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub language_code: String,
}

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::user_preferences)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserPreferencesEntity {
    pub user_id: i32,
    pub notify_telegram: bool,
    pub notify_sms: bool,
    pub notify_email: bool,
    pub preferred_window: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::user_preferences)]
pub struct UpsertUserPreferencesEntity {
    pub user_id: i32,
    pub notify_telegram: bool,
    pub notify_sms: bool,
    pub notify_email: bool,
    pub preferred_window: Option<String>,
}

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::user_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserSessionEntity {
    pub id: i32,
    pub user_id: i32,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::user_sessions)]
pub struct CreateUserSessionEntity {
    pub user_id: i32,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

// Addresses

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AddressEntity {
    pub id: i32,
    pub user_id: i32,
    pub label: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_default: bool,
    pub delivery_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::addresses)]
pub struct CreateAddressEntity {
    pub user_id: i32,
    pub label: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_default: bool,
    pub delivery_instructions: Option<String>,
}

// Products

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub volume_liters: f64,
    pub price: f64,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub name: String,
    pub description: String,
    pub volume_liters: f64,
    pub price: f64,
    pub stock_quantity: i32,
}

// Orders

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub user_id: i32,
    pub order_number: String,
    pub status: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub discount_amount: f64,
    pub loyalty_points_used: i32,
    pub total_amount: f64,
    pub special_instructions: Option<String>,
    pub delivery_address_id: i32,
    pub subscription_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub user_id: i32,
    pub order_number: String,
    pub status: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub discount_amount: f64,
    pub loyalty_points_used: i32,
    pub total_amount: f64,
    pub special_instructions: Option<String>,
    pub delivery_address_id: i32,
    pub subscription_id: Option<i32>,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: f64,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
pub struct CreateOrderItemEntity {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: f64,
    pub total_price: f64,
}

// Payments

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentEntity {
    pub id: Uuid,
    pub order_id: i32,
    pub amount: f64,
    pub status: String,
    pub provider: String,
    pub provider_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::payments)]
pub struct CreatePaymentEntity {
    pub order_id: i32,
    pub amount: f64,
    pub provider: String,
    pub status: String,
}

// Subscriptions

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriptionEntity {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub address_id: i32,
    pub quantity: i32,
    pub frequency_days: i32,
    pub next_delivery_date: NaiveDate,
    pub status: String,
    pub total_deliveries: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::subscriptions)]
pub struct CreateSubscriptionEntity {
    pub user_id: i32,
    pub product_id: i32,
    pub address_id: i32,
    pub quantity: i32,
    pub frequency_days: i32,
    pub next_delivery_date: NaiveDate,
    pub status: String,
}

// Deliveries

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::deliveries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeliveryEntity {
    pub id: i32,
    pub order_id: i32,
    pub courier_id: Option<i32>,
    pub scheduled_date: NaiveDate,
    pub scheduled_window: String,
    pub zone: Option<String>,
    pub status: String,
    pub photo_file_id: Option<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::deliveries)]
pub struct CreateDeliveryEntity {
    pub order_id: i32,
    pub courier_id: Option<i32>,
    pub scheduled_date: NaiveDate,
    pub scheduled_window: String,
    pub zone: Option<String>,
    pub status: String,
}

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::delivery_slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeliverySlotEntity {
    pub id: i32,
    pub slot_date: NaiveDate,
    pub time_window: String,
    pub zone: String,
    pub capacity: i32,
    pub booked: i32,
}

// Notifications

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationEntity {
    pub id: i32,
    pub user_id: i32,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::notifications)]
pub struct CreateNotificationEntity {
    pub user_id: i32,
    pub kind: String,
    pub title: String,
    pub message: String,
}

// Analytics

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::order_analytics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderAnalyticsEntity {
    pub day: NaiveDate,
    pub orders_placed: i32,
    pub orders_delivered: i32,
    pub revenue: f64,
    pub updated_at: DateTime<Utc>,
}

// Company

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::company_info)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CompanyInfoEntity {
    pub id: i32,
    pub company_name: String,
    pub description: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub address: String,
    pub business_hours: String,
    pub delivery_areas: Vec<String>,
    pub warehouse_latitude: f64,
    pub warehouse_longitude: f64,
    pub updated_at: DateTime<Utc>,
}

// Outbox

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEntity {
    pub id: i32,
    pub event_type: String,
    pub payload: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
