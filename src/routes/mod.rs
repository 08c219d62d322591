pub mod addresses;
pub mod analytics;
pub mod company;
pub mod deliveries;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod subscriptions;
pub mod users;
