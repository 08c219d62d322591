//! Thin clients for outbound notification channels. Every channel is
//! optional: missing credentials disable it instead of failing requests.

pub mod email;
pub mod sms;
pub mod telegram;
