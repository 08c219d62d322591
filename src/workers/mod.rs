//! Background loops spawned at bootstrap: subscription renewals, delivery
//! reminders and the slot calendar.

pub mod reminders;
pub mod renewals;
pub mod slots;

use std::sync::Arc;

use crate::app_state::AppState;

pub fn spawn_all(state: Arc<AppState>) {
    tokio::spawn(slots::run(state.clone()));
    tokio::spawn(renewals::run(state.clone()));
    tokio::spawn(reminders::run(state));
}
