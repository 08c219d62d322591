//! Delivery slot calendar: five two-hour windows per day, with a capacity
//! per date, window and zone.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

pub const DELIVERY_WINDOWS: [&str; 5] = [
    "09:00-11:00",
    "11:00-13:00",
    "13:00-15:00",
    "15:00-17:00",
    "17:00-19:00",
];

/// Deliveries bookable per date, window and zone.
pub const SLOT_CAPACITY: i32 = 20;

/// How many days ahead the slot calendar is maintained.
pub const SCHEDULING_HORIZON_DAYS: i64 = 7;

/// Orders placed before this hour (UTC) may be scheduled for the same day.
pub const SAME_DAY_CUTOFF_HOUR: u32 = 16;

pub fn is_valid_window(window: &str) -> bool {
    DELIVERY_WINDOWS.contains(&window)
}

/// Earliest date a delivery placed at `now` can be scheduled for.
pub fn earliest_delivery_date(now: DateTime<Utc>) -> NaiveDate {
    if now.hour() < SAME_DAY_CUTOFF_HOUR {
        now.date_naive()
    } else {
        now.date_naive() + Duration::days(1)
    }
}

/// The dates the slot calendar should cover as of `today`.
pub fn horizon_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (0..SCHEDULING_HORIZON_DAYS)
        .map(|offset| today + Duration::days(offset))
        .collect()
}

/// Picks the window a customer prefers if it is valid, otherwise the first
/// window of the day.
pub fn window_or_default(preferred: Option<&str>) -> &'static str {
    preferred
        .and_then(|window| DELIVERY_WINDOWS.iter().find(|known| **known == window))
        .copied()
        .unwrap_or(DELIVERY_WINDOWS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn the_day_has_five_windows() {
        assert_eq!(DELIVERY_WINDOWS.len(), 5);
        assert!(is_valid_window("09:00-11:00"));
        assert!(is_valid_window("17:00-19:00"));
        assert!(!is_valid_window("19:00-21:00"));
        assert!(!is_valid_window("9:00-11:00"));
    }

    #[test]
    fn morning_orders_can_ship_same_day() {
        let morning = Utc.with_ymd_and_hms(2025, 7, 14, 10, 30, 0).unwrap();
        assert_eq!(
            earliest_delivery_date(morning),
            NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()
        );

        let evening = Utc.with_ymd_and_hms(2025, 7, 14, 18, 0, 0).unwrap();
        assert_eq!(
            earliest_delivery_date(evening),
            NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
        );
    }

    #[test]
    fn horizon_spans_a_week_from_today() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let dates = horizon_dates(today);
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], today);
        assert_eq!(dates[6], NaiveDate::from_ymd_opt(2025, 7, 20).unwrap());
    }

    #[test]
    fn unknown_preferences_fall_back_to_the_first_window() {
        assert_eq!(window_or_default(Some("11:00-13:00")), "11:00-13:00");
        assert_eq!(window_or_default(Some("02:00-04:00")), "09:00-11:00");
        assert_eq!(window_or_default(None), "09:00-11:00");
    }
}
