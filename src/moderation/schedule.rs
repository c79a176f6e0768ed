//! Dispatch window computation
//!
//! Moderation decisions are not relayed as they are taken. They are batched
//! and picked up by the external dispatch job once a day at a fixed local
//! hour (18:00 by default). This module computes the next such instant.

use crate::config::DispatchConfig;
use crate::error::{ModerationError, ModerationResult};
use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Utc,
};

/// Zone in which the dispatch hour is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchZone {
    /// The server's local zone, DST included
    Local,
    /// A fixed offset from UTC
    Fixed(FixedOffset),
}

/// Daily dispatch window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchWindow {
    at: NaiveTime,
    zone: DispatchZone,
}

impl DispatchWindow {
    pub fn new(hour: u32, zone: DispatchZone) -> ModerationResult<Self> {
        let at = NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| {
            ModerationError::Config(format!("Dispatch hour must be between 0 and 23, got {}", hour))
        })?;
        Ok(Self { at, zone })
    }

    pub fn from_config(config: &DispatchConfig) -> ModerationResult<Self> {
        let zone = match config.utc_offset_seconds {
            Some(seconds) => DispatchZone::Fixed(FixedOffset::east_opt(seconds).ok_or_else(
                || ModerationError::Config(format!("Invalid UTC offset: {}s", seconds)),
            )?),
            None => DispatchZone::Local,
        };
        Self::new(config.hour, zone)
    }

    /// 18:00 at a fixed offset, handy for deterministic tests
    pub fn fixed(hour: u32, offset: FixedOffset) -> ModerationResult<Self> {
        Self::new(hour, DispatchZone::Fixed(offset))
    }

    pub fn zone(&self) -> DispatchZone {
        self.zone
    }

    /// Next dispatch instant strictly after `now`.
    ///
    /// Today's slot is used only while `now` is strictly before it; at the
    /// slot itself the decision goes to tomorrow's batch.
    pub fn next_dispatch_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.zone {
            DispatchZone::Local => next_in_zone(&Local, self.at, now),
            DispatchZone::Fixed(offset) => next_in_zone(&offset, self.at, now),
        }
    }

    /// `YYYY-MM-DD HH:MM` in the window's zone, for moderator messages
    pub fn display(&self, instant: DateTime<Utc>) -> String {
        const FORMAT: &str = "%Y-%m-%d %H:%M";
        match self.zone {
            DispatchZone::Local => instant.with_timezone(&Local).format(FORMAT).to_string(),
            DispatchZone::Fixed(offset) => instant.with_timezone(&offset).format(FORMAT).to_string(),
        }
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-01-15T18:00:00.000Z`
pub fn format_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn next_in_zone<Tz: TimeZone>(tz: &Tz, at: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.with_timezone(tz).date_naive();
    let today_at = resolve_local(tz, today.and_time(at));

    if now < today_at {
        today_at
    } else {
        let tomorrow = today + Duration::days(1);
        resolve_local(tz, tomorrow.and_time(at))
    }
}

/// Map a wall-clock time to an instant. Ambiguous times take the earliest
/// mapping; times inside a DST gap move forward to the first valid quarter hour.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.with_timezone(&Utc);
    }

    (1..=96)
        .find_map(|step| {
            tz.from_local_datetime(&(naive + Duration::minutes(15 * step)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, TimeZone};
    use proptest::prelude::*;

    fn utc_window() -> DispatchWindow {
        DispatchWindow::fixed(18, FixedOffset::east_opt(0).unwrap()).unwrap()
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_just_before_boundary_is_same_day() {
        let next = utc_window().next_dispatch_at(at("2024-01-15T17:59:59.999Z"));
        assert_eq!(format_iso(next), "2024-01-15T18:00:00.000Z");
    }

    #[test]
    fn test_exact_boundary_is_next_day() {
        let next = utc_window().next_dispatch_at(at("2024-01-15T18:00:00.000Z"));
        assert_eq!(format_iso(next), "2024-01-16T18:00:00.000Z");
    }

    #[test]
    fn test_evening_is_next_day() {
        let next = utc_window().next_dispatch_at(at("2024-01-15T23:00:00.000Z"));
        assert_eq!(format_iso(next), "2024-01-16T18:00:00.000Z");
    }

    #[test]
    fn test_early_morning() {
        let next = utc_window().next_dispatch_at(at("2024-01-15T00:00:00.000Z"));
        assert_eq!(format_iso(next), "2024-01-15T18:00:00.000Z");
    }

    #[test]
    fn test_month_and_year_rollover() {
        let next = utc_window().next_dispatch_at(at("2024-12-31T19:30:00Z"));
        assert_eq!(format_iso(next), "2025-01-01T18:00:00.000Z");

        let next = utc_window().next_dispatch_at(at("2024-02-28T18:00:01Z"));
        assert_eq!(format_iso(next), "2024-02-29T18:00:00.000Z");
    }

    #[test]
    fn test_fixed_offset_uses_local_calendar() {
        // 17:30 UTC is 18:30 in Paris winter time, so today's slot is gone
        let paris = DispatchWindow::fixed(18, FixedOffset::east_opt(3600).unwrap()).unwrap();
        let next = paris.next_dispatch_at(at("2024-01-15T17:30:00Z"));
        assert_eq!(format_iso(next), "2024-01-16T17:00:00.000Z");
        assert_eq!(paris.display(next), "2024-01-16 18:00");

        // 23:30 UTC on the 14th is already the 15th locally
        let next = paris.next_dispatch_at(at("2024-01-14T23:30:00Z"));
        assert_eq!(format_iso(next), "2024-01-15T17:00:00.000Z");
    }

    #[test]
    fn test_invalid_hour_rejected() {
        assert!(DispatchWindow::new(24, DispatchZone::Local).is_err());
        assert!(DispatchWindow::new(0, DispatchZone::Local).is_ok());
    }

    #[test]
    fn test_from_config() {
        let window = DispatchWindow::from_config(&DispatchConfig {
            hour: 18,
            utc_offset_seconds: Some(7200),
        })
        .unwrap();
        assert_eq!(
            window.zone(),
            DispatchZone::Fixed(FixedOffset::east_opt(7200).unwrap())
        );

        let local = DispatchWindow::from_config(&DispatchConfig::default()).unwrap();
        assert_eq!(local.zone(), DispatchZone::Local);
    }

    #[test]
    fn test_local_zone_lands_on_hour() {
        let window = DispatchWindow::new(18, DispatchZone::Local).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let next = window.next_dispatch_at(now).with_timezone(&Local);
        assert_eq!(next.hour(), 18);
        assert_eq!(next.minute(), 0);
        assert!(next.with_timezone(&Utc) > now);
    }

    proptest! {
        #[test]
        fn prop_next_dispatch_is_next_boundary(
            secs in 946_684_800i64..4_102_444_800i64,
            millis in 0u32..1000,
            offset_minutes in -720i32..=840,
        ) {
            let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
            let window = DispatchWindow::fixed(18, offset).unwrap();
            let now = Utc.timestamp_opt(secs, millis * 1_000_000).unwrap();

            let next = window.next_dispatch_at(now);
            let local_next = next.with_timezone(&offset);
            let local_now = now.with_timezone(&offset);

            prop_assert!(next > now);
            prop_assert!(next - now <= Duration::hours(24));
            prop_assert_eq!(local_next.time(), NaiveTime::from_hms_opt(18, 0, 0).unwrap());

            let today_slot = local_now.date_naive().and_hms_opt(18, 0, 0).unwrap();
            if local_now.naive_local() < today_slot {
                prop_assert_eq!(local_next.date_naive(), local_now.date_naive());
            } else {
                prop_assert_eq!(local_next.date_naive(), local_now.date_naive() + Duration::days(1));
            }
        }

        #[test]
        fn prop_same_instant_same_schedule(secs in 946_684_800i64..4_102_444_800i64) {
            let window = utc_window();
            let now = Utc.timestamp_opt(secs, 0).unwrap();
            prop_assert_eq!(window.next_dispatch_at(now), window.next_dispatch_at(now));
        }
    }
}
