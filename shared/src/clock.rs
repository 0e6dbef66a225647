use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and by hosts that
/// replay a session.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Converts unix seconds (fractional) to a UTC date time. Values chrono
/// cannot represent fall back to the epoch.
pub fn timestamp_to_datetime(timestamp: f64) -> DateTime<Utc> {
    if !timestamp.is_finite() {
        return DateTime::<Utc>::default();
    }
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1_000_000_000.0) as u32;
    Utc.timestamp_opt(secs as i64, nanos.min(999_999_999))
        .single()
        .unwrap_or_default()
}

pub fn datetime_to_timestamp(date_time: DateTime<Utc>) -> f64 {
    date_time.timestamp() as f64 + f64::from(date_time.timestamp_subsec_nanos()) / 1_000_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversion() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 10, 12, 30, 15).unwrap();
        let ts = datetime_to_timestamp(dt);
        assert_eq!(ts, 1_710_073_815.0);
        assert_eq!(timestamp_to_datetime(ts), dt);
        assert_eq!(timestamp_to_datetime(0.0), DateTime::<Utc>::default());
        assert_eq!(timestamp_to_datetime(f64::NAN), DateTime::<Utc>::default());
    }

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(90));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
