use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::DEFAULT_CLAIM_HOUR;

/// Hour of the UTC day at which the daily claim window opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ClaimHour(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidClaimHour(pub u32);

impl fmt::Display for InvalidClaimHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Claim hour must be between 0 and 23, got {}", self.0)
    }
}

impl std::error::Error for InvalidClaimHour {}

impl ClaimHour {
    pub fn new(hour: u32) -> Result<Self, InvalidClaimHour> {
        if hour > 23 {
            return Err(InvalidClaimHour(hour));
        }
        Ok(Self(hour))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    fn offset(self) -> Duration {
        Duration::hours(i64::from(self.0))
    }
}

impl Default for ClaimHour {
    fn default() -> Self {
        Self(DEFAULT_CLAIM_HOUR)
    }
}

impl TryFrom<u32> for ClaimHour {
    type Error = InvalidClaimHour;

    fn try_from(hour: u32) -> Result<Self, Self::Error> {
        Self::new(hour)
    }
}

impl From<ClaimHour> for u32 {
    fn from(hour: ClaimHour) -> Self {
        hour.0
    }
}

/// Midnight UTC of the day containing `date_time`.
pub fn start_of_day(date_time: DateTime<Utc>) -> DateTime<Utc> {
    date_time
        - Duration::seconds(i64::from(date_time.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(date_time.nanosecond()))
}

/// When the bonus may next be claimed after a claim at `last_claim`.
///
/// A claim made before the claim hour unlocks again at the claim hour of the
/// same day; any later claim waits for the claim hour of the next day.
pub fn next_claim_time(last_claim: DateTime<Utc>, claim_hour: ClaimHour) -> DateTime<Utc> {
    let same_day_claim_time = start_of_day(last_claim) + claim_hour.offset();
    if last_claim < same_day_claim_time {
        same_day_claim_time
    } else {
        same_day_claim_time + Duration::days(1)
    }
}

pub fn is_claimable(now: DateTime<Utc>, next_claim_time: DateTime<Utc>) -> bool {
    now >= next_claim_time
}

/// Time left until `target`, zero once it has passed.
pub fn time_until(target: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (target - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

/// The latest claim-hour instant at or before `now`.
pub fn current_window_start(now: DateTime<Utc>, claim_hour: ClaimHour) -> DateTime<Utc> {
    let today = start_of_day(now) + claim_hour.offset();
    if now >= today {
        today
    } else {
        today - Duration::days(1)
    }
}

/// The first claim-hour instant strictly after `now`.
pub fn next_window_start(now: DateTime<Utc>, claim_hour: ClaimHour) -> DateTime<Utc> {
    current_window_start(now, claim_hour) + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
    }

    fn hour(h: u32) -> ClaimHour {
        ClaimHour::new(h).unwrap()
    }

    #[test]
    fn test_claim_hour_range() {
        assert!(ClaimHour::new(0).is_ok());
        assert!(ClaimHour::new(23).is_ok());
        assert_eq!(ClaimHour::new(24), Err(InvalidClaimHour(24)));
    }

    #[test]
    fn test_start_of_day() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 10, 14, 3, 59).unwrap() + Duration::milliseconds(250);
        assert_eq!(start_of_day(dt), at(10, 0, 0));
        assert_eq!(start_of_day(at(10, 0, 0)), at(10, 0, 0));
    }

    #[test]
    fn test_claim_before_claim_hour_unlocks_same_day() {
        assert_eq!(next_claim_time(at(10, 12, 0), hour(13)), at(10, 13, 0));
        assert_eq!(next_claim_time(at(10, 0, 0), hour(13)), at(10, 13, 0));
    }

    #[test]
    fn test_claim_after_claim_hour_unlocks_next_day() {
        assert_eq!(next_claim_time(at(10, 13, 0), hour(13)), at(11, 13, 0));
        assert_eq!(next_claim_time(at(10, 23, 59), hour(13)), at(11, 13, 0));
        assert_eq!(next_claim_time(at(10, 0, 0), hour(0)), at(11, 0, 0));
    }

    #[test]
    fn test_next_claim_time_is_idempotent() {
        let last = at(10, 15, 30);
        let first = next_claim_time(last, hour(13));
        for _ in 0..5 {
            assert_eq!(next_claim_time(last, hour(13)), first);
        }
    }

    #[test]
    fn test_is_claimable_at_boundary() {
        let next = at(11, 13, 0);
        assert!(!is_claimable(next - Duration::seconds(1), next));
        assert!(is_claimable(next, next));
        assert!(is_claimable(next + Duration::hours(30), next));
    }

    #[test]
    fn test_time_until_clamps_to_zero() {
        let next = at(11, 13, 0);
        assert_eq!(time_until(next, at(11, 12, 0)), std::time::Duration::from_secs(3600));
        assert_eq!(time_until(next, next), std::time::Duration::ZERO);
        assert_eq!(time_until(next, at(12, 0, 0)), std::time::Duration::ZERO);
    }

    #[test]
    fn test_window_starts() {
        assert_eq!(current_window_start(at(10, 12, 59), hour(13)), at(9, 13, 0));
        assert_eq!(current_window_start(at(10, 13, 0), hour(13)), at(10, 13, 0));
        assert_eq!(next_window_start(at(10, 12, 59), hour(13)), at(10, 13, 0));
        assert_eq!(next_window_start(at(10, 13, 0), hour(13)), at(11, 13, 0));
    }
}
