use std::time::Duration;

// Persistence keys
pub const COINS_KEY: &str = "PlayerCoins";
pub const LAST_CLAIM_TIMESTAMP_KEY: &str = "LastClaimTimestamp";
pub const EXTRA_COIN_ACTION_COUNT_KEY: &str = "ExtraCoinActionCount";
pub const EXTRA_COIN_WINDOW_START_KEY: &str = "ExtraCoinWindowStart";

pub const DEFAULT_STARTING_COINS: i32 = 5;
pub const DEFAULT_CLAIM_HOUR: u32 = 13; // UTC
pub const DEFAULT_MAX_FREE_COIN_COUNT: u32 = 5;
pub const MAX_FREE_COIN_COUNT_LIMIT: u32 = 10;

pub const CLAIM_BONUS_AMOUNT: i32 = 1;
pub const EXTRA_COIN_AMOUNT: i32 = 1;

pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

pub const CLAIM_FREE_COIN_LABEL: &str = "Claim Free Coin";
pub const NOT_CLAIMABLE_ERROR: &str = "Daily bonus is not available yet.";
pub const EXTRA_COIN_LIMIT_ERROR: &str = "No extra coins left for today.";
pub const INVALID_AMOUNT_ERROR: &str = "Coin amounts cannot be negative.";
pub const NOT_ENOUGH_COINS_ERROR: &str = "Not enough coins.";

pub fn coin_display(coins: i32) -> String {
    format!("Coins: {}", coins)
}

pub fn extra_coin_label(left: u32, max: u32) -> String {
    format!("Get Extra Coin {}/{}", left, max)
}

pub fn extra_coin_available_in(remaining: Duration) -> String {
    format!("Extra Coin Available in: {}", format_countdown(remaining))
}

pub fn daily_bonus_in(remaining: Duration) -> String {
    format!("Daily bonus in: {}", format_countdown(remaining))
}

/// Formats a wait as `hh:mm:ss`. Hours wrap at a day, the same way the
/// menu timer always has.
pub fn format_countdown(remaining: Duration) -> String {
    let seconds = remaining.as_secs();
    let hours = (seconds / 3600) % 24;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_countdown(Duration::from_secs(3 * 3600 + 4 * 60 + 5)), "03:04:05");
        assert_eq!(daily_bonus_in(Duration::from_secs(59)), "Daily bonus in: 00:00:59");
    }

    #[test]
    fn test_extra_coin_label() {
        assert_eq!(extra_coin_label(3, 5), "Get Extra Coin 3/5");
        assert_eq!(coin_display(12), "Coins: 12");
    }
}
