use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::claim_schedule::{
    current_window_start, is_claimable, next_claim_time, next_window_start, time_until, ClaimHour,
    InvalidClaimHour,
};
use crate::clock::{datetime_to_timestamp, timestamp_to_datetime};
use crate::coin_manager::{CoinBank, CoinManager};
use crate::constants::*;
use crate::error::RewardError;
use crate::persistence::CoinPersistence;
use crate::rate_limit::{validate_max_free_coin_count, InvalidRateLimit, RateLimitCheck};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    ClaimHour(InvalidClaimHour),
    MaxFreeCoinCount(InvalidRateLimit),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClaimHour(e) => write!(f, "{}", e),
            Self::MaxFreeCoinCount(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<InvalidClaimHour> for SettingsError {
    fn from(err: InvalidClaimHour) -> Self {
        Self::ClaimHour(err)
    }
}

impl From<InvalidRateLimit> for SettingsError {
    fn from(err: InvalidRateLimit) -> Self {
        Self::MaxFreeCoinCount(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomySettings {
    pub claim_hour: ClaimHour,
    pub max_free_coin_count: u32,
}

impl EconomySettings {
    pub fn new(claim_hour: u32, max_free_coin_count: u32) -> Result<Self, SettingsError> {
        Ok(Self {
            claim_hour: ClaimHour::new(claim_hour)?,
            max_free_coin_count: validate_max_free_coin_count(max_free_coin_count)?,
        })
    }
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            claim_hour: ClaimHour::default(),
            max_free_coin_count: DEFAULT_MAX_FREE_COIN_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownKind {
    ClaimBonus,
    ExtraCoin,
}

/// What the menu shows for one reward: whether it can be taken now, and
/// otherwise how long until it can.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardStatus {
    pub kind: CountdownKind,
    pub available: bool,
    pub remaining_seconds: u64,
    pub label: String,
}

/// Time-gated rewards: the daily bonus and the capped extra coin action.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardScheduler {
    settings: EconomySettings,
}

impl RewardScheduler {
    pub fn new(settings: EconomySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> EconomySettings {
        self.settings
    }

    /// First-run setup: the bonus clock starts at today's midnight.
    pub fn initialize<P: CoinPersistence>(&self, coins: &mut CoinManager<P>, now: DateTime<Utc>) {
        coins.persistence_mut().initialize_last_claim_timestamp(now);
    }

    pub fn next_claim_time<P: CoinPersistence>(&self, coins: &CoinManager<P>) -> DateTime<Utc> {
        let last_claim = timestamp_to_datetime(coins.persistence().last_claim_timestamp());
        next_claim_time(last_claim, self.settings.claim_hour)
    }

    /// Whether the daily bonus can be claimed. Entering a new claim window
    /// also hands back the day's extra coins.
    pub fn can_claim_bonus<P: CoinPersistence>(&self, coins: &mut CoinManager<P>, now: DateTime<Utc>) -> bool {
        let claimable = is_claimable(now, self.next_claim_time(coins));
        if claimable {
            self.roll_claim_window(coins, now);
        }
        claimable
    }

    fn roll_claim_window<P: CoinPersistence>(&self, coins: &mut CoinManager<P>, now: DateTime<Utc>) {
        let window_start = datetime_to_timestamp(current_window_start(now, self.settings.claim_hour));
        let persistence = coins.persistence_mut();
        if persistence.extra_coin_window_start() < window_start {
            persistence.set_extra_coin_action_count(0);
            persistence.set_extra_coin_window_start(window_start);
            log::info!("Claim window rolled over, extra coin counter reset");
        }
    }

    pub fn time_until_next_claim<P: CoinPersistence>(&self, coins: &CoinManager<P>, now: DateTime<Utc>) -> Duration {
        time_until(self.next_claim_time(coins), now)
    }

    pub fn extra_coin_limit<P: CoinPersistence>(&self, coins: &CoinManager<P>) -> RateLimitCheck {
        RateLimitCheck::new(
            coins.persistence().extra_coin_action_count(),
            self.settings.max_free_coin_count,
        )
    }

    pub fn can_execute_extra_coin_action<P: CoinPersistence>(
        &self,
        coins: &mut CoinManager<P>,
        now: DateTime<Utc>,
    ) -> bool {
        self.can_claim_bonus(coins, now);
        !self.extra_coin_limit(coins).is_locked
    }

    /// Time until the extra coin counter is next handed back.
    pub fn time_until_next_free_coin(&self, now: DateTime<Utc>) -> Duration {
        time_until(next_window_start(now, self.settings.claim_hour), now)
    }

    /// Claims the daily bonus and returns the new balance.
    pub fn claim_free_coin<P: CoinPersistence>(
        &self,
        coins: &mut CoinManager<P>,
        now: DateTime<Utc>,
    ) -> Result<i32, RewardError> {
        if !self.can_claim_bonus(coins, now) {
            return Err(RewardError::NotClaimable {
                remaining: self.time_until_next_claim(coins, now),
            });
        }
        coins.persistence_mut().set_last_claim_timestamp(datetime_to_timestamp(now));
        let balance = coins
            .earn_coins(CLAIM_BONUS_AMOUNT)
            .unwrap_or_else(|_| coins.current_coins());
        log::info!("Daily bonus claimed, balance is now {}", balance);
        Ok(balance)
    }

    /// Takes one of the window's extra coins and returns the new balance.
    pub fn get_extra_coin<P: CoinPersistence>(
        &self,
        coins: &mut CoinManager<P>,
        now: DateTime<Utc>,
    ) -> Result<i32, RewardError> {
        if !self.can_execute_extra_coin_action(coins, now) {
            return Err(RewardError::ExtraCoinLimitReached {
                max: self.settings.max_free_coin_count,
                remaining: self.time_until_next_free_coin(now),
            });
        }
        let count = self.extra_coin_limit(coins).current_attempts + 1;
        coins.persistence_mut().set_extra_coin_action_count(count);
        let balance = coins
            .earn_coins(EXTRA_COIN_AMOUNT)
            .unwrap_or_else(|_| coins.current_coins());
        log::info!(
            "Extra coin taken ({}/{}), balance is now {}",
            count,
            self.settings.max_free_coin_count,
            balance
        );
        Ok(balance)
    }

    pub fn spend_one_coin<P: CoinPersistence>(&self, coins: &mut CoinManager<P>) -> bool {
        if coins.spend_coins(1) {
            log::info!("Successfully spent 1 coin.");
            return true;
        }
        false
    }

    pub fn bonus_status<P: CoinPersistence>(&self, coins: &mut CoinManager<P>, now: DateTime<Utc>) -> RewardStatus {
        let available = self.can_claim_bonus(coins, now);
        let remaining = self.time_until_next_claim(coins, now);
        RewardStatus {
            kind: CountdownKind::ClaimBonus,
            available,
            remaining_seconds: remaining.as_secs(),
            label: if available {
                CLAIM_FREE_COIN_LABEL.to_string()
            } else {
                daily_bonus_in(remaining)
            },
        }
    }

    pub fn extra_coin_status<P: CoinPersistence>(
        &self,
        coins: &mut CoinManager<P>,
        now: DateTime<Utc>,
    ) -> RewardStatus {
        let available = self.can_execute_extra_coin_action(coins, now);
        let remaining = self.time_until_next_free_coin(now);
        let limit = self.extra_coin_limit(coins);
        RewardStatus {
            kind: CountdownKind::ExtraCoin,
            available,
            remaining_seconds: remaining.as_secs(),
            label: if available {
                extra_coin_label(limit.remaining_attempts, limit.max_attempts)
            } else {
                extra_coin_available_in(remaining)
            },
        }
    }

    pub fn status<P: CoinPersistence>(
        &self,
        kind: CountdownKind,
        coins: &mut CoinManager<P>,
        now: DateTime<Utc>,
    ) -> RewardStatus {
        match kind {
            CountdownKind::ClaimBonus => self.bonus_status(coins, now),
            CountdownKind::ExtraCoin => self.extra_coin_status(coins, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, PrefsCoinPersistence};
    use chrono::TimeZone;

    type TestCoins = CoinManager<PrefsCoinPersistence<MemoryStore>>;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
    }

    fn setup(last_claim: DateTime<Utc>) -> (RewardScheduler, TestCoins) {
        let mut coins = CoinManager::new(PrefsCoinPersistence::new(MemoryStore::new()));
        coins
            .persistence_mut()
            .set_last_claim_timestamp(datetime_to_timestamp(last_claim));
        (RewardScheduler::new(EconomySettings::new(13, 5).unwrap()), coins)
    }

    #[test]
    fn test_settings_validation() {
        assert!(EconomySettings::new(13, 5).is_ok());
        assert!(matches!(EconomySettings::new(24, 5), Err(SettingsError::ClaimHour(_))));
        assert!(matches!(EconomySettings::new(13, 11), Err(SettingsError::MaxFreeCoinCount(_))));
        assert_eq!(EconomySettings::default(), EconomySettings::new(13, 5).unwrap());
    }

    #[test]
    fn test_yesterday_claim_is_claimable_and_resets_counter() {
        let (rewards, mut coins) = setup(at(9, 12, 0));
        coins.persistence_mut().set_extra_coin_action_count(5);

        assert!(rewards.can_claim_bonus(&mut coins, at(10, 14, 0)));
        assert_eq!(coins.persistence().extra_coin_action_count(), 0);
        assert_eq!(coins.current_coins(), 5);
    }

    #[test]
    fn test_not_claimable_before_claim_hour() {
        let (rewards, mut coins) = setup(at(10, 14, 0));
        coins.persistence_mut().set_extra_coin_action_count(2);

        let now = at(11, 12, 0);
        assert!(!rewards.can_claim_bonus(&mut coins, now));
        assert_eq!(coins.persistence().extra_coin_action_count(), 2);
        assert_eq!(rewards.time_until_next_claim(&coins, now), Duration::from_secs(3600));
    }

    #[test]
    fn test_counter_resets_once_per_window() {
        let (rewards, mut coins) = setup(at(9, 12, 0));
        let now = at(10, 14, 0);

        assert!(rewards.can_claim_bonus(&mut coins, now));
        coins.persistence_mut().set_extra_coin_action_count(3);

        // Same window, still claimable: no second reset.
        assert!(rewards.can_claim_bonus(&mut coins, now + chrono::Duration::hours(1)));
        assert!(rewards.can_execute_extra_coin_action(&mut coins, now + chrono::Duration::hours(2)));
        assert_eq!(coins.persistence().extra_coin_action_count(), 3);

        // Next day's window resets again.
        assert!(rewards.can_claim_bonus(&mut coins, at(11, 13, 0)));
        assert_eq!(coins.persistence().extra_coin_action_count(), 0);
    }

    #[test]
    fn test_window_reset_survives_reload() {
        let (rewards, mut coins) = setup(at(9, 12, 0));
        assert!(rewards.can_claim_bonus(&mut coins, at(10, 14, 0)));
        coins.persistence_mut().set_extra_coin_action_count(4);

        let store = coins.persistence().store().clone();
        let mut reloaded = CoinManager::new(PrefsCoinPersistence::new(store));
        assert!(rewards.can_claim_bonus(&mut reloaded, at(10, 15, 0)));
        assert_eq!(reloaded.persistence().extra_coin_action_count(), 4);
    }

    #[test]
    fn test_claim_free_coin_advances_timestamp_and_earns() {
        let (rewards, mut coins) = setup(at(9, 12, 0));
        let now = at(10, 14, 0);

        assert_eq!(rewards.claim_free_coin(&mut coins, now), Ok(6));
        assert_eq!(coins.persistence().last_claim_timestamp(), datetime_to_timestamp(now));
        assert_eq!(rewards.next_claim_time(&coins), at(11, 13, 0));

        let again = rewards.claim_free_coin(&mut coins, now + chrono::Duration::minutes(1));
        assert_eq!(
            again,
            Err(RewardError::NotClaimable {
                remaining: Duration::from_secs(23 * 3600 - 60)
            })
        );
        assert_eq!(coins.current_coins(), 6);
        assert_eq!(coins.persistence().last_claim_timestamp(), datetime_to_timestamp(now));
    }

    #[test]
    fn test_extra_coin_is_capped_per_window() {
        let (rewards, mut coins) = setup(at(10, 14, 0));
        let now = at(10, 15, 0);

        for expected in 6..=10 {
            assert_eq!(rewards.get_extra_coin(&mut coins, now), Ok(expected));
        }
        assert_eq!(coins.persistence().extra_coin_action_count(), 5);
        assert!(!rewards.can_execute_extra_coin_action(&mut coins, now));
        assert_eq!(
            rewards.get_extra_coin(&mut coins, now),
            Err(RewardError::ExtraCoinLimitReached {
                max: 5,
                remaining: Duration::from_secs(22 * 3600)
            })
        );
        assert_eq!(coins.current_coins(), 10);

        // The bonus unlocks at the next claim hour and brings the coins back.
        assert!(rewards.can_execute_extra_coin_action(&mut coins, at(11, 13, 0)));
    }

    #[test]
    fn test_spend_one_coin() {
        let (rewards, mut coins) = setup(at(10, 14, 0));
        for _ in 0..5 {
            assert!(rewards.spend_one_coin(&mut coins));
        }
        assert!(!rewards.spend_one_coin(&mut coins));
        assert_eq!(coins.current_coins(), 0);
    }

    #[test]
    fn test_status_labels() {
        let (rewards, mut coins) = setup(at(10, 14, 0));
        let now = at(11, 10, 30);

        let bonus = rewards.bonus_status(&mut coins, now);
        assert!(!bonus.available);
        assert_eq!(bonus.remaining_seconds, 9000);
        assert_eq!(bonus.label, "Daily bonus in: 02:30:00");

        let extra = rewards.extra_coin_status(&mut coins, now);
        assert!(extra.available);
        assert_eq!(extra.label, "Get Extra Coin 5/5");

        let bonus = rewards.status(CountdownKind::ClaimBonus, &mut coins, at(11, 13, 0));
        assert!(bonus.available);
        assert_eq!(bonus.remaining_seconds, 0);
        assert_eq!(bonus.label, "Claim Free Coin");
    }

    #[test]
    fn test_initialize_uses_start_of_today() {
        let mut coins = CoinManager::new(PrefsCoinPersistence::new(MemoryStore::new()));
        let rewards = RewardScheduler::default();
        rewards.initialize(&mut coins, at(10, 9, 0));
        assert_eq!(rewards.next_claim_time(&coins), at(10, 13, 0));
        assert!(!rewards.can_claim_bonus(&mut coins, at(10, 9, 0)));
        assert!(rewards.can_claim_bonus(&mut coins, at(10, 13, 0)));
    }
}
