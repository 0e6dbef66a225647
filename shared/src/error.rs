use std::{fmt, time::Duration};

use crate::constants::{EXTRA_COIN_LIMIT_ERROR, INVALID_AMOUNT_ERROR, NOT_CLAIMABLE_ERROR, NOT_ENOUGH_COINS_ERROR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoinError {
    InvalidAmount(i32),
    InsufficientFunds { requested: i32, available: i32 },
}

impl CoinError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => INVALID_AMOUNT_ERROR,
            Self::InsufficientFunds { .. } => NOT_ENOUGH_COINS_ERROR,
        }
    }
}

impl fmt::Display for CoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAmount(amount) => write!(f, "Invalid coin amount: {}", amount),
            Self::InsufficientFunds { requested, available } => {
                write!(f, "Not enough coins: requested {}, available {}", requested, available)
            }
        }
    }
}

impl std::error::Error for CoinError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    NotClaimable { remaining: Duration },
    ExtraCoinLimitReached { max: u32, remaining: Duration },
}

impl RewardError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotClaimable { .. } => NOT_CLAIMABLE_ERROR,
            Self::ExtraCoinLimitReached { .. } => EXTRA_COIN_LIMIT_ERROR,
        }
    }

    pub fn remaining(&self) -> Duration {
        match self {
            Self::NotClaimable { remaining } | Self::ExtraCoinLimitReached { remaining, .. } => *remaining,
        }
    }
}

impl fmt::Display for RewardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotClaimable { remaining } => {
                write!(f, "Daily bonus not claimable for another {} seconds", remaining.as_secs())
            }
            Self::ExtraCoinLimitReached { max, remaining } => write!(
                f,
                "Extra coin limit of {} reached, resets in {} seconds",
                max,
                remaining.as_secs()
            ),
        }
    }
}

impl std::error::Error for RewardError {}
