use serde::{Deserialize, Serialize};

use crate::constants::MAX_FREE_COIN_COUNT_LIMIT;

/// Snapshot of a per-window action counter against its cap.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitCheck {
    pub current_attempts: u32,
    pub max_attempts: u32,
    pub remaining_attempts: u32,
    pub is_locked: bool,
}

impl RateLimitCheck {
    pub fn new(attempts: u32, max_attempts: u32) -> Self {
        // A counter read back from storage may be stale or hand edited.
        let current_attempts = attempts.min(max_attempts);
        Self {
            current_attempts,
            max_attempts,
            remaining_attempts: max_attempts - current_attempts,
            is_locked: current_attempts >= max_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRateLimit(pub u32);

impl std::fmt::Display for InvalidRateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Max free coin count must be at most {}, got {}",
            MAX_FREE_COIN_COUNT_LIMIT, self.0
        )
    }
}

impl std::error::Error for InvalidRateLimit {}

pub fn validate_max_free_coin_count(max: u32) -> Result<u32, InvalidRateLimit> {
    if max > MAX_FREE_COIN_COUNT_LIMIT {
        return Err(InvalidRateLimit(max));
    }
    Ok(max)
}
