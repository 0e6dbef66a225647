pub mod constants;
pub mod clock;
pub mod error;
pub mod persistence;
pub mod coin_manager;
pub mod claim_schedule;
pub mod rate_limit;
pub mod reward_scheduler;
pub mod shared_wheel_game;
