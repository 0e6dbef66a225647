use axum::extract::{Json, State};
use serde::Serialize;
use shared::coin_manager::CoinBank;
use shared::constants::coin_display;
use shared::error::CoinError;
use shared::reward_scheduler::{CountdownKind, RewardStatus};

use crate::error::Error;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CoinsResponse {
    pub coins: i32,
    pub label: String,
}

impl CoinsResponse {
    fn new(coins: i32) -> Self {
        Self {
            coins,
            label: coin_display(coins),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RewardsStatusResponse {
    pub coins: i32,
    pub claim_bonus: RewardStatus,
    pub extra_coin: RewardStatus,
}

pub async fn get_coins(State(state): State<AppState>) -> Json<CoinsResponse> {
    Json(CoinsResponse::new(state.balance()))
}

pub async fn spend_one_coin(State(state): State<AppState>) -> Result<Json<CoinsResponse>, Error> {
    let mut guard = state.lock_game();
    let game = &mut *guard;
    if !game.rewards.spend_one_coin(&mut game.coins) {
        return Err(CoinError::InsufficientFunds {
            requested: 1,
            available: game.coins.current_coins(),
        }
        .into());
    }
    Ok(Json(CoinsResponse::new(game.coins.current_coins())))
}

pub async fn get_extra_coin(State(state): State<AppState>) -> Result<Json<CoinsResponse>, Error> {
    let now = state.now();
    let balance = {
        let mut guard = state.lock_game();
        let game = &mut *guard;
        game.rewards.get_extra_coin(&mut game.coins, now)?
    };
    state.refresh_rewards();
    Ok(Json(CoinsResponse::new(balance)))
}

pub async fn claim_free_coin(State(state): State<AppState>) -> Result<Json<CoinsResponse>, Error> {
    let now = state.now();
    let balance = {
        let mut guard = state.lock_game();
        let game = &mut *guard;
        game.rewards.claim_free_coin(&mut game.coins, now)?
    };
    state.refresh_rewards();
    Ok(Json(CoinsResponse::new(balance)))
}

pub async fn get_rewards_status(State(state): State<AppState>) -> Json<RewardsStatusResponse> {
    let status = |kind| {
        let status = state.reward_status(kind);
        state.countdowns().publish(status.clone());
        status
    };
    let claim_bonus = status(CountdownKind::ClaimBonus);
    let extra_coin = status(CountdownKind::ExtraCoin);
    Json(RewardsStatusResponse {
        coins: state.balance(),
        claim_bonus,
        extra_coin,
    })
}
