use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use shared::coin_manager::CoinBank;
use shared::shared_wheel_game::*;
use tracing::info;
use uuid::Uuid;

use crate::error::Error;
use crate::{AppState, WheelSession};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/session", post(new_session))
        .route("/select", post(select_number))
        .route("/spin", post(spin_wheel))
}

fn check_session(session: &WheelSession, session_id: &str) -> Result<(), Error> {
    match Uuid::parse_str(session_id) {
        Ok(id) if id == session.id => Ok(()),
        _ => Err(Error::UnknownSession),
    }
}

async fn new_session(State(state): State<AppState>) -> Result<Json<NewWheelSessionResponse>, Error> {
    let mut game = state.lock_game();
    if game.wheel.game.phase() == SpinPhase::Spinning {
        return Err(WheelError::SpinInProgress.into());
    }
    game.wheel.game.reset();
    game.wheel.id = Uuid::new_v4();
    info!("🎡 New wheel session {}", game.wheel.id);

    Ok(Json(NewWheelSessionResponse {
        session_id: game.wheel.id.to_string(),
        message: CHOOSE_NUMBER.to_string(),
        greetings: GREETINGS.to_string(),
        coins: game.coins.current_coins(),
    }))
}

async fn select_number(
    State(state): State<AppState>,
    Json(request): Json<WheelSelectRequest>,
) -> Result<Json<WheelSelectResponse>, Error> {
    let mut game = state.lock_game();
    check_session(&game.wheel, &request.session_id)?;
    let message = game.wheel.game.select_number(request.number)?;
    Ok(Json(WheelSelectResponse { message }))
}

/// Takes the bet and picks the result straight away, then holds the
/// response for the length of the wheel animation before paying out.
async fn spin_wheel(
    State(state): State<AppState>,
    Json(request): Json<WheelSpinRequest>,
) -> Result<Json<WheelSpinResponse>, Error> {
    let (ticket, duration) = {
        let mut guard = state.lock_game();
        let game = &mut *guard;
        check_session(&game.wheel, &request.session_id)?;
        match game.wheel.game.start_spin(&request.bet, &mut game.coins, &mut game.rng) {
            Ok(ticket) => (ticket, game.wheel.game.config().spin_duration()),
            Err(WheelError::Rejected(rejection)) => {
                return Ok(Json(WheelSpinResponse {
                    success: false,
                    is_win: false,
                    winning_number: None,
                    target_angle: None,
                    payout: 0,
                    new_balance: game.coins.current_coins(),
                    message: Some(rejection.message().to_string()),
                }));
            }
            Err(e) => return Err(e.into()),
        }
    };
    info!(
        "🎡 {} Spin {}: bet {} on {}",
        SPINNING, ticket.spin_number, ticket.bet, ticket.selected_number
    );

    // Settled in its own task so a dropped request still pays out.
    let settle_state = state.clone();
    let outcome = tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        let mut guard = settle_state.lock_game();
        let game = &mut *guard;
        game.wheel.game.complete_spin(&mut game.coins)
    })
    .await
    .map_err(|e| Error::Internal(e.to_string()))??;

    if outcome.ticket.is_win {
        info!("🎡 WHEEL SPIN: landed on {}, won {} coins! 💰", outcome.ticket.winning_number, outcome.payout);
    } else {
        info!("🎡 WHEEL SPIN: landed on {}, lost {} coins", outcome.ticket.winning_number, outcome.ticket.bet);
    }

    Ok(Json(WheelSpinResponse {
        success: true,
        is_win: outcome.ticket.is_win,
        winning_number: Some(outcome.ticket.winning_number),
        target_angle: Some(outcome.ticket.target_angle()),
        payout: outcome.payout,
        new_balance: outcome.new_balance,
        message: Some(outcome.message),
    }))
}
