use axum::body::Body;
use axum::http::{HeaderValue, Method, Response};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::clock::{Clock, SystemClock};
use shared::coin_manager::{CoinBank, CoinManager};
use shared::constants::coin_display;
use shared::persistence::{PersistenceError, PrefsCoinPersistence};
use shared::reward_scheduler::{CountdownKind, EconomySettings, RewardScheduler, RewardStatus};
use shared::shared_wheel_game::{WheelConfig, WheelGame};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::games::backend_wheel_game::create_router as create_wheel_game_router;
use crate::services::coin_service;
use crate::services::countdown_service::CountdownService;
use crate::store::JsonFileStore;

mod config;
mod error;
mod games;
mod logging;
mod services;
mod store;

pub type Coins = CoinManager<PrefsCoinPersistence<JsonFileStore>>;

/// The wheel screen the player is on. A new session starts the spin
/// counter over.
pub struct WheelSession {
    pub id: Uuid,
    pub game: WheelGame,
}

impl WheelSession {
    fn new(config: WheelConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            game: WheelGame::new(config),
        }
    }
}

pub struct GameState {
    pub coins: Coins,
    pub rewards: RewardScheduler,
    pub wheel: WheelSession,
    pub rng: StdRng,
}

#[derive(Clone)]
pub struct AppState {
    game: Arc<Mutex<GameState>>,
    clock: Arc<dyn Clock>,
    countdowns: Arc<CountdownService>,
    balance: watch::Receiver<i32>,
}

impl AppState {
    pub fn new(
        store: JsonFileStore,
        economy: EconomySettings,
        wheel: WheelConfig,
        clock: Arc<dyn Clock>,
        countdown_tick: Duration,
    ) -> Self {
        let mut coins = CoinManager::new(PrefsCoinPersistence::new(store));
        let (balance_tx, balance) = watch::channel(coins.current_coins());
        coins.on_coin_changed(Box::new(move |coins| {
            info!("💰 {}", coin_display(coins));
            balance_tx.send_replace(coins);
        }));

        let game = GameState {
            coins,
            rewards: RewardScheduler::new(economy),
            wheel: WheelSession::new(wheel),
            rng: StdRng::from_entropy(),
        };
        Self {
            game: Arc::new(Mutex::new(game)),
            clock,
            countdowns: Arc::new(CountdownService::new(countdown_tick)),
            balance,
        }
    }

    /// Locks the game state. A handler that panicked mid-update leaves the
    /// state as it was at the panic; every write is already persisted.
    pub fn lock_game(&self) -> MutexGuard<'_, GameState> {
        self.game.lock().unwrap_or_else(|poisoned| {
            error!("Game state lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn balance(&self) -> i32 {
        *self.balance.borrow()
    }

    pub fn countdowns(&self) -> &CountdownService {
        &self.countdowns
    }

    pub fn reward_status(&self, kind: CountdownKind) -> RewardStatus {
        let now = self.now();
        let mut guard = self.lock_game();
        let game = &mut *guard;
        game.rewards.status(kind, &mut game.coins, now)
    }

    /// Publishes both reward statuses and restarts the countdown of any
    /// reward that is not available.
    pub fn refresh_rewards(&self) {
        for kind in [CountdownKind::ClaimBonus, CountdownKind::ExtraCoin] {
            let status = self.reward_status(kind);
            let available = status.available;
            self.countdowns.publish(status);
            if !available {
                self.countdowns.start(self.clone(), kind);
            }
        }
    }

    pub fn initialize(&self) {
        let now = self.now();
        {
            let mut guard = self.lock_game();
            let game = &mut *guard;
            game.rewards.initialize(&mut game.coins, now);
            info!(
                "Economy ready: {}, daily bonus at {:02}:00 UTC",
                coin_display(game.coins.current_coins()),
                game.rewards.settings().claim_hour.get()
            );
        }
        self.refresh_rewards();
    }

    pub fn flush(&self) -> Result<(), PersistenceError> {
        self.lock_game().coins.flush()
    }
}

pub async fn health_check() -> impl IntoResponse {
    Response::builder()
        .status(200)
        .body(Body::from("OK"))
        .unwrap_or_default()
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(vec![
            HeaderValue::from_static("http://127.0.0.1:8080"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(vec![axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health_check", get(health_check))
        .route("/api/coins", get(coin_service::get_coins))
        .route("/api/coins/spend-one", post(coin_service::spend_one_coin))
        .route("/api/coins/extra", post(coin_service::get_extra_coin))
        .route("/api/coins/claim", post(coin_service::claim_free_coin))
        .route("/api/rewards/status", get(coin_service::get_rewards_status))
        .nest("/wheel", create_wheel_game_router())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}

/// Serves until `shutdown` resolves, then stops the countdowns and flushes
/// the store.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_app(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    state.countdowns().stop_all();
    state.flush()?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::from_path(".env").ok();
    logging::setup();

    let config = AppConfig::from_env()?;
    let store = JsonFileStore::open(&config.store_path)?;
    info!("Using player store at {}", store.path().display());

    let state = AppState::new(
        store,
        config.economy,
        config.wheel.clone(),
        Arc::new(SystemClock),
        config.countdown_tick,
    );
    state.initialize();

    info!("listening on {}", config.bind_addr);
    let listener = TcpListener::bind(config.bind_addr).await?;
    serve(listener, state, shutdown_signal()).await
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::http::{Request, StatusCode};
    use shared::constants::COINS_KEY;
    use shared::persistence::KeyValueStore;
    use tower::ServiceExt;

    async fn call(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (state, _) = state_at(june(10, 12));
        let app = create_app(state);
        let request = Request::builder().uri("/api/health_check").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_claim_flow_over_http() {
        let (state, clock) = state_at(june(10, 12));
        state.initialize();
        let app = create_app(state.clone());

        let (status, body) = call(&app, Method::GET, "/api/coins", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["coins"], 5);

        // First run records midnight, so the bonus opens at 13:00 today.
        let (status, body) = call(&app, Method::POST, "/api/coins/claim", None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["remaining_seconds"], 3600);

        clock.set(june(10, 14));
        let (status, body) = call(&app, Method::POST, "/api/coins/claim", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["coins"], 6);

        let (_, body) = call(&app, Method::GET, "/api/rewards/status", None).await;
        assert_eq!(body["claim_bonus"]["available"], false);
        assert_eq!(body["claim_bonus"]["remaining_seconds"], 23 * 3600);
        assert_eq!(body["extra_coin"]["label"], "Get Extra Coin 5/5");
        assert!(state.countdowns().is_running(CountdownKind::ClaimBonus));
        state.countdowns().stop_all();
    }

    #[tokio::test]
    async fn test_extra_coin_and_spend_over_http() {
        let (state, _) = state_at(june(10, 14));
        state.initialize();
        let app = create_app(state.clone());

        for expected in 6..=10 {
            let (status, body) = call(&app, Method::POST, "/api/coins/extra", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["coins"], expected);
        }
        let (status, body) = call(&app, Method::POST, "/api/coins/extra", None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "No extra coins left for today.");
        assert!(state.countdowns().is_running(CountdownKind::ExtraCoin));

        let (status, body) = call(&app, Method::POST, "/api/coins/spend-one", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["coins"], 9);
        assert_eq!(state.balance(), 9);
        state.countdowns().stop_all();
    }

    #[tokio::test]
    async fn test_rewards_status_follows_clock_across_window() {
        let (state, clock) = state_at(june(10, 14));
        state.initialize();
        let app = create_app(state.clone());

        call(&app, Method::POST, "/api/coins/extra", None).await;
        call(&app, Method::POST, "/api/coins/extra", None).await;
        let (_, body) = call(&app, Method::GET, "/api/rewards/status", None).await;
        assert_eq!(body["extra_coin"]["label"], "Get Extra Coin 3/5");

        clock.set(june(11, 15));
        let (_, body) = call(&app, Method::GET, "/api/rewards/status", None).await;
        assert_eq!(body["extra_coin"]["available"], true);
        assert_eq!(body["extra_coin"]["label"], "Get Extra Coin 5/5");
        assert_eq!(body["extra_coin"]["remaining_seconds"], 22 * 3600);
        assert_eq!(body["claim_bonus"]["available"], true);
        state.countdowns().stop_all();
    }

    #[tokio::test]
    async fn test_serve_flushes_on_shutdown() {
        let (state, _) = state_at(june(10, 12));
        state.initialize();
        let path = state.lock_game().coins.persistence().store().path().to_path_buf();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, state.clone(), async move {
            stop_rx.await.ok();
        }));
        assert!(state.countdowns().is_running(CountdownKind::ClaimBonus));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(!state.countdowns().is_running(CountdownKind::ClaimBonus));
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_int(COINS_KEY), Some(5));
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_spend_one_with_empty_balance_fails() {
        let (state, _) = state_at(june(10, 12));
        state.lock_game().coins.try_spend_coins(5).unwrap();
        let app = create_app(state);

        let (status, body) = call(&app, Method::POST, "/api/coins/spend-one", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Not enough coins.");
    }

    #[tokio::test]
    async fn test_balance_persists_across_restart() {
        let (state, _) = state_at(june(10, 14));
        state.initialize();
        state.lock_game().coins.earn_coins(7).unwrap();
        state.flush().unwrap();
        state.countdowns().stop_all();
        let path = state.lock_game().coins.persistence().store().path().to_path_buf();

        let reopened = AppState::new(
            JsonFileStore::open(&path).unwrap(),
            EconomySettings::default(),
            fast_wheel(),
            Arc::new(shared::clock::ManualClock::new(june(10, 15))),
            Duration::from_millis(10),
        );
        assert_eq!(reopened.balance(), 12);
        std::fs::remove_file(&path).unwrap();
    }
}
