use shared::reward_scheduler::{CountdownKind, RewardStatus};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::AppState;

/// Ticking countdowns for the time-gated rewards. Each kind has at most one
/// task; starting a kind again aborts the task already running for it.
pub struct CountdownService {
    tick: Duration,
    tasks: Mutex<HashMap<CountdownKind, JoinHandle<()>>>,
    claim_bonus: watch::Sender<Option<RewardStatus>>,
    extra_coin: watch::Sender<Option<RewardStatus>>,
}

impl CountdownService {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            tasks: Mutex::new(HashMap::new()),
            claim_bonus: watch::channel(None).0,
            extra_coin: watch::channel(None).0,
        }
    }

    fn channel(&self, kind: CountdownKind) -> &watch::Sender<Option<RewardStatus>> {
        match kind {
            CountdownKind::ClaimBonus => &self.claim_bonus,
            CountdownKind::ExtraCoin => &self.extra_coin,
        }
    }

    pub fn publish(&self, status: RewardStatus) {
        self.channel(status.kind).send_replace(Some(status));
    }

    #[cfg(test)]
    pub fn latest(&self, kind: CountdownKind) -> Option<RewardStatus> {
        self.channel(kind).borrow().clone()
    }

    pub fn start(&self, state: AppState, kind: CountdownKind) {
        let tick = self.tick;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                let status = state.reward_status(kind);
                let available = status.available;
                debug!("⏳ {:?}: {}", kind, status.label);
                state.countdowns().publish(status);
                if available {
                    info!("✅ {:?} is available", kind);
                    break;
                }
            }
        });

        let previous = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn is_running(&self, kind: CountdownKind) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn stop_all(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}
