use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::claim_schedule::start_of_day;
use crate::clock::datetime_to_timestamp;
use crate::constants::*;

#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    Format(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Storage I/O error: {}", e),
            Self::Format(e) => write!(f, "Storage format error: {}", e),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(_) => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// A single stored scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PrefValue {
    Int(i64),
    Float(f64),
}

/// Key-value scalar storage in the style of player preferences.
pub trait KeyValueStore {
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_float(&self, key: &str) -> Option<f64>;
    fn set_int(&mut self, key: &str, value: i64);
    fn set_float(&mut self, key: &str, value: f64);
    fn has_key(&self, key: &str) -> bool;
    fn save(&mut self) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, PrefValue>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, PrefValue>) -> Self {
        Self { entries, saves: 0 }
    }

    pub fn entries(&self) -> &BTreeMap<String, PrefValue> {
        &self.entries
    }

    /// Number of times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key)? {
            PrefValue::Int(v) => Some(*v),
            PrefValue::Float(v) => Some(*v as i64),
        }
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        match self.entries.get(key)? {
            PrefValue::Int(v) => Some(*v as f64),
            PrefValue::Float(v) => Some(*v),
        }
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), PrefValue::Int(value));
    }

    fn set_float(&mut self, key: &str, value: f64) {
        self.entries.insert(key.to_string(), PrefValue::Float(value));
    }

    fn has_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn save(&mut self) -> Result<(), PersistenceError> {
        self.saves += 1;
        Ok(())
    }
}

/// Loading and saving of the coin economy's persisted values.
pub trait CoinPersistence {
    fn load_coins(&self) -> i32;
    fn save_coins(&mut self, coins: i32);

    fn extra_coin_action_count(&self) -> u32;
    fn set_extra_coin_action_count(&mut self, count: u32);

    fn last_claim_timestamp(&self) -> f64;
    fn set_last_claim_timestamp(&mut self, timestamp: f64);

    /// Start of the claim window for which the extra coin counter was last
    /// reset, in unix seconds. `0.0` when no reset has happened yet.
    fn extra_coin_window_start(&self) -> f64;
    fn set_extra_coin_window_start(&mut self, timestamp: f64);

    /// Sets the last claim timestamp to the start of `now`'s day if it has
    /// never been stored.
    fn initialize_last_claim_timestamp(&mut self, now: DateTime<Utc>);

    fn flush(&mut self) -> Result<(), PersistenceError>;
}

/// `CoinPersistence` over any `KeyValueStore`. Every write is saved
/// immediately.
#[derive(Debug, Default)]
pub struct PrefsCoinPersistence<S> {
    store: S,
}

impl<S: KeyValueStore> PrefsCoinPersistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn save_or_log(&mut self, what: &str) {
        if let Err(e) = self.store.save() {
            log::error!("Failed to save {}: {}", what, e);
        }
    }
}

impl<S: KeyValueStore> CoinPersistence for PrefsCoinPersistence<S> {
    fn load_coins(&self) -> i32 {
        if !self.store.has_key(COINS_KEY) {
            return DEFAULT_STARTING_COINS;
        }
        let stored = self.store.get_int(COINS_KEY).unwrap_or(i64::from(DEFAULT_STARTING_COINS));
        if stored < 0 {
            log::warn!("Stored coin balance {} is negative, clamping to 0", stored);
        }
        stored.clamp(0, i64::from(i32::MAX)) as i32
    }

    fn save_coins(&mut self, coins: i32) {
        if coins < 0 {
            log::error!("Invalid coin value to save: {}", coins);
            return;
        }
        self.store.set_int(COINS_KEY, i64::from(coins));
        self.save_or_log("coins");
    }

    fn extra_coin_action_count(&self) -> u32 {
        self.store
            .get_int(EXTRA_COIN_ACTION_COUNT_KEY)
            .unwrap_or(0)
            .clamp(0, i64::from(u32::MAX)) as u32
    }

    fn set_extra_coin_action_count(&mut self, count: u32) {
        self.store.set_int(EXTRA_COIN_ACTION_COUNT_KEY, i64::from(count));
        self.save_or_log("extra coin action count");
    }

    fn last_claim_timestamp(&self) -> f64 {
        self.store.get_float(LAST_CLAIM_TIMESTAMP_KEY).unwrap_or(0.0)
    }

    fn set_last_claim_timestamp(&mut self, timestamp: f64) {
        self.store.set_float(LAST_CLAIM_TIMESTAMP_KEY, timestamp);
        self.save_or_log("last claim timestamp");
    }

    fn extra_coin_window_start(&self) -> f64 {
        self.store.get_float(EXTRA_COIN_WINDOW_START_KEY).unwrap_or(0.0)
    }

    fn set_extra_coin_window_start(&mut self, timestamp: f64) {
        self.store.set_float(EXTRA_COIN_WINDOW_START_KEY, timestamp);
        self.save_or_log("extra coin window");
    }

    fn initialize_last_claim_timestamp(&mut self, now: DateTime<Utc>) {
        if !self.store.has_key(LAST_CLAIM_TIMESTAMP_KEY) {
            let initial = datetime_to_timestamp(start_of_day(now));
            log::info!("Initializing last claim timestamp to {}", initial);
            self.set_last_claim_timestamp(initial);
        }
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        self.store.save()
    }
}
