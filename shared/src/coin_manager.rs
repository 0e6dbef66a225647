use crate::error::CoinError;
use crate::persistence::{CoinPersistence, PersistenceError};

/// Called with the new balance whenever it changes.
pub type CoinListener = Box<dyn FnMut(i32) + Send>;

/// Anything that holds a coin balance games can bet against.
pub trait CoinBank {
    fn current_coins(&self) -> i32;

    /// Adds `amount` and returns the new balance.
    fn earn_coins(&mut self, amount: i32) -> Result<i32, CoinError>;

    /// Removes `amount` if the balance covers it. `false` leaves the balance
    /// untouched.
    fn spend_coins(&mut self, amount: i32) -> bool;
}

/// The player's coin balance, persisted on every change.
pub struct CoinManager<P> {
    persistence: P,
    current_coins: i32,
    listeners: Vec<CoinListener>,
}

impl<P: CoinPersistence> CoinManager<P> {
    pub fn new(persistence: P) -> Self {
        let current_coins = persistence.load_coins();
        Self {
            persistence,
            current_coins,
            listeners: Vec::new(),
        }
    }

    pub fn on_coin_changed(&mut self, listener: CoinListener) {
        self.listeners.push(listener);
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut P {
        &mut self.persistence
    }

    /// Spends coins, reporting why it failed.
    pub fn try_spend_coins(&mut self, amount: i32) -> Result<i32, CoinError> {
        if amount < 0 {
            log::warn!("Cannot spend negative coins: {}", amount);
            return Err(CoinError::InvalidAmount(amount));
        }
        if self.current_coins < amount {
            log::warn!("Not enough coins: requested {}, have {}", amount, self.current_coins);
            return Err(CoinError::InsufficientFunds {
                requested: amount,
                available: self.current_coins,
            });
        }
        self.set_current_coins(self.current_coins - amount);
        Ok(self.current_coins)
    }

    /// Writes the balance and flushes the store. Hosts call this when the
    /// app is backgrounded or shutting down.
    pub fn flush(&mut self) -> Result<(), PersistenceError> {
        self.persistence.save_coins(self.current_coins);
        self.persistence.flush()
    }

    fn set_current_coins(&mut self, value: i32) {
        if self.current_coins == value {
            return;
        }
        self.current_coins = value;
        self.persistence.save_coins(value);
        for listener in self.listeners.iter_mut() {
            listener(value);
        }
    }
}

impl<P: CoinPersistence> CoinBank for CoinManager<P> {
    fn current_coins(&self) -> i32 {
        self.current_coins
    }

    fn earn_coins(&mut self, amount: i32) -> Result<i32, CoinError> {
        if amount < 0 {
            log::warn!("Cannot earn negative coins: {}", amount);
            return Err(CoinError::InvalidAmount(amount));
        }
        self.set_current_coins(self.current_coins.saturating_add(amount));
        Ok(self.current_coins)
    }

    fn spend_coins(&mut self, amount: i32) -> bool {
        self.try_spend_coins(amount).is_ok()
    }
}
