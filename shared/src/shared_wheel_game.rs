use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::coin_manager::CoinBank;

pub const GREETINGS: &str = "Spin the wheel to win double amount of your bet!";
pub const CHOOSE_NUMBER: &str = "Choose the winning number!";
pub const SELECT_VALID_NUMBER: &str = "Please select a number to bet on!";
pub const ENTER_VALID_BET: &str = "Enter a valid bet amount!";
pub const NOT_ENOUGH_COINS: &str = "Not enough coins!";
pub const SPINNING: &str = "Spinning!";

pub const WHEEL_SEGMENTS: u32 = 8;
/// Offset of the first slice in the wheel artwork, in degrees.
pub const FIRST_SLICE_ANGLE: f32 = -22.0;
pub const SLICE_ANGLE: f32 = 360.0 / WHEEL_SEGMENTS as f32;

pub fn selected_number_message(number: i32) -> String {
    format!("You have selected {}!", number)
}

pub fn won_coins_message(coins: i32) -> String {
    format!("You won {} coins!", coins)
}

pub fn lose_coins_message(coins: i32) -> String {
    format!("You lose {} coins!", coins)
}

/// Tuning for the wheel: which spins are rigged to win, and how likely a
/// win is once the rigged spins are over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    /// Spin indices (1-based) that always win.
    pub win_spin_counts: Vec<u32>,
    /// After this many spins, wins are drawn with `win_probability`.
    pub max_spin_count: u32,
    pub win_probability: f64,
    pub min_number: i32,
    pub max_number: i32,
    /// Seconds of free spinning before the wheel eases onto the result.
    pub wheel_spin_rotation_duration: f32,
    /// Seconds spent easing onto the result.
    pub wheel_smooth_rotation_duration: f32,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            win_spin_counts: vec![2, 7, 8],
            max_spin_count: 10,
            win_probability: 0.05,
            min_number: 1,
            max_number: 8,
            wheel_spin_rotation_duration: 3.0,
            wheel_smooth_rotation_duration: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WheelConfigError {
    RangeTooSmall { min: i32, max: i32 },
    ProbabilityOutOfRange(f64),
    DurationOutOfRange { name: &'static str, value: f32 },
}

impl fmt::Display for WheelConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RangeTooSmall { min, max } => {
                write!(f, "Wheel range {}..={} must hold at least two numbers", min, max)
            }
            Self::ProbabilityOutOfRange(p) => write!(f, "Win probability {} is outside [0, 1]", p),
            Self::DurationOutOfRange { name, value } => write!(f, "{} of {}s is out of range", name, value),
        }
    }
}

impl std::error::Error for WheelConfigError {}

impl WheelConfig {
    pub fn validate(&self) -> Result<(), WheelConfigError> {
        // A losing draw needs some number other than the selected one.
        if i64::from(self.max_number) - i64::from(self.min_number) < 1 {
            return Err(WheelConfigError::RangeTooSmall {
                min: self.min_number,
                max: self.max_number,
            });
        }
        if !(0.0..=1.0).contains(&self.win_probability) {
            return Err(WheelConfigError::ProbabilityOutOfRange(self.win_probability));
        }
        if !(0.5..=10.0).contains(&self.wheel_spin_rotation_duration) {
            return Err(WheelConfigError::DurationOutOfRange {
                name: "wheel_spin_rotation_duration",
                value: self.wheel_spin_rotation_duration,
            });
        }
        if !(0.5..=3.0).contains(&self.wheel_smooth_rotation_duration) {
            return Err(WheelConfigError::DurationOutOfRange {
                name: "wheel_smooth_rotation_duration",
                value: self.wheel_smooth_rotation_duration,
            });
        }
        Ok(())
    }

    pub fn contains(&self, number: i32) -> bool {
        (self.min_number..=self.max_number).contains(&number)
    }

    /// How long a spin takes to play out before its result is paid.
    pub fn spin_duration(&self) -> Duration {
        Duration::from_secs_f32(self.wheel_spin_rotation_duration + self.wheel_smooth_rotation_duration)
    }
}

/// Reasons a spin is refused before any coins move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpinValidationError {
    NoSelection,
    InvalidBet,
    InsufficientFunds,
}

impl SpinValidationError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoSelection => SELECT_VALID_NUMBER,
            Self::InvalidBet => ENTER_VALID_BET,
            Self::InsufficientFunds => NOT_ENOUGH_COINS,
        }
    }
}

impl fmt::Display for SpinValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for SpinValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WheelError {
    Rejected(SpinValidationError),
    NumberOutOfRange { number: i32, min: i32, max: i32 },
    SpinInProgress,
    NoSpinInProgress,
}

impl fmt::Display for WheelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "{}", e),
            Self::NumberOutOfRange { number, min, max } => {
                write!(f, "Number {} is not on the wheel ({}..={})", number, min, max)
            }
            Self::SpinInProgress => write!(f, "The wheel is already spinning"),
            Self::NoSpinInProgress => write!(f, "The wheel is not spinning"),
        }
    }
}

impl std::error::Error for WheelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpinValidationError> for WheelError {
    fn from(err: SpinValidationError) -> Self {
        Self::Rejected(err)
    }
}

/// Checks a spin request, most relevant problem first. Returns the parsed
/// bet.
pub fn validate_spin(selected_number: i32, bet_input: &str, balance: i32) -> Result<i32, SpinValidationError> {
    if selected_number == 0 {
        return Err(SpinValidationError::NoSelection);
    }
    let bet = match bet_input.trim().parse::<i32>() {
        Ok(bet) if bet > 0 => bet,
        _ => return Err(SpinValidationError::InvalidBet),
    };
    if balance < bet {
        return Err(SpinValidationError::InsufficientFunds);
    }
    Ok(bet)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinResolution {
    pub is_win: bool,
    pub winning_number: i32,
}

/// Decides where the wheel stops for spin number `spin_count`.
pub fn resolve<R: Rng + ?Sized>(
    selected_number: i32,
    spin_count: u32,
    config: &WheelConfig,
    rng: &mut R,
) -> SpinResolution {
    let forced_win = config.win_spin_counts.contains(&spin_count);
    if forced_win || (spin_count > config.max_spin_count && rng.gen::<f64>() <= config.win_probability) {
        return SpinResolution {
            is_win: true,
            winning_number: selected_number,
        };
    }
    SpinResolution {
        is_win: false,
        winning_number: losing_number(selected_number, config, rng),
    }
}

/// Draws uniformly from the wheel until the number differs from the
/// selection. The range must hold at least two numbers.
pub fn losing_number<R: Rng + ?Sized>(selected_number: i32, config: &WheelConfig, rng: &mut R) -> i32 {
    loop {
        let number = rng.gen_range(config.min_number..=config.max_number);
        if number != selected_number {
            return number;
        }
    }
}

/// Rotation, in degrees, that puts `winning_number`'s slice under the
/// pointer.
pub fn target_angle(winning_number: i32) -> f32 {
    FIRST_SLICE_ANGLE + SLICE_ANGLE * (winning_number - 1) as f32
}

/// Interpolates forward (clockwise) from `from` towards `to`.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let difference = (to - from + 360.0).rem_euclid(360.0);
    from + difference * t
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpinPhase {
    Idle,
    Spinning,
}

/// A spin that has taken the bet and knows its result, waiting for the
/// wheel to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinTicket {
    pub spin_number: u32,
    pub selected_number: i32,
    pub winning_number: i32,
    pub bet: i32,
    pub is_win: bool,
}

impl SpinTicket {
    pub fn target_angle(&self) -> f32 {
        target_angle(self.winning_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub ticket: SpinTicket,
    pub payout: i32,
    pub new_balance: i32,
    pub message: String,
}

/// One wheel screen: the selected number, the running spin counter and the
/// spin in flight.
#[derive(Debug, Clone)]
pub struct WheelGame {
    config: WheelConfig,
    selected_number: i32,
    spin_count: u32,
    pending: Option<SpinTicket>,
}

impl WheelGame {
    pub fn new(config: WheelConfig) -> Self {
        Self {
            config,
            selected_number: 0,
            spin_count: 0,
            pending: None,
        }
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn selected_number(&self) -> i32 {
        self.selected_number
    }

    pub fn spin_count(&self) -> u32 {
        self.spin_count
    }

    pub fn phase(&self) -> SpinPhase {
        if self.pending.is_some() {
            SpinPhase::Spinning
        } else {
            SpinPhase::Idle
        }
    }

    /// Starts over: no selection, spin counter back to zero.
    pub fn reset(&mut self) {
        self.selected_number = 0;
        self.spin_count = 0;
        self.pending = None;
    }

    /// Selects the number to bet on. Zero clears the selection.
    pub fn select_number(&mut self, number: i32) -> Result<String, WheelError> {
        if self.pending.is_some() {
            return Err(WheelError::SpinInProgress);
        }
        if number != 0 && !self.config.contains(number) {
            return Err(WheelError::NumberOutOfRange {
                number,
                min: self.config.min_number,
                max: self.config.max_number,
            });
        }
        self.selected_number = number;
        if number == 0 {
            return Ok(CHOOSE_NUMBER.to_string());
        }
        Ok(selected_number_message(number))
    }

    /// Validates the bet, takes it from `bank` and decides the result.
    /// Winnings are only paid by `complete_spin`.
    pub fn start_spin<B, R>(&mut self, bet_input: &str, bank: &mut B, rng: &mut R) -> Result<SpinTicket, WheelError>
    where
        B: CoinBank + ?Sized,
        R: Rng + ?Sized,
    {
        if self.pending.is_some() {
            return Err(WheelError::SpinInProgress);
        }
        let bet = validate_spin(self.selected_number, bet_input, bank.current_coins())?;
        if !bank.spend_coins(bet) {
            return Err(SpinValidationError::InsufficientFunds.into());
        }

        self.spin_count += 1;
        let resolution = resolve(self.selected_number, self.spin_count, &self.config, rng);
        let ticket = SpinTicket {
            spin_number: self.spin_count,
            selected_number: self.selected_number,
            winning_number: resolution.winning_number,
            bet,
            is_win: resolution.is_win,
        };
        self.pending = Some(ticket);
        log::debug!(
            "Spin {} started: bet {} on {}, wheel stops on {}",
            ticket.spin_number,
            bet,
            ticket.selected_number,
            ticket.winning_number
        );
        Ok(ticket)
    }

    /// Settles the spin in flight, paying double the bet on a win.
    pub fn complete_spin<B>(&mut self, bank: &mut B) -> Result<SpinOutcome, WheelError>
    where
        B: CoinBank + ?Sized,
    {
        let ticket = self.pending.take().ok_or(WheelError::NoSpinInProgress)?;
        let (payout, message) = if ticket.is_win {
            let won = ticket.bet.saturating_mul(2);
            if let Err(e) = bank.earn_coins(won) {
                log::error!("Failed to pay out spin {}: {}", ticket.spin_number, e);
            }
            (won, won_coins_message(won))
        } else {
            (0, lose_coins_message(ticket.bet))
        };
        Ok(SpinOutcome {
            ticket,
            payout,
            new_balance: bank.current_coins(),
            message,
        })
    }
}

impl Default for WheelGame {
    fn default() -> Self {
        Self::new(WheelConfig::default())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewWheelSessionResponse {
    pub session_id: String,
    pub message: String,
    pub greetings: String,
    pub coins: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WheelSelectRequest {
    pub session_id: String,
    pub number: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WheelSelectResponse {
    pub message: String,
}

/// The bet arrives as typed by the player and is validated server side.
#[derive(Debug, Serialize, Deserialize)]
pub struct WheelSpinRequest {
    pub session_id: String,
    pub bet: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WheelSpinResponse {
    pub success: bool,
    pub is_win: bool,
    pub winning_number: Option<i32>,
    pub target_angle: Option<f32>,
    pub payout: i32,
    pub new_balance: i32,
    pub message: Option<String>,
}
