use shared::constants::COUNTDOWN_TICK;
use shared::reward_scheduler::{EconomySettings, SettingsError};
use shared::shared_wheel_game::{WheelConfig, WheelConfigError};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_STORE_PATH: &str = "coin_prefs.json";
const DEFAULT_COUNTDOWN_TICK_MS: u64 = COUNTDOWN_TICK.as_millis() as u64;

#[derive(Debug)]
pub enum ConfigError {
    Invalid { var: &'static str, value: String },
    Settings(SettingsError),
    WheelFile { path: PathBuf, reason: String },
    Wheel(WheelConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { var, value } => write!(f, "Invalid value for {}: {:?}", var, value),
            Self::Settings(e) => write!(f, "Invalid economy settings: {}", e),
            Self::WheelFile { path, reason } => {
                write!(f, "Could not read wheel config {}: {}", path.display(), reason)
            }
            Self::Wheel(e) => write!(f, "Invalid wheel config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<SettingsError> for ConfigError {
    fn from(err: SettingsError) -> Self {
        Self::Settings(err)
    }
}

impl From<WheelConfigError> for ConfigError {
    fn from(err: WheelConfigError) -> Self {
        Self::Wheel(err)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store_path: PathBuf,
    pub economy: EconomySettings,
    pub countdown_tick: Duration,
    pub wheel: WheelConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr: SocketAddr = parse_var(&lookup, "COIN_BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let store_path = lookup("COIN_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

        let defaults = EconomySettings::default();
        let claim_hour = parse_var(&lookup, "CLAIM_HOUR", Some(defaults.claim_hour.get()))?;
        let max_free_coin_count = parse_var(&lookup, "MAX_FREE_COIN_COUNT", Some(defaults.max_free_coin_count))?;
        let economy = EconomySettings::new(claim_hour, max_free_coin_count)?;

        let tick_ms: u64 = parse_var(&lookup, "COUNTDOWN_TICK_MS", Some(DEFAULT_COUNTDOWN_TICK_MS))?;
        if tick_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "COUNTDOWN_TICK_MS",
                value: tick_ms.to_string(),
            });
        }

        let wheel = match lookup("WHEEL_CONFIG_PATH") {
            Some(path) => load_wheel_config(PathBuf::from(path))?,
            None => WheelConfig::default(),
        };
        wheel.validate()?;

        Ok(Self {
            bind_addr,
            store_path,
            economy,
            countdown_tick: Duration::from_millis(tick_ms),
            wheel,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => default.ok_or(ConfigError::Invalid {
            var,
            value: String::new(),
        }),
    }
}

fn load_wheel_config(path: PathBuf) -> Result<WheelConfig, ConfigError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::WheelFile {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::WheelFile {
        path,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.store_path, PathBuf::from("coin_prefs.json"));
        assert_eq!(config.economy.claim_hour.get(), 13);
        assert_eq!(config.economy.max_free_coin_count, 5);
        assert_eq!(config.countdown_tick, COUNTDOWN_TICK);
        assert_eq!(config.countdown_tick, Duration::from_secs(1));
        assert_eq!(config.wheel, WheelConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("COIN_BIND_ADDR", "0.0.0.0:8080"),
            ("CLAIM_HOUR", "0"),
            ("MAX_FREE_COIN_COUNT", "10"),
            ("COUNTDOWN_TICK_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.economy.claim_hour.get(), 0);
        assert_eq!(config.economy.max_free_coin_count, 10);
        assert_eq!(config.countdown_tick, Duration::from_millis(250));
    }

    #[test]
    fn test_out_of_range_settings_are_rejected() {
        assert!(matches!(config_from(&[("CLAIM_HOUR", "24")]), Err(ConfigError::Settings(_))));
        assert!(matches!(
            config_from(&[("MAX_FREE_COIN_COUNT", "11")]),
            Err(ConfigError::Settings(_))
        ));
        assert!(matches!(
            config_from(&[("CLAIM_HOUR", "noon")]),
            Err(ConfigError::Invalid { var: "CLAIM_HOUR", .. })
        ));
        assert!(matches!(
            config_from(&[("COUNTDOWN_TICK_MS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_wheel_config_file() {
        let path = crate::store::temp_store_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "win_spin_counts": [1], "win_probability": 0.5 }"#).unwrap();

        let config = config_from(&[("WHEEL_CONFIG_PATH", path.to_str().unwrap())]).unwrap();
        assert_eq!(config.wheel.win_spin_counts, vec![1]);
        assert_eq!(config.wheel.win_probability, 0.5);
        assert_eq!(config.wheel.max_number, 8);

        std::fs::write(&path, r#"{ "win_probability": 2.0 }"#).unwrap();
        let result = config_from(&[("WHEEL_CONFIG_PATH", path.to_str().unwrap())]);
        assert!(matches!(result, Err(ConfigError::Wheel(_))));
        std::fs::remove_file(&path).unwrap();
    }
}
