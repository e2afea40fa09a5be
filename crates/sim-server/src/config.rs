use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use core_sim::{RemainderPolicy, ShockRange, SimConfig, SimConfigError};
use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8050";
const DEFAULT_TICK_INTERVAL_MS: u64 = 2_000;

const ENV_ADDR: &str = "SIM_SERVER_ADDR";
const ENV_TICK_INTERVAL: &str = "SIM_TICK_INTERVAL_MS";
const ENV_SEED: &str = "SIM_SEED";
const ENV_START_PRICE: &str = "SIM_START_PRICE";
const ENV_INITIAL_BALANCE: &str = "SIM_INITIAL_BALANCE";
const ENV_NEWS_PRESET: &str = "SIM_NEWS_PRESET";
const ENV_STRICT_BOUNDS: &str = "SIM_STRICT_BOUNDS";
const ENV_VOLUME_REMAINDER: &str = "SIM_VOLUME_REMAINDER";
const ENV_START_PAUSED: &str = "SIM_START_PAUSED";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub tick_interval: Duration,
    pub seed: Option<u64>,
    pub start_paused: bool,
    pub simulation: SimConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
    },
    #[error("{key} contains non-unicode data")]
    NonUnicode { key: &'static str },
    #[error("simulation parameters rejected: {0}")]
    Simulation(#[from] SimConfigError),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = match read_env(ENV_ADDR)? {
            Some(value) => parse_value(ENV_ADDR, &value, "a valid socket address")?,
            None => parse_value(ENV_ADDR, DEFAULT_LISTEN_ADDR, "a valid socket address")?,
        };

        let tick_interval_ms = match read_env(ENV_TICK_INTERVAL)? {
            Some(value) => {
                let parsed: u64 =
                    parse_value(ENV_TICK_INTERVAL, &value, "a positive number of milliseconds")?;
                if parsed == 0 {
                    return Err(ConfigError::Invalid {
                        key: ENV_TICK_INTERVAL,
                        expected: "a positive number of milliseconds",
                    });
                }
                parsed
            }
            None => DEFAULT_TICK_INTERVAL_MS,
        };

        let seed = match read_env(ENV_SEED)? {
            Some(value) => Some(parse_value(ENV_SEED, &value, "an unsigned 64-bit integer")?),
            None => None,
        };

        let start_paused = match read_env(ENV_START_PAUSED)? {
            Some(value) => parse_bool(ENV_START_PAUSED, &value)?,
            None => false,
        };

        let mut simulation = SimConfig::default();
        if let Some(value) = read_env(ENV_START_PRICE)? {
            simulation.start_price = parse_value(ENV_START_PRICE, &value, "a positive number")?;
        }
        if let Some(value) = read_env(ENV_INITIAL_BALANCE)? {
            simulation.initial_balance =
                parse_value(ENV_INITIAL_BALANCE, &value, "a non-negative number")?;
        }
        if let Some(value) = read_env(ENV_NEWS_PRESET)? {
            simulation.news_shock =
                ShockRange::preset(value.as_str()).ok_or(ConfigError::Invalid {
                    key: ENV_NEWS_PRESET,
                    expected: "one of: standard, moderate",
                })?;
        }
        if let Some(value) = read_env(ENV_STRICT_BOUNDS)? {
            simulation.strict_bounds = parse_bool(ENV_STRICT_BOUNDS, &value)?;
        }
        if let Some(value) = read_env(ENV_VOLUME_REMAINDER)? {
            simulation.remainder_policy =
                RemainderPolicy::parse(value.as_str()).ok_or(ConfigError::Invalid {
                    key: ENV_VOLUME_REMAINDER,
                    expected: "one of: drop, distribute",
                })?;
        }
        simulation.validate()?;

        Ok(Self {
            listen_addr,
            tick_interval: Duration::from_millis(tick_interval_ms),
            seed,
            start_paused,
            simulation,
        })
    }
}

fn read_env(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicode { key }),
    }
}

fn parse_value<T: FromStr>(
    key: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, expected })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            expected: "true or false",
        }),
    }
}
