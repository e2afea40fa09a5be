use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magnitude range of the multiplicative shock a news event applies to the close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShockRange {
    pub lo: f64,
    pub hi: f64,
}

impl ShockRange {
    pub const STANDARD: Self = Self { lo: 0.10, hi: 0.20 };
    pub const MODERATE: Self = Self { lo: 0.05, hi: 0.10 };

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::STANDARD),
            "moderate" => Some(Self::MODERATE),
            _ => None,
        }
    }
}

impl Default for ShockRange {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// What happens to `total_volume % count` when a tick's volume is split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    #[default]
    Drop,
    Distribute,
}

impl RemainderPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "drop" => Some(Self::Drop),
            "distribute" => Some(Self::Distribute),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub start_price: f64,
    pub initial_balance: f64,
    /// Annualized drift `r`.
    pub drift: f64,
    /// Annualized volatility `sigma`.
    pub volatility: f64,
    /// Year fraction covered by one tick.
    pub dt: f64,
    pub news_probability: f64,
    pub news_shock: ShockRange,
    /// Re-widen high/low after a news shock so the candle still encloses the close.
    pub strict_bounds: bool,
    pub remainder_policy: RemainderPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            initial_balance: 100_000.0,
            drift: 0.05,
            volatility: 0.5,
            dt: 1.0 / 252.0,
            news_probability: 2.0 / 60.0,
            news_shock: ShockRange::STANDARD,
            strict_bounds: false,
            remainder_policy: RemainderPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimConfigError {
    #[error("start price must be finite and positive")]
    InvalidStartPrice,
    #[error("initial balance must be finite and non-negative")]
    InvalidInitialBalance,
    #[error("drift must be finite")]
    InvalidDrift,
    #[error("volatility must be finite and non-negative")]
    InvalidVolatility,
    #[error("time step must be finite and positive")]
    InvalidTimeStep,
    #[error("news probability must be within [0, 1]")]
    InvalidNewsProbability,
    #[error("news shock range must satisfy 0 <= lo <= hi")]
    InvalidShockRange,
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimConfigError> {
        if !self.start_price.is_finite() || self.start_price <= 0.0 {
            return Err(SimConfigError::InvalidStartPrice);
        }
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err(SimConfigError::InvalidInitialBalance);
        }
        if !self.drift.is_finite() {
            return Err(SimConfigError::InvalidDrift);
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(SimConfigError::InvalidVolatility);
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimConfigError::InvalidTimeStep);
        }
        if !self.news_probability.is_finite() || !(0.0..=1.0).contains(&self.news_probability) {
            return Err(SimConfigError::InvalidNewsProbability);
        }
        let ShockRange { lo, hi } = self.news_shock;
        if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || lo > hi {
            return Err(SimConfigError::InvalidShockRange);
        }

        Ok(())
    }
}
