//! Price-path and portfolio simulation engine.
//!
//! [`SimulationEngine`] owns a single [`SimulationState`] and mutates it only
//! through two transitions: [`SimulationEngine::tick`] and
//! [`SimulationEngine::apply_command`].

pub mod clock;
mod config;
mod engine;
mod error;
mod generators;
mod news;
mod portfolio;
pub mod random;
mod state;
mod transactions;

pub use config::{RemainderPolicy, ShockRange, SimConfig, SimConfigError};
pub use engine::{Command, CommandRejected, SimulationEngine};
pub use error::SimError;
pub use generators::PricePathGenerator;
pub use news::{NewsEvent, NewsImpact, NewsInjector, NewsTemplate, NEWS_CATALOG};
pub use portfolio::{Portfolio, Position, PositionId, PositionSide, ShareCount};
pub use state::{PricePoint, SimulationState, Snapshot};
pub use transactions::{
    OrderType, TradeSide, Transaction, TransactionSynthesizer, Venue, TRANSACTION_ID_LEN,
};
