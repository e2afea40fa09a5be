use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::clock::{wall_clock_label, Clock, SystemClock};
use crate::config::{SimConfig, SimConfigError};
use crate::error::SimError;
use crate::generators::PricePathGenerator;
use crate::news::NewsInjector;
use crate::portfolio::{PositionId, PositionSide, ShareCount};
use crate::random::{RandomSource, SeededRandom};
use crate::state::{SimulationState, Snapshot};
use crate::transactions::TransactionSynthesizer;

/// A discrete user action against the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    OpenLong { shares: ShareCount },
    OpenShort { shares: ShareCount },
    Close { position_id: PositionId },
    CloseAt { index: usize },
}

/// A command the engine refused. The carried snapshot is the untouched state.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct CommandRejected {
    pub error: SimError,
    pub snapshot: Snapshot,
}

/// Owns the simulation state and performs every transition on it.
///
/// Each transition computes its full result before committing it, and commits
/// copy-on-write: snapshots handed out earlier keep describing the state they
/// were taken from.
pub struct SimulationEngine<R = SeededRandom, C = SystemClock> {
    config: SimConfig,
    prices: PricePathGenerator,
    news: NewsInjector,
    transactions: TransactionSynthesizer,
    rng: R,
    clock: C,
    state: Snapshot,
}

impl SimulationEngine {
    /// Engine on the system clock, seeded when `seed` is given.
    pub fn new(config: SimConfig, seed: Option<u64>) -> Result<Self, SimConfigError> {
        let rng = match seed {
            Some(seed) => SeededRandom::new(seed),
            None => SeededRandom::from_entropy(),
        };
        Self::with_parts(config, rng, SystemClock)
    }
}

impl<R: RandomSource, C: Clock> SimulationEngine<R, C> {
    pub fn with_parts(config: SimConfig, rng: R, clock: C) -> Result<Self, SimConfigError> {
        config.validate()?;

        Ok(Self {
            prices: PricePathGenerator::new(config.drift, config.volatility, config.dt),
            news: NewsInjector::new(config.news_probability, config.news_shock),
            transactions: TransactionSynthesizer::new(config.remainder_policy),
            state: Arc::new(SimulationState::new(
                config.start_price,
                config.initial_balance,
            )),
            config,
            rng,
            clock,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> Snapshot {
        Arc::clone(&self.state)
    }

    /// Advances the simulation by one step.
    ///
    /// Order of effects: GBM candle, transaction batch priced at the GBM close,
    /// optional news shock replacing the close, then revaluation of every open
    /// position at the final close.
    pub fn tick(&mut self) -> Snapshot {
        let tick = self.state.tick + 1;
        let stamp = wall_clock_label(self.clock.now());

        let mut point = self.prices.advance(self.state.last_close(), &mut self.rng);
        let batch = self
            .transactions
            .generate(point.close, tick, &stamp, &mut self.rng);
        let (close, news) = self
            .news
            .maybe_fire(point.close, tick, &stamp, &mut self.rng);

        if let Some(event) = &news {
            debug!(
                tick,
                headline = %event.headline,
                impact = ?event.impact,
                from = point.close,
                to = close,
                "news shock applied"
            );
            point.close = close;
            if self.config.strict_bounds {
                point.widen_to_close();
            }
        }

        let state = Arc::make_mut(&mut self.state);
        state.tick = tick;
        state.price_series.push(point);
        state.transactions.extend(batch);
        state.news.extend(news);
        state.portfolio.revalue(point.close);

        Arc::clone(&self.state)
    }

    /// Executes `command` at the latest close, then revalues the portfolio.
    pub fn apply_command(&mut self, command: Command) -> Result<Snapshot, CommandRejected> {
        let price = self.state.last_close();
        let mut portfolio = self.state.portfolio.clone();

        let outcome = match command {
            Command::OpenLong { shares } => portfolio
                .open(PositionSide::Long, shares, price)
                .map(|_| ()),
            Command::OpenShort { shares } => portfolio
                .open(PositionSide::Short, shares, price)
                .map(|_| ()),
            Command::Close { position_id } => portfolio.close(position_id).map(|_| ()),
            Command::CloseAt { index } => portfolio.close_at(index).map(|_| ()),
        };

        if let Err(error) = outcome {
            debug!(?command, %error, "command rejected");
            return Err(CommandRejected {
                error,
                snapshot: self.state(),
            });
        }

        portfolio.revalue(price);
        Arc::make_mut(&mut self.state).portfolio = portfolio;

        Ok(Arc::clone(&self.state))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::OffsetDateTime;

    use super::{Command, SimulationEngine};
    use crate::clock::FixedClock;
    use crate::config::SimConfig;
    use crate::error::SimError;
    use crate::portfolio::{PositionId, PositionSide, ShareCount};
    use crate::random::scripted::ScriptedRandom;
    use crate::state::PricePoint;

    type ScriptedEngine = SimulationEngine<ScriptedRandom, FixedClock>;

    fn scripted_engine(config: SimConfig) -> ScriptedEngine {
        SimulationEngine::with_parts(
            config,
            ScriptedRandom::quiet(),
            FixedClock(OffsetDateTime::UNIX_EPOCH),
        )
        .unwrap()
    }

    fn shares(count: u64) -> ShareCount {
        ShareCount::new(count).unwrap()
    }

    /// Queues draws so the next tick closes at `target` with no news.
    fn script_close(engine: &mut ScriptedEngine, target: f64) {
        let z = engine.prices.shock_for(engine.state.last_close(), target);
        engine.rng.push_normals(&[z, 0.0, 0.0]);
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
    }

    #[test]
    fn each_tick_appends_exactly_one_point() {
        let mut engine = scripted_engine(SimConfig::default());

        for expected_len in 2..50 {
            let snapshot = engine.tick();
            assert_eq!(snapshot.price_series.len(), expected_len);
            assert_eq!(snapshot.tick as usize, expected_len - 1);
        }
    }

    #[test]
    fn tick_stamps_transactions_with_tick_and_wall_clock() {
        let mut engine = scripted_engine(SimConfig::default());

        let snapshot = engine.tick();

        assert_eq!(snapshot.transactions.len(), 1);
        assert_eq!(snapshot.transactions[0].tick, 1);
        assert_eq!(snapshot.transactions[0].timestamp, "00:00:00");
        assert_eq!(snapshot.transactions[0].volume, 100);
    }

    #[test]
    fn long_scenario_through_engine() {
        let mut engine = scripted_engine(SimConfig::default());

        let opened = engine
            .apply_command(Command::OpenLong { shares: shares(100) })
            .unwrap();
        assert_eq!(opened.portfolio.balance, 90_000.0);
        assert_eq!(opened.portfolio.shares_held, 100);

        script_close(&mut engine, 105.0);
        let ticked = engine.tick();
        assert_close(ticked.portfolio.positions[0].profit_loss, 500.0);
        assert_close(ticked.portfolio.value, 100_500.0);

        let closed = engine
            .apply_command(Command::CloseAt { index: 0 })
            .unwrap();
        assert_close(closed.portfolio.balance, 100_500.0);
        assert!(closed.portfolio.positions.is_empty());
        assert_eq!(closed.portfolio.shares_held, 0);
    }

    #[test]
    fn short_scenario_through_engine() {
        let mut engine = scripted_engine(SimConfig::default());

        let opened = engine
            .apply_command(Command::OpenShort { shares: shares(50) })
            .unwrap();
        assert_eq!(opened.portfolio.balance, 105_000.0);

        script_close(&mut engine, 90.0);
        let ticked = engine.tick();
        assert_close(ticked.portfolio.positions[0].profit_loss, 500.0);
        assert_close(ticked.portfolio.value, 105_500.0);
    }

    #[test]
    fn unaffordable_long_is_rejected_with_unchanged_state() {
        let config = SimConfig {
            start_price: 200.0,
            ..SimConfig::default()
        };
        let mut engine = scripted_engine(config);
        let before = engine.state();

        let rejected = engine
            .apply_command(Command::OpenLong {
                shares: shares(1_000),
            })
            .unwrap_err();

        assert!(matches!(rejected.error, SimError::InsufficientFunds { .. }));
        assert!(Arc::ptr_eq(&rejected.snapshot, &before));
        assert_eq!(engine.state().portfolio.balance, 100_000.0);
        assert!(engine.state().portfolio.positions.is_empty());
    }

    #[test]
    fn stale_position_id_is_rejected() {
        let mut engine = scripted_engine(SimConfig::default());
        engine
            .apply_command(Command::OpenLong { shares: shares(10) })
            .unwrap();
        engine
            .apply_command(Command::Close {
                position_id: PositionId(1),
            })
            .unwrap();

        let rejected = engine
            .apply_command(Command::Close {
                position_id: PositionId(1),
            })
            .unwrap_err();

        assert_eq!(rejected.error, SimError::PositionNotFound(PositionId(1)));
    }

    #[test]
    fn commands_execute_at_latest_close_including_news() {
        let mut engine = scripted_engine(SimConfig::default());
        let held = engine
            .apply_command(Command::OpenLong { shares: shares(10) })
            .unwrap();
        assert_close(held.portfolio.positions[0].open_price, 100.0);

        script_close(&mut engine, 100.0);
        // news roll hits, positive headline, +15%
        engine.rng.push_uniforms(&[0.0, 0.5]);

        let ticked = engine.tick();
        assert_eq!(ticked.news.len(), 1);
        assert_close(ticked.last_close(), 115.0);
        assert!(!ticked.transactions.is_empty());
        for transaction in &ticked.transactions {
            assert_close(transaction.price, 100.0);
        }
        let marked = &ticked.portfolio.positions[0];
        assert_close(marked.current_price, 115.0);
        assert_close(marked.profit_loss, 150.0);

        let opened = engine
            .apply_command(Command::OpenLong { shares: shares(10) })
            .unwrap();
        let position = &opened.portfolio.positions[1];
        assert_close(position.open_price, 115.0);
        assert_eq!(position.side, PositionSide::Long);
    }

    #[test]
    fn news_shock_leaves_bounds_alone_unless_strict() {
        let mut lax = scripted_engine(SimConfig::default());
        script_close(&mut lax, 100.0);
        lax.rng.push_uniforms(&[0.0, 0.5]);
        let lax_point = *lax.tick().price_series.last().unwrap();

        let mut strict = scripted_engine(SimConfig {
            strict_bounds: true,
            ..SimConfig::default()
        });
        script_close(&mut strict, 100.0);
        strict.rng.push_uniforms(&[0.0, 0.5]);
        let strict_point = *strict.tick().price_series.last().unwrap();

        assert!(!lax_point.encloses_body());
        assert!(strict_point.encloses_body());
        assert_close(strict_point.high, 115.0);
    }

    #[test]
    fn earlier_snapshots_are_not_mutated_by_later_transitions() {
        let mut engine = scripted_engine(SimConfig::default());
        let before = engine.state();

        engine.tick();
        engine
            .apply_command(Command::OpenShort { shares: shares(5) })
            .unwrap();

        assert_eq!(before.price_series, vec![PricePoint::flat(100.0)]);
        assert!(before.portfolio.positions.is_empty());
        assert_eq!(engine.state().price_series.len(), 2);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SimConfig {
            volatility: -1.0,
            ..SimConfig::default()
        };

        assert!(SimulationEngine::new(config, Some(1)).is_err());
    }

    #[test]
    fn seeded_engines_produce_identical_paths() {
        let mut a = SimulationEngine::new(SimConfig::default(), Some(99)).unwrap();
        let mut b = SimulationEngine::new(SimConfig::default(), Some(99)).unwrap();

        for _ in 0..200 {
            a.tick();
            b.tick();
        }

        assert_eq!(a.state().price_series, b.state().price_series);
        assert_eq!(a.state().news, b.state().news);
    }

    #[test]
    fn command_json_uses_action_tag() {
        let command: Command =
            serde_json::from_str(r#"{"action":"open_long","shares":100}"#).unwrap();
        assert_eq!(command, Command::OpenLong { shares: shares(100) });

        let close: Command = serde_json::from_str(r#"{"action":"close","position_id":3}"#).unwrap();
        assert_eq!(
            close,
            Command::Close {
                position_id: PositionId(3)
            }
        );

        let fractional = r#"{"action":"open_short","shares":1.5}"#;
        assert!(serde_json::from_str::<Command>(fractional).is_err());
    }
}
