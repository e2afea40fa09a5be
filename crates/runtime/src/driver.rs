use std::time::Instant;

use core_sim::clock::Clock;
use core_sim::random::RandomSource;
use core_sim::{Command, CommandRejected, SimError, SimulationEngine, Snapshot};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::logging::{RunLogEvent, RunLogEventKind, RunLogWriter};
use crate::metrics::{LatencyPercentiles, TransitionLatencyMetrics};

const REQUEST_CAPACITY: usize = 64;
const UPDATE_CAPACITY: usize = 64;

/// What subscribers see after each driver-side change.
#[derive(Debug, Clone)]
pub enum SimUpdate {
    Snapshot(Snapshot),
    CommandRejected { error: SimError, snapshot: Snapshot },
    Paused,
    Resumed,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("simulation driver has stopped")]
    Stopped,
    #[error(transparent)]
    Rejected(#[from] CommandRejected),
}

enum SimRequest {
    Tick {
        reply: oneshot::Sender<Snapshot>,
    },
    Command {
        command: Command,
        reply: oneshot::Sender<Result<Snapshot, CommandRejected>>,
    },
    State {
        reply: oneshot::Sender<Snapshot>,
    },
    Latency {
        reply: oneshot::Sender<Option<LatencyPercentiles>>,
    },
    SetPaused {
        paused: bool,
        reply: oneshot::Sender<bool>,
    },
}

/// Cloneable front door to the driver task.
///
/// Every call becomes one message on a single queue, so ticks and commands
/// from any number of callers are applied strictly one after another.
#[derive(Debug, Clone)]
pub struct SimHandle {
    requests: mpsc::Sender<SimRequest>,
    updates: broadcast::Sender<SimUpdate>,
    paused: watch::Receiver<bool>,
}

impl SimHandle {
    pub async fn tick(&self) -> Result<Snapshot, DriverError> {
        self.request(|reply| SimRequest::Tick { reply }).await
    }

    pub async fn apply_command(&self, command: Command) -> Result<Snapshot, DriverError> {
        self.request(|reply| SimRequest::Command { command, reply })
            .await?
            .map_err(DriverError::from)
    }

    pub async fn state(&self) -> Result<Snapshot, DriverError> {
        self.request(|reply| SimRequest::State { reply }).await
    }

    pub async fn latency(&self) -> Result<Option<LatencyPercentiles>, DriverError> {
        self.request(|reply| SimRequest::Latency { reply }).await
    }

    /// Stops the periodic ticker. Returns whether the flag changed.
    pub async fn pause(&self) -> Result<bool, DriverError> {
        self.request(|reply| SimRequest::SetPaused {
            paused: true,
            reply,
        })
        .await
    }

    pub async fn resume(&self) -> Result<bool, DriverError> {
        self.request(|reply| SimRequest::SetPaused {
            paused: false,
            reply,
        })
        .await
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn paused_watch(&self) -> watch::Receiver<bool> {
        self.paused.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimUpdate> {
        self.updates.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SimRequest,
    ) -> Result<T, DriverError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .await
            .map_err(|_| DriverError::Stopped)?;
        response.await.map_err(|_| DriverError::Stopped)
    }
}

struct SimDriver<R, C> {
    engine: SimulationEngine<R, C>,
    log: Box<dyn RunLogWriter>,
    latency: TransitionLatencyMetrics,
    updates: broadcast::Sender<SimUpdate>,
    paused: watch::Sender<bool>,
}

/// Moves `engine` into its own task and returns the handle that drives it.
///
/// The task ends once every [`SimHandle`] has been dropped.
pub fn spawn_driver<R, C>(
    engine: SimulationEngine<R, C>,
    log: Box<dyn RunLogWriter>,
    start_paused: bool,
) -> (SimHandle, JoinHandle<()>)
where
    R: RandomSource + Send + 'static,
    C: Clock + Send + 'static,
{
    let (requests_tx, requests_rx) = mpsc::channel(REQUEST_CAPACITY);
    let (updates_tx, _) = broadcast::channel(UPDATE_CAPACITY);
    let (paused_tx, paused_rx) = watch::channel(start_paused);

    let driver = SimDriver {
        engine,
        log,
        latency: TransitionLatencyMetrics::new(),
        updates: updates_tx.clone(),
        paused: paused_tx,
    };
    let task = tokio::spawn(driver.run(requests_rx));

    let handle = SimHandle {
        requests: requests_tx,
        updates: updates_tx,
        paused: paused_rx,
    };
    (handle, task)
}

impl<R: RandomSource, C: Clock> SimDriver<R, C> {
    async fn run(mut self, mut requests: mpsc::Receiver<SimRequest>) {
        info!(paused = *self.paused.borrow(), "simulation driver started");
        while let Some(request) = requests.recv().await {
            match request {
                SimRequest::Tick { reply } => {
                    let _ = reply.send(self.tick());
                }
                SimRequest::Command { command, reply } => {
                    let _ = reply.send(self.apply_command(command));
                }
                SimRequest::State { reply } => {
                    let _ = reply.send(self.engine.state());
                }
                SimRequest::Latency { reply } => {
                    let _ = reply.send(self.latency.percentiles());
                }
                SimRequest::SetPaused { paused, reply } => {
                    let _ = reply.send(self.set_paused(paused));
                }
            }
        }
        info!("simulation driver stopped");
    }

    fn tick(&mut self) -> Snapshot {
        // Read through a temporary so no extra reference to the state is alive
        // while the engine commits.
        let transactions_before = self.engine.state().transactions.len();

        let started = Instant::now();
        let snapshot = self.engine.tick();
        let latency_micros = self.latency.record(started.elapsed());

        let close = snapshot.last_close();
        let minted = snapshot.transactions.len() - transactions_before;
        self.log.write(
            RunLogEvent::new(snapshot.tick, RunLogEventKind::TickApplied)
                .with_detail(format!("close={close:.4} transactions={minted}"))
                .with_latency_micros(latency_micros),
        );
        if let Some(news) = snapshot
            .news
            .last()
            .filter(|news| news.tick == snapshot.tick)
        {
            self.log.write(
                RunLogEvent::new(snapshot.tick, RunLogEventKind::NewsFired)
                    .with_detail(format!("{:?}: {}", news.impact, news.headline)),
            );
        }

        let _ = self.updates.send(SimUpdate::Snapshot(snapshot.clone()));
        snapshot
    }

    fn apply_command(&mut self, command: Command) -> Result<Snapshot, CommandRejected> {
        let started = Instant::now();
        let outcome = self.engine.apply_command(command);
        let latency_micros = self.latency.record(started.elapsed());

        match &outcome {
            Ok(snapshot) => {
                self.log.write(
                    RunLogEvent::new(snapshot.tick, RunLogEventKind::CommandApplied)
                        .with_detail(format!("{command:?}"))
                        .with_latency_micros(latency_micros),
                );
                let _ = self.updates.send(SimUpdate::Snapshot(snapshot.clone()));
            }
            Err(rejected) => {
                self.log.write(
                    RunLogEvent::new(rejected.snapshot.tick, RunLogEventKind::CommandRejected)
                        .with_detail(format!("{command:?}: {}", rejected.error))
                        .with_latency_micros(latency_micros),
                );
                let _ = self.updates.send(SimUpdate::CommandRejected {
                    error: rejected.error,
                    snapshot: rejected.snapshot.clone(),
                });
            }
        }

        outcome
    }

    fn set_paused(&mut self, paused: bool) -> bool {
        let changed = self.paused.send_if_modified(|current| {
            let changed = *current != paused;
            *current = paused;
            changed
        });
        if !changed {
            return false;
        }

        let tick = self.engine.state().tick;
        let (kind, update) = if paused {
            (RunLogEventKind::Paused, SimUpdate::Paused)
        } else {
            (RunLogEventKind::Resumed, SimUpdate::Resumed)
        };
        self.log.write(RunLogEvent::new(tick, kind));
        let _ = self.updates.send(update);
        true
    }
}

#[cfg(test)]
mod tests {
    use core_sim::{Command, PositionId, ShareCount, SimConfig, SimError, SimulationEngine};

    use super::{spawn_driver, DriverError, SimUpdate};
    use crate::logging::{InMemoryRunLogWriter, RunLogEventKind};

    fn seeded_engine() -> SimulationEngine {
        SimulationEngine::new(SimConfig::default(), Some(7)).unwrap()
    }

    fn shares(count: u64) -> ShareCount {
        ShareCount::new(count).unwrap()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ticks_and_commands_are_journaled_in_order() {
        let journal = InMemoryRunLogWriter::new();
        let (handle, _task) = spawn_driver(seeded_engine(), Box::new(journal.clone()), false);

        handle.tick().await.unwrap();
        handle
            .apply_command(Command::OpenLong { shares: shares(10) })
            .await
            .unwrap();
        handle.tick().await.unwrap();

        let kinds: Vec<RunLogEventKind> = journal
            .events()
            .into_iter()
            .map(|event| event.kind)
            .filter(|kind| *kind != RunLogEventKind::NewsFired)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RunLogEventKind::TickApplied,
                RunLogEventKind::CommandApplied,
                RunLogEventKind::TickApplied,
            ]
        );
        assert_eq!(handle.state().await.unwrap().tick, 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejected_command_is_reported_and_broadcast() {
        let journal = InMemoryRunLogWriter::new();
        let (handle, _task) = spawn_driver(seeded_engine(), Box::new(journal.clone()), false);
        let mut updates = handle.subscribe();

        let err = handle
            .apply_command(Command::Close {
                position_id: PositionId(42),
            })
            .await
            .unwrap_err();

        match err {
            DriverError::Rejected(rejected) => {
                assert_eq!(rejected.error, SimError::PositionNotFound(PositionId(42)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            updates.recv().await.unwrap(),
            SimUpdate::CommandRejected {
                error: SimError::PositionNotFound(PositionId(42)),
                ..
            }
        ));
        assert_eq!(journal.events()[0].kind, RunLogEventKind::CommandRejected);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_callers_are_serialized() {
        let (handle, _task) =
            spawn_driver(seeded_engine(), Box::new(InMemoryRunLogWriter::new()), true);

        let mut calls = Vec::new();
        for _ in 0..20 {
            let handle = handle.clone();
            calls.push(tokio::spawn(async move { handle.tick().await }));
        }
        for call in calls {
            call.await.unwrap().unwrap();
        }

        let state = handle.state().await.unwrap();
        assert_eq!(state.tick, 20);
        assert_eq!(state.price_series.len(), 21);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn pause_and_resume_toggle_once() {
        let journal = InMemoryRunLogWriter::new();
        let (handle, _task) = spawn_driver(seeded_engine(), Box::new(journal.clone()), false);

        assert!(handle.pause().await.unwrap());
        assert!(!handle.pause().await.unwrap());
        assert!(handle.is_paused());
        assert!(handle.resume().await.unwrap());
        assert!(!handle.is_paused());

        let kinds: Vec<RunLogEventKind> = journal.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![RunLogEventKind::Paused, RunLogEventKind::Resumed]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn latency_is_recorded_per_transition() {
        let (handle, _task) =
            spawn_driver(seeded_engine(), Box::new(InMemoryRunLogWriter::new()), false);

        assert!(handle.latency().await.unwrap().is_none());
        handle.tick().await.unwrap();
        handle.tick().await.unwrap();

        assert_eq!(handle.latency().await.unwrap().unwrap().count, 2);
    }
}
