use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::driver::SimHandle;

/// Advances the simulation once per `period` while the driver is not paused.
///
/// The first tick fires one full period after start (or after resuming).
/// The task exits when the driver stops.
pub fn spawn_ticker(handle: SimHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut paused = handle.paused_watch();
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = period.as_millis() as u64, "ticker started");

        loop {
            if *paused.borrow_and_update() {
                if paused.changed().await.is_err() {
                    break;
                }
                ticks.reset();
                continue;
            }

            tokio::select! {
                _ = ticks.tick() => {
                    match handle.tick().await {
                        Ok(snapshot) => debug!(tick = snapshot.tick, "scheduled tick"),
                        Err(_) => break,
                    }
                }
                changed = paused.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("ticker stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use core_sim::{SimConfig, SimulationEngine};
    use tokio::time::sleep;

    use super::spawn_ticker;
    use crate::driver::spawn_driver;
    use crate::logging::InMemoryRunLogWriter;

    fn engine() -> SimulationEngine {
        SimulationEngine::new(SimConfig::default(), Some(11)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (handle, _driver) =
            spawn_driver(engine(), Box::new(InMemoryRunLogWriter::new()), false);
        let _ticker = spawn_ticker(handle.clone(), Duration::from_millis(100));

        sleep(Duration::from_millis(350)).await;

        assert_eq!(handle.state().await.unwrap().tick, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_halts_ticks_until_resumed() {
        let (handle, _driver) =
            spawn_driver(engine(), Box::new(InMemoryRunLogWriter::new()), false);
        let _ticker = spawn_ticker(handle.clone(), Duration::from_millis(100));

        sleep(Duration::from_millis(150)).await;
        handle.pause().await.unwrap();
        let frozen = handle.state().await.unwrap().tick;
        assert_eq!(frozen, 1);

        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(handle.state().await.unwrap().tick, frozen);

        handle.resume().await.unwrap();
        sleep(Duration::from_millis(150)).await;
        assert_eq!(handle.state().await.unwrap().tick, frozen + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_paused_produces_no_ticks() {
        let (handle, _driver) =
            spawn_driver(engine(), Box::new(InMemoryRunLogWriter::new()), true);
        let _ticker = spawn_ticker(handle.clone(), Duration::from_millis(100));

        sleep(Duration::from_millis(500)).await;

        assert_eq!(handle.state().await.unwrap().tick, 0);
    }
}
