mod config;
mod wiring;

use std::error::Error;

use core_sim::SimulationEngine;
use runtime::{spawn_driver, spawn_ticker, TracingRunLogWriter};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::Config::from_env()?;
    info!(
        addr = %config.listen_addr,
        tick_interval_ms = config.tick_interval.as_millis() as u64,
        seed = ?config.seed,
        start_paused = config.start_paused,
        "starting simulation server"
    );

    let engine = SimulationEngine::new(config.simulation, config.seed)?;
    let (sim, driver) = spawn_driver(engine, Box::new(TracingRunLogWriter), config.start_paused);
    let ticker = spawn_ticker(sim.clone(), config.tick_interval);

    let listener = TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, wiring::build_app(sim))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ticker.abort();
    driver.abort();
    info!("simulation server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
