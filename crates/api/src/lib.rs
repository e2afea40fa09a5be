//! HTTP and WebSocket surface over a running simulation driver.

pub mod error;
pub mod routes;
pub mod state;
mod ws;

use axum::Router;
use runtime::SimHandle;

pub use error::ApiError;
pub use state::{AppState, RuntimeEvent};

pub fn app(sim: SimHandle) -> Router {
    routes::router(state::AppState::new(sim))
}
