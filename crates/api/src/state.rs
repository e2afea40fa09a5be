use core_sim::{NewsEvent, Portfolio, PricePoint, SimulationState, Transaction};
use runtime::{SimHandle, SimUpdate};

/// Candles kept in a pushed view; matches the dashboard chart width.
pub const VIEW_PRICE_POINTS: usize = 120;
/// Transactions and news rows kept in a pushed view.
pub const VIEW_ROWS: usize = 50;

/// Recent tail of a snapshot, sized for per-tick pushes.
///
/// The portfolio is carried whole. The full history stays available from
/// `GET /api/state`.
#[derive(Clone, Debug, serde::Serialize)]
pub struct StateView {
    pub tick: u64,
    pub price_series: Vec<PricePoint>,
    pub transactions: Vec<Transaction>,
    pub news: Vec<NewsEvent>,
    pub portfolio: Portfolio,
}

impl From<&SimulationState> for StateView {
    fn from(state: &SimulationState) -> Self {
        Self {
            tick: state.tick,
            price_series: tail(&state.price_series, VIEW_PRICE_POINTS),
            transactions: tail(&state.transactions, VIEW_ROWS),
            news: tail(&state.news, VIEW_ROWS),
            portfolio: state.portfolio.clone(),
        }
    }
}

fn tail<T: Clone>(items: &[T], keep: usize) -> Vec<T> {
    items[items.len().saturating_sub(keep)..].to_vec()
}

#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    Connected {
        tick: u64,
        paused: bool,
    },
    Snapshot {
        state: StateView,
    },
    CommandRejected {
        code: &'static str,
        message: String,
        state: StateView,
    },
    Paused,
    Resumed,
}

impl RuntimeEvent {
    pub fn connected(tick: u64, paused: bool) -> Self {
        Self::Connected { tick, paused }
    }

    pub fn snapshot(state: &SimulationState) -> Self {
        Self::Snapshot {
            state: StateView::from(state),
        }
    }
}

impl From<SimUpdate> for RuntimeEvent {
    fn from(update: SimUpdate) -> Self {
        match update {
            SimUpdate::Snapshot(state) => Self::snapshot(&state),
            SimUpdate::CommandRejected { error, snapshot } => Self::CommandRejected {
                code: error.code(),
                message: error.to_string(),
                state: StateView::from(snapshot.as_ref()),
            },
            SimUpdate::Paused => Self::Paused,
            SimUpdate::Resumed => Self::Resumed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppState {
    sim: SimHandle,
}

impl AppState {
    pub fn new(sim: SimHandle) -> Self {
        Self { sim }
    }

    pub fn sim(&self) -> &SimHandle {
        &self.sim
    }
}
