use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::news::NewsEvent;
use crate::portfolio::Portfolio;
use crate::transactions::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PricePoint {
    pub fn flat(price: f64) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    /// Whether high/low still enclose both open and close.
    pub fn encloses_body(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }

    pub(crate) fn widen_to_close(&mut self) {
        self.high = self.high.max(self.close);
        self.low = self.low.min(self.close);
    }
}

/// Aggregate root of one simulation session.
///
/// Only [`SimulationEngine`](crate::SimulationEngine) mutates it; everyone else
/// sees it through a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub tick: u64,
    pub price_series: Vec<PricePoint>,
    pub transactions: Vec<Transaction>,
    pub news: Vec<NewsEvent>,
    pub portfolio: Portfolio,
}

pub type Snapshot = Arc<SimulationState>;

impl SimulationState {
    pub fn new(start_price: f64, initial_balance: f64) -> Self {
        Self {
            tick: 0,
            price_series: vec![PricePoint::flat(start_price)],
            transactions: Vec::new(),
            news: Vec::new(),
            portfolio: Portfolio::new(initial_balance),
        }
    }

    pub fn last_close(&self) -> f64 {
        // The series is seeded at construction and only ever appended to.
        self.price_series.last().map_or(0.0, |point| point.close)
    }
}
