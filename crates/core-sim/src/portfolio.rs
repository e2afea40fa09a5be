use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Stable handle for an open position, issued monotonically per portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated, strictly positive share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u64")]
pub struct ShareCount(u64);

impl ShareCount {
    pub fn new(shares: u64) -> Result<Self, SimError> {
        if shares == 0 {
            return Err(SimError::InvalidShareCount);
        }
        Ok(Self(shares))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<f64> for ShareCount {
    type Error = SimError;

    /// Accepts only finite, positive, integral values, e.g. raw numeric UI input.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value.fract() != 0.0 || value < 1.0 || value > u64::MAX as f64 {
            return Err(SimError::InvalidShareCount);
        }
        Self::new(value as u64)
    }
}

impl From<ShareCount> for u64 {
    fn from(value: ShareCount) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub side: PositionSide,
    pub shares: u64,
    pub open_price: f64,
    pub current_price: f64,
    pub profit_loss: f64,
}

impl Position {
    /// Market value at the current price, negative for shorts.
    pub fn signed_exposure(&self) -> f64 {
        let notional = self.shares as f64 * self.current_price;
        match self.side {
            PositionSide::Long => notional,
            PositionSide::Short => -notional,
        }
    }

    fn mark(&mut self, price: f64) {
        let shares = self.shares as f64;
        self.current_price = price;
        self.profit_loss = match self.side {
            PositionSide::Long => (price - self.open_price) * shares,
            PositionSide::Short => (self.open_price - price) * shares,
        };
    }
}

/// Cash, open positions and their valuation.
///
/// Opening a long is refused when it would overdraw the balance. Shorts are
/// not margined: opening one credits the proceeds unconditionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub balance: f64,
    pub shares_held: u64,
    pub positions: Vec<Position>,
    pub value: f64,
    #[serde(skip_serializing, default = "first_position_id")]
    next_position_id: u64,
}

fn first_position_id() -> u64 {
    1
}

impl Portfolio {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            shares_held: 0,
            positions: Vec::new(),
            value: initial_balance,
            next_position_id: 1,
        }
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.iter().find(|position| position.id == id)
    }

    pub fn open(
        &mut self,
        side: PositionSide,
        shares: ShareCount,
        price: f64,
    ) -> Result<PositionId, SimError> {
        let shares = shares.get();
        let notional = shares as f64 * price;

        match side {
            PositionSide::Long => {
                if notional > self.balance {
                    return Err(SimError::InsufficientFunds {
                        required: notional,
                        available: self.balance,
                    });
                }
                self.balance -= notional;
                self.shares_held += shares;
            }
            PositionSide::Short => {
                self.balance += notional;
            }
        }

        // A portfolio restored from JSON has lost its counter; resume past open ids.
        let floor = self
            .positions
            .iter()
            .map(|position| position.id.0 + 1)
            .max()
            .unwrap_or(1);
        let id = PositionId(self.next_position_id.max(floor));
        self.next_position_id = id.0 + 1;
        self.positions.push(Position {
            id,
            side,
            shares,
            open_price: price,
            current_price: price,
            profit_loss: 0.0,
        });

        Ok(id)
    }

    /// Closes the position with the given id at its last marked price.
    pub fn close(&mut self, id: PositionId) -> Result<Position, SimError> {
        let index = self
            .positions
            .iter()
            .position(|position| position.id == id)
            .ok_or(SimError::PositionNotFound(id))?;

        Ok(self.settle(index))
    }

    /// Closes whatever position currently sits at `index`.
    pub fn close_at(&mut self, index: usize) -> Result<Position, SimError> {
        if index >= self.positions.len() {
            return Err(SimError::IndexOutOfRange {
                index,
                len: self.positions.len(),
            });
        }

        Ok(self.settle(index))
    }

    fn settle(&mut self, index: usize) -> Position {
        let closed = self.positions.remove(index);
        let notional = closed.shares as f64 * closed.current_price;

        match closed.side {
            PositionSide::Long => {
                self.balance += notional;
                self.shares_held = self.shares_held.saturating_sub(closed.shares);
            }
            PositionSide::Short => {
                self.balance -= notional;
            }
        }

        closed
    }

    /// Marks every open position to `close` and refreshes `value`.
    pub fn revalue(&mut self, close: f64) {
        for position in &mut self.positions {
            position.mark(close);
        }
        self.value = self.total_value();
    }

    pub fn total_value(&self) -> f64 {
        self.balance
            + self
                .positions
                .iter()
                .map(Position::signed_exposure)
                .sum::<f64>()
    }
}
