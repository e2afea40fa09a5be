use thiserror::Error;

use crate::portfolio::PositionId;

/// Recoverable engine errors. None of them leave the state partially updated.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SimError {
    #[error("insufficient funds: position costs {required:.2} but balance is {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },
    #[error("share count must be a positive integer")]
    InvalidShareCount,
    #[error("position index {index} is out of range ({len} open)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("position {0} is not open")]
    PositionNotFound(PositionId),
}

impl SimError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidShareCount => "invalid_share_count",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::PositionNotFound(_) => "position_not_found",
        }
    }
}
