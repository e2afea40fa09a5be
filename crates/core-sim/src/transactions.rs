use serde::{Deserialize, Serialize};

use crate::config::RemainderPolicy;
use crate::random::RandomSource;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const TRANSACTION_ID_LEN: usize = 10;

const MIN_TRANSACTIONS: u64 = 1;
const MAX_TRANSACTIONS: u64 = 10;
const MIN_TOTAL_VOLUME: u64 = 100;
const MAX_TOTAL_VOLUME: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Exchange,
    #[serde(rename = "OTC")]
    Otc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// Synthetic market print. Display-only: the ledger never reads these back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tick: u64,
    pub timestamp: String,
    pub price: f64,
    pub volume: u64,
    pub side: TradeSide,
    pub venue: Venue,
    pub order_type: OrderType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionSynthesizer {
    remainder_policy: RemainderPolicy,
}

impl TransactionSynthesizer {
    pub fn new(remainder_policy: RemainderPolicy) -> Self {
        Self { remainder_policy }
    }

    /// Draws 1..=10 prints sharing a total volume in `[100, 1000)`.
    ///
    /// The total is split with integer division; under
    /// [`RemainderPolicy::Drop`] the remainder is lost, under
    /// [`RemainderPolicy::Distribute`] the first prints absorb one unit each.
    pub fn generate(
        &self,
        price: f64,
        tick: u64,
        timestamp: &str,
        rng: &mut impl RandomSource,
    ) -> Vec<Transaction> {
        let count = rng.int_between(MIN_TRANSACTIONS, MAX_TRANSACTIONS + 1);
        let total_volume = rng.int_between(MIN_TOTAL_VOLUME, MAX_TOTAL_VOLUME);
        let per_transaction = total_volume / count;
        let remainder = total_volume % count;

        (0..count)
            .map(|slot| {
                let extra = match self.remainder_policy {
                    RemainderPolicy::Distribute if slot < remainder => 1,
                    _ => 0,
                };

                Transaction {
                    id: transaction_id(rng),
                    tick,
                    timestamp: timestamp.to_owned(),
                    price,
                    volume: per_transaction + extra,
                    side: pick(rng, [TradeSide::Buy, TradeSide::Sell]),
                    venue: pick(rng, [Venue::Exchange, Venue::Otc]),
                    order_type: pick(rng, [OrderType::Market, OrderType::Limit]),
                }
            })
            .collect()
    }
}

fn pick<T: Copy, const N: usize>(rng: &mut impl RandomSource, options: [T; N]) -> T {
    options[rng.index(N)]
}

fn transaction_id(rng: &mut impl RandomSource) -> String {
    (0..TRANSACTION_ID_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.index(ID_ALPHABET.len())]))
        .collect()
}
