use serde::{Deserialize, Serialize};

use crate::config::ShockRange;
use crate::random::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsImpact {
    Positive,
    Negative,
}

impl NewsImpact {
    fn sign(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsTemplate {
    pub headline: &'static str,
    pub impact: NewsImpact,
}

const fn positive(headline: &'static str) -> NewsTemplate {
    NewsTemplate {
        headline,
        impact: NewsImpact::Positive,
    }
}

const fn negative(headline: &'static str) -> NewsTemplate {
    NewsTemplate {
        headline,
        impact: NewsImpact::Negative,
    }
}

/// Paired headlines: every theme has one positive and one negative variant.
pub const NEWS_CATALOG: [NewsTemplate; 20] = [
    positive("Quarterly financial results exceed expectations"),
    negative("Quarterly financial results disappoint investors"),
    positive("Successful mergers and acquisitions boost company growth"),
    negative("Failed merger talks lead to stock decline"),
    positive("New CEO brings fresh vision to the company"),
    negative("CEO resignation creates uncertainty in the market"),
    positive("Innovative new product launch drives sales surge"),
    negative("New product launch fails to meet market expectations"),
    positive("Regulatory approval paves the way for expansion"),
    negative("New regulations pose challenges for the industry"),
    positive("Positive macroeconomic data supports market rally"),
    negative("Negative macroeconomic data triggers market sell-off"),
    positive("Central bank policies stimulate economic growth"),
    negative("Tightening monetary policies concern investors"),
    positive("Company outperforms competitors in the sector"),
    negative("Intense competition affects company's market share"),
    positive("Scandal-free reputation strengthens brand loyalty"),
    negative("Corporate scandal damages company's reputation"),
    positive("Sector performance shows robust growth"),
    negative("Sector performance shows signs of slowdown"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEvent {
    pub tick: u64,
    pub timestamp: String,
    pub headline: String,
    pub impact: NewsImpact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewsInjector {
    probability: f64,
    shock: ShockRange,
}

impl NewsInjector {
    pub fn new(probability: f64, shock: ShockRange) -> Self {
        Self { probability, shock }
    }

    /// Rolls for a news event and, when one fires, shocks `current_close`.
    ///
    /// Returns the close unchanged and no event when the roll misses.
    pub fn maybe_fire(
        &self,
        current_close: f64,
        tick: u64,
        timestamp: &str,
        rng: &mut impl RandomSource,
    ) -> (f64, Option<NewsEvent>) {
        if rng.uniform() >= self.probability {
            return (current_close, None);
        }

        let template = NEWS_CATALOG[rng.index(NEWS_CATALOG.len())];
        let magnitude = rng.uniform_between(self.shock.lo, self.shock.hi);
        let adjusted_close = current_close * (1.0 + template.impact.sign() * magnitude);

        let event = NewsEvent {
            tick,
            timestamp: timestamp.to_owned(),
            headline: template.headline.to_owned(),
            impact: template.impact,
        };

        (adjusted_close, Some(event))
    }
}
