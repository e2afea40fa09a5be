use crate::random::RandomSource;
use crate::state::PricePoint;

/// Relative scale of the high/low wick around the candle body.
const WICK_SCALE: f64 = 0.01;

/// One geometric-Brownian-motion step per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePathGenerator {
    drift_term: f64,
    diffusion: f64,
}

impl PricePathGenerator {
    pub fn new(drift: f64, volatility: f64, dt: f64) -> Self {
        assert!(drift.is_finite(), "drift must be finite");
        assert!(
            volatility.is_finite() && volatility >= 0.0,
            "volatility must be finite and non-negative"
        );
        assert!(dt.is_finite() && dt > 0.0, "dt must be finite and positive");

        Self {
            drift_term: (drift - 0.5 * volatility * volatility) * dt,
            diffusion: volatility * dt.sqrt(),
        }
    }

    /// Builds the next candle from the previous close.
    ///
    /// Draws three independent standard normals: the return shock, then the
    /// upper and lower wick sizes. Wicks are applied by magnitude so the
    /// returned point always encloses its own open and close. Prices are not
    /// clamped and may go non-positive on extreme draws.
    pub fn advance(&self, last_close: f64, rng: &mut impl RandomSource) -> PricePoint {
        let z = rng.standard_normal();
        let z_high = rng.standard_normal();
        let z_low = rng.standard_normal();

        let open = last_close;
        let close = last_close * (self.drift_term + self.diffusion * z).exp();
        let top = open.max(close);
        let bottom = open.min(close);

        PricePoint {
            open,
            high: top + top.abs() * WICK_SCALE * z_high.abs(),
            low: bottom - bottom.abs() * WICK_SCALE * z_low.abs(),
            close,
        }
    }

    /// Return shock that moves `from` exactly to `to` in one step.
    pub fn shock_for(&self, from: f64, to: f64) -> f64 {
        if self.diffusion == 0.0 {
            return 0.0;
        }
        ((to / from).ln() - self.drift_term) / self.diffusion
    }
}
