//! Bouncing ball kinematics.
//!
//! A ball dropped from `i` loses a fixed fraction of its energy on every bounce,
//! so the apex after bounce `n` is `i · eⁿ` where `e` is the bounce efficiency.
//! Only complete bounces whose apex stays at or above the minimum height `m`
//! are counted.

use serde::Serialize;

use crate::domain::BounceInputs;

/// Gravitational acceleration at the Earth's surface (m s⁻²).
pub const GRAVITY: f64 = 9.81;

/// Number of complete bounces: `floor(ln(m / i) / ln(e))`.
///
/// Rounds down on purpose: a partial bounce that does not reach `m` is not a
/// bounce.
pub fn bounce_count(initial_height: f64, minimum_height: f64, efficiency: f64) -> usize {
    let bounces = (minimum_height / initial_height).ln() / efficiency.ln();
    if bounces.is_finite() && bounces > 0.0 {
        bounces.floor() as usize
    } else {
        0
    }
}

/// Most bounces listed individually; the count and total time cover all of them.
pub const MAX_LISTED_BOUNCES: usize = 10_000;

/// Apex height after bounce `n` (1-based).
pub fn apex_height(initial_height: f64, efficiency: f64, n: usize) -> f64 {
    initial_height * efficiency.powf(n as f64)
}

/// Time for a free fall from `height` to the ground.
pub fn fall_time(height: f64) -> f64 {
    (2.0 * height / GRAVITY).sqrt()
}

/// `Σ √eⁿ` for `n = 1..=count`, summed as a geometric series.
fn flight_series(efficiency: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    // ln √e < 0 for e in (0, 1); exp_m1 keeps e close to 1 accurate.
    let half_log = 0.5 * efficiency.ln();
    half_log.exp() * (count as f64 * half_log).exp_m1() / half_log.exp_m1()
}

/// Bounce count and timing for one drop.
///
/// Per-bounce heights are produced on demand and capped at
/// [`MAX_LISTED_BOUNCES`].
#[derive(Debug, Clone, Serialize)]
pub struct BounceProfile {
    pub initial_height: f64,
    pub minimum_height: f64,
    pub efficiency: f64,
    pub count: usize,
    pub first_drop_time: f64,
    /// From release until the ball lands after the last complete bounce.
    pub total_time: f64,
}

impl BounceProfile {
    /// Build the profile for validated inputs.
    pub fn compute(inputs: &BounceInputs) -> Self {
        let count = bounce_count(inputs.initial_height, inputs.minimum_height, inputs.efficiency);
        let first_drop_time = fall_time(inputs.initial_height);
        // Bounce n flies for 2·√(2·i·eⁿ/g) = 2·t₀·√eⁿ.
        let total_time = first_drop_time + 2.0 * first_drop_time * flight_series(inputs.efficiency, count);

        Self {
            initial_height: inputs.initial_height,
            minimum_height: inputs.minimum_height,
            efficiency: inputs.efficiency,
            count,
            first_drop_time,
            total_time,
        }
    }

    /// Number of bounces [`heights`](Self::heights) yields.
    pub fn listed(&self) -> usize {
        self.count.min(MAX_LISTED_BOUNCES)
    }

    /// True when there are more bounces than are listed.
    pub fn is_truncated(&self) -> bool {
        self.count > MAX_LISTED_BOUNCES
    }

    /// Apex heights of the first [`listed`](Self::listed) bounces.
    pub fn heights(&self) -> impl Iterator<Item = f64> + '_ {
        (1..=self.listed()).map(|n| apex_height(self.initial_height, self.efficiency, n))
    }

    /// `(cumulative time, apex height)` series starting with the release height.
    ///
    /// Each apex is paired with the time at which the preceding bounce lands,
    /// so the first point is `(first_drop_time, initial_height)`.
    pub fn decay_series(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::with_capacity(self.listed() + 1);
        let mut t = self.first_drop_time;
        out.push((t, self.initial_height));
        for h in self.heights() {
            t += 2.0 * fall_time(h);
            out.push((t, h));
        }
        out
    }
}
