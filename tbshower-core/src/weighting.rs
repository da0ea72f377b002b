//! Logarithmic energy weighting for shower centroids.
//!
//! A hit of energy `e` in a cluster of total energy `E` gets the weight
//! `max(W0 + ln(e / E), 0)`. Hits below `E * exp(-W0)` drop out of the
//! centroid entirely, which suppresses the noisy shower tails.

/// Log weight of a hit.
///
/// Returns 0 whenever `energy` or `total` is not strictly positive, so the
/// result is never NaN or negative.
#[inline]
#[must_use]
pub fn log_weight(energy: f64, total: f64, w0: f64) -> f64 {
    if energy <= 0.0 || total <= 0.0 {
        return 0.0;
    }
    (w0 + (energy / total).ln()).max(0.0)
}

/// Running sums of a log-weighted centroid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedCentroid {
    sum_x: f64,
    sum_y: f64,
    sum_weight: f64,
}

impl WeightedCentroid {
    /// Adds a position with the given weight.
    #[inline]
    pub fn add(&mut self, x: f32, y: f32, weight: f64) {
        self.sum_x += f64::from(x) * weight;
        self.sum_y += f64::from(y) * weight;
        self.sum_weight += weight;
    }

    /// Sum of all weights added so far.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.sum_weight
    }

    /// Weighted mean position, or `None` if the weights sum to zero.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn position(&self) -> Option<(f64, f64)> {
        if self.sum_weight == 0.0 {
            return None;
        }
        let inv = 1.0 / self.sum_weight;
        Some((self.sum_x * inv, self.sum_y * inv))
    }
}
