//! Spatial resolution with respect to the track impact points.
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;
use tbshower_core::{ClusterAnalysis, ImpactPoint, ImpactPoints, LayerClusters, Residual};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Residuals of a set of centroids on one layer.
///
/// `xs` and `ys` are parallel; extra entries in the longer slice are ignored.
#[must_use]
pub fn residuals(xs: &[f32], ys: &[f32], impact: ImpactPoint) -> Vec<Residual> {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| Residual::between(impact, x, y))
        .collect()
}

/// Residuals of every cluster on a layer.
#[must_use]
pub fn layer_residuals(layer: &LayerClusters, impact: ImpactPoint) -> Vec<Residual> {
    layer
        .clusters
        .iter()
        .map(|c| Residual::between(impact, c.x, c.y))
        .collect()
}

/// Fills in the residual of every cluster whose layer has an impact point.
#[must_use]
pub fn attach_residuals(mut analysis: ClusterAnalysis, impacts: &ImpactPoints) -> ClusterAnalysis {
    for layer in &mut analysis.layers {
        let Some(impact) = impacts.get(layer.layer) else {
            continue;
        };
        for cluster in &mut layer.clusters {
            cluster.residual = Some(Residual::between(impact, cluster.x, cluster.y));
        }
    }
    analysis
}

/// Running moments of the residuals on one layer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResidualMoments {
    /// Number of residuals added.
    pub count: usize,
    sum_dx: f64,
    sum_dy: f64,
    sum_dx2: f64,
    sum_dy2: f64,
}

impl ResidualMoments {
    /// Adds one residual.
    pub fn add(&mut self, r: Residual) {
        let (dx, dy) = (f64::from(r.dx), f64::from(r.dy));
        self.count += 1;
        self.sum_dx += dx;
        self.sum_dy += dy;
        self.sum_dx2 += dx * dx;
        self.sum_dy2 += dy * dy;
    }

    /// Adds the moments of another accumulation.
    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.sum_dx += other.sum_dx;
        self.sum_dy += other.sum_dy;
        self.sum_dx2 += other.sum_dx2;
        self.sum_dy2 += other.sum_dy2;
    }

    /// Mean `(dx, dy)`, or `None` without entries.
    #[must_use]
    pub fn mean(&self) -> Option<(f64, f64)> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some((self.sum_dx / n, self.sum_dy / n))
    }

    /// Standard deviation of `(dx, dy)`, the layer resolution.
    #[must_use]
    pub fn std_dev(&self) -> Option<(f64, f64)> {
        let (mx, my) = self.mean()?;
        let n = self.count as f64;
        let vx = (self.sum_dx2 / n - mx * mx).max(0.0);
        let vy = (self.sum_dy2 / n - my * my).max(0.0);
        Some((vx.sqrt(), vy.sqrt()))
    }
}

/// Per-layer resolution accumulated over a run.
///
/// Clusters carrying the zero-weight sentinel have no meaningful position
/// and are left out.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResolutionStats {
    layers: BTreeMap<u32, ResidualMoments>,
}

impl ResolutionStats {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the residuals of one event.
    pub fn add_event(&mut self, analysis: &ClusterAnalysis) {
        for cluster in analysis.clusters() {
            if let Some(r) = cluster.residual.filter(|_| cluster.has_position()) {
                self.layers.entry(cluster.layer).or_default().add(r);
            }
        }
    }

    /// Adds statistics collected elsewhere.
    pub fn merge(&mut self, other: &Self) {
        for (layer, moments) in &other.layers {
            self.layers.entry(*layer).or_default().merge(moments);
        }
    }

    /// Moments of `layer`, if it has any residual.
    #[must_use]
    pub fn layer(&self, layer: u32) -> Option<&ResidualMoments> {
        self.layers.get(&layer)
    }

    /// Iterates over layers in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ResidualMoments)> {
        self.layers.iter().map(|(&l, m)| (l, m))
    }

    /// Returns true if no residual was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
