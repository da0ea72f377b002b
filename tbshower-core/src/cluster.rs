//! Per-cluster result records.

use crate::config::CENTROID_SENTINEL;
use crate::impact::ImpactPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Distance between the track impact point and a cluster centroid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Residual {
    /// `impact.x - centroid.x`
    pub dx: f32,
    /// `impact.y - centroid.y`
    pub dy: f32,
}

impl Residual {
    /// Residual of a centroid with respect to an impact point.
    #[inline]
    #[must_use]
    pub fn between(impact: ImpactPoint, x: f32, y: f32) -> Self {
        Self {
            dx: impact.x - x,
            dy: impact.y - y,
        }
    }
}

/// One 2D cluster: hits sharing a cluster id within a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterSummary {
    /// Layer the cluster lives on.
    pub layer: u32,
    /// Cluster id assigned by the clustering stage.
    pub cluster_id: i32,
    /// Number of member hits.
    pub n_hits: usize,
    /// Energy of all member hits.
    pub energy: f32,
    /// Energy of the members within the distance cut of the anchor hit.
    pub energy_cut: f32,
    /// Log-weighted centroid x, or [`CENTROID_SENTINEL`].
    pub x: f32,
    /// Log-weighted centroid y, or [`CENTROID_SENTINEL`].
    pub y: f32,
    /// Residual against the layer impact point, when one was supplied.
    pub residual: Option<Residual>,
}

impl ClusterSummary {
    /// Returns false if the centroid is the zero-weight sentinel.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn has_position(&self) -> bool {
        !(self.x == CENTROID_SENTINEL && self.y == CENTROID_SENTINEL)
    }
}

/// All clusters found on one layer, in first-seen order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerClusters {
    pub layer: u32,
    pub clusters: Vec<ClusterSummary>,
}

impl LayerClusters {
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Energy of all clusters on the layer.
    #[must_use]
    pub fn energy(&self) -> f32 {
        self.clusters.iter().map(|c| c.energy).sum()
    }
}

/// Cluster aggregation result of one event, one entry per layer.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterAnalysis {
    pub layers: Vec<LayerClusters>,
}

impl ClusterAnalysis {
    /// Clusters of `layer` (1-based).
    #[must_use]
    pub fn layer(&self, layer: u32) -> Option<&LayerClusters> {
        let index = (layer as usize).checked_sub(1)?;
        self.layers.get(index)
    }

    /// Iterates over every cluster, layer by layer.
    pub fn clusters(&self) -> impl Iterator<Item = &ClusterSummary> {
        self.layers.iter().flat_map(|l| l.clusters.iter())
    }

    /// Total number of clusters over all layers.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.layers.iter().map(LayerClusters::len).sum()
    }
}

/// Uncut centroid of one cluster id, as reported by the position estimator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterPosition {
    pub x: f32,
    pub y: f32,
    /// Layer of the first hit seen for the cluster; 0 for the outlier slot.
    pub layer: u32,
}

/// Positions and energies indexed by `cluster_id + 1`; index 0 holds outliers.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionEnergy {
    /// Empty when only energies were computed.
    pub positions: Vec<ClusterPosition>,
    /// Empty when only positions were computed.
    pub energies: Vec<f32>,
}

impl PositionEnergy {
    /// Energy of all clusters, outlier slot excluded.
    #[must_use]
    pub fn clustered_energy(&self) -> f32 {
        self.energies.iter().skip(1).sum()
    }

    /// Energy of the outlier slot.
    #[must_use]
    pub fn outlier_energy(&self) -> f32 {
        self.energies.first().copied().unwrap_or(0.0)
    }
}

/// Flattened `(x, y, layer, energy)` entry for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterOutput {
    pub x: f32,
    pub y: f32,
    pub layer: u32,
    pub energy: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn summary(layer: u32, energy: f32) -> ClusterSummary {
        ClusterSummary {
            layer,
            cluster_id: 0,
            n_hits: 1,
            energy,
            energy_cut: energy,
            x: 1.0,
            y: 2.0,
            residual: None,
        }
    }

    #[test]
    fn test_residual() {
        let r = Residual::between(ImpactPoint::new(1.0, -1.0), 0.25, 0.5);
        assert_relative_eq!(r.dx, 0.75);
        assert_relative_eq!(r.dy, -1.5);
    }

    #[test]
    fn test_sentinel_detection() {
        let mut s = summary(1, 1.0);
        assert!(s.has_position());
        s.x = CENTROID_SENTINEL;
        s.y = CENTROID_SENTINEL;
        assert!(!s.has_position());
    }

    #[test]
    fn test_analysis_lookup() {
        let analysis = ClusterAnalysis {
            layers: vec![
                LayerClusters {
                    layer: 1,
                    clusters: vec![summary(1, 2.0), summary(1, 3.0)],
                },
                LayerClusters {
                    layer: 2,
                    clusters: Vec::new(),
                },
            ],
        };
        assert_eq!(analysis.n_clusters(), 2);
        assert_eq!(analysis.clusters().count(), 2);
        assert_relative_eq!(analysis.layer(1).unwrap().energy(), 5.0);
        assert!(analysis.layer(2).unwrap().is_empty());
        assert!(analysis.layer(0).is_none());
        assert!(analysis.layer(3).is_none());
    }

    #[test]
    fn test_position_energy_totals() {
        let pe = PositionEnergy {
            positions: Vec::new(),
            energies: vec![100.0, 10.0, 5.0],
        };
        assert_relative_eq!(pe.clustered_energy(), 15.0);
        assert_relative_eq!(pe.outlier_energy(), 100.0);
        assert_relative_eq!(PositionEnergy::default().outlier_energy(), 0.0);
    }
}
