//! Uncut per-cluster-id position and energy estimation.
//!
//! Unlike [`crate::ClusterAggregator`], this estimator ignores layers and
//! the distance cut: every hit sharing a cluster id enters the centroid,
//! weighted against the full cluster energy. Results are indexed by
//! `cluster_id + 1`, leaving index 0 to the outliers.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::aggregator::BatchAggregator;
use tbshower_core::{
    log_weight, AnalysisConfig, ClusterPosition, HitBatch, PositionEnergy, Result,
    WeightedCentroid, ZeroWeightSentinel, CENTROID_SENTINEL,
};

/// Clustering-native centroid and energy per cluster id.
#[derive(Clone, Debug, Default)]
pub struct PositionEnergyEstimator {
    config: AnalysisConfig,
}

impl PositionEnergyEstimator {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Energy per slot; slot 0 is the outlier sum.
    #[must_use]
    pub fn energies(&self, batch: &HitBatch) -> Vec<f32> {
        slot_energies(batch).into_iter().map(|e| e as f32).collect()
    }

    /// Centroid per slot; slot 0 is always the origin on layer 0.
    #[must_use]
    pub fn positions(&self, batch: &HitBatch) -> Vec<ClusterPosition> {
        self.positions_from_totals(batch, &slot_energies(batch))
    }

    /// Positions and energies from a single pass over the cluster totals.
    #[must_use]
    pub fn estimate(&self, batch: &HitBatch) -> PositionEnergy {
        let totals = slot_energies(batch);
        PositionEnergy {
            positions: self.positions_from_totals(batch, &totals),
            energies: totals.into_iter().map(|e| e as f32).collect(),
        }
    }

    fn positions_from_totals(&self, batch: &HitBatch, totals: &[f64]) -> Vec<ClusterPosition> {
        let n_slots = totals.len();
        let mut centroids = vec![WeightedCentroid::default(); n_slots];
        let mut layers = vec![0u32; n_slots];

        for (i, &cluster_id) in batch.cluster_id().iter().enumerate() {
            let slot = slot_index(cluster_id);
            if slot == 0 {
                continue;
            }
            let w = log_weight(
                f64::from(batch.energy()[i]),
                totals[slot],
                self.config.log_weight_floor,
            );
            centroids[slot].add(batch.x()[i], batch.y()[i], w);
            if layers[slot] == 0 {
                layers[slot] = batch.layer()[i];
            }
        }

        centroids
            .iter()
            .zip(layers)
            .enumerate()
            .map(|(slot, (centroid, layer))| {
                if slot == 0 {
                    return ClusterPosition::default();
                }
                match (centroid.position(), self.config.zero_weight_sentinel) {
                    (Some((x, y)), _) => ClusterPosition {
                        x: x as f32,
                        y: y as f32,
                        layer,
                    },
                    (None, ZeroWeightSentinel::Origin) => ClusterPosition::default(),
                    (None, ZeroWeightSentinel::Marker) => ClusterPosition {
                        x: CENTROID_SENTINEL,
                        y: CENTROID_SENTINEL,
                        layer,
                    },
                }
            })
            .collect()
    }
}

impl BatchAggregator for PositionEnergyEstimator {
    type Output = PositionEnergy;

    fn name(&self) -> &'static str {
        "PositionEnergyEstimator"
    }

    fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn aggregate(&self, batch: &HitBatch) -> Result<PositionEnergy> {
        Ok(self.estimate(batch))
    }
}

/// Slot of a cluster id; outliers (-1) map to 0.
#[inline]
fn slot_index(cluster_id: i32) -> usize {
    (cluster_id + 1) as usize
}

fn slot_energies(batch: &HitBatch) -> Vec<f64> {
    let n_slots = slot_index(batch.max_cluster_id()) + 1;
    let mut totals = vec![0.0f64; n_slots];
    for (&cluster_id, &energy) in batch.cluster_id().iter().zip(batch.energy()) {
        totals[slot_index(cluster_id)] += f64::from(energy);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tbshower_core::{EventContext, Hit};

    fn batch(hits: &[Hit]) -> HitBatch {
        HitBatch::from_hits(EventContext::default(), hits).unwrap()
    }

    #[test]
    fn test_outlier_slot_and_uncut_centroid() {
        let hits = [
            Hit::new(0.0, 0.0, 10.0, 1, 0),
            Hit::new(1.0, 1.0, 5.0, 1, 0),
            Hit::new(9.0, 9.0, 100.0, 1, -1),
        ];
        let pe = PositionEnergyEstimator::default().estimate(&batch(&hits));

        assert_eq!(pe.energies.len(), 2);
        assert_relative_eq!(pe.energies[0], 100.0);
        assert_relative_eq!(pe.energies[1], 15.0);
        assert_eq!(pe.positions[0], ClusterPosition::default());

        // Both hits enter: w0 = 2.9 + ln(10/15), w1 = 2.9 + ln(5/15)
        let w0 = 2.9 + (10.0f64 / 15.0).ln();
        let w1 = 2.9 + (5.0f64 / 15.0).ln();
        let expected = w1 / (w0 + w1);
        assert_relative_eq!(f64::from(pe.positions[1].x), expected, epsilon = 1e-6);
        assert_relative_eq!(f64::from(pe.positions[1].y), expected, epsilon = 1e-6);
        assert_eq!(pe.positions[1].layer, 1);
    }

    #[test]
    fn test_gaps_and_layers() {
        let hits = [
            Hit::new(2.0, 3.0, 1.0, 4, 2),
            Hit::new(2.0, 3.0, 1.0, 5, 2),
        ];
        let estimator = PositionEnergyEstimator::default();
        let positions = estimator.positions(&batch(&hits));
        assert_eq!(positions.len(), 4);
        // ids 0 and 1 never appear
        assert_eq!(positions[1], ClusterPosition::default());
        assert_eq!(positions[2], ClusterPosition::default());
        assert_relative_eq!(positions[3].x, 2.0);
        assert_eq!(positions[3].layer, 4);
        assert_eq!(estimator.energies(&batch(&hits)), vec![0.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_only_outliers() {
        let hits = [Hit::new(0.0, 0.0, 3.0, 1, -1)];
        let pe = PositionEnergyEstimator::default().estimate(&batch(&hits));
        assert_eq!(pe.energies, vec![3.0]);
        assert_eq!(pe.positions.len(), 1);
        assert_relative_eq!(pe.clustered_energy(), 0.0);
    }

    #[test]
    fn test_zero_weight_policies() {
        let hits = [
            Hit::new(1.0, 1.0, 1e-6, 3, 0),
            Hit::new(2.0, 2.0, 1e-6, 3, 0),
        ];
        let config = AnalysisConfig::default().with_log_weight_floor(0.1);

        let origin = PositionEnergyEstimator::new(config.clone()).positions(&batch(&hits));
        assert_eq!(origin[1], ClusterPosition::default());

        let marker = PositionEnergyEstimator::new(
            config.with_zero_weight_sentinel(ZeroWeightSentinel::Marker),
        )
        .positions(&batch(&hits));
        assert_relative_eq!(marker[1].x, CENTROID_SENTINEL);
        assert_relative_eq!(marker[1].y, CENTROID_SENTINEL);
        assert_eq!(marker[1].layer, 3);
        assert!(!marker[1].x.is_nan());
    }
}
