//! Per-layer 2D cluster aggregation.
//!
//! Clusters are identified by `(layer, cluster id)`: the clustering stage
//! runs layer by layer, so the same id on two layers names two different
//! clusters. For each cluster the aggregator sums the energy of all
//! members, then builds a log-weighted centroid from only those members
//! that lie within `distance_cut` of the cluster's most energetic hit.
#![allow(clippy::cast_possible_truncation)]

use crate::aggregator::{layer_index, BatchAggregator};
use crate::resolution::attach_residuals;
use std::collections::HashMap;
use tbshower_core::{
    log_weight, AnalysisConfig, ClusterAnalysis, ClusterSummary, HitBatch, ImpactPoints,
    LayerClusters, Result, WeightedCentroid, CENTROID_SENTINEL, OUTLIER_ID,
};

/// Hits of one `(layer, cluster id)` group, in scan order.
#[derive(Debug)]
struct ClusterSlot {
    layer: u32,
    cluster_id: i32,
    members: Vec<usize>,
    energy: f64,
}

/// Dense slot arena for one event.
///
/// Slots are allocated in first-seen order; `by_layer[l]` lists the slots of
/// layer `l + 1` in that same order.
#[derive(Debug)]
struct SlotArena {
    slots: Vec<ClusterSlot>,
    by_layer: Vec<Vec<usize>>,
}

impl SlotArena {
    fn build(batch: &HitBatch, max_layers: usize) -> Result<Self> {
        let mut slots: Vec<ClusterSlot> = Vec::new();
        let mut by_layer = vec![Vec::new(); max_layers];
        let mut lookup: HashMap<(u32, i32), usize> = HashMap::new();

        let energies = batch.energy();
        let labels = batch.layer().iter().zip(batch.cluster_id());
        for (i, (&layer, &cluster_id)) in labels.enumerate() {
            if cluster_id == OUTLIER_ID {
                continue;
            }
            let l = layer_index(layer, max_layers)?;
            let slot = *lookup.entry((layer, cluster_id)).or_insert_with(|| {
                slots.push(ClusterSlot {
                    layer,
                    cluster_id,
                    members: Vec::new(),
                    energy: 0.0,
                });
                by_layer[l].push(slots.len() - 1);
                slots.len() - 1
            });
            let entry = &mut slots[slot];
            entry.members.push(i);
            entry.energy += f64::from(energies[i]);
        }

        Ok(Self { slots, by_layer })
    }
}

/// Aggregates hits into per-layer clusters with a cut, log-weighted centroid.
#[derive(Clone, Debug, Default)]
pub struct ClusterAggregator {
    config: AnalysisConfig,
}

impl ClusterAggregator {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Aggregates a batch and attaches residuals for every layer that has an
    /// impact point.
    ///
    /// # Errors
    /// Returns [`tbshower_core::Error::LayerOutOfRange`] if a clustered hit
    /// lies beyond `max_layers`.
    pub fn aggregate_with_impacts(
        &self,
        batch: &HitBatch,
        impacts: &ImpactPoints,
    ) -> Result<ClusterAnalysis> {
        let analysis = self.aggregate(batch)?;
        Ok(attach_residuals(analysis, impacts))
    }

    fn summarize(&self, batch: &HitBatch, slot: &ClusterSlot) -> ClusterSummary {
        let x = batch.x();
        let y = batch.y();
        let energy = batch.energy();

        // `>=` keeps the last of several equally energetic hits
        let mut anchor = slot.members[0];
        for &i in &slot.members {
            if energy[i] >= energy[anchor] {
                anchor = i;
            }
        }
        let anchor_hit = batch.hit(anchor);

        let within_cut: Vec<usize> = slot
            .members
            .iter()
            .copied()
            .filter(|&i| batch.hit(i).distance(&anchor_hit) < self.config.distance_cut)
            .collect();
        let energy_cut: f64 = within_cut.iter().map(|&i| f64::from(energy[i])).sum();

        let mut centroid = WeightedCentroid::default();
        for &i in &within_cut {
            let w = log_weight(f64::from(energy[i]), energy_cut, self.config.log_weight_floor);
            centroid.add(x[i], y[i], w);
        }

        let (cx, cy) = match centroid.position() {
            Some((cx, cy)) => (cx as f32, cy as f32),
            None => {
                log::trace!(
                    "cluster {} on layer {} has zero total log weight",
                    slot.cluster_id,
                    slot.layer
                );
                (CENTROID_SENTINEL, CENTROID_SENTINEL)
            }
        };

        ClusterSummary {
            layer: slot.layer,
            cluster_id: slot.cluster_id,
            n_hits: slot.members.len(),
            energy: slot.energy as f32,
            energy_cut: energy_cut as f32,
            x: cx,
            y: cy,
            residual: None,
        }
    }
}

impl BatchAggregator for ClusterAggregator {
    type Output = ClusterAnalysis;

    fn name(&self) -> &'static str {
        "ClusterAggregator"
    }

    fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn aggregate(&self, batch: &HitBatch) -> Result<ClusterAnalysis> {
        let arena = SlotArena::build(batch, self.config.max_layers)?;

        let layers = arena
            .by_layer
            .iter()
            .enumerate()
            .map(|(l, slots)| LayerClusters {
                layer: l as u32 + 1,
                clusters: slots
                    .iter()
                    .map(|&s| self.summarize(batch, &arena.slots[s]))
                    .collect(),
            })
            .collect();

        Ok(ClusterAnalysis { layers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tbshower_core::{Error, EventContext, Hit, ImpactPoint};

    fn batch(hits: &[Hit]) -> HitBatch {
        HitBatch::from_hits(EventContext::default(), hits).unwrap()
    }

    fn aggregator() -> ClusterAggregator {
        ClusterAggregator::new(AnalysisConfig::default().with_max_layers(3))
    }

    #[test]
    fn test_distance_cut_excludes_far_hit() {
        let hits = [
            Hit::new(0.0, 0.0, 10.0, 1, 0),
            Hit::new(1.0, 1.0, 5.0, 1, 0),
            Hit::new(9.0, 9.0, 100.0, 1, -1),
        ];
        let analysis = aggregator().aggregate(&batch(&hits)).unwrap();

        let layer = analysis.layer(1).unwrap();
        assert_eq!(layer.len(), 1);
        let c = layer.clusters[0];
        assert_eq!(c.n_hits, 2);
        assert_relative_eq!(c.energy, 15.0);
        assert_relative_eq!(c.energy_cut, 10.0);
        assert_relative_eq!(c.x, 0.0);
        assert_relative_eq!(c.y, 0.0);
        assert!(c.residual.is_none());
    }

    #[test]
    fn test_same_id_on_two_layers_is_two_clusters() {
        let hits = [
            Hit::new(0.0, 0.0, 1.0, 1, 0),
            Hit::new(5.0, 5.0, 2.0, 2, 0),
            Hit::new(5.5, 5.0, 2.0, 2, 0),
        ];
        let analysis = aggregator().aggregate(&batch(&hits)).unwrap();
        assert_eq!(analysis.layers.len(), 3);
        assert_eq!(analysis.n_clusters(), 2);
        assert_eq!(analysis.layer(1).unwrap().clusters[0].n_hits, 1);
        let c = analysis.layer(2).unwrap().clusters[0];
        assert_eq!(c.n_hits, 2);
        assert_relative_eq!(c.x, 5.25);
        assert!(analysis.layer(3).unwrap().is_empty());
    }

    #[test]
    fn test_first_seen_order() {
        let hits = [
            Hit::new(0.0, 0.0, 1.0, 1, 7),
            Hit::new(3.0, 0.0, 1.0, 1, 2),
            Hit::new(0.1, 0.0, 1.0, 1, 7),
        ];
        let analysis = aggregator().aggregate(&batch(&hits)).unwrap();
        let ids: Vec<i32> = analysis
            .layer(1)
            .unwrap()
            .clusters
            .iter()
            .map(|c| c.cluster_id)
            .collect();
        assert_eq!(ids, vec![7, 2]);
    }

    #[test]
    fn test_tie_break_prefers_later_hit() {
        // Equal energies: the anchor is hit 1, so hit 0 at distance 2 is cut
        // while hit 2 next to the anchor survives.
        let hits = [
            Hit::new(0.0, 0.0, 4.0, 1, 0),
            Hit::new(2.0, 0.0, 4.0, 1, 0),
            Hit::new(3.0, 0.0, 1.0, 1, 0),
        ];
        let analysis = aggregator().aggregate(&batch(&hits)).unwrap();
        let c = analysis.layer(1).unwrap().clusters[0];
        assert_relative_eq!(c.energy, 9.0);
        assert_relative_eq!(c.energy_cut, 5.0);
        assert!(c.x > 2.0 && c.x < 3.0);
    }

    #[test]
    fn test_zero_weight_sentinel() {
        let config = AnalysisConfig::default()
            .with_max_layers(1)
            .with_log_weight_floor(0.1);
        // Two equal hits: each weight is max(0.1 + ln(0.5), 0) = 0
        let hits = [
            Hit::new(0.0, 0.0, 1e-6, 1, 0),
            Hit::new(0.5, 0.0, 1e-6, 1, 0),
        ];
        let c = ClusterAggregator::new(config)
            .aggregate(&batch(&hits))
            .unwrap()
            .layer(1)
            .unwrap()
            .clusters[0];
        assert_relative_eq!(c.x, CENTROID_SENTINEL);
        assert_relative_eq!(c.y, CENTROID_SENTINEL);
        assert!(!c.has_position());
    }

    #[test]
    fn test_residuals_attached_per_layer() {
        let hits = [Hit::new(1.0, 2.0, 3.0, 1, 0), Hit::new(4.0, 4.0, 3.0, 2, 0)];
        let mut impacts = ImpactPoints::new();
        impacts.insert(1, ImpactPoint::new(1.5, 1.0));

        let analysis = aggregator()
            .aggregate_with_impacts(&batch(&hits), &impacts)
            .unwrap();
        let r = analysis.layer(1).unwrap().clusters[0].residual.unwrap();
        assert_relative_eq!(r.dx, 0.5);
        assert_relative_eq!(r.dy, -1.0);
        assert!(analysis.layer(2).unwrap().clusters[0].residual.is_none());
    }

    #[test]
    fn test_layer_out_of_range() {
        let hits = [Hit::new(0.0, 0.0, 1.0, 4, 0)];
        let err = aggregator().aggregate(&batch(&hits)).unwrap_err();
        assert_eq!(
            err,
            Error::LayerOutOfRange {
                layer: 4,
                max_layers: 3
            }
        );
    }

    #[test]
    fn test_outlier_beyond_layers_is_ignored() {
        let hits = [Hit::new(0.0, 0.0, 1.0, 1, 0), Hit::new(0.0, 0.0, 1.0, 9, -1)];
        assert!(aggregator().aggregate(&batch(&hits)).is_ok());
    }
}
