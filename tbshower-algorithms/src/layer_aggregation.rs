//! Per-layer slices of clustered hits.
#![allow(clippy::cast_possible_truncation)]

use crate::aggregator::{layer_index, BatchAggregator};
use tbshower_core::{
    AnalysisConfig, HitBatch, ImpactPoints, LayerOccupancy, LayerSlice, Result, OUTLIER_ID,
};

/// Partitions the clustered hits of an event by layer.
#[derive(Clone, Debug, Default)]
pub struct LayerAggregator {
    config: AnalysisConfig,
}

impl LayerAggregator {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Aggregates a batch and records the impact point of every layer.
    ///
    /// # Errors
    /// Same as [`BatchAggregator::aggregate`].
    pub fn aggregate_with_impacts(
        &self,
        batch: &HitBatch,
        impacts: &ImpactPoints,
    ) -> Result<Vec<LayerSlice>> {
        let mut slices = self.aggregate(batch)?;
        for slice in &mut slices {
            slice.impact = impacts.get(slice.layer);
        }
        Ok(slices)
    }

    /// Counts all hits and all clustered hits per layer, with their energies.
    ///
    /// Hits beyond `max_layers` are not counted.
    #[must_use]
    pub fn occupancy(&self, batch: &HitBatch) -> Vec<LayerOccupancy> {
        let mut layers: Vec<LayerOccupancy> = (1..=self.config.max_layers)
            .map(|l| LayerOccupancy {
                layer: l as u32,
                ..LayerOccupancy::default()
            })
            .collect();

        for ((&layer, &cluster_id), &energy) in batch
            .layer()
            .iter()
            .zip(batch.cluster_id())
            .zip(batch.energy())
        {
            let Ok(l) = layer_index(layer, self.config.max_layers) else {
                continue;
            };
            let occ = &mut layers[l];
            occ.n_hits += 1;
            occ.energy += f64::from(energy);
            if cluster_id != OUTLIER_ID {
                occ.n_clustered += 1;
                occ.clustered_energy += f64::from(energy);
            }
        }
        layers
    }
}

impl BatchAggregator for LayerAggregator {
    type Output = Vec<LayerSlice>;

    fn name(&self) -> &'static str {
        "LayerAggregator"
    }

    fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn aggregate(&self, batch: &HitBatch) -> Result<Vec<LayerSlice>> {
        let mut slices: Vec<LayerSlice> = (1..=self.config.max_layers)
            .map(|l| LayerSlice::new(l as u32))
            .collect();

        let rho = batch.rho();
        let delta = batch.delta();
        let is_seed = batch.is_seed();
        let cluster_size = batch.cluster_size();

        let labels = batch.layer().iter().zip(batch.cluster_id());
        for (i, (&layer, &cluster_id)) in labels.enumerate() {
            if cluster_id == OUTLIER_ID {
                continue;
            }
            let slice = &mut slices[layer_index(layer, self.config.max_layers)?];
            slice.n_hits += 1;
            slice.energy.push(batch.energy()[i]);
            slice.x.push(batch.x()[i]);
            slice.y.push(batch.y()[i]);
            if let Some(rho) = rho {
                slice.rho.push(rho[i]);
            }
            if let Some(delta) = delta {
                slice.delta.push(delta[i]);
            }
            if let Some(is_seed) = is_seed {
                slice.is_seed.push(is_seed[i]);
            }
            if let Some(cluster_size) = cluster_size {
                slice.cluster_size.push(cluster_size[i]);
            }
        }

        Ok(slices)
    }
}
