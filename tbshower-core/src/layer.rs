//! Per-layer result records.

use crate::impact::ImpactPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Clustered hits of one layer, in original relative order.
///
/// Columns that the batch did not carry (rho, delta, seed flag, cluster
/// size) stay empty; `n_hits` is always authoritative.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerSlice {
    pub layer: u32,
    pub n_hits: usize,
    pub energy: Vec<f32>,
    pub rho: Vec<f32>,
    pub delta: Vec<f32>,
    pub is_seed: Vec<bool>,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub cluster_size: Vec<u32>,
    /// Track impact point on this layer, when one was supplied.
    pub impact: Option<ImpactPoint>,
}

impl LayerSlice {
    /// Creates an empty slice for `layer`.
    #[must_use]
    pub fn new(layer: u32) -> Self {
        Self {
            layer,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_hits == 0
    }

    /// Energy of the clustered hits.
    #[must_use]
    pub fn energy_sum(&self) -> f32 {
        self.energy.iter().sum()
    }

    /// Number of seed hits, 0 if the seed column is absent.
    #[must_use]
    pub fn n_seeds(&self) -> usize {
        self.is_seed.iter().filter(|&&s| s).count()
    }
}

/// Per-layer counts over all hits, clustered or not.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerOccupancy {
    pub layer: u32,
    pub n_hits: usize,
    pub n_clustered: usize,
    pub energy: f64,
    pub clustered_energy: f64,
}

impl LayerOccupancy {
    /// Fraction of the hits that were clustered, 0 for an empty layer.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hits_fraction(&self) -> f64 {
        if self.n_hits == 0 {
            0.0
        } else {
            self.n_clustered as f64 / self.n_hits as f64
        }
    }

    /// Fraction of the energy that was clustered, 0 for an empty layer.
    #[must_use]
    pub fn energy_fraction(&self) -> f64 {
        if self.energy > 0.0 {
            self.clustered_energy / self.energy
        } else {
            0.0
        }
    }

    /// Adds the counts of another occupancy of the same layer.
    pub fn merge(&mut self, other: &Self) {
        self.n_hits += other.n_hits;
        self.n_clustered += other.n_clustered;
        self.energy += other.energy;
        self.clustered_energy += other.clustered_energy;
    }
}
