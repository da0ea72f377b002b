//! Single calorimeter hit as produced by the upstream clustering stage.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cluster id assigned to hits that belong to no cluster.
pub const OUTLIER_ID: i32 = -1;

/// One detector-channel reading with its clustering metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// X position in the detector plane.
    pub x: f32,
    /// Y position in the detector plane.
    pub y: f32,
    /// Deposited energy (used as the hit weight).
    pub energy: f32,
    /// Layer id, starting at 1.
    pub layer: u32,
    /// Cluster id within the layer, or [`OUTLIER_ID`].
    pub cluster_id: i32,
    /// Local density estimate.
    pub rho: Option<f32>,
    /// Distance to the nearest hit of higher density.
    pub delta: Option<f32>,
    /// Whether the clustering promoted this hit to a seed.
    pub is_seed: Option<bool>,
    /// Size of the cluster this hit was assigned to.
    pub cluster_size: Option<u32>,
}

impl Hit {
    /// Creates a hit without the optional clustering columns.
    #[must_use]
    pub fn new(x: f32, y: f32, energy: f32, layer: u32, cluster_id: i32) -> Self {
        Self {
            x,
            y,
            energy,
            layer,
            cluster_id,
            rho: None,
            delta: None,
            is_seed: None,
            cluster_size: None,
        }
    }

    /// Attaches the density/separation/seed columns.
    #[must_use]
    pub fn with_clue(mut self, rho: f32, delta: f32, is_seed: bool, cluster_size: u32) -> Self {
        self.rho = Some(rho);
        self.delta = Some(delta);
        self.is_seed = Some(is_seed);
        self.cluster_size = Some(cluster_size);
        self
    }

    /// Returns true if the hit was not assigned to any cluster.
    #[inline]
    #[must_use]
    pub fn is_outlier(&self) -> bool {
        self.cluster_id == OUTLIER_ID
    }

    /// Euclidean distance to another hit in the detector plane.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}
