//! Reference impact points from the beam tracking.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Extrapolated track position on one layer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImpactPoint {
    pub x: f32,
    pub y: f32,
}

impl ImpactPoint {
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Impact points of one event, indexed by layer id.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImpactPoints {
    points: BTreeMap<u32, ImpactPoint>,
}

impl ImpactPoints {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from per-layer arrays where index 0 is layer 1.
    ///
    /// Non-finite entries mark layers without a track extrapolation.
    #[must_use]
    pub fn from_arrays(x: &[f32], y: &[f32]) -> Self {
        let points = (1u32..)
            .zip(x.iter().zip(y))
            .filter(|(_, (x, y))| x.is_finite() && y.is_finite())
            .map(|(layer, (&x, &y))| (layer, ImpactPoint::new(x, y)))
            .collect();
        Self { points }
    }

    /// Sets the impact point of `layer` (1-based). Layer 0 is ignored.
    pub fn insert(&mut self, layer: u32, point: ImpactPoint) {
        if layer > 0 {
            self.points.insert(layer, point);
        }
    }

    /// Impact point of `layer` (1-based), if known.
    #[must_use]
    pub fn get(&self, layer: u32) -> Option<ImpactPoint> {
        self.points.get(&layer).copied()
    }

    /// Number of layers with a known impact point.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no layer has an impact point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut points = ImpactPoints::new();
        assert!(points.is_empty());
        points.insert(3, ImpactPoint::new(1.0, 2.0));
        points.insert(0, ImpactPoint::new(5.0, 5.0));
        assert_eq!(points.len(), 1);
        assert_eq!(points.get(3), Some(ImpactPoint::new(1.0, 2.0)));
        assert_eq!(points.get(1), None);
        assert_eq!(points.get(0), None);
        assert_eq!(points.get(40), None);
    }

    #[test]
    fn test_far_layer_ids_stay_sparse() {
        let mut points = ImpactPoints::new();
        points.insert(u32::MAX, ImpactPoint::new(1.0, 1.0));
        points.insert(2, ImpactPoint::new(0.0, 0.0));
        assert_eq!(points.len(), 2);
        assert_eq!(points.get(u32::MAX), Some(ImpactPoint::new(1.0, 1.0)));
        assert_eq!(points.get(u32::MAX - 1), None);
    }

    #[test]
    fn test_from_arrays_skips_missing_layers() {
        let points = ImpactPoints::from_arrays(&[1.0, f32::NAN, 3.0], &[1.5, 2.5, 3.5]);
        assert_eq!(points.len(), 2);
        assert_eq!(points.get(1), Some(ImpactPoint::new(1.0, 1.5)));
        assert_eq!(points.get(2), None);
        assert_eq!(points.get(3), Some(ImpactPoint::new(3.0, 3.5)));
    }
}
