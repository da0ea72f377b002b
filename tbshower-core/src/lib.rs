//! tbshower-core: Core types for calorimeter test-beam shower analysis.
//!
//! This crate provides the validated hit container, the analysis
//! configuration, the logarithmic weighting shared by the centroid
//! estimators, and the result records the aggregators produce.
//!

pub mod cluster;
pub mod config;
pub mod error;
pub mod hit;
pub mod impact;
pub mod layer;
pub mod soa;
pub mod weighting;

pub use cluster::{
    ClusterAnalysis, ClusterOutput, ClusterPosition, ClusterSummary, LayerClusters, PositionEnergy,
    Residual,
};
pub use config::{AnalysisConfig, ShowerType, ZeroWeightSentinel, CENTROID_SENTINEL};
pub use error::{Error, Result};
pub use hit::{Hit, OUTLIER_ID};
pub use impact::{ImpactPoint, ImpactPoints};
pub use layer::{LayerOccupancy, LayerSlice};
pub use soa::{EventContext, HitBatch, HitBatchBuilder, HitColumns};
pub use weighting::{log_weight, WeightedCentroid};
