//! tbshower-algorithms: Cluster and layer aggregation of clustered hits.
//!
//! This crate turns the output of an external clustering stage into
//! physics quantities:
//! - **ClusterAggregator** - per-layer 2D clusters with a cut, log-weighted centroid
//! - **LayerAggregator** - per-layer slices of clustered hits
//! - **PositionEnergyEstimator** - uncut centroid and energy per cluster id
//! - **Resolution** - residuals against the track impact points
//! - **ResultAccumulator** - run-level totals for reporting
//!
#![warn(missing_docs)]

mod accumulator;
mod aggregator;
mod cluster_aggregation;
mod layer_aggregation;
mod position_energy;
mod processing;
pub mod resolution;

pub use accumulator::{EventRecord, ResultAccumulator};
pub use aggregator::BatchAggregator;
pub use cluster_aggregation::ClusterAggregator;
pub use layer_aggregation::LayerAggregator;
pub use position_energy::PositionEnergyEstimator;
pub use processing::{
    analyze_event, analyze_run, analyze_stream, EventAnalysis, EventInput, LayerSummary,
    RunAnalysis, RunSummary,
};
pub use resolution::{ResidualMoments, ResolutionStats};

// Re-export core configuration
pub use tbshower_core::{AnalysisConfig, ShowerType, ZeroWeightSentinel};
