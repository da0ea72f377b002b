//! High-level helpers that run every aggregator over events and runs.

use crate::{
    BatchAggregator, ClusterAggregator, LayerAggregator, PositionEnergyEstimator, ResolutionStats,
    ResultAccumulator,
};
use rayon::prelude::*;
use tbshower_core::{
    AnalysisConfig, ClusterAnalysis, EventContext, HitBatch, ImpactPoints, LayerOccupancy,
    LayerSlice, PositionEnergy, Result,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hits of one event together with its optional track impact points.
#[derive(Debug, Clone)]
pub struct EventInput {
    /// Validated hits.
    pub batch: HitBatch,
    /// Impact points per layer, if the event had a reconstructed track.
    pub impacts: Option<ImpactPoints>,
}

impl EventInput {
    /// Wraps a batch without impact points.
    #[must_use]
    pub fn new(batch: HitBatch) -> Self {
        Self {
            batch,
            impacts: None,
        }
    }

    /// Attaches impact points.
    #[must_use]
    pub fn with_impacts(mut self, impacts: ImpactPoints) -> Self {
        self.impacts = Some(impacts);
        self
    }
}

/// Every derived quantity of one event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventAnalysis {
    /// Event metadata.
    pub context: EventContext,
    /// Per-layer clusters with cut centroids and residuals.
    pub clusters: ClusterAnalysis,
    /// Per-layer clustered hits.
    pub layers: Vec<LayerSlice>,
    /// Per-layer hit and energy counts, outliers included.
    pub occupancy: Vec<LayerOccupancy>,
    /// Uncut centroid and energy per cluster id.
    pub position_energy: PositionEnergy,
}

/// Runs all aggregators over one event.
///
/// # Errors
/// Fails on an invalid configuration or a clustered hit beyond
/// `config.max_layers`.
pub fn analyze_event(
    batch: &HitBatch,
    impacts: Option<&ImpactPoints>,
    config: &AnalysisConfig,
) -> Result<EventAnalysis> {
    config.validate()?;

    let cluster_aggregator = ClusterAggregator::new(config.clone());
    let clusters = match impacts {
        Some(impacts) => cluster_aggregator.aggregate_with_impacts(batch, impacts)?,
        None => cluster_aggregator.aggregate(batch)?,
    };
    let layer_aggregator = LayerAggregator::new(config.clone());
    let layers = match impacts {
        Some(impacts) => layer_aggregator.aggregate_with_impacts(batch, impacts)?,
        None => layer_aggregator.aggregate(batch)?,
    };
    let occupancy = layer_aggregator.occupancy(batch);
    let position_energy = PositionEnergyEstimator::new(config.clone()).estimate(batch);

    log::debug!(
        "event {}: {} hits, {} clusters, {:.3} clustered energy",
        batch.context().event,
        batch.len(),
        clusters.n_clusters(),
        position_energy.clustered_energy()
    );

    Ok(EventAnalysis {
        context: *batch.context(),
        clusters,
        layers,
        occupancy,
        position_energy,
    })
}

/// Results of a whole run, events kept in input order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunAnalysis {
    /// Per-event results.
    pub events: Vec<EventAnalysis>,
    /// Uncut estimator output of every event.
    pub accumulator: ResultAccumulator,
    /// Per-layer residual statistics.
    pub resolution: ResolutionStats,
    occupancy: Vec<LayerOccupancy>,
}

impl RunAnalysis {
    /// Creates an empty run for `max_layers` layers.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(max_layers: usize) -> Self {
        Self {
            events: Vec::new(),
            accumulator: ResultAccumulator::new(),
            resolution: ResolutionStats::new(),
            occupancy: (1..=max_layers)
                .map(|l| LayerOccupancy {
                    layer: l as u32,
                    ..LayerOccupancy::default()
                })
                .collect(),
        }
    }

    /// Appends one event.
    ///
    /// # Errors
    /// Propagates [`ResultAccumulator::record_estimate`] errors; the run is
    /// left untouched in that case.
    pub fn push(&mut self, event: EventAnalysis) -> Result<()> {
        self.accumulator
            .record_estimate(event.position_energy.clone())?;
        self.resolution.add_event(&event.clusters);
        for (total, occ) in self.occupancy.iter_mut().zip(&event.occupancy) {
            total.merge(occ);
        }
        self.events.push(event);
        Ok(())
    }

    /// Per-layer hit/energy counts summed over the run.
    #[must_use]
    pub fn layer_totals(&self) -> &[LayerOccupancy] {
        &self.occupancy
    }

    /// Number of 2D clusters over all events.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.events.iter().map(|e| e.clusters.n_clusters()).sum()
    }

    /// Short report of the run.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let layers = self
            .occupancy
            .iter()
            .map(|occ| {
                let moments = self.resolution.layer(occ.layer);
                LayerSummary {
                    layer: occ.layer,
                    n_hits: occ.n_hits,
                    n_clustered: occ.n_clustered,
                    hits_fraction: occ.hits_fraction(),
                    energy_fraction: occ.energy_fraction(),
                    n_residuals: moments.map_or(0, |m| m.count),
                    mean_residual: moments.and_then(|m| m.mean()),
                    resolution: moments.and_then(|m| m.std_dev()),
                }
            })
            .collect();

        RunSummary {
            n_events: self.events.len(),
            n_clusters: self.n_clusters(),
            total_energy: self.accumulator.total_energy().ok(),
            layers,
        }
    }
}

/// Per-layer line of a [`RunSummary`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerSummary {
    /// Layer id.
    pub layer: u32,
    /// All hits on the layer.
    pub n_hits: usize,
    /// Hits assigned to a cluster.
    pub n_clustered: usize,
    /// Clustered hits over all hits.
    pub hits_fraction: f64,
    /// Clustered energy over all energy.
    pub energy_fraction: f64,
    /// Number of residuals measured.
    pub n_residuals: usize,
    /// Mean `(dx, dy)`.
    pub mean_residual: Option<(f64, f64)>,
    /// Standard deviation of `(dx, dy)`.
    pub resolution: Option<(f64, f64)>,
}

/// Run-level report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Events analyzed.
    pub n_events: usize,
    /// 2D clusters found.
    pub n_clusters: usize,
    /// Clustered energy, `None` if no energy was computed.
    pub total_energy: Option<f32>,
    /// One entry per configured layer.
    pub layers: Vec<LayerSummary>,
}

/// Analyzes every event of a run in parallel.
///
/// Events are analyzed independently on the rayon pool, then appended to
/// the run in input order.
///
/// # Errors
/// Fails on the first event that cannot be analyzed; no partial run is
/// returned.
pub fn analyze_run(inputs: &[EventInput], config: &AnalysisConfig) -> Result<RunAnalysis> {
    config.validate()?;
    log::info!(
        "analyzing {} events ({} shower, {} layers, W0 = {}, cut = {})",
        inputs.len(),
        config.shower_type,
        config.max_layers,
        config.log_weight_floor,
        config.distance_cut
    );

    let events: Vec<EventAnalysis> = inputs
        .par_iter()
        .map(|input| analyze_event(&input.batch, input.impacts.as_ref(), config))
        .collect::<Result<_>>()?;

    let mut run = RunAnalysis::new(config.max_layers);
    for event in events {
        run.push(event)?;
    }

    log::info!(
        "found {} clusters in {} events",
        run.n_clusters(),
        run.events.len()
    );
    Ok(run)
}

/// Analyzes events one at a time from an iterator.
///
/// # Errors
/// Same as [`analyze_run`].
pub fn analyze_stream<I>(inputs: I, config: &AnalysisConfig) -> Result<RunAnalysis>
where
    I: IntoIterator<Item = EventInput>,
{
    config.validate()?;
    let mut run = RunAnalysis::new(config.max_layers);
    for input in inputs {
        run.push(analyze_event(&input.batch, input.impacts.as_ref(), config)?)?;
    }
    Ok(run)
}
