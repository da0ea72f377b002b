//! Common interface of the per-event aggregators.

use tbshower_core::{AnalysisConfig, HitBatch, Result};

/// An analysis step that turns one event's hits into derived quantities.
///
/// Aggregators hold only their configuration; every call recomputes its
/// result from the batch, so the same aggregator can serve many events
/// and threads at once.
pub trait BatchAggregator: Send + Sync {
    /// Result produced for one batch.
    type Output;

    /// Name used in log messages.
    fn name(&self) -> &'static str;

    /// Current configuration.
    fn config(&self) -> &AnalysisConfig;

    /// Aggregates one batch.
    ///
    /// # Errors
    /// Returns an error if the batch violates the configured geometry.
    fn aggregate(&self, batch: &HitBatch) -> Result<Self::Output>;
}

/// Layer index (0-based) of `layer`, checked against the configured count.
pub(crate) fn layer_index(layer: u32, max_layers: usize) -> Result<usize> {
    let index = layer as usize - 1;
    if index < max_layers {
        Ok(index)
    } else {
        Err(tbshower_core::Error::LayerOutOfRange { layer, max_layers })
    }
}
