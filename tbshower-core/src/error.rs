//! Error types for tbshower-core.

use thiserror::Error;

/// Result type alias for tbshower operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for tbshower operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A hit batch was built without any hits.
    #[error("hit batch is empty")]
    EmptyBatch,

    /// A per-hit column does not match the length of the position column.
    #[error("column '{column}' has {found} entries, expected {expected}")]
    ColumnLengthMismatch {
        column: &'static str,
        expected: usize,
        found: usize,
    },

    /// Layer ids are 1-based.
    #[error("hit {index} has invalid layer id {layer}")]
    InvalidLayer { index: usize, layer: u32 },

    /// Cluster ids are either -1 (outlier) or in `0..i32::MAX`.
    #[error("hit {index} has invalid cluster id {cluster_id}")]
    InvalidClusterId { index: usize, cluster_id: i32 },

    /// A hit lies beyond the configured number of layers.
    #[error("layer {layer} exceeds the configured {max_layers} layers")]
    LayerOutOfRange { layer: u32, max_layers: usize },

    /// Total energy was requested before any cluster energy was recorded.
    #[error("no cluster energies have been recorded")]
    NoClusterEnergy,

    /// Positions and energies recorded for the same event disagree in length.
    #[error("event record has {positions} positions but {energies} energies")]
    RecordLengthMismatch { positions: usize, energies: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
