//! Append-only accumulation of estimator output across events.

use tbshower_core::{ClusterOutput, ClusterPosition, Error, PositionEnergy, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Estimator output of one event. Either part may be missing.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventRecord {
    /// Positions indexed by `cluster_id + 1`.
    pub positions: Option<Vec<ClusterPosition>>,
    /// Energies indexed by `cluster_id + 1`.
    pub energies: Option<Vec<f32>>,
}

impl EventRecord {
    fn len(&self) -> usize {
        match (&self.positions, &self.energies) {
            (Some(p), _) => p.len(),
            (None, Some(e)) => e.len(),
            (None, None) => 0,
        }
    }
}

/// Collects per-event cluster positions and energies for reporting.
///
/// Records are only ever appended. A host processing events on several
/// threads either serializes `record` calls or gives each worker its own
/// accumulator and [`merge`](Self::merge)s them afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultAccumulator {
    records: Vec<EventRecord>,
}

impl ResultAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the output of one event.
    ///
    /// # Errors
    /// Returns [`Error::RecordLengthMismatch`] if both parts are present
    /// with different lengths; nothing is recorded in that case.
    pub fn record(
        &mut self,
        positions: Option<Vec<ClusterPosition>>,
        energies: Option<Vec<f32>>,
    ) -> Result<()> {
        if let (Some(p), Some(e)) = (&positions, &energies) {
            if p.len() != e.len() {
                return Err(Error::RecordLengthMismatch {
                    positions: p.len(),
                    energies: e.len(),
                });
            }
        }
        self.records.push(EventRecord {
            positions,
            energies,
        });
        Ok(())
    }

    /// Appends an estimator result; empty parts count as not computed.
    ///
    /// # Errors
    /// Same as [`record`](Self::record).
    pub fn record_estimate(&mut self, estimate: PositionEnergy) -> Result<()> {
        let positions = (!estimate.positions.is_empty()).then_some(estimate.positions);
        let energies = (!estimate.energies.is_empty()).then_some(estimate.energies);
        self.record(positions, energies)
    }

    /// Appends all records of another accumulator after this one's.
    pub fn merge(&mut self, other: ResultAccumulator) {
        self.records.extend(other.records);
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no event was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recorded events in insertion order.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Clustered energy summed over all events, outlier slots excluded.
    ///
    /// # Errors
    /// Returns [`Error::NoClusterEnergy`] if no event recorded a single
    /// energy value.
    #[allow(clippy::cast_possible_truncation)]
    pub fn total_energy(&self) -> Result<f32> {
        let mut seen = false;
        let mut total = 0.0f64;
        for energies in self.records.iter().filter_map(|r| r.energies.as_deref()) {
            seen |= !energies.is_empty();
            total += energies.iter().skip(1).map(|&e| f64::from(e)).sum::<f64>();
        }
        if seen {
            Ok(total as f32)
        } else {
            Err(Error::NoClusterEnergy)
        }
    }

    /// One `(x, y, layer, energy)` entry per recorded slot, outliers included.
    ///
    /// Fields that were not computed for an event are reported as 0.
    #[must_use]
    pub fn cluster_outputs(&self) -> Vec<ClusterOutput> {
        let mut out = Vec::with_capacity(self.records.iter().map(EventRecord::len).sum());
        for record in &self.records {
            for i in 0..record.len() {
                let mut entry = ClusterOutput::default();
                if let Some(p) = record.positions.as_ref().and_then(|p| p.get(i)) {
                    entry.x = p.x;
                    entry.y = p.y;
                    entry.layer = p.layer;
                }
                if let Some(&e) = record.energies.as_ref().and_then(|e| e.get(i)) {
                    entry.energy = e;
                }
                out.push(entry);
            }
        }
        out
    }
}
