//! Structure of Arrays (`SoA`) storage for the hits of one event.
//!
//! The upstream clustering stage hands over one array per quantity. A
//! [`HitBatch`] keeps that layout, validates it once on construction and
//! is read-only afterwards, so every aggregator can index the columns
//! without re-checking lengths.

use crate::hit::{Hit, OUTLIER_ID};
use crate::{Error, Result, ShowerType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-event metadata shared by every hit of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventContext {
    /// Event number within the run.
    pub event: u64,
    /// Run number.
    pub run: u32,
    /// Nominal beam energy (GeV).
    pub beam_energy: f32,
    /// Shower type of the run.
    pub shower_type: ShowerType,
}

/// Raw columns as delivered by the reader, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitColumns {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub energy: Vec<f32>,
    pub layer: Vec<u32>,
    pub cluster_id: Vec<i32>,
    pub rho: Option<Vec<f32>>,
    pub delta: Option<Vec<f32>>,
    pub is_seed: Option<Vec<bool>>,
    pub cluster_size: Option<Vec<u32>>,
}

/// Validated, immutable hit columns of one event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitBatch {
    context: EventContext,
    x: Vec<f32>,
    y: Vec<f32>,
    energy: Vec<f32>,
    layer: Vec<u32>,
    cluster_id: Vec<i32>,
    rho: Option<Vec<f32>>,
    delta: Option<Vec<f32>>,
    is_seed: Option<Vec<bool>>,
    cluster_size: Option<Vec<u32>>,
}

fn check_len(column: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::ColumnLengthMismatch {
            column,
            expected,
            found,
        })
    }
}

impl HitBatch {
    /// Validates the columns and builds a batch.
    ///
    /// # Errors
    /// Fails if the batch is empty, a column length differs from `x`, a layer
    /// id is 0 or a cluster id is below -1. `i32::MAX` is rejected too, since
    /// cluster id `c` is stored in slot `c + 1`.
    pub fn from_columns(context: EventContext, columns: HitColumns) -> Result<Self> {
        let n = columns.x.len();
        if n == 0 {
            return Err(Error::EmptyBatch);
        }
        check_len("y", n, columns.y.len())?;
        check_len("energy", n, columns.energy.len())?;
        check_len("layer", n, columns.layer.len())?;
        check_len("cluster_id", n, columns.cluster_id.len())?;
        if let Some(rho) = &columns.rho {
            check_len("rho", n, rho.len())?;
        }
        if let Some(delta) = &columns.delta {
            check_len("delta", n, delta.len())?;
        }
        if let Some(is_seed) = &columns.is_seed {
            check_len("is_seed", n, is_seed.len())?;
        }
        if let Some(cluster_size) = &columns.cluster_size {
            check_len("cluster_size", n, cluster_size.len())?;
        }

        if let Some(index) = columns.layer.iter().position(|&l| l == 0) {
            return Err(Error::InvalidLayer { index, layer: 0 });
        }
        if let Some((index, &cluster_id)) = columns
            .cluster_id
            .iter()
            .enumerate()
            .find(|(_, &id)| !(OUTLIER_ID..i32::MAX).contains(&id))
        {
            return Err(Error::InvalidClusterId { index, cluster_id });
        }

        Ok(Self {
            context,
            x: columns.x,
            y: columns.y,
            energy: columns.energy,
            layer: columns.layer,
            cluster_id: columns.cluster_id,
            rho: columns.rho,
            delta: columns.delta,
            is_seed: columns.is_seed,
            cluster_size: columns.cluster_size,
        })
    }

    /// Builds a batch from row-oriented hits.
    ///
    /// An optional column is kept only if every hit carries it.
    ///
    /// # Errors
    /// Same conditions as [`HitBatch::from_columns`].
    pub fn from_hits(context: EventContext, hits: &[Hit]) -> Result<Self> {
        let mut builder = HitBatchBuilder::with_capacity(hits.len());
        for hit in hits {
            builder.push(*hit);
        }
        builder.build(context)
    }

    /// Event metadata.
    #[must_use]
    pub fn context(&self) -> &EventContext {
        &self.context
    }

    /// Returns the number of hits in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false: empty batches are rejected on construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[must_use]
    pub fn x(&self) -> &[f32] {
        &self.x
    }

    #[must_use]
    pub fn y(&self) -> &[f32] {
        &self.y
    }

    #[must_use]
    pub fn energy(&self) -> &[f32] {
        &self.energy
    }

    #[must_use]
    pub fn layer(&self) -> &[u32] {
        &self.layer
    }

    #[must_use]
    pub fn cluster_id(&self) -> &[i32] {
        &self.cluster_id
    }

    #[must_use]
    pub fn rho(&self) -> Option<&[f32]> {
        self.rho.as_deref()
    }

    #[must_use]
    pub fn delta(&self) -> Option<&[f32]> {
        self.delta.as_deref()
    }

    #[must_use]
    pub fn is_seed(&self) -> Option<&[bool]> {
        self.is_seed.as_deref()
    }

    #[must_use]
    pub fn cluster_size(&self) -> Option<&[u32]> {
        self.cluster_size.as_deref()
    }

    /// Row view of hit `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn hit(&self, index: usize) -> Hit {
        Hit {
            x: self.x[index],
            y: self.y[index],
            energy: self.energy[index],
            layer: self.layer[index],
            cluster_id: self.cluster_id[index],
            rho: self.rho.as_ref().map(|c| c[index]),
            delta: self.delta.as_ref().map(|c| c[index]),
            is_seed: self.is_seed.as_ref().map(|c| c[index]),
            cluster_size: self.cluster_size.as_ref().map(|c| c[index]),
        }
    }

    /// Iterates over row views of all hits.
    pub fn iter(&self) -> impl Iterator<Item = Hit> + '_ {
        (0..self.len()).map(move |i| self.hit(i))
    }

    /// Number of hits assigned to some cluster.
    #[must_use]
    pub fn clustered_len(&self) -> usize {
        self.cluster_id.iter().filter(|&&id| id != OUTLIER_ID).count()
    }

    /// Largest cluster id, or -1 if every hit is an outlier.
    #[must_use]
    pub fn max_cluster_id(&self) -> i32 {
        self.cluster_id.iter().copied().max().unwrap_or(OUTLIER_ID)
    }

    /// Largest layer id present in the batch.
    #[must_use]
    pub fn max_layer(&self) -> u32 {
        self.layer.iter().copied().max().unwrap_or(0)
    }
}

/// Incremental builder for a [`HitBatch`].
#[derive(Debug, Clone)]
pub struct HitBatchBuilder {
    columns: HitColumns,
    rho: Vec<f32>,
    delta: Vec<f32>,
    is_seed: Vec<bool>,
    cluster_size: Vec<u32>,
    complete_rho: bool,
    complete_delta: bool,
    complete_seed: bool,
    complete_size: bool,
}

impl HitBatchBuilder {
    /// Creates an empty builder with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: HitColumns {
                x: Vec::with_capacity(capacity),
                y: Vec::with_capacity(capacity),
                energy: Vec::with_capacity(capacity),
                layer: Vec::with_capacity(capacity),
                cluster_id: Vec::with_capacity(capacity),
                ..HitColumns::default()
            },
            rho: Vec::with_capacity(capacity),
            delta: Vec::with_capacity(capacity),
            is_seed: Vec::with_capacity(capacity),
            cluster_size: Vec::with_capacity(capacity),
            complete_rho: true,
            complete_delta: true,
            complete_seed: true,
            complete_size: true,
        }
    }

    /// Number of hits pushed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.x.len()
    }

    /// Returns true if no hit has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.x.is_empty()
    }

    /// Pushes a single hit.
    pub fn push(&mut self, hit: Hit) {
        self.columns.x.push(hit.x);
        self.columns.y.push(hit.y);
        self.columns.energy.push(hit.energy);
        self.columns.layer.push(hit.layer);
        self.columns.cluster_id.push(hit.cluster_id);
        push_optional(&mut self.rho, &mut self.complete_rho, hit.rho);
        push_optional(&mut self.delta, &mut self.complete_delta, hit.delta);
        push_optional(&mut self.is_seed, &mut self.complete_seed, hit.is_seed);
        push_optional(&mut self.cluster_size, &mut self.complete_size, hit.cluster_size);
    }

    /// Validates and freezes the pushed hits.
    ///
    /// # Errors
    /// Same conditions as [`HitBatch::from_columns`].
    pub fn build(self, context: EventContext) -> Result<HitBatch> {
        let mut columns = self.columns;
        columns.rho = self.complete_rho.then_some(self.rho);
        columns.delta = self.complete_delta.then_some(self.delta);
        columns.is_seed = self.complete_seed.then_some(self.is_seed);
        columns.cluster_size = self.complete_size.then_some(self.cluster_size);
        HitBatch::from_columns(context, columns)
    }
}

impl Default for HitBatchBuilder {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

fn push_optional<T>(column: &mut Vec<T>, complete: &mut bool, value: Option<T>) {
    match value {
        Some(v) if *complete => column.push(v),
        Some(_) => {}
        None => {
            *complete = false;
            column.clear();
        }
    }
}
