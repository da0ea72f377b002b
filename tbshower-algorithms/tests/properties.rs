#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
use tbshower_algorithms::{
    AnalysisConfig, BatchAggregator, ClusterAggregator, LayerAggregator, PositionEnergyEstimator,
    ResultAccumulator,
};
use tbshower_core::{EventContext, HitBatch, HitColumns, OUTLIER_ID};

const LAYERS: usize = 6;

/// Deterministic linear congruential generator for reproducible hit layouts.
struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as u32
    }

    fn uniform(&mut self) -> f32 {
        self.next_u32() as f32 / (1u64 << 31) as f32
    }
}

fn generate_event(seed: u64, n_hits: usize) -> HitBatch {
    let mut rng = Lcg(seed);
    let mut cols = HitColumns::default();
    for _ in 0..n_hits {
        let cluster = rng.next_u32() % 5;
        cols.x.push(cluster as f32 * 3.0 + rng.uniform() * 2.0);
        cols.y.push(rng.uniform() * 2.0);
        cols.energy.push(0.01 + rng.uniform() * 20.0);
        cols.layer.push(1 + rng.next_u32() % LAYERS as u32);
        // cluster 4 plays the outliers
        cols.cluster_id
            .push(if cluster == 4 { OUTLIER_ID } else { cluster as i32 });
    }
    HitBatch::from_columns(EventContext::default(), cols).unwrap()
}

fn config() -> AnalysisConfig {
    AnalysisConfig::default().with_max_layers(LAYERS)
}

#[test]
fn test_layer_counts_match_clustered_hits() {
    for seed in 0..20 {
        let batch = generate_event(seed, 200);
        let slices = LayerAggregator::new(config()).aggregate(&batch).unwrap();
        for slice in &slices {
            let expected = batch
                .layer()
                .iter()
                .zip(batch.cluster_id())
                .filter(|(&l, &id)| l == slice.layer && id != OUTLIER_ID)
                .count();
            assert_eq!(slice.n_hits, expected, "seed {seed} layer {}", slice.layer);
            assert_eq!(slice.energy.len(), expected);
            assert_eq!(slice.x.len(), expected);
        }
        let total: usize = slices.iter().map(|s| s.n_hits).sum();
        assert_eq!(total, batch.clustered_len());
    }
}

#[test]
fn test_cut_energy_never_exceeds_total() {
    for seed in 0..20 {
        let batch = generate_event(seed, 150);
        let clusters = ClusterAggregator::new(config()).aggregate(&batch).unwrap();
        for c in clusters.clusters() {
            assert!(c.energy_cut > 0.0);
            assert!(
                c.energy_cut <= c.energy * (1.0 + 1e-6),
                "seed {seed}: cut {} > total {}",
                c.energy_cut,
                c.energy
            );
            assert!(!c.x.is_nan() && !c.y.is_nan());
        }
    }
}

#[test]
fn test_hit_counts_partition_clustered_hits() {
    let batch = generate_event(99, 300);
    let clusters = ClusterAggregator::new(config()).aggregate(&batch).unwrap();
    let n: usize = clusters.clusters().map(|c| c.n_hits).sum();
    assert_eq!(n, batch.clustered_len());
}

#[test]
fn test_aggregation_is_idempotent() {
    let batch = generate_event(7, 250);
    let clusters = ClusterAggregator::new(config());
    let layers = LayerAggregator::new(config());
    let estimator = PositionEnergyEstimator::new(config());

    assert_eq!(
        clusters.aggregate(&batch).unwrap(),
        clusters.aggregate(&batch).unwrap()
    );
    assert_eq!(
        layers.aggregate(&batch).unwrap(),
        layers.aggregate(&batch).unwrap()
    );
    let a = estimator.estimate(&batch);
    let b = estimator.estimate(&batch);
    for (pa, pb) in a.positions.iter().zip(&b.positions) {
        assert_eq!(pa.x.to_bits(), pb.x.to_bits());
        assert_eq!(pa.y.to_bits(), pb.y.to_bits());
    }
    assert_eq!(a, b);
}

#[test]
fn test_total_energy_excludes_outliers() {
    let batch = generate_event(3, 120);
    let mut acc = ResultAccumulator::new();
    acc.record_estimate(PositionEnergyEstimator::new(config()).estimate(&batch))
        .unwrap();

    let expected: f64 = batch
        .energy()
        .iter()
        .zip(batch.cluster_id())
        .filter(|(_, &id)| id != OUTLIER_ID)
        .map(|(&e, _)| f64::from(e))
        .sum();
    let total = f64::from(acc.total_energy().unwrap());
    assert!((total - expected).abs() < 1e-3 * expected);
}
