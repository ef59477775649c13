//! Seeded mini-batch k-means clustering sweep

use ndarray::{Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use tracing::debug;

use crate::config::Config;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};

const BATCH_SIZE: usize = 100;
const ITERATIONS: usize = 100;

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(&x, &y)| (x - y) * (x - y)).sum()
}

fn nearest_centroid(point: ArrayView1<f64>, centroids: &Array2<f64>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = c;
        }
    }
    best
}

/// Mini-batch k-means: per-center learning rates shrink as centers
/// absorb samples, then every row is assigned to its nearest center
fn mini_batch_kmeans(data: &Array2<f64>, k: usize, rng: &mut Pcg64Mcg) -> Vec<usize> {
    let n = data.nrows();
    let d = data.ncols();

    // init from k distinct random rows
    let mut order: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        order.swap(i, j);
    }
    let mut centroids = Array2::zeros((k, d));
    for (c, &row) in order.iter().take(k).enumerate() {
        centroids.row_mut(c).assign(&data.row(row));
    }

    let mut counts = vec![0.0_f64; k];
    for _ in 0..ITERATIONS {
        for _ in 0..BATCH_SIZE.min(n) {
            let row = rng.random_range(0..n);
            let point = data.row(row);
            let c = nearest_centroid(point, &centroids);
            counts[c] += 1.0;
            let eta = 1.0 / counts[c];
            let mut centroid = centroids.row_mut(c);
            for (cv, &pv) in centroid.iter_mut().zip(point.iter()) {
                *cv += eta * (pv - *cv);
            }
        }
    }

    (0..n)
        .map(|row| nearest_centroid(data.row(row), &centroids))
        .collect()
}

/// For each cluster count in the configured sweep, fit a seeded
/// mini-batch k-means model and emit its integer label column
pub(crate) fn cluster_sweep(
    base: &Array2<f64>,
    config: &Config,
    diag: &mut Diagnostics,
) -> Array2<f64> {
    let n = base.nrows();
    let mut rng = Pcg64Mcg::seed_from_u64(config.seed);
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for k in (config.cluster_min..=config.cluster_max).step_by(config.cluster_inc) {
        if k > n {
            diag.record(DiagnosticEvent::ComponentsClamped {
                generator: "clustering",
                requested: k,
                available: n,
            });
            break;
        }
        debug!(k, "clustering sweep step");
        let labels = mini_batch_kmeans(base, k, &mut rng);
        columns.push(labels.into_iter().map(|l| l as f64).collect());
    }
    let mut out = Array2::zeros((n, columns.len()));
    for (j, col) in columns.iter().enumerate() {
        for (i, &v) in col.iter().enumerate() {
            out[[i, j]] = v;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Array2<f64> {
        let mut data = Array2::zeros((20, 2));
        for i in 0..10 {
            data[[i, 0]] = i as f64 * 0.01;
            data[[i, 1]] = i as f64 * 0.01;
        }
        for i in 10..20 {
            data[[i, 0]] = 100.0 + i as f64 * 0.01;
            data[[i, 1]] = 100.0 + i as f64 * 0.01;
        }
        data
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let data = two_blobs();
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let labels = mini_batch_kmeans(&data, 2, &mut rng);
        // all rows in a blob share a label, blobs differ
        assert!(labels[..10].iter().all(|&l| l == labels[0]));
        assert!(labels[10..].iter().all(|&l| l == labels[10]));
        assert_ne!(labels[0], labels[10]);
    }

    #[test]
    fn test_kmeans_fixed_seed_is_reproducible() {
        let data = two_blobs();
        let mut a = Pcg64Mcg::seed_from_u64(3);
        let mut b = Pcg64Mcg::seed_from_u64(3);
        assert_eq!(
            mini_batch_kmeans(&data, 3, &mut a),
            mini_batch_kmeans(&data, 3, &mut b)
        );
    }

    #[test]
    fn test_sweep_column_count_and_clamp() {
        let data = two_blobs();
        let config = Config {
            cluster_min: 2,
            cluster_max: 40,
            cluster_inc: 2,
            ..Config::default()
        };
        let mut diag = Diagnostics::new();
        let out = cluster_sweep(&data, &config, &mut diag);
        // steps 2..=20 fit in 20 rows: 2,4,...,20 = 10 columns
        assert_eq!(out.ncols(), 10);
        assert!(matches!(
            diag.events().last(),
            Some(DiagnosticEvent::ComponentsClamped { .. })
        ));
    }
}
