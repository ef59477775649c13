//! Dimensionality-reduction generators: PCA sweep, neighbor-graph
//! manifold embedding, and stochastic-neighbor embedding

use ndarray::{s, Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64Mcg;
use tracing::debug;

use crate::config::Config;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};

/// Eigenpairs of a symmetric matrix, sorted by descending eigenvalue
struct Eigen {
    values: Array1<f64>,
    vectors: Array2<f64>,
}

/// Power iteration with deflation; computes the leading `count`
/// eigenpairs of a symmetric matrix
fn eigen_symmetric(matrix: &Array2<f64>, count: usize) -> Eigen {
    let n = matrix.nrows();
    let count = count.min(n);
    let mut values = Array1::zeros(count);
    let mut vectors = Array2::zeros((n, count));
    let mut deflated = matrix.clone();

    for i in 0..count {
        let (eigenvalue, eigenvector) = power_iteration(&deflated, 200, 1e-12);
        values[i] = eigenvalue;
        vectors.column_mut(i).assign(&eigenvector);
        // deflate: A = A - lambda v v^T
        for r in 0..n {
            for c in 0..n {
                deflated[[r, c]] -= eigenvalue * eigenvector[r] * eigenvector[c];
            }
        }
    }

    // deflation order can drift for near-equal eigenvalues
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let sorted_values = Array1::from_iter(order.iter().map(|&i| values[i]));
    let mut sorted_vectors = Array2::zeros((n, count));
    for (new, &old) in order.iter().enumerate() {
        sorted_vectors.column_mut(new).assign(&vectors.column(old));
    }
    Eigen {
        values: sorted_values,
        vectors: sorted_vectors,
    }
}

fn power_iteration(matrix: &Array2<f64>, max_iter: usize, tol: f64) -> (f64, Array1<f64>) {
    let n = matrix.nrows();
    let mut v = Array1::from_elem(n, 1.0 / (n as f64).sqrt());
    let mut eigenvalue = 0.0;
    for _ in 0..max_iter {
        let mut next = matrix.dot(&v);
        let next_eigenvalue = v.dot(&next);
        let norm = next.dot(&next).sqrt();
        if norm > 1e-12 {
            next /= norm;
        }
        if (next_eigenvalue - eigenvalue).abs() < tol {
            return (next_eigenvalue, next);
        }
        eigenvalue = next_eigenvalue;
        v = next;
    }
    (eigenvalue, v)
}

/// Principal-component sweep: for each component count in the configured
/// range, project the centered base matrix onto its leading
/// eigenvectors, optionally whitening to unit variance
pub(crate) fn pca_sweep(base: &Array2<f64>, config: &Config, diag: &mut Diagnostics) -> Array2<f64> {
    let n = base.nrows();
    let d = base.ncols();
    let limit = d.min(n.saturating_sub(1)).max(1).min(d);
    if n < 2 || d == 0 {
        return Array2::zeros((n, 0));
    }

    let mean = base.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
    let centered = base - &mean;
    let cov = centered.t().dot(&centered) / (n as f64 - 1.0);
    let eigen = eigen_symmetric(&cov, limit);

    let mut blocks: Vec<Array2<f64>> = Vec::new();
    for requested in (config.pca_min..=config.pca_max).step_by(config.pca_inc) {
        let clamped = requested > limit;
        if clamped {
            diag.record(DiagnosticEvent::ComponentsClamped {
                generator: "pca",
                requested,
                available: limit,
            });
        }
        let ncomp = requested.min(limit);
        // a clamped step repeating the previous width adds nothing
        if clamped && blocks.last().is_some_and(|b| b.ncols() == ncomp) {
            break;
        }
        debug!(ncomp, "pca sweep step");
        let mut proj = centered.dot(&eigen.vectors.slice(s![.., ..ncomp]));
        if config.pca_whiten {
            for j in 0..ncomp {
                let scale = eigen.values[j].max(0.0).sqrt();
                if scale > 1e-12 {
                    proj.column_mut(j).mapv_inplace(|v| v / scale);
                }
            }
        }
        blocks.push(proj);
        if clamped {
            break;
        }
    }

    let total: usize = blocks.iter().map(|b| b.ncols()).sum();
    let mut out = Array2::zeros((n, total));
    let mut offset = 0;
    for block in blocks {
        let width = block.ncols();
        out.slice_mut(s![.., offset..offset + width]).assign(&block);
        offset += width;
    }
    out
}

fn pairwise_distances(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let mut dist = Array2::zeros((n, n));
    for i in 0..n {
        for j in i + 1..n {
            let d: f64 = data
                .row(i)
                .iter()
                .zip(data.row(j).iter())
                .map(|(&a, &b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }
    dist
}

/// Shortest-path distances over a symmetrized k-NN graph
fn geodesic_distances(dist: &Array2<f64>, neighbors: usize) -> Array2<f64> {
    let n = dist.nrows();
    let mut graph = Array2::from_elem((n, n), f64::INFINITY);
    for i in 0..n {
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| {
            dist[[i, a]]
                .partial_cmp(&dist[[i, b]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for &j in order.iter().take(neighbors) {
            graph[[i, j]] = dist[[i, j]];
            graph[[j, i]] = dist[[i, j]];
        }
    }

    let mut geo = Array2::from_elem((n, n), f64::INFINITY);
    for source in 0..n {
        // dense Dijkstra, O(n^2) per source
        let mut done = vec![false; n];
        let mut best = vec![f64::INFINITY; n];
        best[source] = 0.0;
        for _ in 0..n {
            let mut current = usize::MAX;
            let mut current_dist = f64::INFINITY;
            for v in 0..n {
                if !done[v] && best[v] < current_dist {
                    current_dist = best[v];
                    current = v;
                }
            }
            if current == usize::MAX {
                break;
            }
            done[current] = true;
            for v in 0..n {
                let w = graph[[current, v]];
                if w.is_finite() && best[current] + w < best[v] {
                    best[v] = best[current] + w;
                }
            }
        }
        for v in 0..n {
            geo[[source, v]] = best[v];
        }
    }

    // disconnected components fall back to the largest finite geodesic
    let max_finite = geo.iter().copied().filter(|d| d.is_finite()).fold(0.0, f64::max);
    geo.mapv_inplace(|d| if d.is_finite() { d } else { max_finite });
    geo
}

/// Neighbor-graph manifold embedding: k-NN graph, geodesic distances,
/// classical MDS on the double-centered squared distance matrix
pub(crate) fn isomap_embedding(
    base: &Array2<f64>,
    config: &Config,
    diag: &mut Diagnostics,
) -> Array2<f64> {
    let n = base.nrows();
    let requested = config.iso_components;
    if n < 2 {
        return Array2::zeros((n, requested));
    }
    let dims = if requested >= n {
        diag.record(DiagnosticEvent::ComponentsClamped {
            generator: "isomap",
            requested,
            available: n - 1,
        });
        n - 1
    } else {
        requested
    };
    let neighbors = config.iso_neighbors.min(n - 1);

    let geo = geodesic_distances(&pairwise_distances(base), neighbors);

    // classical MDS: B = -1/2 J D^2 J
    let d2 = geo.mapv(|d| d * d);
    let row_mean = d2.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(n));
    let grand = d2.mean().unwrap_or(0.0);
    let mut b = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            b[[i, j]] = -0.5 * (d2[[i, j]] - row_mean[i] - row_mean[j] + grand);
        }
    }
    let eigen = eigen_symmetric(&b, dims);

    let mut out = Array2::zeros((n, dims));
    for j in 0..dims {
        let scale = eigen.values[j].max(0.0).sqrt();
        for i in 0..n {
            out[[i, j]] = eigen.vectors[[i, j]] * scale;
        }
    }
    out
}

const TSNE_ITERATIONS: usize = 400;
const TSNE_EXAGGERATION_ITERS: usize = 100;
const TSNE_EXAGGERATION: f64 = 4.0;

/// Perplexity-calibrated conditional affinities, symmetrized
fn tsne_affinities(dist2: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n = dist2.nrows();
    let target_entropy = perplexity.ln();
    let mut p = Array2::zeros((n, n));
    for i in 0..n {
        let mut beta = 1.0;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;
        for _ in 0..50 {
            let mut sum = 0.0;
            let mut weighted = 0.0;
            for j in 0..n {
                if j == i {
                    continue;
                }
                let w = (-beta * dist2[[i, j]]).exp();
                sum += w;
                weighted += beta * dist2[[i, j]] * w;
            }
            if sum <= 0.0 {
                break;
            }
            // Shannon entropy of the conditional distribution
            let entropy = sum.ln() + weighted / sum;
            let diff = entropy - target_entropy;
            if diff.abs() < 1e-5 {
                break;
            }
            if diff > 0.0 {
                beta_min = beta;
                beta = if beta_max.is_finite() {
                    (beta + beta_max) / 2.0
                } else {
                    beta * 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min.is_finite() {
                    (beta + beta_min) / 2.0
                } else {
                    beta / 2.0
                };
            }
        }
        let mut sum = 0.0;
        for j in 0..n {
            if j != i {
                let w = (-beta * dist2[[i, j]]).exp();
                p[[i, j]] = w;
                sum += w;
            }
        }
        if sum > 0.0 {
            for j in 0..n {
                p[[i, j]] /= sum;
            }
        }
    }
    // symmetrize and floor
    let mut sym = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            sym[[i, j]] = ((p[[i, j]] + p[[j, i]]) / (2.0 * n as f64)).max(1e-12);
        }
    }
    sym
}

/// Stochastic-neighbor embedding: seeded random init, early
/// exaggeration, momentum gradient descent on the KL objective
pub(crate) fn tsne_embedding(
    base: &Array2<f64>,
    config: &Config,
    diag: &mut Diagnostics,
) -> Array2<f64> {
    let n = base.nrows();
    let requested = config.tsne_components;
    if n < 2 {
        return Array2::zeros((n, requested));
    }
    let dims = if requested >= n {
        diag.record(DiagnosticEvent::ComponentsClamped {
            generator: "tsne",
            requested,
            available: n - 1,
        });
        n - 1
    } else {
        requested
    };
    // perplexity cannot exceed the neighbor budget
    let perplexity = config.tsne_perplexity.min(((n - 1) as f64 / 3.0).max(1.0));

    let dist2 = pairwise_distances(base).mapv(|d| d * d);
    let p = tsne_affinities(&dist2, perplexity);

    let mut rng = Pcg64Mcg::seed_from_u64(config.seed);
    let mut y = Array2::<f64>::zeros((n, dims));
    for v in y.iter_mut() {
        let z: f64 = rng.sample(StandardNormal);
        *v = 1e-4 * z;
    }
    let mut velocity = Array2::<f64>::zeros((n, dims));

    for iter in 0..TSNE_ITERATIONS {
        let exaggeration = if iter < TSNE_EXAGGERATION_ITERS {
            TSNE_EXAGGERATION
        } else {
            1.0
        };
        let momentum = if iter < 20 { 0.5 } else { 0.8 };

        // student-t kernel in the embedding
        let mut q_unnorm = Array2::<f64>::zeros((n, n));
        let mut q_sum = 0.0;
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d2: f64 = (0..dims).map(|k| (y[[i, k]] - y[[j, k]]).powi(2)).sum();
                let w = 1.0 / (1.0 + d2);
                q_unnorm[[i, j]] = w;
                q_sum += w;
            }
        }

        let mut grad = Array2::<f64>::zeros((n, dims));
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = (q_unnorm[[i, j]] / q_sum).max(1e-12);
                let coeff = 4.0 * (exaggeration * p[[i, j]] - q) * q_unnorm[[i, j]];
                for k in 0..dims {
                    grad[[i, k]] += coeff * (y[[i, k]] - y[[j, k]]);
                }
            }
        }

        for i in 0..n {
            for k in 0..dims {
                velocity[[i, k]] =
                    momentum * velocity[[i, k]] - config.tsne_learn_rate * grad[[i, k]];
                y[[i, k]] += velocity[[i, k]];
            }
        }
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn line_data() -> Array2<f64> {
        // points along a line in 3-d: one dominant direction
        let mut data = Array2::zeros((12, 3));
        for i in 0..12 {
            let t = i as f64;
            data[[i, 0]] = 3.0 * t;
            data[[i, 1]] = -2.0 * t;
            data[[i, 2]] = 0.5 * t + if i % 2 == 0 { 0.01 } else { -0.01 };
        }
        data
    }

    #[test]
    fn test_eigen_trace_preserved() {
        let m = array![[4.0, 2.0], [2.0, 3.0]];
        let eigen = eigen_symmetric(&m, 2);
        assert!(eigen.values[0] > eigen.values[1]);
        assert!((eigen.values.sum() - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_pca_first_component_captures_line() {
        let data = line_data();
        let config = Config {
            pca_min: 1,
            pca_max: 1,
            pca_inc: 1,
            ..Config::default()
        };
        let mut diag = Diagnostics::new();
        let out = pca_sweep(&data, &config, &mut diag);
        assert_eq!(out.dim(), (12, 1));
        // projections along the line are monotone in t
        let first = out.column(0);
        let increasing = first[1] > first[0];
        for i in 1..11 {
            assert_eq!(first[i + 1] > first[i], increasing);
        }
    }

    #[test]
    fn test_pca_sweep_clamps_with_diagnostic() {
        let data = line_data();
        let config = Config {
            pca_min: 2,
            pca_max: 9,
            pca_inc: 2,
            ..Config::default()
        };
        let mut diag = Diagnostics::new();
        let out = pca_sweep(&data, &config, &mut diag);
        // steps 2 and 3 columns wide: 2 + 3(clamped from 4) ... limit is 3
        assert_eq!(out.nrows(), 12);
        assert!(diag
            .events()
            .iter()
            .any(|e| matches!(e, DiagnosticEvent::ComponentsClamped { generator: "pca", .. })));
    }

    #[test]
    fn test_pca_sweep_clamped_step_never_duplicates() {
        // three usable components: the step at 3 already covers the
        // limit, so the clamped step at 4 must not repeat it
        let data = line_data();
        let config = Config {
            pca_min: 3,
            pca_max: 4,
            pca_inc: 1,
            ..Config::default()
        };
        let mut diag = Diagnostics::new();
        let out = pca_sweep(&data, &config, &mut diag);
        assert_eq!(out.ncols(), 3);
        assert!(diag
            .events()
            .iter()
            .any(|e| matches!(e, DiagnosticEvent::ComponentsClamped { generator: "pca", .. })));
    }

    #[test]
    fn test_isomap_clamps_components_to_rows() {
        let data = line_data();
        let config = Config {
            iso_components: 20,
            iso_neighbors: 3,
            ..Config::default()
        };
        let mut diag = Diagnostics::new();
        let out = isomap_embedding(&data, &config, &mut diag);
        assert_eq!(out.dim(), (12, 11));
        assert!(diag.events().iter().any(|e| matches!(
            e,
            DiagnosticEvent::ComponentsClamped {
                generator: "isomap",
                requested: 20,
                available: 11,
            }
        )));
    }

    #[test]
    fn test_tsne_clamps_components_to_rows() {
        let data = line_data();
        let config = Config {
            tsne_components: 15,
            tsne_perplexity: 3.0,
            ..Config::default()
        };
        let mut diag = Diagnostics::new();
        let out = tsne_embedding(&data, &config, &mut diag);
        assert_eq!(out.dim(), (12, 11));
        assert!(diag.events().iter().any(|e| matches!(
            e,
            DiagnosticEvent::ComponentsClamped {
                generator: "tsne",
                requested: 15,
                available: 11,
            }
        )));
    }

    #[test]
    fn test_isomap_shape_and_determinism() {
        let data = line_data();
        let config = Config {
            iso_components: 2,
            iso_neighbors: 3,
            ..Config::default()
        };
        let mut diag = Diagnostics::new();
        let a = isomap_embedding(&data, &config, &mut diag);
        let b = isomap_embedding(&data, &config, &mut diag);
        assert_eq!(a.dim(), (12, 2));
        assert_eq!(a, b);
    }

    #[test]
    fn test_tsne_shape_and_seeded_reproducibility() {
        let data = line_data();
        let config = Config {
            tsne_components: 2,
            tsne_perplexity: 5.0,
            tsne_learn_rate: 100.0,
            ..Config::default()
        };
        let mut diag = Diagnostics::new();
        let a = tsne_embedding(&data, &config, &mut diag);
        let b = tsne_embedding(&data, &config, &mut diag);
        assert_eq!(a.dim(), (12, 2));
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v.is_finite()));
    }
}
