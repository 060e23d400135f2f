//! Deterministic consensus over every minimal subset.
//!
//! Implement [`Estimator`] for a model and call [`exhaustive_consensus`]. With
//! only a handful of correspondences every subset can be tried, so the result
//! does not depend on a random seed.

/// Configuration for the consensus search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusOptions {
    /// Inlier residual threshold
    pub threshold: f64,
    /// Minimum number of inliers required to accept a model
    pub min_inliers: usize,
}

/// Output of a consensus search.
///
/// `model` is `None` when no subset gathered `min_inliers` inliers.
#[derive(Debug, Clone)]
pub struct ConsensusResult<M> {
    /// Best model, refit on its inliers
    pub model: Option<M>,
    /// Indices of inlier data points
    pub inliers: Vec<usize>,
    /// Root-mean-square residual over inliers
    pub inlier_rms: f64,
    /// Number of subsets evaluated
    pub subsets: usize,
}

impl<M> Default for ConsensusResult<M> {
    fn default() -> Self {
        Self {
            model: None,
            inliers: Vec::new(),
            inlier_rms: f64::INFINITY,
            subsets: 0,
        }
    }
}

/// Model that can be fit from a subset of data and scored per datum
pub trait Estimator {
    type Datum;
    type Model;

    /// Size of the subsets to enumerate
    const MIN_SAMPLES: usize;

    /// Fit a model from the data at `indices`, `None` if degenerate
    fn fit(data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model>;

    /// Non-negative residual of one datum, in the units of the threshold
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Refit on the full inlier set
    fn refit(data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
        Self::fit(data, inliers)
    }
}

fn rms(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::INFINITY;
    }
    let ss: f64 = vals.iter().map(|&v| v * v).sum();
    #[allow(clippy::cast_precision_loss)]
    let n = vals.len() as f64;
    (ss / n).sqrt()
}

fn score<E: Estimator>(data: &[E::Datum], model: &E::Model, threshold: f64) -> (Vec<usize>, f64) {
    let mut inliers = Vec::new();
    let mut residuals = Vec::new();
    for (i, datum) in data.iter().enumerate() {
        let r = E::residual(model, datum);
        if r.is_finite() && r <= threshold {
            inliers.push(i);
            residuals.push(r);
        }
    }
    let rms = rms(&residuals);
    (inliers, rms)
}

/// Advance `indices` to the next k-combination of `0..n` in lexicographic order
fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();
    let Some(i) = (0..k).rev().find(|&i| indices[i] < n - k + i) else {
        return false;
    };
    indices[i] += 1;
    for j in i + 1..k {
        indices[j] = indices[j - 1] + 1;
    }
    true
}

/// Try every `MIN_SAMPLES`-subset and keep the model with the most inliers.
///
/// Ties go to the lower inlier RMS, then to the earlier subset. The winner is
/// refit on its inliers.
pub fn exhaustive_consensus<E: Estimator>(data: &[E::Datum], opts: &ConsensusOptions) -> ConsensusResult<E::Model> {
    let n = data.len();
    let k = E::MIN_SAMPLES;
    let mut result = ConsensusResult::default();
    if k == 0 || n < k {
        return result;
    }

    let mut best: Option<(Vec<usize>, f64)> = None;
    let mut subset: Vec<usize> = (0..k).collect();
    loop {
        result.subsets += 1;
        if let Some(model) = E::fit(data, &subset) {
            let (inliers, inlier_rms) = score::<E>(data, &model, opts.threshold);
            let better = match &best {
                None => true,
                Some((best_inliers, best_rms)) => {
                    inliers.len() > best_inliers.len()
                        || (inliers.len() == best_inliers.len() && inlier_rms < *best_rms)
                }
            };
            if better {
                best = Some((inliers, inlier_rms));
            }
        }
        if !next_combination(&mut subset, n) {
            break;
        }
    }

    let Some((inliers, _)) = best else {
        return result;
    };
    if inliers.len() < opts.min_inliers.max(k) {
        log::debug!("Consensus found only {} inliers out of {}", inliers.len(), n);
        return result;
    }

    if let Some(model) = E::refit(data, &inliers) {
        let residuals: Vec<f64> = inliers.iter().map(|&i| E::residual(&model, &data[i])).collect();
        result.inlier_rms = rms(&residuals);
        result.model = Some(model);
        result.inliers = inliers;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1D line y = a x + b
    struct LineEstimator;

    impl Estimator for LineEstimator {
        type Datum = (f64, f64);
        type Model = (f64, f64);
        const MIN_SAMPLES: usize = 2;

        fn fit(data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model> {
            let n = indices.len() as f64;
            let (sx, sy, sxx, sxy) = indices.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, &i| {
                let (x, y) = data[i];
                (acc.0 + x, acc.1 + y, acc.2 + x * x, acc.3 + x * y)
            });
            let denom = n * sxx - sx * sx;
            if denom.abs() < 1e-12 {
                return None;
            }
            let a = (n * sxy - sx * sy) / denom;
            Some((a, (sy - a * sx) / n))
        }

        fn residual(model: &Self::Model, datum: &Self::Datum) -> f64 {
            (model.0 * datum.0 + model.1 - datum.1).abs()
        }
    }

    #[test]
    fn test_next_combination_count() {
        let mut subset = vec![0, 1, 2, 3];
        let mut count = 1;
        while next_combination(&mut subset, 6) {
            count += 1;
        }
        assert_eq!(count, 15);
        assert_eq!(subset, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_rejects_outlier() {
        let mut data: Vec<(f64, f64)> = (0..6).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        data[3].1 += 50.0;

        let opts = ConsensusOptions {
            threshold: 0.5,
            min_inliers: 3,
        };
        let result = exhaustive_consensus::<LineEstimator>(&data, &opts);
        let (a, b) = result.model.unwrap();
        assert!((a - 2.0).abs() < 1e-9);
        assert!((b - 1.0).abs() < 1e-9);
        assert_eq!(result.inliers, vec![0, 1, 2, 4, 5]);
        assert_eq!(result.subsets, 15);
        assert!(result.inlier_rms < 1e-9);
    }

    #[test]
    fn test_no_consensus() {
        let data = vec![(0.0, 0.0), (1.0, 10.0), (2.0, -7.0), (3.0, 30.0)];
        let opts = ConsensusOptions {
            threshold: 0.1,
            min_inliers: 4,
        };
        let result = exhaustive_consensus::<LineEstimator>(&data, &opts);
        assert!(result.model.is_none());
        assert!(result.inliers.is_empty());
    }

    #[test]
    fn test_too_few_points() {
        let data = vec![(0.0, 0.0)];
        let opts = ConsensusOptions {
            threshold: 1.0,
            min_inliers: 1,
        };
        let result = exhaustive_consensus::<LineEstimator>(&data, &opts);
        assert!(result.model.is_none());
        assert_eq!(result.subsets, 0);
    }
}
