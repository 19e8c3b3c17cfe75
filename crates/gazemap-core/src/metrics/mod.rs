//! Saliency evaluation metrics.
//!
//! Standard formulas comparing a predicted map against a ground-truth map.
//! All functions take flattened maps of equal length and are NaN-free on
//! degenerate inputs: flat or empty inputs yield the metric's neutral value
//! rather than propagating undefined arithmetic.

#![allow(clippy::cast_precision_loss)]

/// Ground-truth values at or above this are treated as fixated locations
/// for AUC and NSS.
pub const FIXATION_THRESHOLD: f32 = 0.5;

/// Guard for logarithms and divisions on probability values.
const EPSILON: f64 = 1e-7;

/// Scalar metrics for one predicted/ground-truth map pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSet {
    /// Area under the ROC curve.
    pub auc: f64,
    /// Pearson correlation coefficient.
    pub cc: f64,
    /// Normalized scanpath saliency.
    pub nss: f64,
    /// KL divergence (ground truth ‖ prediction).
    pub kldiv: f64,
    /// Histogram intersection similarity.
    pub sim: f64,
}

impl MetricSet {
    /// Computes all metrics for a map pair.
    ///
    /// # Panics
    ///
    /// Panics if the slices have different lengths.
    #[must_use]
    pub fn compute(predicted: &[f32], ground_truth: &[f32]) -> Self {
        assert_eq!(
            predicted.len(),
            ground_truth.len(),
            "map length mismatch: {} vs {}",
            predicted.len(),
            ground_truth.len()
        );
        Self {
            auc: auc(predicted, ground_truth),
            cc: cc(predicted, ground_truth),
            nss: nss(predicted, ground_truth),
            kldiv: kl_div(predicted, ground_truth),
            sim: sim(predicted, ground_truth),
        }
    }
}

/// Exact ROC AUC of the prediction against the ground truth binarized at
/// [`FIXATION_THRESHOLD`].
///
/// Computed via the rank-sum (Mann-Whitney) identity with average ranks for
/// ties. Returns 0.5 when the label set is degenerate (all positive or all
/// negative).
#[must_use]
pub fn auc(predicted: &[f32], ground_truth: &[f32]) -> f64 {
    let n = predicted.len();
    let positives = ground_truth
        .iter()
        .filter(|&&g| g >= FIXATION_THRESHOLD)
        .count();
    if positives == 0 || positives == n {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| predicted[a].total_cmp(&predicted[b]));

    // Average ranks over tied prediction values, then the rank-sum identity.
    let mut rank_sum_pos = 0.0f64;
    let mut i = 0usize;
    while i < n {
        let mut j = i;
        while j + 1 < n && predicted[order[j + 1]] == predicted[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1 ..= j+1 share the average rank.
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            if ground_truth[idx] >= FIXATION_THRESHOLD {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let pos = positives as f64;
    let neg = (n - positives) as f64;
    (rank_sum_pos - pos * (pos + 1.0) / 2.0) / (pos * neg)
}

/// Pearson correlation coefficient between the two maps.
///
/// Returns 0.0 when either map has zero variance.
#[must_use]
pub fn cc(predicted: &[f32], ground_truth: &[f32]) -> f64 {
    let n = predicted.len();
    if n == 0 {
        return 0.0;
    }
    let mean_p = mean(predicted);
    let mean_g = mean(ground_truth);

    let mut cov = 0.0f64;
    let mut var_p = 0.0f64;
    let mut var_g = 0.0f64;
    for (&p, &g) in predicted.iter().zip(ground_truth) {
        let dp = f64::from(p) - mean_p;
        let dg = f64::from(g) - mean_g;
        cov += dp * dg;
        var_p += dp * dp;
        var_g += dg * dg;
    }
    if var_p <= 0.0 || var_g <= 0.0 {
        return 0.0;
    }
    cov / (var_p.sqrt() * var_g.sqrt())
}

/// Normalized scanpath saliency: mean of the z-scored prediction over
/// fixated locations (ground truth ≥ [`FIXATION_THRESHOLD`]).
///
/// Returns 0.0 when the prediction is flat or no location is fixated.
#[must_use]
pub fn nss(predicted: &[f32], ground_truth: &[f32]) -> f64 {
    let n = predicted.len();
    if n == 0 {
        return 0.0;
    }
    let mean_p = mean(predicted);
    let var: f64 = predicted
        .iter()
        .map(|&p| {
            let d = f64::from(p) - mean_p;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    let std = var.sqrt();
    if std <= 0.0 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (&p, &g) in predicted.iter().zip(ground_truth) {
        if g >= FIXATION_THRESHOLD {
            sum += (f64::from(p) - mean_p) / std;
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// KL divergence of the ground-truth distribution from the predicted one,
/// after normalizing both maps to sum to 1.
///
/// Returns 0.0 when either map has no mass.
#[must_use]
pub fn kl_div(predicted: &[f32], ground_truth: &[f32]) -> f64 {
    let (Some(p), Some(q)) = (to_distribution(predicted), to_distribution(ground_truth)) else {
        return 0.0;
    };
    p.iter()
        .zip(&q)
        .filter(|&(_, &qi)| qi > 0.0)
        .map(|(&pi, &qi)| qi * (qi / pi.max(EPSILON)).ln())
        .sum()
}

/// Histogram intersection similarity: Σ min(p, q) over the normalized
/// distributions. 1.0 for identical maps, 0.0 for disjoint mass.
///
/// Returns 0.0 when either map has no mass.
#[must_use]
pub fn sim(predicted: &[f32], ground_truth: &[f32]) -> f64 {
    let (Some(p), Some(q)) = (to_distribution(predicted), to_distribution(ground_truth)) else {
        return 0.0;
    };
    p.iter().zip(&q).map(|(&pi, &qi)| pi.min(qi)).sum()
}

fn mean(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64
}

/// Normalizes a map to a probability distribution; `None` if it has no mass.
fn to_distribution(values: &[f32]) -> Option<Vec<f64>> {
    let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
    if sum <= 0.0 {
        return None;
    }
    Some(values.iter().map(|&v| f64::from(v) / sum).collect())
}
