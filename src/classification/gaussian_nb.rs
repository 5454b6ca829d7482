use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::classification::alias::FType;
use crate::common::{ClassLabel, WeightedClassifier};

/// Incremental Gaussian naive Bayes for binary streams.
///
/// Keeps per-class weighted running sums, squared sums and weight totals for
/// every feature, so a `partial_fit` step is a pure accumulation and the
/// model never stores the stream itself. Likelihoods are evaluated in log
/// space with a small variance-smoothing term to keep degenerate features
/// from collapsing the density.
///
/// This is the default base model of
/// [`UnderSamplingBagging`](crate::classification::bagging::UnderSamplingBagging):
/// it accepts per-instance sample weights and treats a zero weight as "this
/// instance was not drawn for me".
///
/// # Example
///
/// ```
/// use ndarray::arr2;
/// use stream_bagging::classification::gaussian_nb::GaussianNb;
/// use stream_bagging::common::WeightedClassifier;
///
/// let mut nb: GaussianNb<f64> = GaussianNb::new();
/// let x = arr2(&[[-2.0, -2.1], [-1.9, -2.0], [2.0, 2.1], [2.1, 1.9]]);
/// let y = vec![0, 0, 1, 1];
/// nb.partial_fit(&x.view(), &y, &[0, 1], &[1.0, 1.0, 1.0, 1.0]);
///
/// let probs = nb.predict_proba(&arr2(&[[2.0, 2.0]]).view());
/// assert!(probs[[0, 1]] > probs[[0, 0]]);
/// ```
#[derive(Clone)]
pub struct GaussianNb<F: FType> {
    var_smoothing: F,
    stats: Option<Stats<F>>,
}

/// Running per-class statistics, one row per class, one column per feature.
#[derive(Clone)]
struct Stats<F> {
    sums: Array2<F>,
    sq_sums: Array2<F>,
    weights: Array1<F>,
}

impl<F: FType> Stats<F> {
    fn new(n_features: usize) -> Self {
        Stats {
            sums: Array2::zeros((2, n_features)),
            sq_sums: Array2::zeros((2, n_features)),
            weights: Array1::zeros(2),
        }
    }

    fn add(&mut self, x: &ndarray::ArrayView1<F>, y: ClassLabel, w: F) {
        self.sums.row_mut(y).zip_mut_with(x, |a, &b| *a += w * b);
        self.sq_sums
            .row_mut(y)
            .zip_mut_with(x, |a, &b| *a += w * b * b);
        self.weights[y] += w;
    }
}

impl<F: FType> GaussianNb<F> {
    pub fn new() -> Self {
        GaussianNb {
            var_smoothing: F::from_f64(1e-9).unwrap(),
            stats: None,
        }
    }

    /// Override the variance floor added to every per-feature variance.
    pub fn with_var_smoothing(var_smoothing: F) -> Self {
        GaussianNb {
            var_smoothing,
            stats: None,
        }
    }

    /// Joint log likelihood of one instance under class `y`, or `None` when
    /// that class has accumulated no weight yet.
    fn joint_log_likelihood(
        &self,
        stats: &Stats<F>,
        x: &ndarray::ArrayView1<F>,
        y: ClassLabel,
        total_weight: F,
    ) -> Option<F> {
        let w = stats.weights[y];
        if w <= F::zero() {
            return None;
        }

        let two = F::from_f64(2.0).unwrap();
        let two_pi = F::from_f64(2.0 * std::f64::consts::PI).unwrap();

        let mut ll = (w / total_weight).ln();
        for ((&sum, &sq_sum), &value) in stats
            .sums
            .row(y)
            .iter()
            .zip(stats.sq_sums.row(y).iter())
            .zip(x.iter())
        {
            let mean = sum / w;
            // The difference form cancels catastrophically for features with
            // a large offset and small spread; clamp before smoothing so the
            // density stays finite.
            let var = (sq_sum / w - mean * mean).max(F::zero()) + self.var_smoothing;
            let diff = value - mean;
            ll -= ((two_pi * var).ln() + diff * diff / var) / two;
        }
        Some(ll)
    }
}

impl<F: FType> Default for GaussianNb<F> {
    fn default() -> Self {
        GaussianNb::new()
    }
}

impl<F: FType> WeightedClassifier<F> for GaussianNb<F> {
    fn partial_fit(
        &mut self,
        x: &ArrayView2<F>,
        y: &[ClassLabel],
        _classes: &[ClassLabel],
        sample_weight: &[F],
    ) {
        let stats = self
            .stats
            .get_or_insert_with(|| Stats::new(x.ncols()));

        for ((row, &label), &w) in x.outer_iter().zip(y.iter()).zip(sample_weight.iter()) {
            if w > F::zero() {
                stats.add(&row, label, w);
            }
        }
    }

    fn predict_proba(&self, x: &ArrayView2<F>) -> Array2<F> {
        let n = x.nrows();
        let half = F::from_f64(0.5).unwrap();
        let mut probs = Array2::from_elem((n, 2), half);

        let stats = match &self.stats {
            Some(stats) => stats,
            // Never trained, e.g. every chunk so far drew zero weights.
            None => return probs,
        };
        let total_weight = stats.weights.sum();
        if total_weight <= F::zero() {
            return probs;
        }

        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            let lls: Vec<Option<F>> = (0..2)
                .map(|y| self.joint_log_likelihood(stats, &row, y, total_weight))
                .collect();

            let max_ll = lls
                .iter()
                .flatten()
                .cloned()
                .fold(F::neg_infinity(), F::max);

            let mut norm = F::zero();
            let mut row_probs = [F::zero(), F::zero()];
            for (y, ll) in lls.iter().enumerate() {
                if let Some(ll) = ll {
                    row_probs[y] = (*ll - max_ll).exp();
                    norm += row_probs[y];
                }
            }
            for (y, &p) in row_probs.iter().enumerate() {
                probs[[i, y]] = p / norm;
            }
        }
        probs
    }
}
