use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};

use crate::classification::alias::FType;
use crate::classification::gaussian_nb::GaussianNb;
use crate::common::{ClassLabel, WeightedClassifier};
use crate::error::StreamError;

/// Online under-sampling bagging for class-imbalanced, drifting streams.
///
/// The ensemble holds `ensemble_size` independent clones of a base
/// classifier prototype. Class balance is tracked by a time-decayed class
/// size pair: for every instance both scalars decay by `time_decay_factor`
/// and the scalar of the instance's own class gains `1 - time_decay_factor`,
/// so the pair is a recency-weighted estimate of the two class frequencies.
/// When an instance belongs to the currently-dominant class, its Poisson
/// resampling rate drops below one (opposite estimate over own estimate),
/// under-sampling the majority without ever buffering the stream. Each
/// member draws its own Poisson replication count per instance, which is the
/// usual online simulation of bootstrap resampling.
///
/// Exactly two classes, labeled 0 and 1, are assumed for the lifetime of
/// the stream; chunks containing any other label are rejected.
///
/// Prediction is an unweighted soft vote: member probabilities are averaged
/// and the argmax class is returned.
///
/// # Parameters
///
/// - `ensemble_size`: number of base classifiers, at least 1.
/// - `time_decay_factor`: memory of the class balance estimate, in (0, 1);
///   closer to 1 means slower forgetting.
/// - base prototype: any [`WeightedClassifier`]; defaults to
///   [`GaussianNb`].
///
/// # Example
///
/// ```
/// use ndarray::arr2;
/// use stream_bagging::classification::bagging::UnderSamplingBagging;
///
/// let mut model = UnderSamplingBagging::<f64>::new(3, 0.9).seeded(42);
/// let x = arr2(&[[0.0, 0.1], [0.2, 0.0], [1.0, 0.9], [0.1, 0.2]]);
/// let y = vec![0, 0, 1, 0];
///
/// model.partial_fit(&x, &y, Some(&[0, 1])).unwrap();
/// let predictions = model.predict(&x).unwrap();
/// assert_eq!(predictions.len(), 4);
/// ```
pub struct UnderSamplingBagging<F: FType, B: WeightedClassifier<F> = GaussianNb<F>> {
    ensemble_size: usize,
    time_decay_factor: F,
    prototype: B,
    rng: StdRng,
    fitted: Option<Fitted<F, B>>,
}

/// State that only exists once the first chunk has been seen.
struct Fitted<F, B> {
    ensemble: Vec<B>,
    classes: Vec<ClassLabel>,
    n_features: usize,
    tdcs: [F; 2],
}

impl<F: FType> UnderSamplingBagging<F, GaussianNb<F>> {
    /// Ensemble over the default Gaussian naive Bayes base model.
    pub fn new(ensemble_size: usize, time_decay_factor: F) -> Self {
        Self::with_base(ensemble_size, time_decay_factor, GaussianNb::new())
    }
}

impl<F: FType, B: WeightedClassifier<F>> UnderSamplingBagging<F, B> {
    /// Ensemble over clones of an explicit base classifier prototype.
    pub fn with_base(ensemble_size: usize, time_decay_factor: F, prototype: B) -> Self {
        assert!(ensemble_size > 0, "ensemble_size must be positive");
        assert!(
            time_decay_factor > F::zero() && time_decay_factor < F::one(),
            "time_decay_factor must lie in (0, 1)"
        );
        UnderSamplingBagging {
            ensemble_size,
            time_decay_factor,
            prototype,
            rng: StdRng::from_entropy(),
            fitted: None,
        }
    }

    /// Switch to deterministic mode with a fixed seed.
    ///
    /// The generator is seeded once here and then advances across
    /// `partial_fit` calls, so successive chunks see fresh draws while two
    /// identically-seeded models replay identical resampling decisions.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Alias of one `partial_fit` call, for batch-style call sites.
    pub fn fit(&mut self, x: &Array2<F>, y: &[ClassLabel]) -> Result<(), StreamError> {
        self.partial_fit(x, y, None)
    }

    /// One incremental update over a chunk of the stream.
    ///
    /// `classes` optionally pins the class label set; otherwise the sorted
    /// set of labels present in `y` is used. Members whose Poisson weights
    /// sum to zero over the chunk are left untouched for this chunk; that
    /// is expected behavior under heavy under-sampling, not an error.
    pub fn partial_fit(
        &mut self,
        x: &Array2<F>,
        y: &[ClassLabel],
        classes: Option<&[ClassLabel]>,
    ) -> Result<(), StreamError> {
        check_chunk(x, y)?;
        let classes = resolve_classes(y, classes)?;

        if let Some(fitted) = &self.fitted {
            if fitted.n_features != x.ncols() {
                return Err(StreamError::DimensionMismatch {
                    expected: fitted.n_features,
                    got: x.ncols(),
                });
            }
        } else {
            self.fitted = Some(Fitted {
                ensemble: vec![self.prototype.clone(); self.ensemble_size],
                classes: Vec::new(),
                n_features: x.ncols(),
                tdcs: [F::zero(), F::zero()],
            });
        }
        let fitted = self.fitted.as_mut().unwrap();
        fitted.classes = classes;

        // Decay pass: one snapshot of the decayed class sizes per instance.
        let boost = F::one() - self.time_decay_factor;
        let mut snapshots = Vec::with_capacity(y.len());
        for &label in y {
            fitted.tdcs[0] *= self.time_decay_factor;
            fitted.tdcs[1] *= self.time_decay_factor;
            fitted.tdcs[label] += boost;
            snapshots.push(fitted.tdcs);
        }

        // Weight pass: a Poisson replication count per instance per member,
        // with the rate pushed below one for the currently-dominant class.
        let mut weights = Array2::<u64>::zeros((y.len(), self.ensemble_size));
        for (i, (&label, snapshot)) in y.iter().zip(snapshots.iter()).enumerate() {
            let lambda = resampling_rate(snapshot, label).to_f64().unwrap();
            if lambda == 0.0 {
                continue;
            }
            let poisson = Poisson::new(lambda).unwrap();
            for k in 0..self.ensemble_size {
                weights[[i, k]] = poisson.sample(&mut self.rng) as u64;
            }
        }

        let Fitted {
            ensemble, classes, ..
        } = fitted;
        for (member, column) in ensemble.iter_mut().zip(weights.axis_iter(Axis(1))) {
            if column.sum() == 0 {
                continue;
            }
            let sample_weight: Vec<F> = column
                .iter()
                .map(|&count| F::from_u64(count).unwrap())
                .collect();
            member.partial_fit(&x.view(), y, classes, &sample_weight);
        }

        Ok(())
    }

    /// Predict one label per row of `x` by unweighted soft voting.
    pub fn predict(&self, x: &Array2<F>) -> Result<Vec<ClassLabel>, StreamError> {
        let support = self.ensemble_support_matrix(x)?;
        let average = support.mean_axis(Axis(0)).unwrap();

        // First maximal column wins on exact ties.
        let predictions = average
            .outer_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, F::neg_infinity()), |best, (label, &p)| {
                        if p > best.1 {
                            (label, p)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect();
        Ok(predictions)
    }

    /// Stacked per-member probability outputs, shape
    /// `(ensemble_size, n_instances, 2)`. Read-only; two calls with the same
    /// input and no fit in between return identical matrices.
    pub fn ensemble_support_matrix(&self, x: &Array2<F>) -> Result<Array3<F>, StreamError> {
        let fitted = self.fitted.as_ref().ok_or(StreamError::NotFitted)?;
        if fitted.n_features != x.ncols() {
            return Err(StreamError::DimensionMismatch {
                expected: fitted.n_features,
                got: x.ncols(),
            });
        }

        let outputs: Vec<Array2<F>> = fitted
            .ensemble
            .iter()
            .map(|member| member.predict_proba(&x.view()))
            .collect();
        let views: Vec<_> = outputs.iter().map(|output| output.view()).collect();
        Ok(ndarray::stack(Axis(0), &views).unwrap())
    }

    /// Class label set recorded by the last fit, `None` before any fit.
    pub fn classes(&self) -> Option<&[ClassLabel]> {
        self.fitted.as_ref().map(|fitted| fitted.classes.as_slice())
    }

    /// Feature dimensionality established by the first fit.
    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|fitted| fitted.n_features)
    }

    /// Current time-decayed class size pair `(class 0, class 1)`.
    pub fn class_balance(&self) -> Option<(F, F)> {
        self.fitted
            .as_ref()
            .map(|fitted| (fitted.tdcs[0], fitted.tdcs[1]))
    }

    pub fn ensemble_size(&self) -> usize {
        self.ensemble_size
    }

    pub fn time_decay_factor(&self) -> F {
        self.time_decay_factor
    }
}

/// Poisson rate for one instance given the decayed class sizes right after
/// it was absorbed. The rate drops below one only when the instance's own
/// class is the currently-dominant one; ties and minority instances keep
/// the plain online-bagging rate of one.
fn resampling_rate<F: FType>(snapshot: &[F; 2], label: ClassLabel) -> F {
    let own = snapshot[label];
    let opposite = snapshot[1 - label];
    if own > opposite {
        opposite / own
    } else {
        F::one()
    }
}

fn check_chunk<F: FType>(x: &Array2<F>, y: &[ClassLabel]) -> Result<(), StreamError> {
    if x.nrows() == 0 {
        return Err(StreamError::InvalidInput("empty chunk".into()));
    }
    if x.nrows() != y.len() {
        return Err(StreamError::InvalidInput(format!(
            "X has {} rows but y has {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().any(|value| !value.is_finite()) {
        return Err(StreamError::InvalidInput(
            "X contains non-finite values".into(),
        ));
    }
    if y.iter().any(|&label| label > 1) {
        return Err(StreamError::InvalidInput(
            "labels must belong to the binary set {0, 1}".into(),
        ));
    }
    Ok(())
}

fn resolve_classes(
    y: &[ClassLabel],
    classes: Option<&[ClassLabel]>,
) -> Result<Vec<ClassLabel>, StreamError> {
    let mut classes = match classes {
        Some(classes) => classes.to_vec(),
        None => y.to_vec(),
    };
    classes.sort_unstable();
    classes.dedup();
    if classes.is_empty() || classes.len() > 2 || classes.iter().any(|&label| label > 1) {
        return Err(StreamError::InvalidInput(
            "class set must be a non-empty subset of {0, 1}".into(),
        ));
    }
    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use std::sync::{Arc, Mutex};

    /// Feature chunk with one well-separated cluster per class.
    fn two_cluster_chunk() -> (Array2<f64>, Vec<ClassLabel>) {
        let x = arr2(&[
            [0.0, 0.1],
            [0.1, 0.0],
            [0.2, 0.1],
            [0.0, 0.2],
            [0.1, 0.1],
            [0.2, 0.0],
            [0.1, 0.2],
            [3.0, 3.1],
            [3.1, 3.0],
            [2.9, 3.2],
        ]);
        let y = vec![0, 0, 0, 0, 0, 0, 0, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_pure_chunk_saturates_decayed_sizes() {
        for decay in [0.5, 0.9, 0.99] {
            let mut model = UnderSamplingBagging::<f64>::new(3, decay).seeded(7);
            let n = 1000;
            let x = Array2::from_elem((n, 2), 0.5);
            let y = vec![0; n];
            model.partial_fit(&x, &y, Some(&[0, 1])).unwrap();

            let (s0, s1) = model.class_balance().unwrap();
            // s0 = 1 - decay^n, s1 never receives a boost.
            assert!(s0 > 0.999, "decay {decay}: s0 = {s0}");
            assert_eq!(s1, 0.0);
        }
    }

    #[test]
    fn test_resampling_rate_rules() {
        // Own class dominant: opposite over own, strictly inside (0, 1).
        let rate: f64 = resampling_rate(&[0.2, 0.8], 1);
        assert!((rate - 0.25).abs() < 1e-12);
        let rate: f64 = resampling_rate(&[0.8, 0.2], 0);
        assert!((rate - 0.25).abs() < 1e-12);
        // Minority instances and exact ties are not down-weighted.
        assert_eq!(resampling_rate(&[0.8, 0.2], 1), 1.0);
        assert_eq!(resampling_rate(&[0.2, 0.8], 0), 1.0);
        assert_eq!(resampling_rate(&[0.5, 0.5], 0), 1.0);
        assert_eq!(resampling_rate(&[0.5, 0.5], 1), 1.0);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = UnderSamplingBagging::<f64>::new(3, 0.9);
        let x = arr2(&[[0.0, 1.0]]);
        assert_eq!(model.predict(&x), Err(StreamError::NotFitted));
        assert!(matches!(
            model.ensemble_support_matrix(&x),
            Err(StreamError::NotFitted)
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let (x, y) = two_cluster_chunk();
        let mut model = UnderSamplingBagging::<f64>::new(3, 0.9).seeded(1);
        model.partial_fit(&x, &y, None).unwrap();

        let narrow = arr2(&[[1.0], [2.0]]);
        assert_eq!(
            model.predict(&narrow),
            Err(StreamError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            model.partial_fit(&narrow, &[0, 1], None),
            Err(StreamError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_invalid_input() {
        let mut model = UnderSamplingBagging::<f64>::new(3, 0.9);
        let x = arr2(&[[0.0, 1.0], [1.0, 2.0]]);
        assert!(matches!(
            model.partial_fit(&x, &[0], None),
            Err(StreamError::InvalidInput(_))
        ));
        assert!(matches!(
            model.partial_fit(&x, &[0, 2], None),
            Err(StreamError::InvalidInput(_))
        ));
        let bad = arr2(&[[f64::NAN, 1.0], [1.0, 2.0]]);
        assert!(matches!(
            model.partial_fit(&bad, &[0, 1], None),
            Err(StreamError::InvalidInput(_))
        ));
        // A failed call must not have created any fitted state.
        assert!(model.classes().is_none());
    }

    #[test]
    fn test_end_to_end_imbalanced_chunk() {
        let (x, y) = two_cluster_chunk();
        let mut model = UnderSamplingBagging::<f64>::new(3, 0.9).seeded(42);
        model.fit(&x, &y).unwrap();

        let (s0, s1) = model.class_balance().unwrap();
        assert!(s0 > s1, "class 0 dominates the chunk: {s0} vs {s1}");
        assert_eq!(model.classes(), Some(&[0, 1][..]));
        assert_eq!(model.n_features(), Some(2));

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 10);
        assert!(predictions.iter().all(|&label| label <= 1));
    }

    #[test]
    fn test_decayed_sizes_track_drift_across_calls() {
        let mut model = UnderSamplingBagging::<f64>::new(3, 0.9).seeded(3);
        let x = Array2::from_elem((30, 2), 0.5);

        model.partial_fit(&x, &vec![0; 30], Some(&[0, 1])).unwrap();
        let (s0_first, s1_first) = model.class_balance().unwrap();
        assert!(s0_first > s1_first);

        model.partial_fit(&x, &vec![1; 30], Some(&[0, 1])).unwrap();
        let (s0_second, s1_second) = model.class_balance().unwrap();
        assert!(s1_second > s0_second, "estimate must flip under drift");
        // Carried over, not reset: the first chunk still leaves a trace.
        assert!(s0_second > 0.0);
        assert!(s0_second < s0_first);
    }

    #[test]
    fn test_support_matrix_is_idempotent() {
        let (x, y) = two_cluster_chunk();
        let mut model = UnderSamplingBagging::<f64>::new(4, 0.9).seeded(5);
        model.partial_fit(&x, &y, Some(&[0, 1])).unwrap();

        let first = model.ensemble_support_matrix(&x).unwrap();
        let second = model.ensemble_support_matrix(&x).unwrap();
        assert_eq!(first.shape(), &[4, 10, 2]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_seeded_models_replay_identically() {
        let (x, y) = two_cluster_chunk();
        let mut a = UnderSamplingBagging::<f64>::new(5, 0.9).seeded(99);
        let mut b = UnderSamplingBagging::<f64>::new(5, 0.9).seeded(99);
        a.partial_fit(&x, &y, Some(&[0, 1])).unwrap();
        b.partial_fit(&x, &y, Some(&[0, 1])).unwrap();
        assert_eq!(
            a.ensemble_support_matrix(&x).unwrap(),
            b.ensemble_support_matrix(&x).unwrap()
        );
    }

    /// Base model that records every weighted update it receives.
    #[derive(Clone, Default)]
    struct Probe {
        calls: Arc<Mutex<Vec<Vec<f64>>>>,
    }

    impl WeightedClassifier<f64> for Probe {
        fn partial_fit(
            &mut self,
            _x: &ndarray::ArrayView2<f64>,
            _y: &[ClassLabel],
            _classes: &[ClassLabel],
            sample_weight: &[f64],
        ) {
            self.calls.lock().unwrap().push(sample_weight.to_vec());
        }

        fn predict_proba(&self, x: &ndarray::ArrayView2<f64>) -> Array2<f64> {
            Array2::from_elem((x.nrows(), 2), 0.5)
        }
    }

    #[test]
    fn test_member_weights_are_integral_counts() {
        let probe = Probe::default();
        let calls = probe.calls.clone();
        let mut model = UnderSamplingBagging::with_base(4, 0.9, probe).seeded(11);

        let (x, y) = two_cluster_chunk();
        model.partial_fit(&x, &y, Some(&[0, 1])).unwrap();

        let calls = calls.lock().unwrap();
        assert!(!calls.is_empty());
        assert!(calls.len() <= 4);
        for weights in calls.iter() {
            assert_eq!(weights.len(), 10);
            assert!(weights.iter().all(|&w| w >= 0.0 && w.fract() == 0.0));
            // All-zero columns are skipped, never forwarded.
            assert!(weights.iter().sum::<f64>() > 0.0);
        }
    }

    #[test]
    fn test_all_zero_weights_skip_every_member() {
        // A first chunk that is pure class 1 leaves the class-0 estimate at
        // zero, so every rate is zero and no member may be updated.
        let probe = Probe::default();
        let calls = probe.calls.clone();
        let mut model = UnderSamplingBagging::with_base(3, 0.9, probe).seeded(2);

        let x = Array2::from_elem((20, 2), 1.0);
        model.partial_fit(&x, &vec![1; 20], Some(&[0, 1])).unwrap();

        assert!(calls.lock().unwrap().is_empty());
        // The model still counts as fitted and predicts a valid label.
        let predictions = model.predict(&x).unwrap();
        assert!(predictions.iter().all(|&label| label <= 1));
    }

    #[test]
    fn test_exact_tie_predicts_first_class() {
        // Probe members emit uniform probabilities, so every average row is
        // an exact 0.5/0.5 tie and the vote must fall on class 0.
        let mut model = UnderSamplingBagging::with_base(3, 0.9, Probe::default()).seeded(6);
        let (x, y) = two_cluster_chunk();
        model.partial_fit(&x, &y, Some(&[0, 1])).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert!(predictions.iter().all(|&label| label == 0));
    }
}
