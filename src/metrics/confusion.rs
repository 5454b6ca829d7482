use crate::classification::alias::FType;
use crate::common::ClassLabel;

/// Weighted confusion matrix for binary classification.
///
/// Rows index the true label, columns the predicted label; class 1 is the
/// positive class throughout. `update` and `revert` make the matrix usable
/// both cumulatively and over sliding windows. Every derived rate returns
/// zero on an empty denominator instead of dividing by zero, so fresh or
/// single-class chunks score conservatively rather than panicking.
///
/// # Example
///
/// ```
/// use stream_bagging::metrics::confusion::ConfusionMatrix;
///
/// let mut cm: ConfusionMatrix<f64> = ConfusionMatrix::new();
/// for (yt, yp) in [(1, 1), (1, 0), (0, 0), (0, 0), (0, 1)] {
///     cm.update(yt, yp, None);
/// }
/// assert_eq!(cm.true_positives(), 1.0);
/// assert_eq!(cm.recall(), 0.5);
/// ```
#[derive(Clone)]
pub struct ConfusionMatrix<F: FType> {
    data: [[F; 2]; 2],
    pub total_weight: F,
}

impl<F: FType> ConfusionMatrix<F> {
    pub fn new() -> Self {
        ConfusionMatrix {
            data: [[F::zero(); 2]; 2],
            total_weight: F::zero(),
        }
    }

    pub fn update(&mut self, y_true: ClassLabel, y_pred: ClassLabel, sample_weight: Option<F>) {
        let weight = sample_weight.unwrap_or_else(F::one);
        self.data[y_true][y_pred] += weight;
        self.total_weight += weight;
    }

    pub fn revert(&mut self, y_true: ClassLabel, y_pred: ClassLabel, sample_weight: Option<F>) {
        let weight = sample_weight.unwrap_or_else(F::one);
        self.data[y_true][y_pred] -= weight;
        self.total_weight -= weight;
    }

    pub fn true_positives(&self) -> F {
        self.data[1][1]
    }

    pub fn true_negatives(&self) -> F {
        self.data[0][0]
    }

    pub fn false_positives(&self) -> F {
        self.data[0][1]
    }

    pub fn false_negatives(&self) -> F {
        self.data[1][0]
    }

    pub fn accuracy(&self) -> F {
        ratio(
            self.true_positives() + self.true_negatives(),
            self.total_weight,
        )
    }

    /// Fraction of predicted positives that are real positives.
    pub fn precision(&self) -> F {
        ratio(
            self.true_positives(),
            self.true_positives() + self.false_positives(),
        )
    }

    /// True positive rate, also called sensitivity.
    pub fn recall(&self) -> F {
        ratio(
            self.true_positives(),
            self.true_positives() + self.false_negatives(),
        )
    }

    /// True negative rate.
    pub fn specificity(&self) -> F {
        ratio(
            self.true_negatives(),
            self.true_negatives() + self.false_positives(),
        )
    }

    /// Harmonic mean of precision and recall.
    pub fn f1(&self) -> F {
        let precision = self.precision();
        let recall = self.recall();
        let two = F::from_f64(2.0).unwrap();
        ratio(two * precision * recall, precision + recall)
    }

    /// Mean of recall and specificity, robust to class imbalance.
    pub fn balanced_accuracy(&self) -> F {
        (self.recall() + self.specificity()) / F::from_f64(2.0).unwrap()
    }

    /// Geometric mean of recall and specificity.
    pub fn g_mean(&self) -> F {
        (self.recall() * self.specificity()).sqrt()
    }
}

impl<F: FType> Default for ConfusionMatrix<F> {
    fn default() -> Self {
        ConfusionMatrix::new()
    }
}

fn ratio<F: FType>(numerator: F, denominator: F) -> F {
    if denominator == F::zero() {
        F::zero()
    } else {
        numerator / denominator
    }
}
