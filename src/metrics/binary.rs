use crate::classification::alias::FType;
use crate::common::ClassLabel;
use crate::metrics::confusion::ConfusionMatrix;
use crate::metrics::traits::ClassificationMetric;

macro_rules! confusion_metric {
    ($(#[$doc:meta])* $name:ident, $getter:ident) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name<F: FType> {
            cm: ConfusionMatrix<F>,
        }

        impl<F: FType> $name<F> {
            pub fn new() -> Self {
                Self {
                    cm: ConfusionMatrix::new(),
                }
            }
        }

        impl<F: FType> Default for $name<F> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<F: FType> ClassificationMetric<F> for $name<F> {
            fn update(
                &mut self,
                y_true: ClassLabel,
                y_pred: ClassLabel,
                sample_weight: Option<F>,
            ) {
                self.cm.update(y_true, y_pred, sample_weight);
            }

            fn revert(
                &mut self,
                y_true: ClassLabel,
                y_pred: ClassLabel,
                sample_weight: Option<F>,
            ) {
                self.cm.revert(y_true, y_pred, sample_weight);
            }

            fn get(&self) -> F {
                self.cm.$getter()
            }
        }
    };
}

confusion_metric!(
    /// Fraction of correctly classified instances.
    Accuracy,
    accuracy
);
confusion_metric!(
    /// Mean of recall and specificity; the accuracy a majority-class
    /// dummy cannot inflate.
    BalancedAccuracy,
    balanced_accuracy
);
confusion_metric!(
    /// Geometric mean of recall and specificity.
    GMean,
    g_mean
);
confusion_metric!(
    /// Harmonic mean of precision and recall for the positive class.
    F1,
    f1
);
confusion_metric!(Precision, precision);
confusion_metric!(Recall, recall);
confusion_metric!(Specificity, specificity);
