use ndarray::{Array2, ArrayView2};

use crate::classification::alias::FType;

/// Binary class label. The whole crate assumes exactly two classes, 0 and 1,
/// across the lifetime of a stream.
pub type ClassLabel = usize;

/// Capability expected from a base classifier used inside an online ensemble.
///
/// Implement this trait for your model to plug it into
/// [`UnderSamplingBagging`](crate::classification::bagging::UnderSamplingBagging).
/// The `Clone` bound is what the ensemble uses to spawn independent,
/// identically-configured members from a prototype: cloning an untrained
/// prototype must yield an untrained, structurally identical model.
///
/// # Example
///
/// ```
/// use ndarray::{arr2, Array2, ArrayView2};
/// use stream_bagging::common::WeightedClassifier;
///
/// // A degenerate classifier that always answers with the class priors.
/// #[derive(Clone, Default)]
/// struct Prior {
///     weights: [f64; 2],
/// }
///
/// impl WeightedClassifier<f64> for Prior {
///     fn partial_fit(
///         &mut self,
///         _x: &ArrayView2<f64>,
///         y: &[usize],
///         _classes: &[usize],
///         sample_weight: &[f64],
///     ) {
///         for (&label, &w) in y.iter().zip(sample_weight) {
///             self.weights[label] += w;
///         }
///     }
///
///     fn predict_proba(&self, x: &ArrayView2<f64>) -> Array2<f64> {
///         let total = self.weights[0] + self.weights[1];
///         let row = [self.weights[0] / total, self.weights[1] / total];
///         Array2::from_shape_fn((x.nrows(), 2), |(_, j)| row[j])
///     }
/// }
///
/// let mut clf = Prior::default();
/// clf.partial_fit(&arr2(&[[0.0], [1.0]]).view(), &[0, 1], &[0, 1], &[3.0, 1.0]);
/// assert_eq!(clf.predict_proba(&arr2(&[[0.5]]).view())[[0, 0]], 0.75);
/// ```
pub trait WeightedClassifier<F: FType>: Clone {
    /// One incremental training step over a chunk.
    ///
    /// `sample_weight` has one entry per row of `x`; a weight of zero means
    /// "this instance is absent from this member's view of the chunk".
    /// `classes` is the label set established by the caller, passed on every
    /// call so an implementation may allocate its per-class state lazily.
    fn partial_fit(
        &mut self,
        x: &ArrayView2<F>,
        y: &[ClassLabel],
        classes: &[ClassLabel],
        sample_weight: &[F],
    );

    /// Per-instance probability distribution over the binary label set,
    /// shape `(n_instances, 2)`, column `j` holding the probability of
    /// class `j`. Must be side-effect free.
    fn predict_proba(&self, x: &ArrayView2<F>) -> Array2<F>;
}
