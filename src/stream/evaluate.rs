use ndarray::Array2;

use crate::classification::alias::FType;
use crate::classification::bagging::UnderSamplingBagging;
use crate::common::{ClassLabel, WeightedClassifier};
use crate::error::StreamError;
use crate::metrics::confusion::ConfusionMatrix;

/// Column order of the score matrix produced by [`test_then_train`].
pub const METRICS: [&str; 6] = [
    "balanced accuracy",
    "g-mean",
    "f1 score",
    "precision",
    "recall",
    "specificity",
];

/// Prequential (test-then-train) evaluation over a chunked stream.
///
/// Every chunk after the first is first scored against the model trained on
/// the stream so far and then used to train it, so each row of the returned
/// matrix is an honest out-of-sample measurement. The matrix has one row
/// per evaluated chunk (chunk count minus one) and one column per entry of
/// [`METRICS`], every value within `[0, 1]`.
///
/// # Example
///
/// ```
/// use stream_bagging::classification::bagging::UnderSamplingBagging;
/// use stream_bagging::stream::evaluate::{test_then_train, METRICS};
/// use stream_bagging::stream::generator::StreamGenerator;
///
/// let stream = StreamGenerator::<f64>::new(8, 100, 3)
///     .minority_fraction(0.2)
///     .seeded(7);
/// let mut model = UnderSamplingBagging::<f64>::new(3, 0.9).seeded(7);
///
/// let scores = test_then_train(&mut model, stream).unwrap();
/// assert_eq!(scores.shape(), &[7, METRICS.len()]);
/// ```
pub fn test_then_train<F, B, S>(
    model: &mut UnderSamplingBagging<F, B>,
    chunks: S,
) -> Result<Array2<F>, StreamError>
where
    F: FType,
    B: WeightedClassifier<F>,
    S: IntoIterator<Item = (Array2<F>, Vec<ClassLabel>)>,
{
    let mut flat = Vec::new();
    let mut n_rows = 0;

    for (index, (x, y)) in chunks.into_iter().enumerate() {
        // Reject bad labels up front; the scoring loop must see the same
        // clean error the training step would raise, never a panic.
        if y.iter().any(|&label| label > 1) {
            return Err(StreamError::InvalidInput(
                "labels must belong to the binary set {0, 1}".into(),
            ));
        }
        if index > 0 {
            let predictions = model.predict(&x)?;
            let mut cm: ConfusionMatrix<F> = ConfusionMatrix::new();
            for (&y_true, &y_pred) in y.iter().zip(predictions.iter()) {
                cm.update(y_true, y_pred, None);
            }
            flat.extend([
                cm.balanced_accuracy(),
                cm.g_mean(),
                cm.f1(),
                cm.precision(),
                cm.recall(),
                cm.specificity(),
            ]);
            n_rows += 1;
        }
        model.partial_fit(&x, &y, Some(&[0, 1]))?;
    }

    Ok(Array2::from_shape_vec((n_rows, METRICS.len()), flat).unwrap())
}
