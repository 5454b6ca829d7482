use crate::classification::alias::FType;
use crate::common::ClassLabel;

/// Incremental binary classification metric.
///
/// `update` absorbs one (true, predicted) pair, `revert` removes one, and
/// `get` reads the current value; this mirrors the confusion-matrix
/// bookkeeping all the concrete metrics are built on.
pub trait ClassificationMetric<F: FType> {
    fn update(&mut self, y_true: ClassLabel, y_pred: ClassLabel, sample_weight: Option<F>);
    fn revert(&mut self, y_true: ClassLabel, y_pred: ClassLabel, sample_weight: Option<F>);
    fn get(&self) -> F;
}
