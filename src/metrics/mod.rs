pub mod binary;
pub mod confusion;
pub mod traits;

pub use binary::{Accuracy, BalancedAccuracy, F1, GMean, Precision, Recall, Specificity};
