pub mod classification;
pub mod common;
pub mod error;
pub mod metrics;
pub mod stream;
