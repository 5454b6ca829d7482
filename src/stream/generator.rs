use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::classification::alias::FType;
use crate::common::ClassLabel;
use std::marker::PhantomData;

/// How the concept moves from its initial state to the drifted one over the
/// course of the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriftType {
    /// The stream switches concept at its midpoint in a single step.
    Sudden,
    /// Instances are drawn from the old or the new concept with a
    /// probability that shifts linearly over the stream.
    Gradual,
    /// The concept itself interpolates linearly between the two states.
    Incremental,
}

/// Synthetic binary stream with class imbalance, label noise and concept
/// drift, produced as an iterator of `(features, labels)` chunks.
///
/// Each class is a Gaussian cluster around a per-class mean vector drawn at
/// construction; the drifted concept swaps the two clusters, so whichever
/// drift type is chosen, the feature/label relationship inverts over the
/// stream and a static model degrades.
///
/// # Example
///
/// ```
/// use stream_bagging::stream::generator::{DriftType, StreamGenerator};
///
/// let stream = StreamGenerator::<f64>::new(10, 50, 4)
///     .minority_fraction(0.1)
///     .label_noise(0.01)
///     .drift_type(DriftType::Sudden)
///     .seeded(42);
///
/// let chunks: Vec<_> = stream.collect();
/// assert_eq!(chunks.len(), 10);
/// assert_eq!(chunks[0].0.nrows(), 50);
/// ```
pub struct StreamGenerator<F: FType> {
    n_chunks: usize,
    chunk_size: usize,
    minority_fraction: f64,
    label_noise: f64,
    drift_type: DriftType,
    means: [Array1<f64>; 2],
    rng: StdRng,
    chunk_index: usize,
    marker: PhantomData<F>,
}

impl<F: FType> StreamGenerator<F> {
    pub fn new(n_chunks: usize, chunk_size: usize, n_features: usize) -> Self {
        assert!(n_chunks > 0 && chunk_size > 0 && n_features > 0);
        let mut rng = StdRng::from_entropy();
        let means = Self::draw_means(n_features, &mut rng);
        StreamGenerator {
            n_chunks,
            chunk_size,
            minority_fraction: 0.1,
            label_noise: 0.0,
            drift_type: DriftType::Incremental,
            means,
            rng,
            chunk_index: 0,
            marker: PhantomData,
        }
    }

    /// Fraction of instances carrying the minority label 1, in (0, 0.5].
    pub fn minority_fraction(mut self, fraction: f64) -> Self {
        assert!(fraction > 0.0 && fraction <= 0.5);
        self.minority_fraction = fraction;
        self
    }

    /// Probability of flipping an emitted label.
    pub fn label_noise(mut self, noise: f64) -> Self {
        assert!((0.0..=0.5).contains(&noise));
        self.label_noise = noise;
        self
    }

    pub fn drift_type(mut self, drift_type: DriftType) -> Self {
        self.drift_type = drift_type;
        self
    }

    /// Deterministic mode: reseed the generator and redraw the cluster
    /// means so two identically-seeded streams are equal.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        let n_features = self.means[0].len();
        self.means = Self::draw_means(n_features, &mut self.rng);
        self
    }

    fn draw_means(n_features: usize, rng: &mut StdRng) -> [Array1<f64>; 2] {
        // Clusters 4 sigma apart along a random direction, so the base
        // classifier has a fair chance on a clean chunk.
        let direction = Normal::new(0.0, 1.0).unwrap();
        let mut axis: Array1<f64> = (0..n_features).map(|_| direction.sample(rng)).collect();
        let norm = axis.dot(&axis).sqrt();
        axis.mapv_inplace(|v| v / norm * 2.0);
        [-axis.clone(), axis]
    }

    /// Drift progress for the current chunk, in [0, 1].
    fn progress(&self) -> f64 {
        if self.n_chunks == 1 {
            return 0.0;
        }
        let linear = self.chunk_index as f64 / (self.n_chunks - 1) as f64;
        match self.drift_type {
            DriftType::Sudden => {
                if self.chunk_index * 2 >= self.n_chunks {
                    1.0
                } else {
                    0.0
                }
            }
            _ => linear,
        }
    }

    fn sample_instance(&mut self, progress: f64) -> (Vec<F>, ClassLabel) {
        let label: ClassLabel = if self.rng.gen::<f64>() < self.minority_fraction {
            1
        } else {
            0
        };

        // The drifted concept swaps the clusters.
        let mean = match self.drift_type {
            DriftType::Gradual => {
                if self.rng.gen::<f64>() < progress {
                    &self.means[1 - label]
                } else {
                    &self.means[label]
                }
            }
            _ => &self.means[label],
        };
        let flipped = &self.means[1 - label];

        let unit = Normal::new(0.0, 1.0).unwrap();
        let features = mean
            .iter()
            .zip(flipped.iter())
            .map(|(&a, &b)| {
                let center = match self.drift_type {
                    DriftType::Incremental => a + (b - a) * progress,
                    DriftType::Sudden => {
                        if progress >= 1.0 {
                            b
                        } else {
                            a
                        }
                    }
                    DriftType::Gradual => a,
                };
                F::from_f64(center + unit.sample(&mut self.rng)).unwrap()
            })
            .collect();

        let label = if self.rng.gen::<f64>() < self.label_noise {
            1 - label
        } else {
            label
        };
        (features, label)
    }
}

impl<F: FType> Iterator for StreamGenerator<F> {
    type Item = (Array2<F>, Vec<ClassLabel>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.chunk_index >= self.n_chunks {
            return None;
        }
        let progress = self.progress();
        let n_features = self.means[0].len();

        let mut flat = Vec::with_capacity(self.chunk_size * n_features);
        let mut labels = Vec::with_capacity(self.chunk_size);
        for _ in 0..self.chunk_size {
            let (features, label) = self.sample_instance(progress);
            flat.extend(features);
            labels.push(label);
        }
        self.chunk_index += 1;

        let x = Array2::from_shape_vec((self.chunk_size, n_features), flat).unwrap();
        Some((x, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_geometry() {
        let stream = StreamGenerator::<f64>::new(6, 40, 3).seeded(1);
        let chunks: Vec<_> = stream.collect();
        assert_eq!(chunks.len(), 6);
        for (x, y) in &chunks {
            assert_eq!(x.shape(), &[40, 3]);
            assert_eq!(y.len(), 40);
            assert!(y.iter().all(|&label| label <= 1));
        }
    }

    #[test]
    fn test_minority_fraction_roughly_holds() {
        let stream = StreamGenerator::<f64>::new(20, 100, 2)
            .minority_fraction(0.2)
            .seeded(3);
        let total: usize = stream.map(|(_, y)| y.iter().sum::<usize>()).sum();
        let fraction = total as f64 / 2000.0;
        assert!((0.12..=0.28).contains(&fraction), "fraction {fraction}");
    }

    #[test]
    fn test_seeded_streams_are_identical() {
        let a: Vec<_> = StreamGenerator::<f64>::new(4, 25, 2).seeded(9).collect();
        let b: Vec<_> = StreamGenerator::<f64>::new(4, 25, 2).seeded(9).collect();
        for ((xa, ya), (xb, yb)) in a.iter().zip(b.iter()) {
            assert_eq!(xa, xb);
            assert_eq!(ya, yb);
        }
    }

    #[test]
    fn test_sudden_drift_swaps_clusters() {
        let chunks: Vec<_> = StreamGenerator::<f64>::new(10, 200, 2)
            .drift_type(DriftType::Sudden)
            .minority_fraction(0.5)
            .seeded(17)
            .collect();

        let class_mean = |chunk: &(Array2<f64>, Vec<ClassLabel>), label: ClassLabel| {
            let (x, y) = chunk;
            let mut mean = vec![0.0; x.ncols()];
            let mut count = 0.0;
            for (row, _) in x.outer_iter().zip(y.iter()).filter(|(_, l)| **l == label) {
                for (m, &v) in mean.iter_mut().zip(row.iter()) {
                    *m += v;
                }
                count += 1.0;
            }
            mean.iter().map(|m| m / count).collect::<Vec<_>>()
        };

        let before = class_mean(&chunks[0], 0);
        let after = class_mean(&chunks[9], 0);
        let distance: f64 = before
            .iter()
            .zip(after.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        // The swapped clusters sit 4 sigma apart.
        assert!(distance > 2.0, "cluster centers must move: {distance}");
    }
}
