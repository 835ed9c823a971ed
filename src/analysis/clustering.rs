// src/analysis/clustering.rs
//
// K-means over RGB samples (Lloyd's algorithm, k-means++ seeding).
//
// Used twice by team assignment: k=2 inside one shirt crop to split shirt
// from background, and k=2 over all player colours of the reference frame
// to split the two teams. Seeding draws from a ChaCha RNG with a fixed seed,
// so the same input always yields the same centroids in the same order.

use crate::types::Rgb;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    #[error("need at least {needed} samples, got {got}")]
    NotEnoughSamples { needed: usize, got: usize },
    #[error("cluster count must be at least 1")]
    NoClusters,
}

/// Seam for the colour clustering step.
pub trait ColorClusterer {
    /// Fit on `samples` and return the centroids.
    fn fit(&mut self, samples: &[Rgb]) -> Result<Vec<Rgb>, ClusterError>;
    /// Index of the nearest centroid, `None` before a successful fit.
    fn predict(&self, sample: &Rgb) -> Option<usize>;
}

pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    tol: f32,
    n_init: usize,
    seed: u64,
    centers: Option<Vec<Rgb>>,
    labels: Vec<usize>,
    inertia: Option<f32>,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            seed: 0,
            centers: None,
            labels: Vec::new(),
            inertia: None,
        }
    }

    pub fn max_iter(mut self, n: usize) -> Self {
        self.max_iter = n.max(1);
        self
    }

    pub fn n_init(mut self, n: usize) -> Self {
        self.n_init = n.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cluster index of each sample from the last fit.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn inertia(&self) -> Option<f32> {
        self.inertia
    }

    fn nearest(centers: &[Rgb], sample: &Rgb) -> (usize, f32) {
        let mut best = (0, f32::INFINITY);
        for (i, c) in centers.iter().enumerate() {
            let d = distance_squared(c, sample);
            if d < best.1 {
                best = (i, d);
            }
        }
        best
    }

    fn init_kmeans_plusplus(&self, samples: &[Rgb], rng: &mut ChaCha8Rng) -> Vec<Rgb> {
        let mut centers = Vec::with_capacity(self.n_clusters);
        centers.push(samples[rng.gen_range(0..samples.len())]);

        while centers.len() < self.n_clusters {
            let dists: Vec<f32> = samples.iter().map(|s| Self::nearest(&centers, s).1).collect();
            let total: f32 = dists.iter().sum();
            if total <= 0.0 {
                centers.push(samples[rng.gen_range(0..samples.len())]);
                continue;
            }
            let threshold = rng.gen::<f32>() * total;
            let mut acc = 0.0;
            let mut chosen = samples.len() - 1;
            for (i, d) in dists.iter().enumerate() {
                acc += d;
                if acc >= threshold {
                    chosen = i;
                    break;
                }
            }
            centers.push(samples[chosen]);
        }
        centers
    }

    fn single_run(&self, samples: &[Rgb], rng: &mut ChaCha8Rng) -> (Vec<Rgb>, Vec<usize>, f32) {
        let mut centers = self.init_kmeans_plusplus(samples, rng);
        let mut labels = vec![0usize; samples.len()];

        for _ in 0..self.max_iter {
            for (label, s) in labels.iter_mut().zip(samples) {
                *label = Self::nearest(&centers, s).0;
            }

            let mut sums = vec![[0.0f64; 3]; self.n_clusters];
            let mut counts = vec![0usize; self.n_clusters];
            for (&label, s) in labels.iter().zip(samples) {
                for c in 0..3 {
                    sums[label][c] += s[c] as f64;
                }
                counts[label] += 1;
            }

            let mut shift = 0.0f32;
            for k in 0..self.n_clusters {
                // Empty clusters keep their previous centre
                if counts[k] == 0 {
                    continue;
                }
                let n = counts[k] as f64;
                let updated = [
                    (sums[k][0] / n) as f32,
                    (sums[k][1] / n) as f32,
                    (sums[k][2] / n) as f32,
                ];
                shift = shift.max(distance_squared(&updated, &centers[k]));
                centers[k] = updated;
            }
            if shift <= self.tol {
                break;
            }
        }

        for (label, s) in labels.iter_mut().zip(samples) {
            *label = Self::nearest(&centers, s).0;
        }
        let inertia = labels
            .iter()
            .zip(samples)
            .map(|(&l, s)| distance_squared(&centers[l], s))
            .sum();
        (centers, labels, inertia)
    }
}

impl ColorClusterer for KMeans {
    fn fit(&mut self, samples: &[Rgb]) -> Result<Vec<Rgb>, ClusterError> {
        if self.n_clusters == 0 {
            return Err(ClusterError::NoClusters);
        }
        if samples.len() < self.n_clusters {
            return Err(ClusterError::NotEnoughSamples {
                needed: self.n_clusters,
                got: samples.len(),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut best: Option<(Vec<Rgb>, Vec<usize>, f32)> = None;
        for _ in 0..self.n_init {
            let run = self.single_run(samples, &mut rng);
            if best.as_ref().map_or(true, |b| run.2 < b.2) {
                best = Some(run);
            }
        }

        let (centers, labels, inertia) = best.ok_or(ClusterError::NoClusters)?;
        self.centers = Some(centers.clone());
        self.labels = labels;
        self.inertia = Some(inertia);
        Ok(centers)
    }

    fn predict(&self, sample: &Rgb) -> Option<usize> {
        self.centers.as_ref().map(|c| Self::nearest(c, sample).0)
    }
}

fn distance_squared(a: &Rgb, b: &Rgb) -> f32 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}
