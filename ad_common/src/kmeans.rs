//! K-means clustering model (K fixed at 2) used to turn a feature vector
//! into an anomaly probability.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Outcome;
use crate::feature::FeatureMatrix;

/// Number of clusters. Fixed at build time, not a config option.
pub const K: usize = 2;

const MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelState {
    Untrained,
    Trained,
}

/// K centroids plus the maximum training-set distance used to normalize
/// scores into `[0, 1]`.
#[derive(Debug, Clone)]
pub struct KMeansModel {
    state: ModelState,
    centroids: Vec<Vec<f64>>,
    max_dist: f64,
}

impl Default for KMeansModel {
    fn default() -> Self {
        Self::new()
    }
}

impl KMeansModel {
    pub fn new() -> Self {
        Self {
            state: ModelState::Untrained,
            centroids: Vec::new(),
            max_dist: 0.0,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.state == ModelState::Trained
    }

    /// Fit `K` centroids to `matrix` using k-means++ seeding and Lloyd's
    /// algorithm, seeded deterministically from `seed` so runs (and tests)
    /// are reproducible for a given `(host, dimension, last_trained_at)`.
    pub fn train(&mut self, matrix: &FeatureMatrix, seed: u64) -> Outcome {
        match self.try_train(matrix, seed) {
            Ok(()) => {
                self.state = ModelState::Trained;
                Outcome::Success
            }
            Err(outcome) => {
                self.state = ModelState::Untrained;
                self.centroids.clear();
                self.max_dist = 0.0;
                outcome
            }
        }
    }

    fn try_train(&mut self, matrix: &FeatureMatrix, seed: u64) -> Result<(), Outcome> {
        if matrix.len() < K {
            return Err(Outcome::MissingData);
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let centroids = kmeans_plus_plus_init(&matrix.rows, K, &mut rng).ok_or(Outcome::MissingData)?;
        let (centroids, assignments) = lloyd(&matrix.rows, centroids, MAX_ITERATIONS).ok_or(Outcome::MissingData)?;

        let mut max_dist = 0.0f64;
        for (row, &assigned) in matrix.rows.iter().zip(assignments.iter()) {
            let d = euclidean(row, &centroids[assigned]);
            if !d.is_finite() {
                return Err(Outcome::MissingData);
            }
            if d > max_dist {
                max_dist = d;
            }
        }

        self.centroids = centroids;
        self.max_dist = max_dist;
        Ok(())
    }

    /// Score one feature vector: the normalized distance to the nearest
    /// centroid. Higher means more anomalous.
    pub fn score(&self, v: &[f64]) -> Result<f64, Outcome> {
        if self.state != ModelState::Trained {
            return Err(Outcome::NoModel);
        }
        let d_min = self
            .centroids
            .iter()
            .map(|c| euclidean(v, c))
            .fold(f64::INFINITY, f64::min);
        if self.max_dist > 0.0 {
            Ok((d_min / self.max_dist).clamp(0.0, 1.0))
        } else {
            Ok(0.0)
        }
    }
}

fn squared_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_dist(a, b).sqrt()
}

/// k-means++ seeding: the first centroid is uniform-random; each subsequent
/// centroid is drawn with probability proportional to its squared distance
/// to the nearest already-chosen centroid.
fn kmeans_plus_plus_init(rows: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Option<Vec<Vec<f64>>> {
    if rows.len() < k {
        return None;
    }
    let mut centroids = Vec::with_capacity(k);
    let first = rng.gen_range(0..rows.len());
    centroids.push(rows[first].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = rows
            .iter()
            .map(|r| {
                centroids
                    .iter()
                    .map(|c| squared_dist(r, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if !total.is_finite() {
            return None;
        }
        let chosen = if total <= 0.0 {
            // Every remaining point coincides with an already-chosen
            // centroid (zero-variance input): fall back to a uniform pick
            // so training still succeeds, just with a degenerate model
            // (`max_dist` ends up 0 and every score is 0).
            rng.gen_range(0..rows.len())
        } else {
            let threshold = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = rows.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                cumulative += w;
                if cumulative >= threshold {
                    pick = i;
                    break;
                }
            }
            pick
        };
        centroids.push(rows[chosen].clone());
    }
    Some(centroids)
}

/// Lloyd's algorithm: alternate assignment and centroid-recompute until
/// stable or `max_iter` is reached. Empty clusters are reseeded from the
/// point farthest from its current assignment.
fn lloyd(rows: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, max_iter: usize) -> Option<(Vec<Vec<f64>>, Vec<usize>)> {
    let k = centroids.len();
    let dim = rows.first()?.len();
    let mut assignments = vec![0usize; rows.len()];

    for _ in 0..max_iter.max(100) {
        let mut changed = false;
        for (i, row) in rows.iter().enumerate() {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for (c_idx, c) in centroids.iter().enumerate() {
                let d = squared_dist(row, c);
                if d < best_d {
                    best_d = d;
                    best = c_idx;
                }
            }
            if assignments[i] != best {
                changed = true;
            }
            assignments[i] = best;
        }

        let mut sums = vec![vec![0.0f64; dim]; k];
        let mut counts = vec![0usize; k];
        for (row, &a) in rows.iter().zip(assignments.iter()) {
            counts[a] += 1;
            for d in 0..dim {
                sums[a][d] += row[d];
            }
        }

        for c_idx in 0..k {
            if counts[c_idx] == 0 {
                let farthest = rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| (i, squared_dist(row, &centroids[assignments[i]])))
                    .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)?;
                centroids[c_idx] = rows[farthest].clone();
                changed = true;
                continue;
            }
            for d in 0..dim {
                sums[c_idx][d] /= counts[c_idx] as f64;
            }
            centroids[c_idx] = std::mem::take(&mut sums[c_idx]);
        }

        if !changed {
            break;
        }
    }

    if centroids.iter().flatten().any(|v| !v.is_finite()) {
        return None;
    }
    Some((centroids, assignments))
}
