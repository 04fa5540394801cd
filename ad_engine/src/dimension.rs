//! A single time series under detection.
//!
//! Exclusively owned by its [`crate::host::Host`]; the host's training
//! worker is the only writer of the model, the detection worker is the
//! only writer of the cached score/bit (outside contention, where it falls
//! back to reading them).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use uuid::Uuid;

use ad_common::bits::RollingBitCounter;
use ad_common::config::Config;
use ad_common::error::Outcome;
use ad_common::feature::FeaturePipeline;
use ad_common::handle::DimensionHandle;
use ad_common::kmeans::KMeansModel;
use ad_common::sample::SampleWindow;
use ad_common::storage::SeriesSource;

struct TrainingState {
    model: KMeansModel,
    last_trained_at: i64,
    trained: bool,
}

/// One monitored dimension: identifiers, its model, and its cached
/// detection output.
pub struct Dimension {
    handle: DimensionHandle,
    id: String,
    display_name: String,
    update_every: i64,
    training: Mutex<TrainingState>,
    anomaly_score_bits: AtomicU64,
    anomaly_bit: AtomicBool,
    /// Per-event contribution ring, sized to the differencing window.
    event_counter: Mutex<RollingBitCounter>,
    bit_counter: AtomicU64,
}

impl Dimension {
    pub fn new(handle: DimensionHandle, id: String, display_name: String, update_every: i64, diff_n: usize) -> Self {
        Self {
            handle,
            id,
            display_name,
            update_every,
            training: Mutex::new(TrainingState {
                model: KMeansModel::new(),
                last_trained_at: i64::MIN,
                trained: false,
            }),
            anomaly_score_bits: AtomicU64::new(0),
            anomaly_bit: AtomicBool::new(false),
            event_counter: Mutex::new(RollingBitCounter::new(diff_n)),
            bit_counter: AtomicU64::new(0),
        }
    }

    pub fn handle(&self) -> &DimensionHandle {
        &self.handle
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn anomaly_bit(&self) -> bool {
        self.anomaly_bit.load(Ordering::Acquire)
    }

    pub fn anomaly_score(&self) -> f64 {
        f64::from_bits(self.anomaly_score_bits.load(Ordering::Acquire))
    }

    fn set_cache(&self, score: f64, bit: bool) {
        self.anomaly_score_bits.store(score.to_bits(), Ordering::Release);
        self.anomaly_bit.store(bit, Ordering::Release);
    }

    /// Attempt to (re)train the model.
    pub fn train(&self, now: i64, host_uuid: Uuid, source: &dyn SeriesSource, config: &Config) -> Outcome {
        let Some(mut guard) = self.training.try_lock() else {
            return Outcome::TryLockFailed;
        };

        if now < guard.last_trained_at.saturating_add(config.train_every_secs as i64) {
            return Outcome::ShouldNotTrainNow;
        }
        guard.last_trained_at = now;

        let pipeline = FeaturePipeline::new(config.diff_n, config.smooth_n, config.lag_n);
        let n = (config.train_secs as i64 / self.update_every).max(1) as usize;
        let min_n = (config.min_train_secs as i64 / self.update_every).max(1) as usize;

        let window = match SampleWindow::build(source, &self.handle, now, self.update_every, n, min_n) {
            Ok(w) => w,
            Err(outcome) => {
                guard.trained = false;
                return outcome;
            }
        };

        let matrix = match pipeline.transform(&window.values) {
            Ok(m) => m,
            Err(_) => {
                guard.trained = false;
                return Outcome::MissingData;
            }
        };

        let seed = seed_for(host_uuid, &self.id, guard.last_trained_at);
        let outcome = guard.model.train(&matrix, seed);
        guard.trained = outcome == Outcome::Success;
        outcome
    }

    /// Score the current tick's feature vector.
    ///
    /// Non-blocking: on lock contention or any data shortfall, returns the
    /// last cached `(score, bit)` unchanged. `now` is the detection tick's
    /// timestamp, supplied by the caller (the detection worker computes it
    /// once per tick).
    pub fn predict(&self, now: i64, source: &dyn SeriesSource, config: &Config) -> (f64, bool) {
        let Some(guard) = self.training.try_lock() else {
            return (self.anomaly_score(), self.anomaly_bit());
        };

        if !guard.trained {
            self.set_cache(0.0, false);
            return (0.0, false);
        }

        let pipeline = FeaturePipeline::new(config.diff_n, config.smooth_n, config.lag_n);
        let n = pipeline.min_samples();

        let window = match SampleWindow::build(source, &self.handle, now, self.update_every, n, n) {
            Ok(w) => w,
            Err(_) => return (self.anomaly_score(), self.anomaly_bit()),
        };

        let matrix = match pipeline.transform(&window.values) {
            Ok(m) => m,
            Err(_) => return (self.anomaly_score(), self.anomaly_bit()),
        };

        let Some(row) = matrix.rows.first() else {
            return (self.anomaly_score(), self.anomaly_bit());
        };

        let score = match guard.model.score(row) {
            Ok(s) => s,
            Err(_) => return (self.anomaly_score(), self.anomaly_bit()),
        };
        let bit = score >= config.anomaly_score_threshold;

        let mut event_counter = self.event_counter.lock();
        event_counter.insert(bit);
        if bit {
            self.bit_counter.fetch_add(1, Ordering::Relaxed);
        }
        drop(event_counter);

        self.set_cache(score, bit);
        (score, bit)
    }

    /// Hold the training lock for `duration`, blocking the caller. Exists
    /// only so integration tests can exercise `predict`'s non-blocking
    /// contention path from a second thread without reaching into a
    /// private field.
    #[doc(hidden)]
    pub fn hold_training_lock_for(&self, duration: std::time::Duration) {
        let _guard = self.training.lock();
        std::thread::sleep(duration);
    }

    /// Re-baseline the contribution counter after a stale (`Below, Below`)
    /// round-trip.
    pub fn reset_contribution(&self) {
        let baseline = self.event_counter.lock().set_bits() as u64;
        self.bit_counter.store(baseline, Ordering::Relaxed);
    }

    /// The fraction of `window_length` ticks this dimension's bit has been
    /// set since the last baseline, then re-baseline for the next window.
    pub fn anomaly_rate(&self, window_length: u64) -> f64 {
        let accumulated = self.bit_counter.load(Ordering::Relaxed) as f64;
        let rate = if window_length == 0 { 0.0 } else { accumulated / window_length as f64 };
        let baseline = self.event_counter.lock().set_bits() as u64;
        self.bit_counter.store(baseline, Ordering::Relaxed);
        rate
    }
}

/// Deterministic k-means seed derived from `(host-uuid, dimension-id,
/// last_trained_at)` so training runs (and tests) are reproducible.
fn seed_for(host_uuid: Uuid, dimension_id: &str, last_trained_at: i64) -> u64 {
    let mut hasher = DefaultHasher::new();
    host_uuid.hash(&mut hasher);
    dimension_id.hash(&mut hasher);
    last_trained_at.hash(&mut hasher);
    hasher.finish()
}
