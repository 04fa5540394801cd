//! A monitored host: its dimension map and its two long-lived worker
//! threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use ad_common::config::Config;
use ad_common::handle::{DimensionHandle, HostHandle};
use ad_common::storage::SeriesSource;
use ad_common::window::RollingBitWindow;
use ad_store::{AnomalyEvent, DimensionContribution, EventStore};

use crate::dimension::Dimension;
use crate::sink::ChartSink;

/// Warm-up sleep before the detection worker's first tick. Kept even though
/// whether it's load-bearing or incidental is unclear; removing a sleep a
/// running system depends on is worse than keeping an unnecessary one.
const DETECTION_WARMUP: Duration = Duration::from_secs(10);
const DETECTION_TICK: Duration = Duration::from_secs(1);

pub(crate) fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

type DimensionMap = Mutex<HashMap<DimensionHandle, Arc<Dimension>>>;

/// A monitored host: its dimensions, and the training/detection workers
/// that sweep them.
pub struct Host {
    handle: HostHandle,
    uuid: Uuid,
    dimensions: Arc<DimensionMap>,
    shutdown: Arc<AtomicBool>,
    training_worker: Option<JoinHandle<()>>,
    detection_worker: Option<JoinHandle<()>>,
}

impl Host {
    pub fn new(handle: HostHandle, uuid: Uuid) -> Self {
        Self {
            handle,
            uuid,
            dimensions: Arc::new(Mutex::new(HashMap::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
            training_worker: None,
            detection_worker: None,
        }
    }

    pub fn handle(&self) -> &HostHandle {
        &self.handle
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn add_dimension(&self, dimension: Arc<Dimension>) {
        self.dimensions.lock().insert(dimension.handle().clone(), dimension);
    }

    pub fn remove_dimension(&self, handle: &DimensionHandle) -> Option<Arc<Dimension>> {
        self.dimensions.lock().remove(handle)
    }

    pub fn dimension(&self, handle: &DimensionHandle) -> Option<Arc<Dimension>> {
        self.dimensions.lock().get(handle).cloned()
    }

    pub fn dimension_handles(&self) -> Vec<DimensionHandle> {
        self.dimensions.lock().keys().cloned().collect()
    }

    /// Spawn the training and detection workers. No-op if already started.
    pub fn start(
        &mut self,
        config: Arc<Config>,
        source: Arc<dyn SeriesSource>,
        sink: Arc<dyn ChartSink>,
        store: Arc<dyn EventStore>,
    ) {
        if self.training_worker.is_some() {
            return;
        }

        let dims = Arc::clone(&self.dimensions);
        let shutdown = Arc::clone(&self.shutdown);
        let cfg = Arc::clone(&config);
        let src = Arc::clone(&source);
        let uuid = self.uuid;
        self.training_worker = Some(
            thread::Builder::new()
                .name(format!("ad1-train-{}", self.handle))
                .spawn(move || training_loop(uuid, dims, shutdown, cfg, src))
                .expect("failed to spawn training worker"),
        );

        let dims = Arc::clone(&self.dimensions);
        let shutdown = Arc::clone(&self.shutdown);
        let handle = self.handle.clone();
        let uuid = self.uuid;
        self.detection_worker = Some(
            thread::Builder::new()
                .name(format!("ad1-detect-{}", self.handle))
                .spawn(move || detection_loop(handle, uuid, dims, shutdown, config, source, sink, store))
                .expect("failed to spawn detection worker"),
        );
    }

    /// Signal both workers to stop and join them.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.training_worker.take() {
            let _ = worker.join();
        }
        if let Some(worker) = self.detection_worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.stop();
    }
}

fn training_loop(
    uuid: Uuid,
    dimensions: Arc<DimensionMap>,
    shutdown: Arc<AtomicBool>,
    config: Arc<Config>,
    source: Arc<dyn SeriesSource>,
) {
    while !shutdown.load(Ordering::Acquire) {
        let iter_start = Instant::now();
        let now = now_secs();
        let snapshot: Vec<Arc<Dimension>> = dimensions.lock().values().cloned().collect();
        let num_dimensions = snapshot.len();

        for dim in &snapshot {
            let outcome = dim.train(now, uuid, source.as_ref(), &config);
            if outcome == ad_common::error::Outcome::Success {
                debug!(dimension = dim.id(), "training succeeded");
                break;
            }
        }

        let real = iter_start.elapsed();
        let allotted = Duration::from_secs_f64(config.train_every_secs as f64 / (num_dimensions + 1) as f64);
        if real < allotted {
            thread::sleep(allotted - real);
        } else {
            thread::yield_now();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn detection_loop(
    handle: HostHandle,
    uuid: Uuid,
    dimensions: Arc<DimensionMap>,
    shutdown: Arc<AtomicBool>,
    config: Arc<Config>,
    source: Arc<dyn SeriesSource>,
    sink: Arc<dyn ChartSink>,
    store: Arc<dyn EventStore>,
) {
    thread::sleep(DETECTION_WARMUP);

    let mut window = RollingBitWindow::new(config.ad_window_size, config.ad_window_threshold());
    let mut anomaly_rate = 0.0f64;

    while !shutdown.load(Ordering::Acquire) {
        let tick_start = Instant::now();
        let now = now_secs();
        let snapshot: Vec<Arc<Dimension>> = dimensions.lock().values().cloned().collect();

        anomaly_rate = run_detection_tick(
            &handle,
            uuid,
            &snapshot,
            &mut window,
            anomaly_rate,
            now,
            source.as_ref(),
            sink.as_ref(),
            &config,
            store.as_ref(),
        );

        let elapsed = tick_start.elapsed();
        if elapsed < DETECTION_TICK {
            thread::sleep(DETECTION_TICK - elapsed);
        }
    }
}

/// One detection tick's worth of work (the detection worker's body, minus
/// the cadence sleep): feed the host rolling window, predict every
/// dimension, publish chart values, and close an event on a closing edge.
/// Pulled out of [`detection_loop`] so the sequence can be driven
/// deterministically, tick by tick, without real wall-clock sleeps —
/// exercised directly by the integration tests alongside the real loop.
#[allow(clippy::too_many_arguments)]
pub fn run_detection_tick(
    handle: &HostHandle,
    uuid: Uuid,
    dimensions: &[Arc<Dimension>],
    window: &mut RollingBitWindow,
    anomaly_rate: f64,
    now: i64,
    source: &dyn SeriesSource,
    sink: &dyn ChartSink,
    config: &Config,
    store: &dyn EventStore,
) -> f64 {
    let above = anomaly_rate >= config.anomaly_rate_threshold;
    let (edge, previous_length) = window.insert(above);

    if edge.is_roundtrip_below() {
        for dim in dimensions {
            dim.reset_contribution();
        }
    }

    let mut num_anomalous = 0u32;
    for dim in dimensions {
        let (score, bit) = dim.predict(now, source, config);
        if bit {
            num_anomalous += 1;
        }
        sink.emit_dimension_score(dim.handle(), (score * 10000.0).round() as u32);
    }
    let num_total = dimensions.len() as u32;
    let new_rate = if num_total == 0 { 0.0 } else { num_anomalous as f64 / num_total as f64 };
    sink.emit_host_rate(handle, num_total, num_anomalous, new_rate * 100.0);

    if edge.is_closing() {
        close_event(handle, uuid, now, previous_length, dimensions, config, store);
    }

    new_rate
}

fn close_event(
    handle: &HostHandle,
    uuid: Uuid,
    now: i64,
    previous_length: u64,
    snapshot: &[Arc<Dimension>],
    config: &Config,
    store: &dyn EventStore,
) {
    let mut contributions: Vec<DimensionContribution> = snapshot
        .iter()
        .filter_map(|dim| {
            let rate = dim.anomaly_rate(previous_length);
            (rate >= config.ad_unit_rate_threshold).then(|| DimensionContribution {
                dimension_id: dim.id().to_string(),
                anomaly_rate: rate,
            })
        })
        .collect();

    if contributions.is_empty() {
        debug!(host = %handle, "anomaly event closed with no dimension above the unit-rate threshold");
        return;
    }
    contributions.sort_by(|a, b| b.anomaly_rate.partial_cmp(&a.anomaly_rate).unwrap());

    let after = now - previous_length as i64;
    let event = AnomalyEvent::new(uuid, after, now, contributions);
    if let Err(err) = store.insert(&event) {
        warn!(host = %handle, error = %err, "failed to persist anomaly event");
    }
}
