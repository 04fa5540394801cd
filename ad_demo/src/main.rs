//! Minimal end-to-end wiring of the AD1 engine to synthetic data.
//!
//! Generates a couple of sine-wave dimensions (one of which develops a
//! periodic anomalous burst) and lets the engine train and detect against
//! them, printing `is_anomalous` as it runs. This stands in for the host
//! agent integration: the real storage engine, config facility, and
//! dashboard are external collaborators not reimplemented here.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::info;
use uuid::Uuid;

use ad_common::config::Config;
use ad_common::handle::{DimensionHandle, HostHandle};
use ad_common::storage::{encode_packed, SeriesCursor, SeriesSource};
use ad_engine::{Engine, RecordingChartSink};
use ad_store::SqliteEventStore;

/// Deterministic sine-wave generator with a periodic anomalous burst on one
/// dimension, standing in for the host agent's real time-series storage.
struct SyntheticSource {
    started_at: i64,
}

impl SyntheticSource {
    fn new(started_at: i64) -> Self {
        Self { started_at }
    }

    fn value_at(handle: &DimensionHandle, t: i64) -> f64 {
        let phase = handle.as_str().len() as f64 * 0.7;
        let base = 50.0 + 5.0 * (t as f64 * 0.05 + phase).sin();
        let bursting = handle.as_str() == "system.cpu.user" && (t / 90) % 4 == 3 && t % 90 < 20;
        if bursting {
            base + 40.0
        } else {
            base
        }
    }
}

impl SeriesSource for SyntheticSource {
    fn latest_time(&self, _handle: &DimensionHandle) -> Option<i64> {
        Some(now_secs())
    }

    fn oldest_time(&self, _handle: &DimensionHandle) -> Option<i64> {
        Some(self.started_at - 4 * 3600)
    }

    fn query<'a>(&'a self, handle: &DimensionHandle, after: i64, before: i64) -> Box<dyn SeriesCursor + 'a> {
        Box::new(SyntheticCursor {
            handle: handle.clone(),
            next: after + 1,
            end: before,
        })
    }
}

struct SyntheticCursor {
    handle: DimensionHandle,
    next: i64,
    end: i64,
}

impl SeriesCursor for SyntheticCursor {
    fn is_finished(&self) -> bool {
        self.next > self.end
    }

    fn next_metric(&mut self) -> Option<(i64, u32)> {
        if self.next > self.end {
            return None;
        }
        let t = self.next;
        self.next += 1;
        Some((t, encode_packed(true, SyntheticSource::value_at(&self.handle, t))))
    }
}

fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

fn main() {
    tracing_subscriber::fmt::init();
    info!("AD1 demo starting...");

    // Compressed timings so the demo trains and detects inside a couple of
    // minutes instead of the hour-scale production defaults.
    let config = Config {
        train_secs: 120,
        min_train_secs: 60,
        train_every_secs: 30,
        ad_window_size: 12,
        charts_to_skip: "!system.* *".to_string(),
        ..Config::default()
    };

    let source = Arc::new(SyntheticSource::new(now_secs()));
    let sink = Arc::new(RecordingChartSink::new());
    let store = Arc::new(SqliteEventStore::open_in_memory().expect("open in-memory event store"));

    let engine = Engine::init(config, source, sink.clone(), store);

    let host = HostHandle::new("demo-host");
    engine.new_host(host.clone(), Uuid::new_v4(), "demo-host");

    // `chart_id` is the chart a dimension belongs to (what `charts_to_skip`
    // matches against); `series_key` is this dimension's own time-series
    // handle, one level more specific than its chart.
    let dims = [
        ("system.cpu.user", "system.cpu", "cpu.user"),
        ("system.net.received", "system.net", "net.received"),
    ];
    for (series_key, chart_id, id) in dims {
        engine.new_dimension(&host, DimensionHandle::new(series_key), id.to_string(), id.to_string(), chart_id, 1);
    }

    info!(host = %host, dimensions = dims.len(), "monitoring started, warming up...");
    for _ in 0..18 {
        thread::sleep(Duration::from_secs(10));
        for (series_key, _, _) in dims {
            let handle = DimensionHandle::new(series_key);
            info!(dimension = series_key, anomalous = engine.is_anomalous(&handle), "tick");
        }
    }

    info!(samples = sink.host_rates().len(), "recorded host-rate samples");
    engine.delete_host(&host);
}
