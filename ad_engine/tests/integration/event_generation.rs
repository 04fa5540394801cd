//! End-to-end: two trained dimensions, a sustained anomalous run, and the
//! single ranked event that a closing edge must persist.

use std::sync::Arc;

use uuid::Uuid;

use ad_common::config::Config;
use ad_common::error::Outcome;
use ad_common::handle::{DimensionHandle, HostHandle};
use ad_common::storage::{encode_packed, SeriesCursor, SeriesSource};
use ad_common::window::RollingBitWindow;
use ad_engine::host::run_detection_tick;
use ad_engine::sink::NullChartSink;
use ad_engine::Dimension;
use ad_store::{EventStore, SqliteEventStore};

/// A source whose value holds to a small, continuously-varying baseline
/// except for a short, high-amplitude oscillating burst, so that a
/// single-step-difference model trained on the baseline scores the burst
/// as anomalous and snaps back to normal the instant the burst ends.
struct BurstSource {
    burst_start: i64,
    burst_end: i64,
}

impl BurstSource {
    fn baseline(t: i64) -> f64 {
        1.0 + 0.1 * (t as f64 * 0.37).sin() + 0.01 * (t.rem_euclid(7) as f64)
    }

    fn value_at(&self, t: i64) -> f64 {
        if t >= self.burst_start && t <= self.burst_end {
            Self::baseline(t) + if t % 2 == 0 { 50.0 } else { -50.0 }
        } else {
            Self::baseline(t)
        }
    }
}

impl SeriesSource for BurstSource {
    fn latest_time(&self, _handle: &DimensionHandle) -> Option<i64> {
        Some(100_000)
    }

    fn oldest_time(&self, _handle: &DimensionHandle) -> Option<i64> {
        Some(0)
    }

    fn query<'a>(&'a self, _handle: &DimensionHandle, after: i64, before: i64) -> Box<dyn SeriesCursor + 'a> {
        Box::new(BurstCursor { source: self, next: after + 1, end: before })
    }
}

struct BurstCursor<'a> {
    source: &'a BurstSource,
    next: i64,
    end: i64,
}

impl SeriesCursor for BurstCursor<'_> {
    fn is_finished(&self) -> bool {
        self.next > self.end
    }

    fn next_metric(&mut self) -> Option<(i64, u32)> {
        if self.next > self.end {
            return None;
        }
        let t = self.next;
        self.next += 1;
        Some((t, encode_packed(true, self.source.value_at(t))))
    }
}

fn test_config() -> Config {
    let mut c = Config::default();
    c.diff_n = 1;
    c.smooth_n = 1;
    c.lag_n = 0;
    c.train_secs = 50;
    c.min_train_secs = 50;
    c.anomaly_score_threshold = 0.5;
    c.anomaly_rate_threshold = 0.5;
    c.ad_window_size = 1;
    c.ad_window_rate_threshold = 1.0;
    c.ad_unit_rate_threshold = 0.1;
    c
}

#[test]
fn closing_edge_persists_one_ranked_event_covering_both_dimensions() {
    let config = test_config();
    let host_uuid = Uuid::new_v4();
    // The burst spans [t0 - 1, t0 + 7]; a one-step-difference model then
    // reads the first anomalous tick at now = t0 and the last at now = t0 + 9
    // (ten consecutive ticks), snapping back to normal at now = t0 + 10.
    let t0 = 5_000i64;
    let source = BurstSource { burst_start: t0 - 1, burst_end: t0 + 7 };

    let dim_cpu = Arc::new(Dimension::new(DimensionHandle::new("system.cpu.user"), "system.cpu.user".into(), "CPU User".into(), 1, config.diff_n));
    let dim_net = Arc::new(Dimension::new(DimensionHandle::new("system.net.received"), "system.net.received".into(), "Net Received".into(), 1, config.diff_n));

    for dim in [&dim_cpu, &dim_net] {
        let outcome = dim.train(1_000, host_uuid, &source, &config);
        assert_eq!(outcome, Outcome::Success, "training must succeed on the baseline window");
    }

    let dimensions = vec![Arc::clone(&dim_cpu), Arc::clone(&dim_net)];
    let store = SqliteEventStore::open_in_memory().unwrap();
    let sink = NullChartSink;
    let host_handle = HostHandle::new("burst-host");

    let mut window = RollingBitWindow::new(config.ad_window_size, config.ad_window_threshold());
    let mut anomaly_rate = 0.0f64;

    for now in (t0 - 1)..=(t0 + 12) {
        anomaly_rate =
            run_detection_tick(&host_handle, host_uuid, &dimensions, &mut window, anomaly_rate, now, &source, &sink, &config, &store);
    }

    let rows = store.range(ad_store::AnomalyEvent::DETECTOR_NAME, ad_store::AnomalyEvent::DETECTOR_VERSION, host_uuid, 0, 100_000).unwrap();
    assert_eq!(rows.len(), 1, "exactly one anomaly event must close");
    let (after, before) = rows[0];
    assert_eq!(before - after, 10, "the closed run must cover ten ticks");

    let payloads = store.info(ad_store::AnomalyEvent::DETECTOR_NAME, ad_store::AnomalyEvent::DETECTOR_VERSION, host_uuid, 0, 100_000).unwrap();
    assert_eq!(payloads.len(), 1);
    assert!(payloads[0].contains("system.cpu.user"));
    assert!(payloads[0].contains("system.net.received"));
}

#[test]
fn a_burst_that_never_clears_the_unit_threshold_closes_with_no_event() {
    // A host-rate burst that closes without any dimension individually
    // crossing ADUnitRateThreshold must not persist an event.
    let mut config = test_config();
    config.ad_unit_rate_threshold = 1.1; // unreachable
    let host_uuid = Uuid::new_v4();
    let t0 = 5_000i64;
    let source = BurstSource { burst_start: t0 - 1, burst_end: t0 + 7 };

    let dim_cpu = Arc::new(Dimension::new(DimensionHandle::new("system.cpu.user"), "system.cpu.user".into(), "CPU User".into(), 1, config.diff_n));
    assert_eq!(dim_cpu.train(1_000, host_uuid, &source, &config), Outcome::Success);

    let dimensions = vec![Arc::clone(&dim_cpu)];
    let store = SqliteEventStore::open_in_memory().unwrap();
    let sink = NullChartSink;
    let host_handle = HostHandle::new("burst-host");
    let mut window = RollingBitWindow::new(config.ad_window_size, config.ad_window_threshold());
    let mut anomaly_rate = 0.0f64;

    for now in (t0 - 1)..=(t0 + 12) {
        anomaly_rate =
            run_detection_tick(&host_handle, host_uuid, &dimensions, &mut window, anomaly_rate, now, &source, &sink, &config, &store);
    }

    let rows = store.range(ad_store::AnomalyEvent::DETECTOR_NAME, ad_store::AnomalyEvent::DETECTOR_VERSION, host_uuid, 0, 100_000).unwrap();
    assert!(rows.is_empty());
}
