//! Publication of detection output to the host agent's chart/dashboard
//! layer: published time series for per-dimension scores and host rates.

use parking_lot::Mutex;

use ad_common::handle::{DimensionHandle, HostHandle};

/// The engine's only outbound I/O besides the event store: per-tick chart
/// values. The host agent's actual charting system is an external
/// collaborator; this trait is the seam.
pub trait ChartSink: Send + Sync {
    /// `num_total_dimensions`, `num_anomalous_dimensions`, and
    /// `anomaly_rate * 100` for one host, once per detection tick.
    fn emit_host_rate(&self, host: &HostHandle, total: u32, anomalous: u32, rate_pct: f64);

    /// One dimension's anomaly score (`score * 10000`, integer), published
    /// to the `_km`-suffixed sidecar chart.
    fn emit_dimension_score(&self, dim: &DimensionHandle, score_x10000: u32);
}

/// Discards every published value. Used by callers that only care about
/// `is_anomalous`/the event store, not the chart stream.
#[derive(Debug, Default)]
pub struct NullChartSink;

impl ChartSink for NullChartSink {
    fn emit_host_rate(&self, _host: &HostHandle, _total: u32, _anomalous: u32, _rate_pct: f64) {}
    fn emit_dimension_score(&self, _dim: &DimensionHandle, _score_x10000: u32) {}
}

/// One published host-rate tick, as captured by [`RecordingChartSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct HostRateSample {
    pub host: HostHandle,
    pub total: u32,
    pub anomalous: u32,
    pub rate_pct: f64,
}

/// One published dimension score, as captured by [`RecordingChartSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionScoreSample {
    pub dimension: DimensionHandle,
    pub score_x10000: u32,
}

/// Records every published value in memory, for tests and `ad_demo`.
#[derive(Debug, Default)]
pub struct RecordingChartSink {
    host_rates: Mutex<Vec<HostRateSample>>,
    dimension_scores: Mutex<Vec<DimensionScoreSample>>,
}

impl RecordingChartSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host_rates(&self) -> Vec<HostRateSample> {
        self.host_rates.lock().clone()
    }

    pub fn dimension_scores(&self) -> Vec<DimensionScoreSample> {
        self.dimension_scores.lock().clone()
    }
}

impl ChartSink for RecordingChartSink {
    fn emit_host_rate(&self, host: &HostHandle, total: u32, anomalous: u32, rate_pct: f64) {
        self.host_rates.lock().push(HostRateSample {
            host: host.clone(),
            total,
            anomalous,
            rate_pct,
        });
    }

    fn emit_dimension_score(&self, dim: &DimensionHandle, score_x10000: u32) {
        self.dimension_scores.lock().push(DimensionScoreSample {
            dimension: dim.clone(),
            score_x10000,
        });
    }
}
