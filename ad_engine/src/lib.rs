//! The per-host scheduler: dimension state, host worker threads, and the
//! process-wide registry that ties them to the event store and chart sink.
//!
//! - [`dimension`]: one monitored time series — its model and cached score.
//! - [`host`]: a monitored host's dimension map and its training/detection
//!   worker threads.
//! - [`engine`]: the registry mapping external handles to hosts and
//!   dimensions, and the agent-facing query surface.
//! - [`sink`]: the seam to the host agent's charting layer.

pub mod dimension;
pub mod engine;
pub mod host;
pub mod sink;

pub use crate::dimension::Dimension;
pub use crate::engine::Engine;
pub use crate::host::Host;
pub use crate::sink::{ChartSink, DimensionScoreSample, HostRateSample, NullChartSink, RecordingChartSink};
