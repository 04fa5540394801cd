//! Opaque handles identifying hosts and dimensions to external collaborators.
//!
//! `Arc<str>` is cheap to clone into worker threads, usable directly as a
//! `HashMap` key, and prints legibly in `tracing` spans — preferable to a
//! numeric ID scheme nothing downstream actually needs.

use std::fmt;
use std::sync::Arc;

/// Identifies a monitored host to the registry and to storage/sink traits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostHandle(Arc<str>);

impl HostHandle {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HostHandle {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifies a single time series (chart.dimension) to the storage query
/// interface and to the chart sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimensionHandle(Arc<str>);

impl DimensionHandle {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DimensionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DimensionHandle {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
