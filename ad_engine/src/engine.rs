//! Process-wide registry mapping external handles to hosts and dimensions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use ad_common::config::Config;
use ad_common::handle::{DimensionHandle, HostHandle};
use ad_common::storage::SeriesSource;
use ad_store::EventStore;

use crate::dimension::Dimension;
use crate::host::Host;
use crate::sink::ChartSink;

/// The engine singleton: owns the config snapshot and every monitored
/// host, and answers the agent-facing queries.
pub struct Engine {
    config: Arc<Config>,
    source: Arc<dyn SeriesSource>,
    sink: Arc<dyn ChartSink>,
    store: Arc<dyn EventStore>,
    hosts: Mutex<HashMap<HostHandle, Host>>,
    /// Secondary index for O(1) `is_anomalous` lookups without knowing
    /// which host owns a dimension.
    dimension_index: Mutex<HashMap<DimensionHandle, Arc<Dimension>>>,
}

impl Engine {
    /// `init(config)`: load the config snapshot and wire in the engine's
    /// collaborators. No workers start here — hosts start their own on
    /// `new_host`.
    pub fn init(config: Config, source: Arc<dyn SeriesSource>, sink: Arc<dyn ChartSink>, store: Arc<dyn EventStore>) -> Self {
        Self {
            config: Arc::new(config),
            source,
            sink,
            store,
            hosts: Mutex::new(HashMap::new()),
            dimension_index: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Construct a host and start its workers, unless its hostname matches
    /// the configured skip pattern.
    pub fn new_host(&self, handle: HostHandle, uuid: Uuid, hostname: &str) {
        if self.config.hosts_to_skip().matches(hostname) {
            info!(host = hostname, "host matches skip pattern, not monitoring");
            return;
        }
        let mut host = Host::new(handle.clone(), uuid);
        host.start(
            Arc::clone(&self.config),
            Arc::clone(&self.source),
            Arc::clone(&self.sink),
            Arc::clone(&self.store),
        );
        self.hosts.lock().insert(handle, host);
    }

    /// Signal the host's workers to stop, join them, and drop its
    /// dimension map (and its entries in the dimension index).
    pub fn delete_host(&self, handle: &HostHandle) {
        if let Some(mut host) = self.hosts.lock().remove(handle) {
            let owned = host.dimension_handles();
            host.stop();
            let mut index = self.dimension_index.lock();
            for dim_handle in owned {
                index.remove(&dim_handle);
            }
        }
    }

    /// Insert a new dimension into its host's map, unless its chart name
    /// matches the configured skip pattern.
    #[allow(clippy::too_many_arguments)]
    pub fn new_dimension(
        &self,
        host_handle: &HostHandle,
        dim_handle: DimensionHandle,
        dimension_id: String,
        display_name: String,
        chart_name: &str,
        update_every: i64,
    ) {
        if self.config.charts_to_skip().matches(chart_name) {
            info!(chart = chart_name, "chart matches skip pattern, not monitoring");
            return;
        }
        let dimension = Arc::new(Dimension::new(dim_handle.clone(), dimension_id, display_name, update_every, self.config.diff_n));
        if let Some(host) = self.hosts.lock().get(host_handle) {
            host.add_dimension(Arc::clone(&dimension));
            self.dimension_index.lock().insert(dim_handle, dimension);
        }
    }

    pub fn delete_dimension(&self, host_handle: &HostHandle, dim_handle: &DimensionHandle) {
        if let Some(host) = self.hosts.lock().get(host_handle) {
            host.remove_dimension(dim_handle);
        }
        self.dimension_index.lock().remove(dim_handle);
    }

    /// Constant-time, lock-free cached read of a dimension's anomaly bit.
    pub fn is_anomalous(&self, dim_handle: &DimensionHandle) -> bool {
        self.dimension_index
            .lock()
            .get(dim_handle)
            .map(|dim| dim.anomaly_bit())
            .unwrap_or(false)
    }

    fn host_uuid(&self, host_handle: &HostHandle) -> Option<Uuid> {
        self.hosts.lock().get(host_handle).map(|h| h.uuid())
    }

    /// `[after, before]` pairs of every anomaly event overlapping the
    /// range, or `None` if the host is unknown or no events overlap.
    pub fn get_anomaly_events(
        &self,
        host_handle: &HostHandle,
        detector_name: &str,
        detector_version: i32,
        after: i64,
        before: i64,
    ) -> Option<String> {
        let uuid = self.host_uuid(host_handle)?;
        let rows = self.store.range(detector_name, detector_version, uuid, after, before).ok()?;
        if rows.is_empty() {
            return None;
        }
        serde_json::to_string(&rows).ok()
    }

    /// The stored `payload_json` of every anomaly event overlapping the
    /// range, assembled into one JSON array, or `None` if none overlap.
    pub fn get_anomaly_event_info(
        &self,
        host_handle: &HostHandle,
        detector_name: &str,
        detector_version: i32,
        after: i64,
        before: i64,
    ) -> Option<String> {
        let uuid = self.host_uuid(host_handle)?;
        let payloads = self.store.info(detector_name, detector_version, uuid, after, before).ok()?;
        if payloads.is_empty() {
            return None;
        }
        let parsed: Vec<serde_json::Value> = payloads.iter().filter_map(|p| serde_json::from_str(p).ok()).collect();
        serde_json::to_string(&parsed).ok()
    }
}
