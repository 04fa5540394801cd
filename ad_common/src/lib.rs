//! AD1 Common Library
//!
//! Data model and algorithms shared by every AD1 crate: the packed-sample
//! decode, sliding sample windows, feature extraction, k-means scoring, the
//! rolling anomaly-rate state machine, the error taxonomy, and config.
//!
//! # Module Structure
//!
//! - [`error`] - the `Outcome` non-fatal result taxonomy
//! - [`handle`] - opaque host/dimension handles
//! - [`storage`] - the `SeriesSource`/`SeriesCursor` query traits and packed-sample codec
//! - [`sample`] - `SampleWindow` construction from a `SeriesSource`
//! - [`feature`] - differencing/smoothing/lag-embedding feature pipeline
//! - [`kmeans`] - the `K=2` clustering model
//! - [`bits`] - fixed-capacity rolling bit counter
//! - [`window`] - the `RollingBitWindow` anomaly-event state machine
//! - [`pattern`] - host/chart skip-list glob matching
//! - [`config`] - the typed configuration snapshot
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! ad_common = { workspace = true }
//! ```

pub mod bits;
pub mod config;
pub mod error;
pub mod feature;
pub mod handle;
pub mod kmeans;
pub mod pattern;
pub mod sample;
pub mod storage;
pub mod window;

pub use crate::config::{Config, ConfigError};
pub use crate::error::Outcome;
pub use crate::feature::{FeatureMatrix, FeaturePipeline};
pub use crate::handle::{DimensionHandle, HostHandle};
pub use crate::kmeans::KMeansModel;
pub use crate::pattern::SimplePattern;
pub use crate::sample::SampleWindow;
pub use crate::storage::{decode_packed, encode_packed, SeriesCursor, SeriesSource};
pub use crate::window::{Edge, RollingBitWindow, WindowState};
