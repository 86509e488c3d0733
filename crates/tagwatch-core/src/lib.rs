//! # tagwatch-core
//!
//! Core tracking pipeline for tagwatch, a detector for Apple FindMy
//! accessories (AirTags in particular) that stay near you.
//!
//! This crate provides:
//! - Structural classification of FindMy advertisements
//! - A concurrent registry of tracked devices with age-based eviction
//! - A duty-cycled scan source over a pluggable BLE radio
//! - The tracking loop that folds advertisements and publishes snapshots
//! - Company identifier lookup, configuration and error types
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`classify`] - FindMy / AirTag / registered predicates
//! - [`registry`] - One record per address, sighting fold and stale eviction
//! - [`bluetooth`] - The [`Radio`] trait and its BlueZ and mock backends
//! - [`scanner`] - Rest/scan duty cycle feeding a bounded channel
//! - [`tracker`] - The orchestrating loop and its lifecycle
//! - [`snapshot`] - Ordering, change suppression and device views
//! - [`pipeline`] - Wires a radio, the scan source and the tracker together
//! - [`companies`] - Bluetooth SIG company identifier table
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod bluetooth;
pub mod classify;
pub mod companies;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod scanner;
pub mod snapshot;
pub mod tracker;
pub mod types;

// Re-export primary types for convenience
#[cfg(feature = "bluetooth")]
pub use bluetooth::BluerRadio;
#[cfg(any(test, feature = "mock-bluetooth", not(feature = "bluetooth")))]
pub use bluetooth::{MockRadio, MockWindow};
pub use bluetooth::{AdvertisementSink, BluetoothError, BluetoothResult, Radio};
pub use classify::{classify, is_airtag_shaped, is_findmy_broadcast, is_registered, Classification};
pub use companies::{CompanyDirectory, CompanyTableError, UNKNOWN_COMPANY};
pub use config::{
    Config, ConfigError, ConfigResult, DisplayConfig, ScanConfig, ServerConfig, SnapshotTrigger,
    TrackingConfig,
};
pub use error::{Error, Result, TagwatchError};
pub use pipeline::Pipeline;
pub use registry::{Registry, TrackedDevice};
pub use scanner::ScanSource;
pub use snapshot::{by_tracking_duration, SnapshotPublisher};
pub use tracker::{Tracker, TrackerState, TrackerStats};
pub use types::{Advertisement, DeviceView, ManufacturerData, Snapshot};
