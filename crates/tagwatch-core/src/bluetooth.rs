//! Bluetooth Low Energy radio access.
//!
//! The pipeline only needs two things from a radio: power it on once at
//! startup, and stream advertisements while a scan window is open. The
//! [`Radio`] trait captures exactly that. Backends:
//!
//! - [`BluerRadio`] (feature `bluetooth`): BlueZ over D-Bus via `bluer`.
//! - [`MockRadio`] (feature `mock-bluetooth`, or whenever `bluetooth` is
//!   off): replays scripted advertisements, for tests and hardware-free runs.
//!
//! A radio never touches the registry. It hands advertisements to an
//! [`AdvertisementSink`], which wraps the bounded channel to the tracker.

use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::types::{Advertisement, ManufacturerData};

#[cfg(feature = "bluetooth")]
mod bluez;
#[cfg(any(test, feature = "mock-bluetooth", not(feature = "bluetooth")))]
mod mock;

#[cfg(feature = "bluetooth")]
pub use bluez::BluerRadio;
#[cfg(any(test, feature = "mock-bluetooth", not(feature = "bluetooth")))]
pub use mock::{MockRadio, MockWindow};

/// Errors raised by a radio backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BluetoothError {
    /// No adapter is available.
    #[error("no Bluetooth adapter found")]
    AdapterNotFound,

    /// The adapter could not be powered on.
    #[error("Bluetooth adapter is powered off")]
    AdapterPoweredOff,

    /// Connecting to the Bluetooth daemon failed.
    #[error("failed to open Bluetooth session: {message}")]
    SessionInitFailed {
        /// Backend error text.
        message: String,
    },

    /// Starting or running discovery failed.
    #[error("discovery failed: {message}")]
    DiscoveryFailed {
        /// Backend error text.
        message: String,
    },
}

/// Result alias for radio operations.
pub type BluetoothResult<T> = std::result::Result<T, BluetoothError>;

/// A BLE radio that can be scanned for advertisements.
pub trait Radio: Send + 'static {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Prepare the radio for scanning. Called once before the first window.
    fn enable(&mut self) -> impl Future<Output = BluetoothResult<()>> + Send;

    /// Scan, pushing every advertisement into `sink`.
    ///
    /// Runs until the sink reports it is closed, the radio runs out of
    /// advertisements, or the future is dropped. Dropping the future must
    /// stop the radio scan.
    fn scan(&mut self, sink: &AdvertisementSink) -> impl Future<Output = BluetoothResult<()>> + Send;
}

/// Producer end of the advertisement channel.
///
/// Pushes wait for buffer space, but never past cancellation.
#[derive(Debug, Clone)]
pub struct AdvertisementSink {
    tx: mpsc::Sender<Advertisement>,
    cancel: CancellationToken,
}

impl AdvertisementSink {
    /// Wrap a channel sender and the shared cancellation token.
    #[must_use]
    pub const fn new(tx: mpsc::Sender<Advertisement>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Push an advertisement. Returns `false` once the receiver is gone or
    /// cancellation was requested; the caller should stop scanning.
    pub async fn push(&self, advertisement: Advertisement) -> bool {
        tokio::select! {
            sent = self.tx.send(advertisement) => sent.is_ok(),
            () = self.cancel.cancelled() => false,
        }
    }

    /// Whether pushes can no longer succeed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed() || self.cancel.is_cancelled()
    }
}

/// Build an advertisement from device properties read during discovery.
///
/// BlueZ replays every cached device when discovery starts, including ones
/// that went out of range long ago. Those carry no signal strength, so a
/// device without an RSSI reading yields `None` and is not reported.
#[must_use]
pub fn live_advertisement(
    address: impl Into<String>,
    rssi: Option<i16>,
    local_name: Option<String>,
    manufacturer_data: impl IntoIterator<Item = (u16, Vec<u8>)>,
) -> Option<Advertisement> {
    rssi?;
    Some(Advertisement {
        address: address.into(),
        local_name,
        manufacturer_data: manufacturer_data.into_iter().collect::<ManufacturerData>(),
    })
}
