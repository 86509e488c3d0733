//! BlueZ radio backend.

use bluer::{Adapter, AdapterEvent, Address, Session};
use futures::StreamExt;
use tracing::{debug, info};

use super::{live_advertisement, AdvertisementSink, BluetoothError, BluetoothResult, Radio};
use crate::types::Advertisement;

/// Radio backed by the default BlueZ adapter.
pub struct BluerRadio {
    // Keeps the D-Bus connection alive for the adapter handle.
    _session: Session,
    adapter: Adapter,
}

impl BluerRadio {
    /// Connect to BlueZ and pick the default adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the Bluetooth daemon is unreachable or there is
    /// no adapter.
    pub async fn new() -> BluetoothResult<Self> {
        let session = Session::new()
            .await
            .map_err(|e| BluetoothError::SessionInitFailed {
                message: e.to_string(),
            })?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|_| BluetoothError::AdapterNotFound)?;
        Ok(Self {
            _session: session,
            adapter,
        })
    }
}

impl Radio for BluerRadio {
    fn name(&self) -> &str {
        self.adapter.name()
    }

    async fn enable(&mut self) -> BluetoothResult<()> {
        let powered = self
            .adapter
            .is_powered()
            .await
            .map_err(|_| BluetoothError::AdapterNotFound)?;
        if !powered {
            info!(adapter = self.adapter.name(), "Powering on Bluetooth adapter");
            self.adapter
                .set_powered(true)
                .await
                .map_err(|_| BluetoothError::AdapterPoweredOff)?;
        }
        Ok(())
    }

    async fn scan(&mut self, sink: &AdvertisementSink) -> BluetoothResult<()> {
        // Discovery stops when this stream is dropped.
        let events = self
            .adapter
            .discover_devices_with_changes()
            .await
            .map_err(|e| BluetoothError::DiscoveryFailed {
                message: e.to_string(),
            })?;
        futures::pin_mut!(events);

        // With changes enabled, BlueZ reports property updates (new RSSI or
        // manufacturer data) on known devices as `DeviceAdded` again.
        while let Some(event) = events.next().await {
            let AdapterEvent::DeviceAdded(address) = event else {
                continue;
            };
            let Some(advertisement) = read_advertisement(&self.adapter, address).await else {
                continue;
            };
            if !sink.push(advertisement).await {
                break;
            }
        }
        Ok(())
    }
}

/// Read the advertisement fields BlueZ holds for `address`, skipping
/// devices that are not currently in range.
async fn read_advertisement(adapter: &Adapter, address: Address) -> Option<Advertisement> {
    let device = match adapter.device(address) {
        Ok(device) => device,
        Err(e) => {
            debug!(%address, error = %e, "Device vanished before it could be read");
            return None;
        }
    };
    let manufacturer_data = device
        .manufacturer_data()
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    let rssi = device.rssi().await.ok().flatten();
    let local_name = device.name().await.ok().flatten();

    let advertisement = live_advertisement(address.to_string(), rssi, local_name, manufacturer_data);
    if advertisement.is_none() {
        debug!(%address, "Skipping cached device with no signal");
    }
    advertisement
}
