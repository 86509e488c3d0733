//! Shared types and OpenAPI schemas.
//!
//! [`Advertisement`] is what the radio hands to the pipeline; [`Snapshot`] and
//! [`DeviceView`] are what the pipeline hands to its consumers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::classify::APPLE_COMPANY_ID;

/// Manufacturer-specific advertisement data, keyed by Bluetooth SIG company
/// identifier.
pub type ManufacturerData = BTreeMap<u16, Vec<u8>>;

/// One radio observation of a BLE advertiser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    /// Advertiser address, e.g. `"AA:BB:CC:DD:EE:FF"`.
    pub address: String,

    /// Local name, if the advertiser broadcasts one.
    pub local_name: Option<String>,

    /// Manufacturer-specific data entries.
    pub manufacturer_data: ManufacturerData,
}

impl Advertisement {
    /// Create an advertisement with no name and no manufacturer data.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            local_name: None,
            manufacturer_data: ManufacturerData::new(),
        }
    }

    /// Set the local name.
    #[must_use]
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    /// Add a manufacturer data entry.
    #[must_use]
    pub fn with_manufacturer_data(mut self, company_id: u16, payload: impl Into<Vec<u8>>) -> Self {
        self.manufacturer_data.insert(company_id, payload.into());
        self
    }

    /// The company the device is presented under, with its payload.
    ///
    /// The Apple entry wins whenever one is present, since that is the
    /// payload the FindMy classification was made from. Otherwise the
    /// lowest company identifier is used.
    #[must_use]
    pub fn primary_company(&self) -> Option<(u16, &[u8])> {
        self.manufacturer_data
            .get_key_value(&APPLE_COMPANY_ID)
            .or_else(|| self.manufacturer_data.iter().next())
            .map(|(id, payload)| (*id, payload.as_slice()))
    }
}

/// A tracked device as presented to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "address": "C4:1F:0A:22:9B:73",
    "local_name": null,
    "company_id": 76,
    "company_name": "Apple, Inc.",
    "manufacturer_data": [7, 25, 1, 2],
    "is_airtag": true,
    "is_registered": false,
    "first_seen": "2025-01-15T03:20:00Z",
    "last_seen": "2025-01-15T03:29:00Z",
    "times_seen": 412,
    "tracked_for_secs": 540
}))]
pub struct DeviceView {
    /// Advertiser address.
    #[schema(example = "C4:1F:0A:22:9B:73")]
    pub address: String,

    /// Local name, if broadcast.
    pub local_name: Option<String>,

    /// Primary company identifier, if any manufacturer data was sent.
    #[schema(example = 76)]
    pub company_id: Option<u16>,

    /// Resolved company name, `"Unknown"` when not in the company table.
    #[schema(example = "Apple, Inc.")]
    pub company_name: String,

    /// Raw manufacturer data for the primary company.
    pub manufacturer_data: Vec<u8>,

    /// Whether the payload has the AirTag shape.
    pub is_airtag: bool,

    /// Whether the AirTag is registered to an owner.
    pub is_registered: bool,

    /// When the device was first seen (UTC).
    pub first_seen: DateTime<Utc>,

    /// When the device was last seen (UTC).
    pub last_seen: DateTime<Utc>,

    /// Number of sightings.
    #[schema(example = 412)]
    pub times_seen: u64,

    /// Seconds between first and last sighting.
    #[schema(example = 540)]
    pub tracked_for_secs: i64,
}

/// An ordered point-in-time view of all tracked devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Snapshot {
    /// Devices, longest-tracked first.
    pub devices: Vec<DeviceView>,

    /// Completed scan windows since the pipeline started.
    #[schema(example = 1200)]
    pub scan_count: u64,

    /// When the snapshot was taken (UTC).
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Look up a device by address.
    #[must_use]
    pub fn device(&self, address: &str) -> Option<&DeviceView> {
        self.devices.iter().find(|d| d.address == address)
    }

    /// Number of devices in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the snapshot holds no devices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
