//! Concurrent registry of tracked devices.
//!
//! One [`TrackedDevice`] per address, stored in a sharded [`DashMap`]. Every
//! mutation goes through the entry API or `retain`, so a record is always
//! updated under its shard lock and readers never see half of an update.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::classify::{classify, Classification};
use crate::types::Advertisement;

/// A device the tracker has seen at least once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedDevice {
    /// Advertiser address, the registry key.
    pub address: String,
    /// Most recent advertisement from this address.
    pub last_advertisement: Advertisement,
    /// First sighting. Never changes.
    pub first_seen: DateTime<Utc>,
    /// Most recent sighting.
    pub last_seen: DateTime<Utc>,
    /// Number of sightings, at least 1.
    pub times_seen: u64,
}

impl TrackedDevice {
    /// Create a record for a first sighting.
    #[must_use]
    pub fn new(advertisement: Advertisement, now: DateTime<Utc>) -> Self {
        Self {
            address: advertisement.address.clone(),
            last_advertisement: advertisement,
            first_seen: now,
            last_seen: now,
            times_seen: 1,
        }
    }

    /// Fold another sighting into the record.
    pub fn record_sighting(&mut self, advertisement: Advertisement, now: DateTime<Utc>) {
        // A wall clock stepping backwards must not break first_seen <= last_seen.
        self.last_seen = now.max(self.last_seen);
        self.times_seen = self.times_seen.saturating_add(1);
        self.last_advertisement = advertisement;
    }

    /// Time between first and last sighting.
    #[must_use]
    pub fn tracked_for(&self) -> Duration {
        self.last_seen - self.first_seen
    }

    /// True once the device has been silent for longer than `threshold`.
    #[must_use]
    pub fn is_stale(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_seen > threshold
    }

    /// Classification of the latest advertisement.
    #[must_use]
    pub fn classification(&self) -> Classification {
        classify(&self.last_advertisement.manufacturer_data)
    }
}

/// Thread-safe store of tracked devices keyed by address.
///
/// Cloning is cheap and yields a handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    devices: Arc<DashMap<String, TrackedDevice>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting now. Returns `true` if the address was new.
    pub fn observe(&self, advertisement: Advertisement) -> bool {
        self.observe_at(advertisement, Utc::now())
    }

    /// Record a sighting at `now`. Returns `true` if the address was new.
    pub fn observe_at(&self, advertisement: Advertisement, now: DateTime<Utc>) -> bool {
        match self.devices.entry(advertisement.address.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().record_sighting(advertisement, now);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(TrackedDevice::new(advertisement, now));
                true
            }
        }
    }

    /// Remove every device silent for longer than `threshold`.
    ///
    /// Returns the number of devices removed.
    pub fn evict_stale(&self, threshold: Duration, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.devices.retain(|_, device| {
            let keep = !device.is_stale(threshold, now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Copy every record out of the registry, in no particular order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TrackedDevice> {
        self.devices
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Copy of one record.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<TrackedDevice> {
        self.devices.get(address).map(|entry| entry.value().clone())
    }

    /// Number of tracked devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no devices are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
