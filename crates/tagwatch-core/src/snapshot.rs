//! Snapshot ordering, change detection and presentation.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;

use crate::companies::{CompanyDirectory, UNKNOWN_COMPANY};
use crate::registry::TrackedDevice;
use crate::types::{DeviceView, Snapshot};

/// Longest-tracked first, then by address.
#[must_use]
pub fn by_tracking_duration(a: &TrackedDevice, b: &TrackedDevice) -> Ordering {
    b.tracked_for()
        .cmp(&a.tracked_for())
        .then_with(|| a.address.cmp(&b.address))
}

impl DeviceView {
    /// Present a tracked device, resolving its primary company.
    #[must_use]
    pub fn from_device(device: &TrackedDevice, companies: &CompanyDirectory) -> Self {
        let advertisement = &device.last_advertisement;
        let classification = device.classification();
        let primary = advertisement.primary_company();

        Self {
            address: device.address.clone(),
            local_name: advertisement.local_name.clone(),
            company_id: primary.map(|(id, _)| id),
            company_name: primary
                .map_or(UNKNOWN_COMPANY, |(id, _)| companies.resolve(id))
                .to_string(),
            manufacturer_data: primary.map(|(_, payload)| payload.to_vec()).unwrap_or_default(),
            is_airtag: classification.is_airtag,
            is_registered: classification.is_registered,
            first_seen: device.first_seen,
            last_seen: device.last_seen,
            times_seen: device.times_seen,
            tracked_for_secs: device.tracked_for().num_seconds(),
        }
    }
}

/// Turns registry copies into snapshots, suppressing repeats.
///
/// Remembers the last ordered record set it let through. The scan counter
/// is not part of the comparison, so a quiet scan window publishes nothing.
#[derive(Debug)]
pub struct SnapshotPublisher {
    companies: Arc<CompanyDirectory>,
    last: Option<Vec<TrackedDevice>>,
}

impl SnapshotPublisher {
    /// Create a publisher that has published nothing yet.
    #[must_use]
    pub const fn new(companies: Arc<CompanyDirectory>) -> Self {
        Self {
            companies,
            last: None,
        }
    }

    /// Sort `records` and return a snapshot if it differs from the last one.
    pub fn prepare(&mut self, mut records: Vec<TrackedDevice>, scan_count: u64) -> Option<Snapshot> {
        records.sort_by(by_tracking_duration);
        if self.last.as_ref() == Some(&records) {
            return None;
        }

        let snapshot = Snapshot {
            devices: records
                .iter()
                .map(|device| DeviceView::from_device(device, &self.companies))
                .collect(),
            scan_count,
            taken_at: Utc::now(),
        };
        self.last = Some(records);
        Some(snapshot)
    }
}
