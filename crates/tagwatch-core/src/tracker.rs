//! The tracking loop.
//!
//! A single task owns the [`Registry`] for writing and multiplexes four
//! sources: incoming advertisements, the trim timer, the snapshot trigger
//! and cancellation. Ready sources are picked at random by `select!`, so a
//! flood of advertisements cannot starve eviction or publishing.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::is_findmy_broadcast;
use crate::companies::CompanyDirectory;
use crate::config::{SnapshotTrigger, TrackingConfig};
use crate::registry::Registry;
use crate::snapshot::SnapshotPublisher;
use crate::types::{Advertisement, Snapshot};

/// Lifecycle of a tracking loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerState {
    /// Accepting advertisements.
    Running,
    /// Cancelled; folding advertisements that were already buffered.
    Stopping,
    /// Finished.
    Stopped,
}

/// Counters kept by the tracking loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    /// Advertisements taken off the channel.
    pub advertisements_received: u64,
    /// Advertisements dropped by the FindMy filter.
    pub advertisements_discarded: u64,
    /// Addresses seen for the first time.
    pub devices_added: u64,
    /// Records removed by the trim sweep.
    pub devices_evicted: u64,
    /// Snapshots delivered to the consumer.
    pub snapshots_published: u64,
}

/// The orchestrator between the scan source and the snapshot consumer.
pub struct Tracker {
    registry: Registry,
    publisher: SnapshotPublisher,
    config: TrackingConfig,
    stats: TrackerStats,
    device_count: usize,
    scan_count: u64,
    state: watch::Sender<TrackerState>,
    consumer_lost: bool,
}

impl Tracker {
    /// Create a tracker with an empty registry.
    #[must_use]
    pub fn new(companies: Arc<CompanyDirectory>, config: TrackingConfig) -> (Self, watch::Receiver<TrackerState>) {
        let (state, state_rx) = watch::channel(TrackerState::Running);
        let tracker = Self {
            registry: Registry::new(),
            publisher: SnapshotPublisher::new(companies),
            config,
            stats: TrackerStats::default(),
            device_count: 0,
            scan_count: 0,
            state,
            consumer_lost: false,
        };
        (tracker, state_rx)
    }

    /// A read handle to the registry.
    #[must_use]
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Run until cancelled or until the scan source closes.
    ///
    /// On cancellation the advertisement channel is closed and whatever was
    /// already buffered is folded in before the loop reports
    /// [`TrackerState::Stopped`].
    pub async fn run(
        mut self,
        mut advertisements: mpsc::Receiver<Advertisement>,
        mut windows: watch::Receiver<u64>,
        snapshots: mpsc::Sender<Snapshot>,
        cancel: CancellationToken,
    ) -> TrackerStats {
        let trim_period = self.config.trim_interval();
        let mut trim = time::interval_at(Instant::now() + trim_period, trim_period);
        trim.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let snapshot_period = self.config.snapshot_interval();
        let mut snapshot_timer = time::interval_at(Instant::now() + snapshot_period, snapshot_period);
        snapshot_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let on_interval = self.config.snapshot_trigger == SnapshotTrigger::Interval;

        info!(trigger = ?self.config.snapshot_trigger, "Tracker started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Tracker cancelled");
                    break;
                }
                received = advertisements.recv() => {
                    let Some(advertisement) = received else {
                        info!("Scan source closed");
                        break;
                    };
                    self.ingest(advertisement);
                }
                changed = windows.changed() => {
                    if changed.is_err() {
                        info!("Scan source closed");
                        break;
                    }
                    self.scan_count = *windows.borrow_and_update();
                    if !on_interval {
                        self.publish(&snapshots, &cancel).await;
                    }
                }
                _ = trim.tick() => self.trim(),
                _ = snapshot_timer.tick(), if on_interval => {
                    self.publish(&snapshots, &cancel).await;
                }
            }
        }

        self.state.send_replace(TrackerState::Stopping);
        advertisements.close();
        while let Some(advertisement) = advertisements.recv().await {
            self.ingest(advertisement);
        }
        self.state.send_replace(TrackerState::Stopped);

        info!(
            received = self.stats.advertisements_received,
            devices = self.device_count,
            snapshots = self.stats.snapshots_published,
            "Tracker stopped"
        );
        self.stats
    }

    fn ingest(&mut self, advertisement: Advertisement) {
        self.stats.advertisements_received += 1;
        if !is_findmy_broadcast(&advertisement.manufacturer_data) {
            self.stats.advertisements_discarded += 1;
            return;
        }
        if self.registry.observe(advertisement) {
            self.stats.devices_added += 1;
            self.device_count += 1;
            debug!(devices = self.device_count, "Tracking new FindMy device");
        }
    }

    fn trim(&mut self) {
        let removed = self.registry.evict_stale(self.config.stale_after(), Utc::now());
        if removed == 0 {
            return;
        }
        self.device_count = self.device_count.saturating_sub(removed);
        self.stats.devices_evicted += u64::try_from(removed).unwrap_or(u64::MAX);
        info!(removed, devices = self.device_count, "Evicted stale devices");
    }

    async fn publish(&mut self, snapshots: &mpsc::Sender<Snapshot>, cancel: &CancellationToken) {
        let Some(snapshot) = self.publisher.prepare(self.registry.snapshot(), self.scan_count) else {
            return;
        };
        let devices = snapshot.len();

        tokio::select! {
            sent = snapshots.send(snapshot) => match sent {
                Ok(()) => {
                    self.stats.snapshots_published += 1;
                    debug!(devices, scan_count = self.scan_count, "Published snapshot");
                }
                Err(_) if !self.consumer_lost => {
                    self.consumer_lost = true;
                    warn!("Snapshot consumer has gone away; snapshots are no longer delivered");
                }
                Err(_) => {}
            },
            () = cancel.cancelled() => {}
        }
    }
}
