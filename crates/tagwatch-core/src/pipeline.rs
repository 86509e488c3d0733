//! Pipeline bootstrap: wires a radio, the scan source and the tracker.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bluetooth::{AdvertisementSink, Radio};
use crate::companies::CompanyDirectory;
use crate::config::Config;
use crate::error::Result;
use crate::registry::Registry;
use crate::scanner::ScanSource;
use crate::tracker::{Tracker, TrackerState, TrackerStats};
use crate::types::Snapshot;

/// A running scan source and tracker pair.
pub struct Pipeline {
    cancel: CancellationToken,
    state: watch::Receiver<TrackerState>,
    windows: watch::Receiver<u64>,
    registry: Registry,
    scan_task: JoinHandle<()>,
    tracker_task: JoinHandle<TrackerStats>,
}

impl Pipeline {
    /// Validate `config`, enable `radio` and spawn both tasks.
    ///
    /// Returns the pipeline handle and the snapshot receiver. The pipeline
    /// runs on a child of `cancel`, so cancelling the parent stops it too.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the radio cannot
    /// be enabled. Nothing is spawned in that case.
    pub async fn start<R: Radio>(
        radio: R,
        companies: Arc<CompanyDirectory>,
        config: &Config,
        cancel: &CancellationToken,
    ) -> Result<(Self, mpsc::Receiver<Snapshot>)> {
        config.validate()?;

        let mut source = ScanSource::new(radio, config.scan.clone());
        source.enable().await?;

        let cancel = cancel.child_token();
        let (advertisement_tx, advertisement_rx) = mpsc::channel(config.scan.buffer_size);
        let (window_tx, window_rx) = watch::channel(0);
        let (snapshot_tx, snapshot_rx) = mpsc::channel(config.tracking.snapshot_buffer);

        let (tracker, state) = Tracker::new(companies, config.tracking.clone());
        let registry = tracker.registry();

        let sink = AdvertisementSink::new(advertisement_tx, cancel.clone());
        let scan_task = tokio::spawn(source.run(sink, window_tx, cancel.clone()));
        let tracker_task = tokio::spawn(tracker.run(
            advertisement_rx,
            window_rx.clone(),
            snapshot_tx,
            cancel.clone(),
        ));

        info!("Tracking pipeline started");
        let pipeline = Self {
            cancel,
            state,
            windows: window_rx,
            registry,
            scan_task,
            tracker_task,
        };
        Ok((pipeline, snapshot_rx))
    }

    /// Watch the tracker's lifecycle.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<TrackerState> {
        self.state.clone()
    }

    /// Watch the completed scan window counter.
    #[must_use]
    pub fn scan_windows(&self) -> watch::Receiver<u64> {
        self.windows.clone()
    }

    /// Read handle to the device registry.
    #[must_use]
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Cancel both tasks and wait for them. Returns the tracker's counters.
    pub async fn shutdown(self) -> TrackerStats {
        self.cancel.cancel();
        if let Err(e) = self.scan_task.await {
            warn!(error = %e, "Scan source task failed");
        }
        match self.tracker_task.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Tracker task failed");
                TrackerStats::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::MockRadio;
    use crate::classify::APPLE_COMPANY_ID;
    use crate::error::TagwatchError;
    use crate::types::Advertisement;

    fn companies() -> Arc<CompanyDirectory> {
        Arc::new(CompanyDirectory::from_entries([
            (APPLE_COMPANY_ID, "Apple, Inc."),
            (0x00E0, "Google"),
        ]))
    }

    fn lost_airtag(address: &str) -> Advertisement {
        Advertisement::new(address).with_manufacturer_data(APPLE_COMPANY_ID, vec![0x07, 0x19, 0x05])
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_snapshot() {
        let radio = MockRadio::new().with_window(vec![
            lost_airtag("A"),
            Advertisement::new("phone").with_manufacturer_data(0x00E0, vec![0x01]),
            lost_airtag("B"),
        ]);
        let cancel = CancellationToken::new();
        let (pipeline, mut snapshots) = Pipeline::start(radio, companies(), &Config::default(), &cancel)
            .await
            .unwrap();

        let snapshot = snapshots.recv().await.unwrap();
        assert_eq!(snapshot.scan_count, 1);
        let addresses: Vec<_> = snapshot.devices.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addresses, ["A", "B"]);
        assert!(snapshot.devices.iter().all(|d| d.is_airtag && !d.is_registered));

        let mut windows = pipeline.scan_windows();
        windows.wait_for(|count| *count >= 3).await.unwrap();

        let stats = pipeline.shutdown().await;
        assert_eq!(stats.advertisements_received, 3);
        assert_eq!(stats.advertisements_discarded, 1);
        assert_eq!(stats.devices_added, 2);
        assert_eq!(stats.snapshots_published, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_scan_window_is_retried() {
        let radio = MockRadio::new()
            .with_failed_window("adapter busy")
            .with_window(vec![lost_airtag("A")]);
        let cancel = CancellationToken::new();
        let (pipeline, mut snapshots) = Pipeline::start(radio, companies(), &Config::default(), &cancel)
            .await
            .unwrap();

        let snapshot = snapshots.recv().await.unwrap();
        assert_eq!(snapshot.scan_count, 1);
        assert_eq!(snapshot.len(), 1);

        pipeline.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_radio_enable_failure_aborts_start() {
        let cancel = CancellationToken::new();
        let result = Pipeline::start(MockRadio::new().without_adapter(), companies(), &Config::default(), &cancel).await;
        assert!(matches!(result, Err(TagwatchError::BluetoothAdapterNotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_aborts_start() {
        let mut config = Config::default();
        config.scan.buffer_size = 0;
        let cancel = CancellationToken::new();
        let result = Pipeline::start(MockRadio::new(), companies(), &config, &cancel).await;
        assert!(matches!(result, Err(TagwatchError::ConfigValidationError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_stops_pipeline() {
        let cancel = CancellationToken::new();
        let (pipeline, _snapshots) = Pipeline::start(MockRadio::demo(), companies(), &Config::default(), &cancel)
            .await
            .unwrap();
        let mut state = pipeline.state();

        cancel.cancel();
        state.wait_for(|s| *s == TrackerState::Stopped).await.unwrap();
        let stats = pipeline.shutdown().await;
        assert!(stats.devices_added <= 3);
    }
}
