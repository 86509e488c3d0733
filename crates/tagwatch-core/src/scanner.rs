//! Scan source adapter.
//!
//! Drives a [`Radio`] through a fixed duty cycle: rest for `scan_rate`, scan
//! for `scan_length`, then report the completed window on a watch channel.
//! Advertisements go out through an [`AdvertisementSink`]. When the source
//! returns, the sink and the window sender are dropped, which is how the
//! tracker learns that the source has closed.

use tokio::sync::watch;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bluetooth::{AdvertisementSink, BluetoothResult, Radio};
use crate::config::ScanConfig;

/// Duty-cycled advertisement producer.
pub struct ScanSource<R> {
    radio: R,
    config: ScanConfig,
}

impl<R: Radio> ScanSource<R> {
    /// Wrap a radio.
    pub const fn new(radio: R, config: ScanConfig) -> Self {
        Self { radio, config }
    }

    /// Power on the radio. Must succeed before [`ScanSource::run`] is useful.
    ///
    /// # Errors
    ///
    /// Returns the radio's error if it cannot be enabled.
    pub async fn enable(&mut self) -> BluetoothResult<()> {
        self.radio.enable().await?;
        info!(radio = self.radio.name(), "Radio enabled");
        Ok(())
    }

    /// Run the duty cycle until cancelled or until nobody is listening.
    ///
    /// Each completed window bumps the counter published on `windows`. A
    /// window whose scan failed is logged and not counted.
    pub async fn run(
        mut self,
        sink: AdvertisementSink,
        windows: watch::Sender<u64>,
        cancel: CancellationToken,
    ) {
        let mut completed: u64 = 0;
        info!(
            scan_rate_ms = self.config.scan_rate_ms,
            scan_length_ms = self.config.scan_length_ms,
            "Scan source started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = time::sleep(self.config.scan_rate()) => {}
            }

            let deadline = Instant::now() + self.config.scan_length();
            // Dropping the scan future at the deadline stops the radio scan.
            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                result = self.radio.scan(&sink) => Some(result),
                () = time::sleep_until(deadline) => None,
            };

            match outcome {
                Some(Err(e)) => {
                    warn!(radio = self.radio.name(), error = %e, "Scan window failed, retrying next cycle");
                    continue;
                }
                Some(Ok(())) => {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = time::sleep_until(deadline) => {}
                    }
                }
                None => {}
            }

            completed += 1;
            debug!(window = completed, "Scan window complete");
            if windows.send(completed).is_err() || sink.is_closed() {
                debug!("Advertisement consumer gone");
                break;
            }
        }

        info!(windows = completed, "Scan source stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::MockRadio;
    use crate::classify::APPLE_COMPANY_ID;
    use crate::types::Advertisement;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn airtag(address: &str) -> Advertisement {
        Advertisement::new(address).with_manufacturer_data(APPLE_COMPANY_ID, vec![0x07, 0x19, 0x00])
    }

    /// Paused time lands on timer deadlines, give or take timer-wheel rounding.
    fn assert_window_end(start: Instant, expected_ms: u64) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(expected_ms) && elapsed < Duration::from_millis(expected_ms + 5),
            "window ended after {elapsed:?}, expected {expected_ms}ms"
        );
    }

    fn config() -> ScanConfig {
        ScanConfig {
            scan_rate_ms: 50,
            scan_length_ms: 200,
            buffer_size: 16,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_windows_follow_duty_cycle() {
        let (tx, mut rx) = mpsc::channel(16);
        let (windows_tx, mut windows) = watch::channel(0);
        let cancel = CancellationToken::new();
        let sink = AdvertisementSink::new(tx, cancel.clone());

        let radio = MockRadio::new().with_window(vec![airtag("A"), airtag("B")]);
        let start = Instant::now();
        let handle = tokio::spawn(ScanSource::new(radio, config()).run(sink, windows_tx, cancel.clone()));

        windows.changed().await.unwrap();
        assert_eq!(*windows.borrow_and_update(), 1);
        assert_window_end(start, 250);
        assert_eq!(rx.recv().await.unwrap().address, "A");
        assert_eq!(rx.recv().await.unwrap().address, "B");

        windows.changed().await.unwrap();
        assert_eq!(*windows.borrow_and_update(), 2);
        assert_window_end(start, 500);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_window_is_not_counted() {
        let (tx, _rx) = mpsc::channel(16);
        let (windows_tx, mut windows) = watch::channel(0);
        let cancel = CancellationToken::new();
        let sink = AdvertisementSink::new(tx, cancel.clone());

        let radio = MockRadio::new().with_failed_window("adapter busy");
        let start = Instant::now();
        let handle = tokio::spawn(ScanSource::new(radio, config()).run(sink, windows_tx, cancel.clone()));

        windows.changed().await.unwrap();
        assert_eq!(*windows.borrow(), 1);
        // Failed window rested 50ms and failed at once; the next one ran in full.
        assert_window_end(start, 300);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_buffer_does_not_block_cancellation() {
        let (tx, _rx) = mpsc::channel(1);
        let (windows_tx, _windows) = watch::channel(0);
        let cancel = CancellationToken::new();
        let sink = AdvertisementSink::new(tx, cancel.clone());

        let burst: Vec<_> = (0..10).map(|i| airtag(&format!("dev{i}"))).collect();
        let radio = MockRadio::new().with_window(burst).repeating();
        let handle = tokio::spawn(ScanSource::new(radio, config()).run(sink, windows_tx, cancel.clone()));

        time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        tokio_test::assert_ok!(time::timeout(Duration::from_millis(10), handle).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_consumer_drops() {
        let (tx, rx) = mpsc::channel(4);
        let (windows_tx, windows) = watch::channel(0);
        let cancel = CancellationToken::new();
        let sink = AdvertisementSink::new(tx, cancel.clone());
        drop(rx);
        drop(windows);

        let handle = tokio::spawn(ScanSource::new(MockRadio::new(), config()).run(sink, windows_tx, cancel));
        tokio_test::assert_ok!(time::timeout(Duration::from_secs(1), handle).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_failure_is_reported() {
        let mut source = ScanSource::new(MockRadio::new().without_adapter(), config());
        tokio_test::assert_err!(source.enable().await);
    }
}
