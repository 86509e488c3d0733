//! Scripted radio for tests and hardware-free runs.

use std::collections::VecDeque;

use super::{AdvertisementSink, BluetoothError, BluetoothResult, Radio};
use crate::classify::APPLE_COMPANY_ID;
use crate::types::Advertisement;

/// What the mock radio does during one scan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockWindow {
    /// Deliver these advertisements, in order.
    Advertisements(Vec<Advertisement>),
    /// Fail the window with a discovery error.
    Fail(String),
}

/// A radio that replays a script, one entry per scan window.
///
/// Once the script is exhausted every further window is silent, unless the
/// radio was built with [`MockRadio::repeating`], in which case the last
/// entry is replayed forever.
#[derive(Debug, Clone, Default)]
pub struct MockRadio {
    script: VecDeque<MockWindow>,
    repeat_last: bool,
    fail_enable: bool,
}

impl MockRadio {
    /// An empty script: every window is silent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a window that delivers `advertisements`.
    #[must_use]
    pub fn with_window(mut self, advertisements: Vec<Advertisement>) -> Self {
        self.script.push_back(MockWindow::Advertisements(advertisements));
        self
    }

    /// Append a window that fails.
    #[must_use]
    pub fn with_failed_window(mut self, message: impl Into<String>) -> Self {
        self.script.push_back(MockWindow::Fail(message.into()));
        self
    }

    /// Replay the last scripted window forever.
    #[must_use]
    pub const fn repeating(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Make [`Radio::enable`] fail as if no adapter were present.
    #[must_use]
    pub const fn without_adapter(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    /// A small neighbourhood: one lost AirTag, one registered AirTag, one
    /// other FindMy accessory and a phone that is filtered out.
    #[must_use]
    pub fn demo() -> Self {
        Self::new()
            .with_window(vec![
                Advertisement::new("C4:1F:0A:22:9B:73")
                    .with_manufacturer_data(APPLE_COMPANY_ID, vec![0x07, 0x19, 0x05, 0x4A, 0x9C]),
                Advertisement::new("DA:02:7E:41:10:8F")
                    .with_manufacturer_data(APPLE_COMPANY_ID, vec![0x12, 0x19, 0x10, 0xB2, 0x33]),
                Advertisement::new("F1:6C:55:0D:21:E4")
                    .with_manufacturer_data(APPLE_COMPANY_ID, vec![0x12, 0x02, 0x00, 0x01]),
                Advertisement::new("58:D3:49:AA:01:7C")
                    .with_local_name("Pixel 8")
                    .with_manufacturer_data(0x00E0, vec![0x01, 0x02]),
            ])
            .repeating()
    }

    fn next_window(&mut self) -> Option<MockWindow> {
        if self.repeat_last && self.script.len() == 1 {
            return self.script.front().cloned();
        }
        self.script.pop_front()
    }
}

impl Radio for MockRadio {
    fn name(&self) -> &str {
        "mock"
    }

    async fn enable(&mut self) -> BluetoothResult<()> {
        if self.fail_enable {
            return Err(BluetoothError::AdapterNotFound);
        }
        Ok(())
    }

    async fn scan(&mut self, sink: &AdvertisementSink) -> BluetoothResult<()> {
        match self.next_window() {
            None => Ok(()),
            Some(MockWindow::Fail(message)) => Err(BluetoothError::DiscoveryFailed { message }),
            Some(MockWindow::Advertisements(advertisements)) => {
                for advertisement in advertisements {
                    if !sink.push(advertisement).await {
                        break;
                    }
                }
                Ok(())
            }
        }
    }
}
