//! Terminal table of tracked devices.
//!
//! The display is the snapshot consumer: every snapshot is stored in the
//! shared state (for the API) and, when enabled, rendered as a table that
//! replaces the previous one on screen.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::cursor::MoveTo;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::QueueableCommand;
use tagwatch_core::{DeviceView, DisplayConfig, Snapshot};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Column headings, in order.
pub const HEADER: [&str; 11] = [
    "Address",
    "Name",
    "Company",
    "Payload",
    "AirTag",
    "Registered",
    "First seen",
    "Last seen",
    "Tracked for",
    "Seen",
    "Seen %",
];

/// Terminal size assumed when it cannot be queried.
const FALLBACK_TERMINAL_HEIGHT: u16 = 24;

/// Quiet period after which the consumer notes that nothing has arrived.
const IDLE_NOTICE: Duration = Duration::from_secs(5);

/// One rendered table row.
pub type Row = [String; 11];

/// Consume snapshots until cancelled or until the pipeline closes the channel.
pub async fn run(
    mut snapshots: mpsc::Receiver<Snapshot>,
    state: AppState,
    config: DisplayConfig,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            received = snapshots.recv() => {
                let Some(snapshot) = received else {
                    info!("Snapshot channel closed");
                    break;
                };
                if config.enabled {
                    let height = terminal::size().map_or(FALLBACK_TERMINAL_HEIGHT, |(_, rows)| rows);
                    if let Err(e) = render(&mut io::stdout().lock(), &snapshot, height, config.row_margin) {
                        warn!(error = %e, "Failed to render device table");
                    }
                }
                state.publish(snapshot).await;
            }
            () = tokio::time::sleep(IDLE_NOTICE) => debug!("No snapshot received in {}s", IDLE_NOTICE.as_secs()),
        }
    }
}

/// Clear the screen and draw the table.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render<W: Write>(out: &mut W, snapshot: &Snapshot, term_height: u16, row_margin: u16) -> io::Result<()> {
    out.queue(Clear(ClearType::All))?.queue(MoveTo(0, 0))?;
    out.write_all(format_table(snapshot, term_height, row_margin).as_bytes())?;
    out.flush()
}

/// Rows for the devices that fit on screen, longest-tracked first.
#[must_use]
pub fn prepare_rows(snapshot: &Snapshot, term_height: u16, row_margin: u16) -> Vec<Row> {
    let visible = usize::from(term_height.saturating_sub(row_margin));
    snapshot
        .devices
        .iter()
        .take(visible)
        .map(|device| device_row(device, snapshot.scan_count))
        .collect()
}

fn device_row(device: &DeviceView, scan_count: u64) -> Row {
    [
        device.address.clone(),
        device.local_name.clone().unwrap_or_default(),
        device.company_name.clone(),
        format_payload(device),
        marker(device.is_airtag),
        marker(device.is_registered),
        format_time(device.first_seen),
        format_time(device.last_seen),
        format_duration(device.tracked_for_secs),
        device.times_seen.to_string(),
        format!("{}%", seen_percent(device.times_seen, scan_count)),
    ]
}

fn marker(flag: bool) -> String {
    String::from(if flag { "*" } else { "" })
}

/// Hex body after the two-byte type/length header, with the body length.
///
/// `None` when the device sent no manufacturer data at all.
#[must_use]
pub fn format_payload(device: &DeviceView) -> String {
    if device.company_id.is_none() {
        return "None".to_string();
    }
    let body = device.manufacturer_data.get(2..).unwrap_or_default();
    let hex: Vec<String> = body.iter().map(|b| format!("{b:02X}")).collect();
    format!("[{}]: {}", hex.join(" "), body.len())
}

/// Share of completed scan windows in which the device was seen, capped at 100.
#[must_use]
pub fn seen_percent(times_seen: u64, scan_count: u64) -> u64 {
    if scan_count == 0 {
        return 0;
    }
    (times_seen.saturating_mul(100) / scan_count).min(100)
}

/// `1h 2m 3s`, `4m 5s` or `6s`.
#[must_use]
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}

/// Render the header, the visible rows and a footer as aligned text.
#[must_use]
pub fn format_table(snapshot: &Snapshot, term_height: u16, row_margin: u16) -> String {
    let rows = prepare_rows(snapshot, term_height, row_margin);

    let mut widths = HEADER.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut table = String::new();
    push_line(&mut table, HEADER.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut table, rule.iter().map(String::as_str), &widths);
    for row in &rows {
        push_line(&mut table, row.iter().map(String::as_str), &widths);
    }

    let hidden = snapshot.len().saturating_sub(rows.len());
    let _ = write!(
        table,
        "{} devices, {} scan windows",
        snapshot.len(),
        snapshot.scan_count
    );
    if hidden > 0 {
        let _ = write!(table, " ({hidden} not shown)");
    }
    table.push('\n');
    table
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join(" | ").trim_end());
    out.push('\n');
}
