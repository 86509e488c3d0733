//! Structural classification of Apple FindMy advertisements.
//!
//! FindMy accessories put an Apple manufacturer-data entry whose first byte
//! is the payload type and whose second byte is the payload length. AirTags
//! use a fixed length. Nothing here verifies rotating keys; a device is
//! classified purely by the shape of its payload.

use serde::{Deserialize, Serialize};

use crate::types::ManufacturerData;

/// Bluetooth SIG company identifier for Apple.
pub const APPLE_COMPANY_ID: u16 = 0x004C;

/// Payload type of a registered accessory on the FindMy network.
pub const FINDMY_NETWORK_MARKER: u8 = 0x12;

/// Payload type of an unregistered (or lost-mode) accessory.
pub const UNREGISTERED_MARKER: u8 = 0x07;

/// Payload length byte carried by AirTags.
pub const AIRTAG_PAYLOAD_LENGTH: u8 = 0x19;

/// Result of classifying one advertisement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Broadcasting on the FindMy network.
    pub is_findmy: bool,
    /// FindMy payload with the AirTag length.
    pub is_airtag: bool,
    /// AirTag that is registered to an owner.
    pub is_registered: bool,
}

/// Classify manufacturer data with all three predicates.
#[must_use]
pub fn classify(data: &ManufacturerData) -> Classification {
    Classification {
        is_findmy: is_findmy_broadcast(data),
        is_airtag: is_airtag_shaped(data),
        is_registered: is_registered(data),
    }
}

/// Returns the Apple payload header `(type, length)`, if there are at least
/// two bytes to read.
fn apple_header(data: &ManufacturerData) -> Option<(u8, u8)> {
    match data.get(&APPLE_COMPANY_ID)?.as_slice() {
        [kind, len, ..] => Some((*kind, *len)),
        _ => None,
    }
}

const fn is_findmy_marker(kind: u8) -> bool {
    matches!(kind, FINDMY_NETWORK_MARKER | UNREGISTERED_MARKER)
}

/// True if the Apple payload carries one of the FindMy type markers.
#[must_use]
pub fn is_findmy_broadcast(data: &ManufacturerData) -> bool {
    apple_header(data).is_some_and(|(kind, _)| is_findmy_marker(kind))
}

/// True if the Apple payload is a FindMy payload with the AirTag length.
#[must_use]
pub fn is_airtag_shaped(data: &ManufacturerData) -> bool {
    apple_header(data).is_some_and(|(kind, len)| is_findmy_marker(kind) && len == AIRTAG_PAYLOAD_LENGTH)
}

/// True if the payload is AirTag-shaped and not in unregistered mode.
#[must_use]
pub fn is_registered(data: &ManufacturerData) -> bool {
    is_airtag_shaped(data)
        && apple_header(data).is_some_and(|(kind, _)| kind != UNREGISTERED_MARKER)
}
