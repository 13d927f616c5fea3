//! Status tables and limits shared by the stage engine, trail merger and scanner

use std::time::Duration;

/// Number of delivery stages
pub const STAGE_COUNT: usize = 5;

/// Statuses that place a parcel in the `Expecting` stage
pub const EXPECTING_STATUSES: &[&str] = &["pending", "registered", "packed", "awaiting_pickup"];

/// Statuses that place a parcel in the `Received` stage
pub const RECEIVED_STATUSES: &[&str] = &["received", "processing"];

/// Statuses that place a parcel in the `InTransit` stage
pub const IN_TRANSIT_STATUSES: &[&str] = &["in_transit", "shipped"];

/// Statuses that place a parcel in the `OutForDelivery` stage
pub const OUT_FOR_DELIVERY_STATUSES: &[&str] = &["out_for_delivery"];

/// Statuses that place a parcel in the `Delivered` stage
pub const DELIVERED_STATUSES: &[&str] = &["delivered"];

/// Separator between segments of a scanned identifier payload
pub const PAYLOAD_SEPARATOR: char = '/';

/// Payload segment naming a box
pub const KIND_BOX: &str = "box";

/// Payload segment naming a sack
pub const KIND_SACK: &str = "sack";

/// Pause between releasing one camera and acquiring the next.
/// Shorter pauses trip "device busy" on several mobile browsers and drivers.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Separator used in keys taken from a source's own identifier (`scan:41`)
pub const SOURCE_KEY_SEPARATOR: char = ':';

/// Separator used in generated keys (`scan#3`, `message#0`)
pub const SYNTHETIC_KEY_SEPARATOR: char = '#';

/// Normalize a raw status string for table lookup.
///
/// Trims, lowercases ASCII and folds spaces and hyphens into `_`, so
/// `"In Transit"`, `"in-transit"` and `"IN_TRANSIT"` all become `in_transit`.
pub fn normalize_status(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
